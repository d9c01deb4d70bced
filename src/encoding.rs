// Copyright 2014-2025 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turning a byte buffer into the code points the tokenizer consumes.

use encoding_rs::{DecoderResult, Encoding};
use log::debug;
use thiserror::Error;

use crate::tendril::StrTendril;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// <https://encoding.spec.whatwg.org/#concept-encoding-get> found nothing.
    #[error("unknown encoding label {0:?}")]
    UnknownLabel(String),
}

pub struct Decoder {
    inner: encoding_rs::Decoder,
}

impl Decoder {
    /// A decoder for the encoding called `label`.  A byte order mark at the
    /// start of the input overrides the label.
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| EncodingError::UnknownLabel(label.to_owned()))?;
        Ok(Self::new(encoding))
    }

    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            inner: encoding.new_decoder(),
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.inner.encoding()
    }

    /// Decode a chunk, replacing each malformed sequence with U+FFFD.
    pub fn decode(&mut self, chunk: &[u8], last: bool, output: &mut String) {
        let mut remaining = chunk;
        loop {
            let needed = self
                .inner
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .unwrap_or(8192)
                .min(8192);
            output.reserve(needed.max(4));

            let (result, bytes_read) =
                self.inner
                    .decode_to_string_without_replacement(remaining, output, last);
            remaining = &remaining[bytes_read..];

            match result {
                DecoderResult::InputEmpty => return,
                DecoderResult::OutputFull => (),
                DecoderResult::Malformed(_, _) => {
                    debug!("malformed {} input", self.inner.encoding().name());
                    output.push('\u{fffd}');
                },
            }
        }
    }
}

/// Decode all of `bytes` as the encoding named by `label`.
pub fn decode(bytes: &[u8], label: &str) -> Result<StrTendril, EncodingError> {
    let mut decoder = Decoder::for_label(label)?;
    let mut output = String::with_capacity(bytes.len());
    decoder.decode(bytes, true, &mut output);
    Ok(StrTendril::from(output))
}

#[cfg(test)]
mod tests {
    use super::{decode, Decoder, EncodingError};

    #[test]
    fn utf8_passes_through() {
        assert_eq!(&*decode("<p>caf\u{e9}</p>".as_bytes(), "utf-8").unwrap(), "<p>caf\u{e9}</p>");
    }

    #[test]
    fn labels_are_resolved() {
        let decoder = Decoder::for_label(" Latin1 ").unwrap();
        assert_eq!(decoder.encoding(), encoding_rs::WINDOWS_1252);
        assert_eq!(&*decode(b"\x80\xe9", "iso-8859-1").unwrap(), "\u{20ac}\u{e9}");
    }

    #[test]
    fn bom_overrides_label() {
        assert_eq!(&*decode(b"\xef\xbb\xbfok", "windows-1252").unwrap(), "ok");
    }

    #[test]
    fn malformed_input_is_replaced() {
        assert_eq!(&*decode(b"a\xffb", "utf-8").unwrap(), "a\u{fffd}b");
    }

    #[test]
    fn unknown_label_is_an_error() {
        assert_eq!(
            decode(b"", "no-such-encoding"),
            Err(EncodingError::UnknownLabel("no-such-encoding".to_owned()))
        );
    }
}
