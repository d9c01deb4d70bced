// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character references: `&name;`, `&#NNNN;` and `&#xHHHH;`.
//!
//! These states run on behalf of whichever state saw the `&`, and hand
//! their output back to it: character tokens for text, or the builder for
//! an attribute value.

use super::interface::ParserContext;
use super::states::{self, Decimal, Hexadecimal};
use super::{ProcessResult, Tokenizer};

use log::trace;
use mac::{format_if, unwrap_or_return};
use markup5ever::data;
use std::borrow::Cow::Borrowed;
use std::mem;

mod named;

pub(super) use self::named::NamedReferenceMatcher;

/// Map the value of a numeric reference to the character it stands for,
/// along with the parse error it raises, if any.
pub(crate) fn resolve_numeric(code: u32) -> (char, Option<&'static str>) {
    fn conv(n: u32) -> char {
        char::from_u32(n).unwrap_or('\u{fffd}')
    }

    match code {
        0x00 => ('\u{fffd}', Some("Null character reference")),
        n if n > 0x10FFFF => ('\u{fffd}', Some("Character reference outside Unicode range")),
        0xD800..=0xDFFF => ('\u{fffd}', Some("Surrogate character reference")),
        0xFDD0..=0xFDEF => (conv(code), Some("Noncharacter character reference")),
        n if (n & 0xFFFE) == 0xFFFE => (conv(n), Some("Noncharacter character reference")),
        0x80..=0x9F => match data::C1_REPLACEMENTS[(code - 0x80) as usize] {
            Some(c) => (c, Some("Control character reference")),
            None => (conv(code), Some("Control character reference")),
        },
        0x01..=0x08 | 0x0B | 0x0D..=0x1F | 0x7F => {
            (conv(code), Some("Control character reference"))
        },
        n => (conv(n), None),
    }
}

impl<Ctx: ParserContext> Tokenizer<Ctx> {
    /// Remember where to come back to.  The `&` has just been consumed.
    pub(super) fn begin_char_ref(&mut self) {
        self.return_state = self.state;
        self.char_ref_start = self.input.prev_offset();
        self.temp_buf.clear();
        self.temp_buf.push_char('&');
    }

    fn consumed_as_part_of_an_attribute(&self) -> bool {
        self.return_state.is_attribute_value()
    }

    fn flush_code_points_consumed_as_a_character_reference(&mut self) {
        let buf = mem::take(&mut self.temp_buf);
        if self.consumed_as_part_of_an_attribute() {
            self.builder.push_tendril(&buf);
        } else {
            for c in buf.chars() {
                self.emit_char(c);
            }
        }
    }

    pub(super) fn step_char_ref(&mut self) -> ProcessResult {
        match self.state {
            //§ character-reference-state
            states::CharacterReference => {
                let c = get_char!(self);
                if c.is_ascii_alphanumeric() {
                    self.named_matcher = NamedReferenceMatcher::new();
                    go!(self: reconsume NamedCharacterReference);
                }
                if c == '#' {
                    self.char_ref_code = 0;
                    go!(self: push_temp c; to_dirty NumericCharacterReference);
                }
                self.flush_code_points_consumed_as_a_character_reference();
                go!(self: reconsume_return_state)
            },

            //§ named-character-reference-state
            states::NamedCharacterReference => {
                let c = get_char!(self);
                if self.stop_at_insertion_point && self.input.is_insertion_point_defined() {
                    // More of the name may be written in later, so take it
                    // one code point per step.
                    if self.named_matcher.try_consume_code_point(c) {
                        self.temp_buf.push_char(c);
                        return ProcessResult::Continue;
                    }
                    self.reconsume_current();
                } else if self.named_matcher.try_consume_code_point(c) {
                    self.temp_buf.push_char(c);
                    let mut scanned = 0;
                    for &next in self.input.slice_from(self.input.offset()) {
                        if !self.named_matcher.try_consume_code_point(next) {
                            break;
                        }
                        self.temp_buf.push_char(next);
                        scanned += 1;
                    }
                    self.input.skip(scanned);
                } else {
                    self.reconsume_current();
                }
                self.finish_named_character_reference()
            },

            //§ ambiguous-ampersand-state
            states::AmbiguousAmpersand => loop {
                let c = get_char!(self);
                match c {
                    c if c.is_ascii_alphanumeric() => {
                        if self.consumed_as_part_of_an_attribute() {
                            go!(self: push c);
                        } else {
                            go!(self: emit c);
                        }
                    },
                    ';' => {
                        self.emit_error(Borrowed("Unknown named character reference"));
                        go!(self: reconsume_return_state);
                    },
                    _ => go!(self: reconsume_return_state),
                }
            },

            //§ numeric-character-reference-state
            states::NumericCharacterReference => match get_char!(self) {
                c @ ('x' | 'X') => go!(self: push_temp c; to_dirty NumericCharacterReferenceStart Hexadecimal),
                _ => go!(self: reconsume NumericCharacterReferenceStart Decimal),
            },

            //§ hexadecimal-character-reference-start-state decimal-character-reference-start-state
            states::NumericCharacterReferenceStart(kind) => {
                let c = get_char!(self);
                if c.is_digit(kind.radix()) {
                    go!(self: reconsume NumericCharacterReferenceDigits kind);
                }
                self.emit_error(Borrowed("Numeric character reference without digits"));
                self.flush_code_points_consumed_as_a_character_reference();
                go!(self: reconsume_return_state)
            },

            //§ hexadecimal-character-reference-state decimal-character-reference-state
            states::NumericCharacterReferenceDigits(kind) => loop {
                let c = get_char!(self);
                match c.to_digit(kind.radix()) {
                    // Past 0x10FFFF the value only has to stay out of range.
                    Some(n) => {
                        self.char_ref_code = (self.char_ref_code * kind.radix() + n).min(0x110000);
                    },
                    None if c == ';' => go!(self: to_dirty NumericCharacterReferenceEnd),
                    None => {
                        self.emit_error(Borrowed(
                            "Semicolon missing after numeric character reference",
                        ));
                        go!(self: reconsume NumericCharacterReferenceEnd);
                    },
                }
            },

            //§ numeric-character-reference-end-state
            states::NumericCharacterReferenceEnd => self.finish_numeric(),

            _ => unreachable!("{:?} is not a character reference state", self.state),
        }
    }

    pub(super) fn eof_char_ref(&mut self) -> ProcessResult {
        match self.state {
            states::CharacterReference => {
                self.flush_code_points_consumed_as_a_character_reference();
                go!(self: to_return_state)
            },

            states::NamedCharacterReference => self.finish_named_character_reference(),

            states::AmbiguousAmpersand => go!(self: to_return_state),

            states::NumericCharacterReference => {
                go!(self: to_dirty NumericCharacterReferenceStart Decimal)
            },

            states::NumericCharacterReferenceStart(_) => {
                self.bad_eof_error();
                self.flush_code_points_consumed_as_a_character_reference();
                go!(self: to_return_state)
            },

            states::NumericCharacterReferenceDigits(_) => {
                self.bad_eof_error();
                go!(self: to_dirty NumericCharacterReferenceEnd)
            },

            states::NumericCharacterReferenceEnd => self.finish_numeric(),

            _ => unreachable!("{:?} is not a character reference state", self.state),
        }
    }

    fn finish_named_character_reference(&mut self) -> ProcessResult {
        // Back up to the longest match.  "&notindo" could still have become
        // "&notindot;" but has to settle for "&not".
        let overconsumed = self.named_matcher.overconsumed_code_points();
        if overconsumed > 0 {
            self.input.restore_to(self.input.offset() - overconsumed);
            self.temp_buf.pop_back(overconsumed as u32);
        }

        let (first, second) = match self.named_matcher.code_points() {
            Some(code_points) => code_points,
            None => {
                self.flush_code_points_consumed_as_a_character_reference();
                go!(self: to_dirty AmbiguousAmpersand);
            },
        };

        let terminated = self.named_matcher.last_match_ends_with_semicolon();
        if self.consumed_as_part_of_an_attribute() && !terminated {
            let next = self.input.peek(0, self.stop_at_insertion_point);
            if matches!(next, Some(c) if c == '=' || c.is_ascii_alphanumeric()) {
                // Legacy query strings like "?a=1&not=2" stay as they are.
                self.flush_code_points_consumed_as_a_character_reference();
                go!(self: to_return_state);
            }
        }

        if !terminated {
            let msg = format_if!(
                self.opts.exact_errors,
                "Character reference does not end with semicolon",
                "Character reference {} does not end with semicolon",
                self.temp_buf
            );
            self.emit_error(msg);
        }

        trace!("resolved {} to {first:?} {second:?}", self.temp_buf);
        self.temp_buf.clear();
        self.temp_buf.push_char(first);
        if let Some(second) = second {
            self.temp_buf.push_char(second);
        }
        self.flush_code_points_consumed_as_a_character_reference();
        go!(self: to_return_state)
    }

    fn finish_numeric(&mut self) -> ProcessResult {
        let (c, error) = resolve_numeric(self.char_ref_code);
        if let Some(error) = error {
            let msg = format_if!(
                self.opts.exact_errors,
                error,
                "{} 0x{:06X}",
                error,
                self.char_ref_code
            );
            self.emit_error(msg);
        }

        self.temp_buf.clear();
        self.temp_buf.push_char(c);
        self.flush_code_points_consumed_as_a_character_reference();
        go!(self: to_return_state)
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_numeric;

    #[test]
    fn plain_values_resolve_without_error() {
        assert_eq!(resolve_numeric(0x41), ('A', None));
        assert_eq!(resolve_numeric(0x1F600), ('\u{1F600}', None));
        assert_eq!(resolve_numeric(0x09), ('\t', None));
        assert_eq!(resolve_numeric(0x0C), ('\x0C', None));
    }

    #[test]
    fn zero_out_of_range_and_surrogates_become_replacement() {
        for code in [0, 0x110000, 0xD800, 0xDFFF] {
            let (c, error) = resolve_numeric(code);
            assert_eq!(c, '\u{fffd}');
            assert!(error.is_some(), "0x{code:X} should be an error");
        }
    }

    #[test]
    fn c1_controls_are_remapped() {
        assert_eq!(resolve_numeric(0x80).0, '\u{20AC}');
        assert_eq!(resolve_numeric(0x99).0, '\u{2122}');
        assert_eq!(resolve_numeric(0x9F).0, '\u{178}');
        assert!(resolve_numeric(0x80).1.is_some());
    }

    #[test]
    fn c1_controls_without_mapping_are_kept() {
        assert_eq!(resolve_numeric(0x81).0, '\u{81}');
        assert!(resolve_numeric(0x81).1.is_some());
    }

    #[test]
    fn other_controls_are_errors_but_kept() {
        assert_eq!(resolve_numeric(0x01), ('\u{1}', Some("Control character reference")));
        assert_eq!(resolve_numeric(0x0D), ('\r', Some("Control character reference")));
        assert_eq!(resolve_numeric(0x7F).0, '\u{7F}');
    }

    #[test]
    fn noncharacters_are_errors_but_kept() {
        assert_eq!(resolve_numeric(0xFFFE).0, '\u{FFFE}');
        assert!(resolve_numeric(0xFDD0).1.is_some());
        assert!(resolve_numeric(0x10FFFF).1.is_some());
    }
}
