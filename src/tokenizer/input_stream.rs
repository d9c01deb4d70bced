// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The decoded input of a tokenizer, with a cursor that can back up and an
//! insertion point where script-written text is spliced in.

use super::interface::Position;

use log::trace;

/// Result of trying to consume a fixed string from the input.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum MatchResult {
    Consumed,
    NotConsumed,
    /// The input ended at the insertion point before the string could be
    /// decided.  The caller must suspend and try again later.
    RanOutOfCharacters,
}

pub(crate) struct InputStream {
    chars: Vec<char>,

    /// Offset of the next code point to consume.
    offset: usize,

    /// Offset at which the most recent consumption step started.
    prev_offset: usize,

    insertion_point: Option<usize>,
    saved_insertion_point: Option<usize>,

    /// Has the parser asked for an end of file ahead of the real one?
    eof_inserted: bool,

    /// `(offset, position)` pairs, one per consumption step, ordered by
    /// offset.  The position is the one *at* that offset, i.e. after the
    /// step that ended there.
    positions: Vec<(usize, Position)>,
}

impl InputStream {
    pub(crate) fn new(input: &str) -> InputStream {
        InputStream {
            chars: input.chars().collect(),
            offset: 0,
            prev_offset: 0,
            insertion_point: None,
            saved_insertion_point: None,
            eof_inserted: false,
            positions: vec![(0, Position::default())],
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn prev_offset(&self) -> usize {
        self.prev_offset
    }

    pub(crate) fn source(&self) -> String {
        self.chars.iter().collect()
    }

    /// Look at the code point `n` places past the cursor without consuming
    /// it.  With `stop` set, nothing at or past a defined insertion point is
    /// visible.
    pub(crate) fn peek(&self, n: usize, stop: bool) -> Option<char> {
        let at = self.offset + n;
        if stop {
            if let Some(point) = self.insertion_point {
                if at >= point {
                    return None;
                }
            }
        }
        self.chars.get(at).copied()
    }

    /// Consume one code point, folding CR LF and lone CR into LF.
    ///
    /// Returns `None` once the input is exhausted, after which reconsuming
    /// is a no-op.  The insertion point is not checked here; callers that
    /// stop there do so before calling.
    pub(crate) fn next_char(&mut self, stop: bool) -> Option<char> {
        let Some(&c) = self.chars.get(self.offset) else {
            self.prev_offset = self.offset;
            return None;
        };
        if c == '\r' {
            if self.peek(1, stop) == Some('\n') {
                self.advance(2, '\n');
            } else {
                self.advance(1, '\n');
            }
            return Some('\n');
        }
        self.advance(1, c);
        Some(c)
    }

    /// Consume `n` code points that are known not to contain CR.
    pub(crate) fn skip(&mut self, n: usize) {
        for _ in 0..n {
            let c = self.chars[self.offset];
            debug_assert!(c != '\r');
            self.advance(1, c);
        }
    }

    fn advance(&mut self, raw: usize, normalized: char) {
        let mut position = self.position();
        if normalized == '\n' {
            position.line += 1;
            position.column = 0;
        } else {
            position.column += 1;
        }
        self.prev_offset = self.offset;
        self.offset += raw;
        self.positions.push((self.offset, position));
    }

    /// Move the cursor back to `target`, forgetting the positions of every
    /// step past it.
    pub(crate) fn restore_to(&mut self, target: usize) {
        assert!(
            target <= self.offset,
            "restore_to({target}) would move the cursor forward from {}",
            self.offset
        );
        while self.positions.len() > 1 {
            match self.positions.last() {
                Some(&(offset, _)) if offset > target => {
                    self.positions.pop();
                },
                _ => break,
            }
        }
        self.offset = target;
        self.prev_offset = self.prev_offset.min(target);
    }

    /// Consume `pat` if the input continues with it.  Case folding only
    /// applies to ASCII.
    pub(crate) fn eat(&mut self, pat: &str, ignore_case: bool, stop: bool) -> MatchResult {
        for (i, p) in pat.chars().enumerate() {
            let Some(c) = self.peek(i, stop) else {
                if stop && self.is_insertion_point_defined() {
                    return MatchResult::RanOutOfCharacters;
                }
                return MatchResult::NotConsumed;
            };
            let same = if ignore_case {
                c.to_ascii_lowercase() == p.to_ascii_lowercase()
            } else {
                c == p
            };
            if !same {
                return MatchResult::NotConsumed;
            }
        }
        self.skip(pat.chars().count());
        MatchResult::Consumed
    }

    /// Everything from `from` to the end of the input, ignoring the
    /// insertion point.
    pub(crate) fn slice_from(&self, from: usize) -> &[char] {
        &self.chars[from.min(self.chars.len())..]
    }

    /// Position at the cursor.
    pub(crate) fn position(&self) -> Position {
        self.positions.last().map(|&(_, p)| p).unwrap_or_default()
    }

    /// Position at `offset`, which must not be older than the last trim.
    pub(crate) fn position_at(&self, offset: usize) -> Position {
        self.positions
            .iter()
            .rev()
            .find(|&&(o, _)| o <= offset)
            .map(|&(_, p)| p)
            .unwrap_or_default()
    }

    /// Position where the most recent step started.
    pub(crate) fn previous_position(&self) -> Position {
        self.position_at(self.prev_offset)
    }

    /// Drop position records for offsets below `keep_from`.  The newest
    /// record always survives.
    pub(crate) fn trim_positions(&mut self, keep_from: usize) {
        // The newest record at or below `keep_from` stays so lookups still
        // resolve there.
        let first_kept = self
            .positions
            .partition_point(|&(offset, _)| offset <= keep_from)
            .saturating_sub(1);
        self.positions.drain(..first_kept);
    }

    #[cfg(test)]
    pub(crate) fn position_records(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn is_insertion_point_defined(&self) -> bool {
        self.insertion_point.is_some()
    }

    pub(crate) fn is_insertion_point_reached(&self) -> bool {
        matches!(self.insertion_point, Some(point) if self.offset >= point)
    }

    /// Is the next code point a CR sitting just before the insertion point?
    /// Whether it starts a CR LF pair is not known until more is written.
    pub(crate) fn is_cr_before_insertion_point(&self) -> bool {
        self.chars.get(self.offset) == Some(&'\r') && self.insertion_point == Some(self.offset + 1)
    }

    pub(crate) fn update_insertion_point(&mut self) {
        self.insertion_point = Some(self.offset);
    }

    pub(crate) fn undefine_insertion_point(&mut self) {
        self.insertion_point = None;
    }

    pub(crate) fn store_insertion_point(&mut self) {
        self.saved_insertion_point = self.insertion_point;
    }

    pub(crate) fn restore_insertion_point(&mut self) {
        self.insertion_point = self.saved_insertion_point;
    }

    /// Splice `text` in at the insertion point and move the insertion point
    /// past it.  Without an insertion point the text is appended.
    pub(crate) fn insert_at_insertion_point(&mut self, text: &str) {
        let Some(point) = self.insertion_point else {
            self.append(text);
            return;
        };
        assert!(
            point >= self.offset,
            "insertion point {point} is behind the cursor at {}",
            self.offset
        );
        let before = self.chars.len();
        self.chars.splice(point..point, text.chars());
        let inserted = self.chars.len() - before;
        trace!("inserted {inserted} code points at {point}");
        self.insertion_point = Some(point + inserted);
    }

    pub(crate) fn append(&mut self, text: &str) {
        self.chars.extend(text.chars());
    }

    pub(crate) fn insert_eof(&mut self) {
        self.eof_inserted = true;
    }

    pub(crate) fn is_eof_inserted(&self) -> bool {
        self.eof_inserted
    }
}
