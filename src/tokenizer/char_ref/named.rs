// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use markup5ever::data;

/// Longest-prefix matcher over the named character reference table, fed
/// one code point at a time.
#[derive(Clone, Debug, Default)]
pub(crate) struct NamedReferenceMatcher {
    /// Everything accepted so far, without the leading `&`.
    name: String,

    /// Length of the longest complete reference seen, and its code points.
    last_match: Option<(usize, (u32, u32))>,
}

impl NamedReferenceMatcher {
    pub(crate) fn new() -> NamedReferenceMatcher {
        NamedReferenceMatcher::default()
    }

    /// Feed `c`.  Returns false, without keeping `c`, if no reference name
    /// starts with what has been accepted plus `c`.
    pub(crate) fn try_consume_code_point(&mut self, c: char) -> bool {
        self.name.push(c);
        match data::NAMED_ENTITIES.get(&self.name[..]) {
            None => {
                self.name.pop();
                false
            },
            // A proper prefix of some name.
            Some(&(0, _)) => true,
            Some(&code_points) => {
                self.last_match = Some((self.name.len(), code_points));
                true
            },
        }
    }

    /// How many accepted code points lie past the longest match.  With no
    /// match at all, that is everything accepted.
    pub(crate) fn overconsumed_code_points(&self) -> usize {
        // Names are ASCII, so bytes and code points agree.
        let matched = self.last_match.map_or(0, |(len, _)| len);
        self.name.len() - matched
    }

    /// The code points of the longest match, if any.
    pub(crate) fn code_points(&self) -> Option<(char, Option<char>)> {
        let (_, (first, second)) = self.last_match?;
        let first = char::from_u32(first)?;
        Some((first, char::from_u32(second).filter(|&c| c != '\0')))
    }

    pub(crate) fn last_match_ends_with_semicolon(&self) -> bool {
        match self.last_match {
            Some((len, _)) => self.name.as_bytes()[len - 1] == b';',
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::NamedReferenceMatcher;

    fn feed(input: &str) -> (NamedReferenceMatcher, usize) {
        let mut matcher = NamedReferenceMatcher::new();
        let mut accepted = 0;
        for c in input.chars() {
            if !matcher.try_consume_code_point(c) {
                break;
            }
            accepted += 1;
        }
        (matcher, accepted)
    }

    #[test]
    fn full_match_with_semicolon() {
        let (m, accepted) = feed("amp;");
        assert_eq!(accepted, 4);
        assert_eq!(m.overconsumed_code_points(), 0);
        assert_eq!(m.code_points(), Some(('&', None)));
        assert!(m.last_match_ends_with_semicolon());
    }

    #[test]
    fn legacy_match_without_semicolon() {
        let (m, _) = feed("amp ");
        assert_eq!(m.code_points(), Some(('&', None)));
        assert!(!m.last_match_ends_with_semicolon());
    }

    #[test]
    fn overconsumption_backs_up_to_longest_match() {
        // "notindo" could still have become "notindot;".
        let (m, accepted) = feed("notindo");
        assert_eq!(accepted, 7);
        assert_eq!(m.overconsumed_code_points(), 4);
        assert_eq!(m.code_points(), Some(('\u{ac}', None)));
    }

    #[test]
    fn two_code_point_reference() {
        let (m, _) = feed("NotEqualTilde;");
        assert_eq!(m.code_points(), Some(('\u{2242}', Some('\u{338}'))));
    }

    #[test]
    fn no_match_overconsumes_everything() {
        let (m, accepted) = feed("xyz;");
        assert_eq!(m.code_points(), None);
        assert_eq!(m.overconsumed_code_points(), accepted);
        assert!(!m.last_match_ends_with_semicolon());
    }

    #[test]
    fn rejects_code_points_no_name_continues_with() {
        let mut m = NamedReferenceMatcher::new();
        assert!(m.try_consume_code_point('l'));
        assert!(m.try_consume_code_point('t'));
        assert!(!m.try_consume_code_point('!'));
        assert_eq!(m.overconsumed_code_points(), 0);
        assert_eq!(m.code_points(), Some(('<', None)));
    }
}
