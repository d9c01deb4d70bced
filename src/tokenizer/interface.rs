// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::tendril::StrTendril;
use crate::LocalName;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

pub use self::TagKind::{EndTag, StartTag};
pub use self::TokenKind::{CharacterToken, CommentToken, DoctypeToken, EOFToken, TagToken};

/// A place in the source text.  Lines and columns both count from zero, and
/// every newline flavor counts as one line break.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug, Default)]
pub struct Position {
    pub line: u64,
    pub column: u64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// The stretch of source a token or attribute came from.  `end` is the
/// position just past the last code point.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A `DOCTYPE` token.  `None` identifiers are missing, which is not the same
/// as empty.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub force_quirks: bool,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}

/// An attribute as it appeared on a tag.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Attribute {
    pub name: LocalName,
    pub value: StrTendril,
    pub name_span: Span,
    pub value_span: Span,
}

/// A tag token.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: LocalName,
    pub self_closing: bool,
    /// In source order.  Names may repeat.
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// Are the tags equivalent when we don't care about attribute order?
    /// Also ignores the self-closing flag and source spans.
    pub fn equiv_modulo_attr_order(&self, other: &Tag) -> bool {
        if (self.kind != other.kind) || (self.name != other.name) {
            return false;
        }

        fn sorted(tag: &Tag) -> Vec<(&str, &str)> {
            let mut attrs: Vec<(&str, &str)> =
                tag.attrs.iter().map(|a| (&*a.name, &*a.value)).collect();
            attrs.sort();
            attrs
        }

        sorted(self) == sorted(other)
    }

    /// Value of the first attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&StrTendril> {
        self.attrs
            .iter()
            .find(|attr| &*attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Drop every attribute whose name already appeared earlier on the tag.
    pub fn dedup_attributes(&mut self) {
        let mut seen: Vec<LocalName> = Vec::with_capacity(self.attrs.len());
        self.attrs.retain(|attr| {
            if seen.contains(&attr.name) {
                false
            } else {
                seen.push(attr.name.clone());
                true
            }
        });
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum TokenKind {
    DoctypeToken(Doctype),
    TagToken(Tag),
    CommentToken(StrTendril),
    CharacterToken(char),
    EOFToken,
}

/// A token together with where it came from.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_start_tag(&self) -> bool {
        matches!(self.kind, TagToken(Tag { kind: StartTag, .. }))
    }

    pub fn is_end_tag(&self) -> bool {
        matches!(self.kind, TagToken(Tag { kind: EndTag, .. }))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, EOFToken)
    }

    pub fn tag(&self) -> Option<&Tag> {
        match self.kind {
            TagToken(ref tag) => Some(tag),
            _ => None,
        }
    }

    pub fn code_point(&self) -> Option<char> {
        match self.kind {
            CharacterToken(c) => Some(c),
            _ => None,
        }
    }
}

/// A recoverable error in the input.  Tokenizing always carries on.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ParseError {
    pub message: Cow<'static, str>,
    pub position: Position,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

/// What the tokenizer may ask of the tree builder that drives it.
pub trait ParserContext {
    /// Held only by the tree builder.  A [`Badge`] can only be made from
    /// one, so whoever can name this type decides who may override the
    /// tokenizer state.
    type Capability;

    /// Used in the markup declaration open state. By default, this always
    /// returns false and thus all CDATA sections are tokenized as bogus
    /// comments.
    /// <https://html.spec.whatwg.org/multipage/#markup-declaration-open-state>
    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        false
    }
}

/// The capability of a tokenizer driven without a tree builder.  It has no
/// constructor, so such a tokenizer never changes state from outside.
pub struct NoParser {
    _private: (),
}

impl ParserContext for () {
    type Capability = NoParser;
}

/// Permission to call [`Tokenizer::switch_to`](super::Tokenizer::switch_to).
///
/// A tokenizer made with `Tokenizer::new` has no way to get one:
///
/// ```compile_fail
/// use html5tok::tokenizer::{Badge, NoParser};
///
/// let _ = Badge::<()>::new(&NoParser { _private: () });
/// ```
pub struct Badge<Ctx> {
    _marker: PhantomData<fn(&Ctx)>,
}

impl<Ctx: ParserContext> Badge<Ctx> {
    pub fn new(_capability: &Ctx::Capability) -> Badge<Ctx> {
        Badge {
            _marker: PhantomData,
        }
    }
}
