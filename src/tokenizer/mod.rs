// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tokenizer.

pub use self::interface::{Attribute, Doctype, EndTag, StartTag, Tag, TagKind};
pub use self::interface::{Badge, NoParser, ParseError, ParserContext, Position, Span};
pub use self::interface::{CharacterToken, CommentToken, DoctypeToken, EOFToken, TagToken};
pub use self::interface::{Token, TokenKind};

use self::input_stream::{InputStream, MatchResult};
use self::states::{DoctypeIdKind, Public, System};
use self::states::{DoubleEscaped, Escaped};
use self::states::{DoubleQuoted, SingleQuoted, Unquoted};
use self::states::{Rawtext, Rcdata, ScriptData, ScriptDataEscaped};

use crate::macros::time;
use crate::tendril::StrTendril;
use crate::util::str::lower_ascii_letter;
use crate::LocalName;

use log::{debug, trace};
use mac::{format_if, unwrap_or_return};
use std::borrow::Cow::{self, Borrowed};
use std::collections::{BTreeMap, VecDeque};
use std::mem;

mod input_stream;
mod interface;
pub mod states;

/// Characters the input stream should not contain.  Only reported when
/// `exact_errors` is on.
fn is_bad_input_char(c: char) -> bool {
    match c as u32 {
        0x01..=0x08 | 0x0B | 0x0E..=0x1F | 0x7F..=0x9F | 0xFDD0..=0xFDEF => true,
        n if (n & 0xFFFE) == 0xFFFE => true,
        _ => false,
    }
}

/// Tokenizer options, with an impl for `Default`.
#[derive(Clone, Debug)]
pub struct TokenizerOpts {
    /// Report all parse errors described in the HTML standard, at some
    /// performance penalty?  Default: false
    pub exact_errors: bool,

    /// Discard a `U+FEFF BYTE ORDER MARK` if we see one at the beginning
    /// of the stream?  Default: true
    pub discard_bom: bool,

    /// Keep a record of how long we spent in each state?  Printed
    /// when the end-of-file token is produced.  Default: false
    pub profile: bool,

    /// Initial state override.  Only the test runner should use
    /// a non-`None` value!
    pub initial_state: Option<states::State>,

    /// Last start tag.  Only the test runner should use a
    /// non-`None` value!
    pub last_start_tag_name: Option<String>,
}

impl Default for TokenizerOpts {
    fn default() -> TokenizerOpts {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            profile: false,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

/// Whether `next_token` may read past a defined insertion point.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum StopAtInsertionPoint {
    No,
    Yes,
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum ProcessResult {
    /// Run another step.
    Continue,
    /// Out of input, for now or for good.
    Suspend,
}

/// The HTML tokenizer.
pub struct Tokenizer<Ctx = ()> {
    /// Options controlling the behavior of the tokenizer.
    opts: TokenizerOpts,

    /// The parser's view of the document, consulted for CDATA sections.
    ctx: Ctx,

    /// The decoded input, with cursor and insertion point.
    input: InputStream,

    /// The abstract machine state of the HTML standard.
    state: states::State,

    /// Where a character reference goes back to when it is done.
    return_state: states::State,

    /// Does the current `next_token` call stop at the insertion point?
    stop_at_insertion_point: bool,

    /// Tokens produced but not yet handed out.
    queued_tokens: VecDeque<Token>,

    aborted: bool,

    has_emitted_eof: bool,

    /// Current input character.  Just consumed, may reconsume.
    current_char: char,

    /// Highest offset already screened for bad characters, so reconsumed
    /// characters are not reported twice.
    checked_offset: usize,

    /// Text of whatever is being built: a tag or attribute name, an
    /// attribute value, a comment, a doctype name or identifier.  Emptied
    /// whenever that piece is committed.
    builder: StrTendril,

    /// Where the current tag, comment or doctype started.
    markup_start: Position,

    /// Current tag kind.
    current_tag_kind: TagKind,

    /// Current tag name, once the builder has been committed.
    current_tag_name: LocalName,

    /// Current tag is self-closing?
    current_tag_self_closing: bool,

    /// Current tag attributes.
    current_tag_attrs: Vec<Attribute>,

    current_attr_name_start: Position,
    current_attr_value_start: Position,

    /// Current doctype token.
    current_doctype: Doctype,

    /// Last start tag name, for use in checking "appropriate end tag".
    last_start_tag_name: Option<LocalName>,

    /// The "temporary buffer" of the HTML standard.
    temp_buf: StrTendril,

    /// Offset of the `&` that began the current character reference.
    char_ref_start: usize,

    /// Value of the numeric character reference being read.
    char_ref_code: u32,

    named_matcher: char_ref::NamedReferenceMatcher,

    /// Parse errors, in order.
    errors: Vec<ParseError>,

    /// Record of how many ns we spent in each state, if profiling is enabled.
    state_profile: BTreeMap<states::State, u64>,
}

impl Tokenizer {
    /// Tokenize `input` with the default options.
    pub fn new(input: &str) -> Tokenizer {
        Tokenizer::with_opts(input, TokenizerOpts::default())
    }

    pub fn with_opts(input: &str, opts: TokenizerOpts) -> Tokenizer {
        Tokenizer::with_context(input, opts, ())
    }

    /// Decode `bytes` in the encoding named by `label`, then tokenize.
    pub fn from_bytes(
        bytes: &[u8],
        label: &str,
        opts: TokenizerOpts,
    ) -> Result<Tokenizer, crate::encoding::EncodingError> {
        let text = crate::encoding::decode(bytes, label)?;
        Ok(Tokenizer::with_opts(&text, opts))
    }
}

impl<Ctx: ParserContext> Tokenizer<Ctx> {
    /// Create a tokenizer that asks `ctx` about the parser's current node.
    pub fn with_context(input: &str, mut opts: TokenizerOpts, ctx: Ctx) -> Tokenizer<Ctx> {
        let input = match input.strip_prefix('\u{feff}') {
            Some(rest) if opts.discard_bom => rest,
            _ => input,
        };
        let start_tag_name = opts
            .last_start_tag_name
            .take()
            .map(|s| LocalName::from(&*s));
        let state = opts.initial_state.unwrap_or(states::Data);
        Tokenizer {
            opts,
            ctx,
            input: InputStream::new(input),
            state,
            return_state: state,
            stop_at_insertion_point: false,
            queued_tokens: VecDeque::new(),
            aborted: false,
            has_emitted_eof: false,
            current_char: '\0',
            checked_offset: 0,
            builder: StrTendril::new(),
            markup_start: Position::default(),
            current_tag_kind: StartTag,
            current_tag_name: LocalName::default(),
            current_tag_self_closing: false,
            current_tag_attrs: vec![],
            current_attr_name_start: Position::default(),
            current_attr_value_start: Position::default(),
            current_doctype: Doctype::default(),
            last_start_tag_name: start_tag_name,
            temp_buf: StrTendril::new(),
            char_ref_start: 0,
            char_ref_code: 0,
            named_matcher: char_ref::NamedReferenceMatcher::new(),
            errors: vec![],
            state_profile: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &Ctx {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Ctx {
        &mut self.ctx
    }

    /// Produce the next token, or `None` if there is nothing to produce
    /// right now.
    ///
    /// With `StopAtInsertionPoint::Yes`, `None` may only mean that the
    /// insertion point was reached; more input can be inserted and the call
    /// repeated.  Once the end-of-file token has been returned, or after
    /// `abort`, every call returns `None` after the queued tokens.
    pub fn next_token(&mut self, stop_at_insertion_point: StopAtInsertionPoint) -> Option<Token> {
        if let Some(token) = self.queued_tokens.pop_front() {
            return Some(token);
        }
        if self.aborted || self.has_emitted_eof {
            return None;
        }

        self.stop_at_insertion_point = stop_at_insertion_point == StopAtInsertionPoint::Yes;
        self.trim_source_positions();

        loop {
            if let Some(token) = self.queued_tokens.pop_front() {
                return Some(token);
            }
            if self.stop_at_insertion_point && self.input.is_insertion_point_reached() {
                return None;
            }
            if self.run_step() == ProcessResult::Suspend {
                return self.queued_tokens.pop_front();
            }
        }
    }

    /// The state the tokenizer is in.
    pub fn state(&self) -> states::State {
        self.state
    }

    /// Switch state on behalf of the parser, e.g. to `RawData(Rcdata)`
    /// after a `<title>` start tag.
    pub fn switch_to(&mut self, _badge: Badge<Ctx>, state: states::State) {
        trace!("parser switches the tokenizer from {:?} to {state:?}", self.state);
        self.state = state;
    }

    pub fn update_insertion_point(&mut self) {
        self.input.update_insertion_point();
    }

    pub fn undefine_insertion_point(&mut self) {
        self.input.undefine_insertion_point();
    }

    pub fn store_insertion_point(&mut self) {
        self.input.store_insertion_point();
    }

    pub fn restore_insertion_point(&mut self) {
        self.input.restore_insertion_point();
    }

    pub fn is_insertion_point_defined(&self) -> bool {
        self.input.is_insertion_point_defined()
    }

    pub fn is_insertion_point_reached(&self) -> bool {
        self.input.is_insertion_point_reached()
    }

    /// Splice `text` in at the insertion point, as `document.write` does.
    /// Without an insertion point, `text` is appended.
    pub fn insert_input_at_insertion_point(&mut self, text: &str) {
        self.input.insert_at_insertion_point(text);
    }

    /// Add `text` at the very end of the input.
    pub fn append_to_input_stream(&mut self, text: &str) {
        self.input.append(text);
    }

    /// Note that the parser has closed the input.  Tokenizing is not
    /// affected; the parser reads this back through `is_eof_inserted`.
    pub fn insert_eof(&mut self) {
        self.input.insert_eof();
    }

    pub fn is_eof_inserted(&self) -> bool {
        self.input.is_eof_inserted()
    }

    /// Stop producing tokens, apart from those already queued.
    pub fn abort(&mut self) {
        debug!("tokenizer aborted in state {:?}", self.state);
        self.aborted = true;
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn take_parse_errors(&mut self) -> Vec<ParseError> {
        mem::take(&mut self.errors)
    }

    /// The decoded input, including anything inserted so far.
    pub fn source(&self) -> String {
        self.input.source()
    }

    /// Time spent in each state, most expensive first.  Empty unless
    /// `profile` is on.
    pub fn profile_report(&self) -> Vec<(states::State, u64)> {
        let mut results: Vec<(states::State, u64)> =
            self.state_profile.iter().map(|(s, t)| (*s, *t)).collect();
        results.sort_by(|&(_, x), &(_, y)| y.cmp(&x));
        results
    }

    fn dump_profile(&self) {
        let results = self.profile_report();
        let total: u64 = results.iter().map(|&(_, t)| t).sum();
        println!("\nTokenizer profile, in nanoseconds");
        println!("\n{total:12}         total in tokenizer");

        for (k, v) in results {
            let pct = 100.0 * (v as f64) / (total as f64);
            println!("{v:12}  {pct:4.1}%  {k:?}");
        }
    }

    fn run_step(&mut self) -> ProcessResult {
        if !self.opts.profile {
            return self.step();
        }
        let state = self.state;
        let (result, dt) = time!(self.step());
        *self.state_profile.entry(state).or_insert(0) += dt;
        result
    }

    /// Forget source positions nothing can back up to any more.
    fn trim_source_positions(&mut self) {
        let mut keep_from = self.input.prev_offset();
        if self.state == states::NamedCharacterReference {
            keep_from = keep_from.min(self.char_ref_start);
        }
        self.input.trim_positions(keep_from);
    }

    //§ preprocessing-the-input-stream
    // Get the next input character, if one is available.
    fn get_char(&mut self) -> Option<char> {
        let c = self.input.next_char(self.stop_at_insertion_point)?;
        if self.input.offset() > self.checked_offset {
            self.checked_offset = self.input.offset();
            if self.opts.exact_errors && is_bad_input_char(c) {
                self.emit_error(Cow::Owned(format!("Bad character {c:?}")));
            }
        }
        trace!("got character {c:?}");
        self.current_char = c;
        Some(c)
    }

    fn reconsume_current(&mut self) {
        let at = self.input.prev_offset();
        self.input.restore_to(at);
    }

    fn set_state(&mut self, state: states::State) {
        self.state = state;
    }

    /// Switch to a state that starts on an empty builder.
    fn switch_to_clean(&mut self, state: states::State) {
        assert!(
            self.builder.is_empty(),
            "switching from {:?} to {state:?} with {:?} still in the builder",
            self.state,
            self.builder
        );
        self.state = state;
    }

    fn reconsume_in(&mut self, state: states::State) {
        self.reconsume_current();
        self.state = state;
    }

    fn emit_error(&mut self, message: Cow<'static, str>) {
        let position = self.input.previous_position();
        debug!("parse error at {position}: {message}");
        self.errors.push(ParseError { message, position });
    }

    fn bad_char_error(&mut self) {
        let msg = format_if!(
            self.opts.exact_errors,
            "Bad character",
            "Saw {:?} in state {:?}",
            self.current_char,
            self.state
        );
        self.emit_error(msg);
    }

    fn bad_eof_error(&mut self) {
        let msg = format_if!(
            self.opts.exact_errors,
            "Unexpected EOF",
            "Saw EOF in state {:?}",
            self.state
        );
        self.emit_error(msg);
    }

    fn queue_token(&mut self, kind: TokenKind, span: Span) {
        trace!("  queue {kind:?}");
        self.queued_tokens.push_back(Token { kind, span });
    }

    fn emit_char(&mut self, c: char) {
        let span = Span {
            start: self.input.previous_position(),
            end: self.input.position(),
        };
        self.queue_token(CharacterToken(c), span);
    }

    fn emit_temp_buf(&mut self) {
        let buf = mem::take(&mut self.temp_buf);
        for c in buf.chars() {
            self.emit_char(c);
        }
    }

    fn markup_span(&self) -> Span {
        Span {
            start: self.markup_start,
            end: self.input.position(),
        }
    }

    fn emit_eof(&mut self) -> ProcessResult {
        if self.has_emitted_eof {
            return ProcessResult::Suspend;
        }
        self.has_emitted_eof = true;
        let here = self.input.position();
        self.queue_token(EOFToken, Span { start: here, end: here });
        if self.opts.profile {
            self.dump_profile();
        }
        ProcessResult::Continue
    }

    fn create_tag(&mut self, kind: TagKind) {
        assert!(self.builder.is_empty(), "tag started over {:?}", self.builder);
        self.current_tag_kind = kind;
        self.current_tag_name = LocalName::default();
        self.current_tag_self_closing = false;
        self.current_tag_attrs.clear();
    }

    fn commit_tag_name(&mut self) {
        self.current_tag_name = LocalName::from(&*self.builder);
        self.builder.clear();
    }

    fn discard_tag(&mut self) {
        self.builder.clear();
        self.current_tag_name = LocalName::default();
        self.current_tag_self_closing = false;
        self.current_tag_attrs.clear();
    }

    fn have_appropriate_end_tag(&self) -> bool {
        match self.last_start_tag_name.as_ref() {
            Some(last) => self.current_tag_kind == EndTag && *self.builder == **last,
            None => false,
        }
    }

    fn emit_current_tag(&mut self) -> ProcessResult {
        assert!(self.builder.is_empty());
        let name = mem::take(&mut self.current_tag_name);

        match self.current_tag_kind {
            StartTag => {
                self.last_start_tag_name = Some(name.clone());
            },
            EndTag => {
                if !self.current_tag_attrs.is_empty() {
                    self.emit_error(Borrowed("Attributes on an end tag"));
                }
                if self.current_tag_self_closing {
                    self.emit_error(Borrowed("Self-closing end tag"));
                }
            },
        }

        let tag = Tag {
            kind: self.current_tag_kind,
            name,
            self_closing: self.current_tag_self_closing,
            attrs: mem::take(&mut self.current_tag_attrs),
        };
        let span = self.markup_span();
        self.queue_token(TagToken(tag), span);
        ProcessResult::Continue
    }

    fn create_attribute(&mut self) {
        assert!(self.builder.is_empty(), "attribute started over {:?}", self.builder);
        self.current_attr_name_start = self.input.previous_position();
    }

    /// The name is complete.  The attribute joins the tag now, with an
    /// empty value that a later value may fill in.
    fn commit_attribute_name(&mut self) {
        let name = LocalName::from(&*self.builder);
        self.builder.clear();
        let end = self.input.previous_position();

        if self.current_tag_attrs.iter().any(|a| a.name == name) {
            let msg = format_if!(
                self.opts.exact_errors,
                "Duplicate attribute",
                "Duplicate attribute {}",
                name
            );
            self.emit_error(msg);
        }

        self.current_tag_attrs.push(Attribute {
            name,
            value: StrTendril::new(),
            name_span: Span {
                start: self.current_attr_name_start,
                end,
            },
            value_span: Span { start: end, end },
        });
    }

    fn start_attribute_value(&mut self, start: Position) {
        self.current_attr_value_start = start;
    }

    fn commit_attribute_value(&mut self) {
        let value = mem::take(&mut self.builder);
        let span = Span {
            start: self.current_attr_value_start,
            end: self.input.previous_position(),
        };
        if let Some(attr) = self.current_tag_attrs.last_mut() {
            attr.value = value;
            attr.value_span = span;
        }
    }

    fn create_comment(&mut self) {
        assert!(self.builder.is_empty(), "comment started over {:?}", self.builder);
    }

    fn emit_current_comment(&mut self) {
        let text = mem::take(&mut self.builder);
        let span = self.markup_span();
        self.queue_token(CommentToken(text), span);
    }

    fn create_doctype(&mut self) {
        self.current_doctype = Doctype::default();
    }

    fn commit_doctype_name(&mut self) {
        self.current_doctype.name = Some(mem::take(&mut self.builder));
    }

    fn doctype_id(&mut self, kind: DoctypeIdKind) -> &mut Option<StrTendril> {
        match kind {
            Public => &mut self.current_doctype.public_id,
            System => &mut self.current_doctype.system_id,
        }
    }

    fn commit_doctype_id(&mut self, kind: DoctypeIdKind) {
        let id = mem::take(&mut self.builder);
        *self.doctype_id(kind) = Some(id);
    }

    fn emit_current_doctype(&mut self) {
        assert!(self.builder.is_empty());
        let doctype = mem::take(&mut self.current_doctype);
        let span = self.markup_span();
        self.queue_token(DoctypeToken(doctype), span);
    }
}
//§ END

// Shorthand for common state machine behaviors.
macro_rules! shorthand (
    ( $me:ident : emit $c:expr                   ) => ( $me.emit_char($c)                                        );
    ( $me:ident : mark_start                     ) => ( $me.markup_start = $me.input.previous_position()          );
    ( $me:ident : create_tag $kind:ident         ) => ( $me.create_tag($kind)                                    );
    ( $me:ident : push $c:expr                   ) => ( $me.builder.push_char($c)                                );
    ( $me:ident : append $s:expr                 ) => ( $me.builder.push_slice($s)                               );
    ( $me:ident : commit_tag_name                ) => ( $me.commit_tag_name()                                    );
    ( $me:ident : discard_tag                    ) => ( $me.discard_tag()                                        );
    ( $me:ident : self_closing                   ) => ( $me.current_tag_self_closing = true                      );
    ( $me:ident : push_temp $c:expr              ) => ( $me.temp_buf.push_char($c)                               );
    ( $me:ident : emit_temp                      ) => ( $me.emit_temp_buf()                                      );
    ( $me:ident : clear_temp                     ) => ( $me.temp_buf.clear()                                     );
    ( $me:ident : create_attr                    ) => ( $me.create_attribute()                                   );
    ( $me:ident : commit_attr_name               ) => ( $me.commit_attribute_name()                              );
    ( $me:ident : commit_attr_value              ) => ( $me.commit_attribute_value()                             );
    ( $me:ident : begin_char_ref                 ) => ( $me.begin_char_ref()                                     );
    ( $me:ident : create_comment                 ) => ( $me.create_comment()                                     );
    ( $me:ident : emit_comment                   ) => ( $me.emit_current_comment()                               );
    ( $me:ident : create_doctype                 ) => ( $me.create_doctype()                                     );
    ( $me:ident : commit_doctype_name            ) => ( $me.commit_doctype_name()                                );
    ( $me:ident : commit_doctype_id $k:ident     ) => ( $me.commit_doctype_id($k)                                );
    ( $me:ident : force_quirks                   ) => ( $me.current_doctype.force_quirks = true                  );
    ( $me:ident : emit_doctype                   ) => ( $me.emit_current_doctype()                               );
    ( $me:ident : error                          ) => ( $me.bad_char_error()                                     );
    ( $me:ident : error_eof                      ) => ( $me.bad_eof_error()                                      );
);

// Tracing of tokenizer actions.  This adds significant bloat and compile time,
// so it's behind a cfg flag.
#[cfg(feature = "trace_tokenizer")]
macro_rules! sh_trace ( ( $me:ident : $($cmds:tt)* ) => ({
    trace!("  {}", stringify!($($cmds)*));
    shorthand!($me: $($cmds)*);
}));

#[cfg(not(feature = "trace_tokenizer"))]
macro_rules! sh_trace ( ( $me:ident : $($cmds:tt)* ) => ( shorthand!($me: $($cmds)*) ) );

// A little DSL for sequencing shorthand actions.
macro_rules! go (
    // A pattern like $($cmd:tt)* ; $($rest:tt)* causes parse ambiguity.
    // We have to tell the parser how much lookahead we need.

    ( $me:ident : $a:tt                   ; $($rest:tt)* ) => ({ sh_trace!($me: $a);          go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt             ; $($rest:tt)* ) => ({ sh_trace!($me: $a $b);       go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt       ; $($rest:tt)* ) => ({ sh_trace!($me: $a $b $c);    go!($me: $($rest)*); });
    ( $me:ident : $a:tt $b:tt $c:tt $d:tt ; $($rest:tt)* ) => ({ sh_trace!($me: $a $b $c $d); go!($me: $($rest)*); });

    // These can only come at the end.

    // `to` expects nothing left in the builder; `to_dirty` carries it over.
    ( $me:ident : to $s:ident                    ) => ({ $me.switch_to_clean(states::$s);            return ProcessResult::Continue; });
    ( $me:ident : to $s:ident $k1:expr           ) => ({ $me.switch_to_clean(states::$s($k1));       return ProcessResult::Continue; });
    ( $me:ident : to $s:ident $k1:ident $k2:expr ) => ({ $me.switch_to_clean(states::$s($k1($k2))); return ProcessResult::Continue; });

    ( $me:ident : to_dirty $s:ident                    ) => ({ $me.set_state(states::$s);            return ProcessResult::Continue; });
    ( $me:ident : to_dirty $s:ident $k1:expr           ) => ({ $me.set_state(states::$s($k1));       return ProcessResult::Continue; });
    ( $me:ident : to_dirty $s:ident $k1:ident $k2:expr ) => ({ $me.set_state(states::$s($k1($k2))); return ProcessResult::Continue; });

    ( $me:ident : reconsume $s:ident                    ) => ({ $me.reconsume_in(states::$s);            return ProcessResult::Continue; });
    ( $me:ident : reconsume $s:ident $k1:expr           ) => ({ $me.reconsume_in(states::$s($k1));       return ProcessResult::Continue; });
    ( $me:ident : reconsume $s:ident $k1:ident $k2:expr ) => ({ $me.reconsume_in(states::$s($k1($k2))); return ProcessResult::Continue; });

    ( $me:ident : to_return_state        ) => ({ let s = $me.return_state; $me.set_state(s);    return ProcessResult::Continue; });
    ( $me:ident : reconsume_return_state ) => ({ let s = $me.return_state; $me.reconsume_in(s); return ProcessResult::Continue; });

    // We have a default next state after emitting a tag, but the parser can override.
    ( $me:ident : emit_tag $s:ident ) => ({
        $me.set_state(states::$s);
        return $me.emit_current_tag();
    });

    ( $me:ident : emit $c:expr ) => ({ $me.emit_char($c); return ProcessResult::Continue; });

    ( $me:ident : eof ) => ({ return $me.emit_eof(); });

    // If nothing else matched, it's a single command
    ( $me:ident : $($cmd:tt)+ ) => ( sh_trace!($me: $($cmd)+) );

    // or nothing.
    ( $me:ident : ) => (());
);

// This is a macro because it can cause early return
// from the function where it is used.
macro_rules! get_char ( ($me:expr) => ({
    if $me.stop_at_insertion_point &&
        ($me.input.is_insertion_point_reached() || $me.input.is_cr_before_insertion_point())
    {
        return ProcessResult::Suspend;
    }
    unwrap_or_return!($me.get_char(), $me.eof_step())
}));

macro_rules! eat_with_case ( ($me:expr, $pat:expr, $ignore_case:expr) => (
    match $me.input.eat($pat, $ignore_case, $me.stop_at_insertion_point) {
        MatchResult::Consumed => true,
        MatchResult::NotConsumed => false,
        MatchResult::RanOutOfCharacters => return ProcessResult::Suspend,
    }
));

macro_rules! eat ( ($me:expr, $pat:expr) => ( eat_with_case!($me, $pat, true) ));

macro_rules! eat_exact ( ($me:expr, $pat:expr) => ( eat_with_case!($me, $pat, false) ));

// Declared after the macros above, which its states use.
mod char_ref;

impl<Ctx: ParserContext> Tokenizer<Ctx> {
    // Run the state machine for a while.
    fn step(&mut self) -> ProcessResult {
        trace!("processing in state {:?}", self.state);
        match self.state {
            //§ data-state
            states::Data => loop {
                match get_char!(self) {
                    '&' => go!(self: begin_char_ref; to_dirty CharacterReference),
                    '<' => go!(self: mark_start; to TagOpen),
                    '\0' => go!(self: error; emit '\0'),
                    c => go!(self: emit c),
                }
            },

            //§ rcdata-state
            states::RawData(Rcdata) => loop {
                match get_char!(self) {
                    '&' => go!(self: begin_char_ref; to_dirty CharacterReference),
                    '<' => go!(self: mark_start; to RawLessThanSign Rcdata),
                    '\0' => go!(self: error; emit '\u{fffd}'),
                    c => go!(self: emit c),
                }
            },

            //§ rawtext-state
            states::RawData(Rawtext) => loop {
                match get_char!(self) {
                    '<' => go!(self: mark_start; to RawLessThanSign Rawtext),
                    '\0' => go!(self: error; emit '\u{fffd}'),
                    c => go!(self: emit c),
                }
            },

            //§ script-data-state
            states::RawData(ScriptData) => loop {
                match get_char!(self) {
                    '<' => go!(self: mark_start; to RawLessThanSign ScriptData),
                    '\0' => go!(self: error; emit '\u{fffd}'),
                    c => go!(self: emit c),
                }
            },

            //§ script-data-escaped-state
            states::RawData(ScriptDataEscaped(Escaped)) => loop {
                match get_char!(self) {
                    '-' => go!(self: emit '-'; to ScriptDataEscapedDash Escaped),
                    '<' => go!(self: mark_start; to RawLessThanSign ScriptDataEscaped Escaped),
                    '\0' => go!(self: error; emit '\u{fffd}'),
                    c => go!(self: emit c),
                }
            },

            //§ script-data-double-escaped-state
            states::RawData(ScriptDataEscaped(DoubleEscaped)) => loop {
                match get_char!(self) {
                    '-' => go!(self: emit '-'; to ScriptDataEscapedDash DoubleEscaped),
                    '<' => go!(self: emit '<'; to RawLessThanSign ScriptDataEscaped DoubleEscaped),
                    '\0' => go!(self: error; emit '\u{fffd}'),
                    c => go!(self: emit c),
                }
            },

            //§ plaintext-state
            states::Plaintext => loop {
                match get_char!(self) {
                    '\0' => go!(self: error; emit '\u{fffd}'),
                    c => go!(self: emit c),
                }
            },

            //§ tag-open-state
            states::TagOpen => match get_char!(self) {
                '!' => go!(self: to MarkupDeclarationOpen),
                '/' => go!(self: to EndTagOpen),
                '?' => go!(self: error; create_comment; reconsume BogusComment),
                c if c.is_ascii_alphabetic() => go!(self: create_tag StartTag; reconsume TagName),
                _ => go!(self: error; emit '<'; reconsume Data),
            },

            //§ end-tag-open-state
            states::EndTagOpen => match get_char!(self) {
                '>' => go!(self: error; to Data),
                c if c.is_ascii_alphabetic() => go!(self: create_tag EndTag; reconsume TagName),
                _ => go!(self: error; create_comment; reconsume BogusComment),
            },

            //§ tag-name-state
            states::TagName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        go!(self: commit_tag_name; to BeforeAttributeName)
                    },
                    '/' => go!(self: commit_tag_name; to SelfClosingStartTag),
                    '>' => go!(self: commit_tag_name; emit_tag Data),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c => go!(self: push c.to_ascii_lowercase()),
                }
            },

            //§ script-data-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(Escaped)) => match get_char!(self) {
                '/' => go!(self: clear_temp; to RawEndTagOpen ScriptDataEscaped Escaped),
                c if c.is_ascii_alphabetic() => {
                    go!(self: clear_temp; emit '<'; reconsume ScriptDataEscapeStart DoubleEscaped)
                },
                _ => go!(self: emit '<'; reconsume RawData ScriptDataEscaped Escaped),
            },

            //§ script-data-double-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => match get_char!(self) {
                '/' => go!(self: clear_temp; emit '/'; to ScriptDataDoubleEscapeEnd),
                _ => go!(self: reconsume RawData ScriptDataEscaped DoubleEscaped),
            },

            //§ rcdata-less-than-sign-state rawtext-less-than-sign-state script-data-less-than-sign-state
            // otherwise
            states::RawLessThanSign(kind) => match get_char!(self) {
                '/' => go!(self: clear_temp; to RawEndTagOpen kind),
                '!' if kind == ScriptData => {
                    go!(self: emit '<'; emit '!'; to ScriptDataEscapeStart Escaped)
                },
                _ => go!(self: emit '<'; reconsume RawData kind),
            },

            //§ rcdata-end-tag-open-state rawtext-end-tag-open-state script-data-end-tag-open-state script-data-escaped-end-tag-open-state
            states::RawEndTagOpen(kind) => match get_char!(self) {
                c if c.is_ascii_alphabetic() => {
                    go!(self: create_tag EndTag; reconsume RawEndTagName kind)
                },
                _ => go!(self: emit '<'; emit '/'; reconsume RawData kind),
            },

            //§ rcdata-end-tag-name-state rawtext-end-tag-name-state script-data-end-tag-name-state script-data-escaped-end-tag-name-state
            states::RawEndTagName(kind) => loop {
                let c = get_char!(self);
                if self.have_appropriate_end_tag() {
                    match c {
                        '\t' | '\n' | '\x0C' | ' ' => {
                            go!(self: commit_tag_name; clear_temp; to BeforeAttributeName)
                        },
                        '/' => go!(self: commit_tag_name; clear_temp; to SelfClosingStartTag),
                        '>' => go!(self: commit_tag_name; clear_temp; emit_tag Data),
                        _ => (),
                    }
                }

                match lower_ascii_letter(c) {
                    Some(cl) => go!(self: push cl; push_temp c),
                    None => {
                        go!(self: discard_tag; emit '<'; emit '/'; emit_temp);
                        go!(self: reconsume RawData kind);
                    },
                }
            },

            //§ script-data-double-escape-start-state
            states::ScriptDataEscapeStart(DoubleEscaped) => loop {
                let c = get_char!(self);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &*self.temp_buf == "script" {
                            DoubleEscaped
                        } else {
                            Escaped
                        };
                        go!(self: emit c; to RawData ScriptDataEscaped esc);
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: push_temp cl; emit c),
                        None => go!(self: reconsume RawData ScriptDataEscaped Escaped),
                    },
                }
            },

            //§ script-data-escape-start-state
            states::ScriptDataEscapeStart(Escaped) => match get_char!(self) {
                '-' => go!(self: emit '-'; to ScriptDataEscapeStartDash),
                _ => go!(self: reconsume RawData ScriptData),
            },

            //§ script-data-escape-start-dash-state
            states::ScriptDataEscapeStartDash => match get_char!(self) {
                '-' => go!(self: emit '-'; to ScriptDataEscapedDashDash Escaped),
                _ => go!(self: reconsume RawData ScriptData),
            },

            //§ script-data-escaped-dash-state script-data-double-escaped-dash-state
            states::ScriptDataEscapedDash(kind) => match get_char!(self) {
                '-' => go!(self: emit '-'; to ScriptDataEscapedDashDash kind),
                '<' => {
                    if kind == DoubleEscaped {
                        self.emit_char('<');
                    } else {
                        go!(self: mark_start);
                    }
                    go!(self: to RawLessThanSign ScriptDataEscaped kind);
                },
                '\0' => go!(self: error; emit '\u{fffd}'; to RawData ScriptDataEscaped kind),
                c => go!(self: emit c; to RawData ScriptDataEscaped kind),
            },

            //§ script-data-escaped-dash-dash-state script-data-double-escaped-dash-dash-state
            states::ScriptDataEscapedDashDash(kind) => loop {
                match get_char!(self) {
                    '-' => go!(self: emit '-'),
                    '<' => {
                        if kind == DoubleEscaped {
                            self.emit_char('<');
                        } else {
                            go!(self: mark_start);
                        }
                        go!(self: to RawLessThanSign ScriptDataEscaped kind);
                    },
                    '>' => go!(self: emit '>'; to RawData ScriptData),
                    '\0' => go!(self: error; emit '\u{fffd}'; to RawData ScriptDataEscaped kind),
                    c => go!(self: emit c; to RawData ScriptDataEscaped kind),
                }
            },

            //§ script-data-double-escape-end-state
            states::ScriptDataDoubleEscapeEnd => loop {
                let c = get_char!(self);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &*self.temp_buf == "script" {
                            Escaped
                        } else {
                            DoubleEscaped
                        };
                        go!(self: emit c; to RawData ScriptDataEscaped esc);
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => go!(self: push_temp cl; emit c),
                        None => go!(self: reconsume RawData ScriptDataEscaped DoubleEscaped),
                    },
                }
            },

            //§ before-attribute-name-state
            states::BeforeAttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' | '>' => go!(self: reconsume AfterAttributeName),
                    '=' => go!(self: error; create_attr; push '='; to_dirty AttributeName),
                    _ => go!(self: create_attr; reconsume AttributeName),
                }
            },

            //§ attribute-name-state
            states::AttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        go!(self: commit_attr_name; reconsume AfterAttributeName)
                    },
                    '=' => go!(self: commit_attr_name; to BeforeAttributeValue),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c @ ('"' | '\'' | '<') => go!(self: error; push c),
                    c => go!(self: push c.to_ascii_lowercase()),
                }
            },

            //§ after-attribute-name-state
            states::AfterAttributeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => go!(self: to SelfClosingStartTag),
                    '=' => go!(self: to BeforeAttributeValue),
                    '>' => go!(self: emit_tag Data),
                    _ => go!(self: create_attr; reconsume AttributeName),
                }
            },

            //§ before-attribute-value-state
            states::BeforeAttributeValue => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => {
                        let start = self.input.position();
                        self.start_attribute_value(start);
                        go!(self: to AttributeValue DoubleQuoted);
                    },
                    '\'' => {
                        let start = self.input.position();
                        self.start_attribute_value(start);
                        go!(self: to AttributeValue SingleQuoted);
                    },
                    '>' => go!(self: error; emit_tag Data),
                    _ => {
                        let start = self.input.previous_position();
                        self.start_attribute_value(start);
                        go!(self: reconsume AttributeValue Unquoted);
                    },
                }
            },

            //§ attribute-value-(double-quoted)-state
            states::AttributeValue(DoubleQuoted) => loop {
                match get_char!(self) {
                    '"' => go!(self: commit_attr_value; to AfterAttributeValueQuoted),
                    '&' => go!(self: begin_char_ref; to_dirty CharacterReference),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c => go!(self: push c),
                }
            },

            //§ attribute-value-(single-quoted)-state
            states::AttributeValue(SingleQuoted) => loop {
                match get_char!(self) {
                    '\'' => go!(self: commit_attr_value; to AfterAttributeValueQuoted),
                    '&' => go!(self: begin_char_ref; to_dirty CharacterReference),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c => go!(self: push c),
                }
            },

            //§ attribute-value-(unquoted)-state
            states::AttributeValue(Unquoted) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        go!(self: commit_attr_value; to BeforeAttributeName)
                    },
                    '&' => go!(self: begin_char_ref; to_dirty CharacterReference),
                    '>' => go!(self: commit_attr_value; emit_tag Data),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c @ ('"' | '\'' | '<' | '=' | '`') => go!(self: error; push c),
                    c => go!(self: push c),
                }
            },

            //§ after-attribute-value-(quoted)-state
            states::AfterAttributeValueQuoted => match get_char!(self) {
                '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeAttributeName),
                '/' => go!(self: to SelfClosingStartTag),
                '>' => go!(self: emit_tag Data),
                _ => go!(self: error; reconsume BeforeAttributeName),
            },

            //§ self-closing-start-tag-state
            states::SelfClosingStartTag => match get_char!(self) {
                '>' => go!(self: self_closing; emit_tag Data),
                _ => go!(self: error; reconsume BeforeAttributeName),
            },

            //§ bogus-comment-state
            states::BogusComment => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_comment; to Data),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c => go!(self: push c),
                }
            },

            //§ markup-declaration-open-state
            states::MarkupDeclarationOpen => {
                if eat_exact!(self, "--") {
                    go!(self: create_comment; to CommentStart);
                } else if eat!(self, "doctype") {
                    go!(self: to Doctype);
                } else if eat_exact!(self, "[CDATA[") {
                    if self
                        .ctx
                        .adjusted_current_node_present_but_not_in_html_namespace()
                    {
                        go!(self: to CdataSection);
                    }
                    go!(self: error; create_comment; append "[CDATA["; to_dirty BogusComment);
                }
                go!(self: error; create_comment; to BogusComment)
            },

            //§ comment-start-state
            states::CommentStart => match get_char!(self) {
                '-' => go!(self: to_dirty CommentStartDash),
                '>' => go!(self: error; emit_comment; to Data),
                _ => go!(self: reconsume Comment),
            },

            //§ comment-start-dash-state
            states::CommentStartDash => match get_char!(self) {
                '-' => go!(self: to_dirty CommentEnd),
                '>' => go!(self: error; emit_comment; to Data),
                _ => go!(self: push '-'; reconsume Comment),
            },

            //§ comment-state
            states::Comment => loop {
                match get_char!(self) {
                    '<' => go!(self: push '<'; to_dirty CommentLessThanSign),
                    '-' => go!(self: to_dirty CommentEndDash),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c => go!(self: push c),
                }
            },

            //§ comment-less-than-sign-state
            states::CommentLessThanSign => loop {
                match get_char!(self) {
                    '!' => go!(self: push '!'; to_dirty CommentLessThanSignBang),
                    '<' => go!(self: push '<'),
                    _ => go!(self: reconsume Comment),
                }
            },

            //§ comment-less-than-sign-bang-state
            states::CommentLessThanSignBang => match get_char!(self) {
                '-' => go!(self: to_dirty CommentLessThanSignBangDash),
                _ => go!(self: reconsume Comment),
            },

            //§ comment-less-than-sign-bang-dash-state
            states::CommentLessThanSignBangDash => match get_char!(self) {
                '-' => go!(self: to_dirty CommentLessThanSignBangDashDash),
                _ => go!(self: reconsume CommentEndDash),
            },

            //§ comment-less-than-sign-bang-dash-dash-state
            states::CommentLessThanSignBangDashDash => match get_char!(self) {
                '>' => go!(self: reconsume CommentEnd),
                _ => go!(self: error; reconsume CommentEnd),
            },

            //§ comment-end-dash-state
            states::CommentEndDash => match get_char!(self) {
                '-' => go!(self: to_dirty CommentEnd),
                _ => go!(self: push '-'; reconsume Comment),
            },

            //§ comment-end-state
            states::CommentEnd => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_comment; to Data),
                    '!' => go!(self: to_dirty CommentEndBang),
                    '-' => go!(self: push '-'),
                    _ => go!(self: append "--"; reconsume Comment),
                }
            },

            //§ comment-end-bang-state
            states::CommentEndBang => match get_char!(self) {
                '-' => go!(self: append "--!"; to_dirty CommentEndDash),
                '>' => go!(self: error; emit_comment; to Data),
                _ => go!(self: append "--!"; reconsume Comment),
            },

            //§ doctype-state
            states::Doctype => match get_char!(self) {
                '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeDoctypeName),
                '>' => go!(self: reconsume BeforeDoctypeName),
                _ => go!(self: error; reconsume BeforeDoctypeName),
            },

            //§ before-doctype-name-state
            states::BeforeDoctypeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '\0' => go!(self: error; create_doctype; push '\u{fffd}'; to_dirty DoctypeName),
                    '>' => go!(self: error; create_doctype; force_quirks; emit_doctype; to Data),
                    c => {
                        let cl = c.to_ascii_lowercase();
                        go!(self: create_doctype; push cl; to_dirty DoctypeName);
                    },
                }
            },

            //§ doctype-name-state
            states::DoctypeName => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        go!(self: commit_doctype_name; to AfterDoctypeName)
                    },
                    '>' => go!(self: commit_doctype_name; emit_doctype; to Data),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    c => go!(self: push c.to_ascii_lowercase()),
                }
            },

            //§ after-doctype-name-state
            states::AfterDoctypeName => loop {
                if eat!(self, "public") {
                    go!(self: to AfterDoctypeKeyword Public);
                } else if eat!(self, "system") {
                    go!(self: to AfterDoctypeKeyword System);
                } else {
                    match get_char!(self) {
                        '\t' | '\n' | '\x0C' | ' ' => (),
                        '>' => go!(self: emit_doctype; to Data),
                        _ => go!(self: error; force_quirks; reconsume BogusDoctype),
                    }
                }
            },

            //§ after-doctype-public-keyword-state after-doctype-system-keyword-state
            states::AfterDoctypeKeyword(kind) => match get_char!(self) {
                '\t' | '\n' | '\x0C' | ' ' => go!(self: to BeforeDoctypeIdentifier kind),
                '"' => go!(self: error; to DoctypeIdentifierDoubleQuoted kind),
                '\'' => go!(self: error; to DoctypeIdentifierSingleQuoted kind),
                '>' => go!(self: error; force_quirks; emit_doctype; to Data),
                _ => go!(self: error; force_quirks; reconsume BogusDoctype),
            },

            //§ before-doctype-public-identifier-state before-doctype-system-identifier-state
            states::BeforeDoctypeIdentifier(kind) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => go!(self: to DoctypeIdentifierDoubleQuoted kind),
                    '\'' => go!(self: to DoctypeIdentifierSingleQuoted kind),
                    '>' => go!(self: error; force_quirks; emit_doctype; to Data),
                    _ => go!(self: error; force_quirks; reconsume BogusDoctype),
                }
            },

            //§ doctype-public-identifier-(double-quoted)-state doctype-system-identifier-(double-quoted)-state
            states::DoctypeIdentifierDoubleQuoted(kind) => loop {
                match get_char!(self) {
                    '"' => go!(self: commit_doctype_id kind; to AfterDoctypeIdentifier kind),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    '>' => go!(self: error; commit_doctype_id kind; force_quirks; emit_doctype; to Data),
                    c => go!(self: push c),
                }
            },

            //§ doctype-public-identifier-(single-quoted)-state doctype-system-identifier-(single-quoted)-state
            states::DoctypeIdentifierSingleQuoted(kind) => loop {
                match get_char!(self) {
                    '\'' => go!(self: commit_doctype_id kind; to AfterDoctypeIdentifier kind),
                    '\0' => go!(self: error; push '\u{fffd}'),
                    '>' => go!(self: error; commit_doctype_id kind; force_quirks; emit_doctype; to Data),
                    c => go!(self: push c),
                }
            },

            //§ after-doctype-public-identifier-state
            states::AfterDoctypeIdentifier(Public) => match get_char!(self) {
                '\t' | '\n' | '\x0C' | ' ' => {
                    go!(self: to BetweenDoctypePublicAndSystemIdentifiers)
                },
                '>' => go!(self: emit_doctype; to Data),
                '"' => go!(self: error; to DoctypeIdentifierDoubleQuoted System),
                '\'' => go!(self: error; to DoctypeIdentifierSingleQuoted System),
                _ => go!(self: error; force_quirks; reconsume BogusDoctype),
            },

            //§ after-doctype-system-identifier-state
            states::AfterDoctypeIdentifier(System) => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to Data),
                    _ => go!(self: error; reconsume BogusDoctype),
                }
            },

            //§ between-doctype-public-and-system-identifiers-state
            states::BetweenDoctypePublicAndSystemIdentifiers => loop {
                match get_char!(self) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => go!(self: emit_doctype; to Data),
                    '"' => go!(self: to DoctypeIdentifierDoubleQuoted System),
                    '\'' => go!(self: to DoctypeIdentifierSingleQuoted System),
                    _ => go!(self: error; force_quirks; reconsume BogusDoctype),
                }
            },

            //§ bogus-doctype-state
            states::BogusDoctype => loop {
                match get_char!(self) {
                    '>' => go!(self: emit_doctype; to Data),
                    '\0' => go!(self: error),
                    _ => (),
                }
            },

            //§ cdata-section-state
            states::CdataSection => loop {
                match get_char!(self) {
                    ']' => go!(self: to CdataSectionBracket),
                    c => go!(self: emit c),
                }
            },

            //§ cdata-section-bracket-state
            states::CdataSectionBracket => match get_char!(self) {
                ']' => go!(self: to CdataSectionEnd),
                _ => go!(self: emit ']'; reconsume CdataSection),
            },

            //§ cdata-section-end-state
            states::CdataSectionEnd => loop {
                match get_char!(self) {
                    ']' => go!(self: emit ']'),
                    '>' => go!(self: to Data),
                    _ => go!(self: emit ']'; emit ']'; reconsume CdataSection),
                }
            },

            //§ character-reference-state
            states::CharacterReference |
            states::NamedCharacterReference |
            states::AmbiguousAmpersand |
            states::NumericCharacterReference |
            states::NumericCharacterReferenceStart(_) |
            states::NumericCharacterReferenceDigits(_) |
            states::NumericCharacterReferenceEnd => self.step_char_ref(),
        }
    }

    fn eof_step(&mut self) -> ProcessResult {
        trace!("processing EOF in state {:?}", self.state);
        match self.state {
            states::Data |
            states::RawData(Rcdata) |
            states::RawData(Rawtext) |
            states::RawData(ScriptData) |
            states::Plaintext => go!(self: eof),

            states::RawData(ScriptDataEscaped(_)) |
            states::ScriptDataEscapedDash(_) |
            states::ScriptDataEscapedDashDash(_) => go!(self: error_eof; eof),

            states::TagName |
            states::BeforeAttributeName |
            states::AttributeName |
            states::AfterAttributeName |
            states::BeforeAttributeValue |
            states::AttributeValue(_) |
            states::AfterAttributeValueQuoted |
            states::SelfClosingStartTag => go!(self: error_eof; discard_tag; to Data),

            states::TagOpen => go!(self: error_eof; emit '<'; to Data),

            states::EndTagOpen => go!(self: error_eof; emit '<'; emit '/'; to Data),

            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => {
                go!(self: to RawData ScriptDataEscaped DoubleEscaped)
            },

            states::RawLessThanSign(kind) => go!(self: emit '<'; to RawData kind),

            states::RawEndTagOpen(kind) => go!(self: emit '<'; emit '/'; to RawData kind),

            states::RawEndTagName(kind) => {
                go!(self: discard_tag; emit '<'; emit '/'; emit_temp; to RawData kind)
            },

            states::ScriptDataEscapeStart(Escaped) => go!(self: to RawData ScriptData),

            states::ScriptDataEscapeStart(DoubleEscaped) => {
                go!(self: to RawData ScriptDataEscaped Escaped)
            },

            states::ScriptDataEscapeStartDash => go!(self: to RawData ScriptData),

            states::ScriptDataDoubleEscapeEnd => {
                go!(self: to RawData ScriptDataEscaped DoubleEscaped)
            },

            states::CommentStart |
            states::CommentStartDash |
            states::Comment |
            states::CommentEndDash |
            states::CommentEnd |
            states::CommentEndBang => go!(self: error_eof; emit_comment; to Data),

            states::CommentLessThanSign | states::CommentLessThanSignBang => {
                go!(self: to_dirty Comment)
            },

            states::CommentLessThanSignBangDash => go!(self: to_dirty CommentEndDash),

            states::CommentLessThanSignBangDashDash => go!(self: to_dirty CommentEnd),

            states::Doctype | states::BeforeDoctypeName => {
                go!(self: error_eof; create_doctype; force_quirks; emit_doctype; to Data)
            },

            states::DoctypeName => {
                go!(self: error_eof; commit_doctype_name; force_quirks; emit_doctype; to Data)
            },

            states::DoctypeIdentifierDoubleQuoted(kind) |
            states::DoctypeIdentifierSingleQuoted(kind) => {
                go!(self: error_eof; commit_doctype_id kind; force_quirks; emit_doctype; to Data)
            },

            states::AfterDoctypeName |
            states::AfterDoctypeKeyword(_) |
            states::BeforeDoctypeIdentifier(_) |
            states::AfterDoctypeIdentifier(_) |
            states::BetweenDoctypePublicAndSystemIdentifiers => {
                go!(self: error_eof; force_quirks; emit_doctype; to Data)
            },

            states::BogusDoctype => go!(self: emit_doctype; to Data),

            states::BogusComment => go!(self: emit_comment; to Data),

            states::MarkupDeclarationOpen => go!(self: error; create_comment; to BogusComment),

            states::CdataSection => go!(self: error_eof; eof),

            states::CdataSectionBracket => go!(self: emit ']'; to CdataSection),

            states::CdataSectionEnd => go!(self: emit ']'; emit ']'; to CdataSection),

            states::CharacterReference |
            states::NamedCharacterReference |
            states::AmbiguousAmpersand |
            states::NumericCharacterReference |
            states::NumericCharacterReferenceStart(_) |
            states::NumericCharacterReferenceDigits(_) |
            states::NumericCharacterReferenceEnd => self.eof_char_ref(),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod test {
    use super::interface::ParserContext;
    use super::states;
    use super::{Badge, Position, Span, StopAtInsertionPoint, Tokenizer, TokenizerOpts};
    use super::{CharacterToken, CommentToken, DoctypeToken, EOFToken, TagToken};
    use super::{EndTag, StartTag, Token, TokenKind};
    use crate::tendril::StrTendril;
    use crate::LocalName;

    fn drain<Ctx: ParserContext>(tok: &mut Tokenizer<Ctx>, stop: StopAtInsertionPoint) -> Vec<Token> {
        let mut tokens = vec![];
        while let Some(token) = tok.next_token(stop) {
            tokens.push(token);
        }
        tokens
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut tok = Tokenizer::new(input);
        drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn chars(s: &str) -> Vec<TokenKind> {
        s.chars().map(CharacterToken).collect()
    }

    fn text(kinds: &[TokenKind]) -> String {
        kinds
            .iter()
            .filter_map(|k| match *k {
                CharacterToken(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    fn pos(line: u64, column: u64) -> Position {
        Position { line, column }
    }

    struct ForeignContent;

    impl ParserContext for ForeignContent {
        type Capability = ();

        fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
            true
        }
    }

    struct ScriptParserKey;

    struct ScriptParser;

    impl ParserContext for ScriptParser {
        type Capability = ScriptParserKey;
    }

    #[test]
    fn simple_element() {
        let tokens = kinds("<div id=\"x\">text</div>");
        assert_eq!(tokens.len(), 7);
        match tokens[0] {
            TagToken(ref tag) => {
                assert_eq!(tag.kind, StartTag);
                assert_eq!(tag.name, LocalName::from("div"));
                assert_eq!(tag.attrs.len(), 1);
                assert_eq!(&*tag.attrs[0].value, "x");
            },
            ref other => panic!("expected a start tag, got {other:?}"),
        }
        assert_eq!(&tokens[1..5], &chars("text")[..]);
        match tokens[5] {
            TagToken(ref tag) => {
                assert_eq!(tag.kind, EndTag);
                assert_eq!(tag.name, LocalName::from("div"));
            },
            ref other => panic!("expected an end tag, got {other:?}"),
        }
        assert_eq!(tokens[6], EOFToken);
    }

    #[test]
    fn eof_is_sticky() {
        let mut tok = Tokenizer::new("");
        assert!(tok.next_token(StopAtInsertionPoint::No).unwrap().is_eof());
        for _ in 0..3 {
            assert_eq!(tok.next_token(StopAtInsertionPoint::No), None);
        }
    }

    #[test]
    fn comment() {
        assert_eq!(
            kinds("<!-- comment -->"),
            vec![CommentToken(StrTendril::from_slice(" comment ")), EOFToken]
        );
    }

    #[test]
    fn abrupt_empty_comment() {
        let mut tok = Tokenizer::new("<!-->");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[0].kind, CommentToken(StrTendril::new()));
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn processing_instruction_is_bogus_comment() {
        assert_eq!(
            kinds("<?xml?>"),
            vec![CommentToken(StrTendril::from_slice("?xml?")), EOFToken]
        );
    }

    #[test]
    fn named_reference() {
        let mut tok = Tokenizer::new("&amp;");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[0].kind, CharacterToken('&'));
        assert!(tok.parse_errors().is_empty());
    }

    #[test]
    fn numeric_references() {
        assert_eq!(kinds("&#65;&#x42;"), vec![CharacterToken('A'), CharacterToken('B'), EOFToken]);
    }

    #[test]
    fn null_numeric_reference() {
        let mut tok = Tokenizer::new("&#0;");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[0].kind, CharacterToken('\u{fffd}'));
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn out_of_range_numeric_reference() {
        let mut tok = Tokenizer::new("&#x110000;");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[0].kind, CharacterToken('\u{fffd}'));
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn huge_numeric_reference_saturates() {
        assert_eq!(text(&kinds("&#99999999999999999999;")), "\u{fffd}");
    }

    #[test]
    fn named_reference_backs_up_to_longest_match() {
        let mut tok = Tokenizer::new("&notit;");
        let tokens: Vec<TokenKind> = drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(text(&tokens), "\u{ac}it;");
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn unknown_reference_is_left_alone() {
        assert_eq!(text(&kinds("&zzz; &")), "&zzz; &");
    }

    #[test]
    fn legacy_reference_in_attribute_is_left_alone() {
        let mut tok = Tokenizer::new("<a href=\"?x=1&not=2&amp;y\">");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        let tag = tokens[0].tag().unwrap();
        assert_eq!(&**tag.attribute("href").unwrap(), "?x=1&not=2&y");
        assert!(tok.parse_errors().is_empty());
    }

    #[test]
    fn duplicate_attributes_are_kept_with_an_error() {
        let mut tok = Tokenizer::new("<a x=1 x=2>");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        let tag = tokens[0].tag().unwrap();
        assert_eq!(tag.attrs.len(), 2);
        assert_eq!(&**tag.attribute("x").unwrap(), "1");
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn end_tag_with_attributes_is_an_error() {
        let mut tok = Tokenizer::new("</p class=a>");
        drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(&*tok.parse_errors()[0].message, "Attributes on an end tag");
    }

    #[test]
    fn self_closing_start_tag() {
        let tokens = kinds("<br/>");
        let TagToken(ref tag) = tokens[0] else {
            panic!("expected a tag");
        };
        assert!(tag.self_closing);
    }

    #[test]
    fn eof_in_tag_drops_it() {
        let mut tok = Tokenizer::new("a<div class");
        let tokens: Vec<TokenKind> = drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(tokens, vec![CharacterToken('a'), EOFToken]);
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn null_in_data_is_kept() {
        let mut tok = Tokenizer::new("a\0");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[1].kind, CharacterToken('\0'));
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn lone_less_than_sign_is_text() {
        assert_eq!(text(&kinds("a < b")), "a < b");
    }

    #[test]
    fn doctype_with_identifiers() {
        let tokens = kinds(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \
             'http://www.w3.org/TR/html4/strict.dtd'>",
        );
        let DoctypeToken(ref doctype) = tokens[0] else {
            panic!("expected a doctype");
        };
        assert_eq!(doctype.name.as_deref(), Some("html"));
        assert_eq!(doctype.public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
        assert_eq!(
            doctype.system_id.as_deref(),
            Some("http://www.w3.org/TR/html4/strict.dtd")
        );
        assert!(!doctype.force_quirks);
    }

    #[test]
    fn empty_doctype_forces_quirks() {
        let tokens = kinds("<!DOCTYPE>");
        let DoctypeToken(ref doctype) = tokens[0] else {
            panic!("expected a doctype");
        };
        assert_eq!(doctype.name, None);
        assert!(doctype.force_quirks);
    }

    #[test]
    fn parser_switches_to_script_data() {
        let mut tok = Tokenizer::with_context(
            "<script>a</scropt></script>",
            TokenizerOpts::default(),
            ScriptParser,
        );
        let first = tok.next_token(StopAtInsertionPoint::No).unwrap();
        assert!(first.is_start_tag());
        let badge = Badge::<ScriptParser>::new(&ScriptParserKey);
        tok.switch_to(badge, states::RawData(states::ScriptData));

        let rest: Vec<TokenKind> = drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(text(&rest), "a</scropt>");
        let TagToken(ref end) = rest[rest.len() - 2] else {
            panic!("expected the end tag");
        };
        assert_eq!(end.kind, EndTag);
        assert_eq!(end.name, LocalName::from("script"));
    }

    #[test]
    fn initial_state_and_last_start_tag_options() {
        let opts = TokenizerOpts {
            initial_state: Some(states::RawData(states::Rcdata)),
            last_start_tag_name: Some("title".to_string()),
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("a&lt;<b></title>", opts);
        let tokens: Vec<TokenKind> = drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(text(&tokens), "a<<b>");
        assert!(matches!(tokens[tokens.len() - 2], TagToken(ref t) if t.kind == EndTag));
    }

    #[test]
    fn insertion_point_matches_whole_input() {
        let whole = kinds("<div class=\"a\">x&amp;y");

        let mut tok = Tokenizer::new("");
        tok.update_insertion_point();
        let mut pieces = drain(&mut tok, StopAtInsertionPoint::Yes);
        assert!(pieces.is_empty());

        tok.insert_input_at_insertion_point("<div cla");
        pieces.extend(drain(&mut tok, StopAtInsertionPoint::Yes));
        assert!(pieces.is_empty());

        tok.insert_input_at_insertion_point("ss=\"a\">x&am");
        pieces.extend(drain(&mut tok, StopAtInsertionPoint::Yes));
        assert_eq!(pieces.len(), 2);

        tok.insert_input_at_insertion_point("p;y");
        pieces.extend(drain(&mut tok, StopAtInsertionPoint::Yes));
        assert!(!pieces.iter().any(|t| t.is_eof()));

        tok.undefine_insertion_point();
        pieces.extend(drain(&mut tok, StopAtInsertionPoint::No));

        let pieces: Vec<TokenKind> = pieces.into_iter().map(|t| t.kind).collect();
        assert_eq!(pieces, whole);
        assert_eq!(tok.source(), "<div class=\"a\">x&amp;y");
    }

    #[test]
    fn insertion_point_suspends_markup_declaration() {
        let mut tok = Tokenizer::new("");
        tok.update_insertion_point();
        tok.insert_input_at_insertion_point("<!-");
        assert!(drain(&mut tok, StopAtInsertionPoint::Yes).is_empty());
        tok.insert_input_at_insertion_point("- x -->");
        let tokens = drain(&mut tok, StopAtInsertionPoint::Yes);
        assert_eq!(tokens[0].kind, CommentToken(StrTendril::from_slice(" x ")));
    }

    #[test]
    fn newlines_are_normalized() {
        for input in ["a\r\nb", "a\rb", "a\nb"] {
            assert_eq!(text(&kinds(input)), "a\nb", "input {input:?}");
        }
    }

    #[test]
    fn crlf_split_at_insertion_point_is_one_newline() {
        let whole = kinds("a\r\nb");

        let mut tok = Tokenizer::new("");
        tok.update_insertion_point();
        tok.insert_input_at_insertion_point("a\r");
        let mut pieces = drain(&mut tok, StopAtInsertionPoint::Yes);
        assert_eq!(pieces.len(), 1);
        tok.insert_input_at_insertion_point("\nb");
        pieces.extend(drain(&mut tok, StopAtInsertionPoint::Yes));
        tok.undefine_insertion_point();
        pieces.extend(drain(&mut tok, StopAtInsertionPoint::No));

        let pieces: Vec<TokenKind> = pieces.into_iter().map(|t| t.kind).collect();
        assert_eq!(pieces, whole);
        assert_eq!(text(&pieces), "a\nb");
    }

    #[test]
    fn token_positions() {
        let mut tok = Tokenizer::new("<p>\r\n<b>");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[0].span, Span { start: pos(0, 0), end: pos(0, 3) });
        assert_eq!(tokens[1].span, Span { start: pos(0, 3), end: pos(1, 0) });
        assert_eq!(tokens[2].span, Span { start: pos(1, 0), end: pos(1, 3) });
    }

    #[test]
    fn attribute_positions() {
        let mut tok = Tokenizer::new("<a href=\"x\" b=y>");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        let tag = tokens[0].tag().unwrap();
        assert_eq!(tag.attrs[0].name_span, Span { start: pos(0, 3), end: pos(0, 7) });
        assert_eq!(tag.attrs[0].value_span, Span { start: pos(0, 9), end: pos(0, 10) });
        assert_eq!(tag.attrs[1].name_span, Span { start: pos(0, 12), end: pos(0, 13) });
        assert_eq!(tag.attrs[1].value_span, Span { start: pos(0, 14), end: pos(0, 15) });
    }

    #[test]
    fn abort_drains_queue_first() {
        let mut tok = Tokenizer::new("</");
        assert_eq!(tok.next_token(StopAtInsertionPoint::No).unwrap().kind, CharacterToken('<'));
        tok.abort();
        assert_eq!(tok.next_token(StopAtInsertionPoint::No).unwrap().kind, CharacterToken('/'));
        assert_eq!(tok.next_token(StopAtInsertionPoint::No), None);
        assert_eq!(tok.next_token(StopAtInsertionPoint::No), None);
    }

    #[test]
    fn eof_is_produced_once() {
        let opts = TokenizerOpts {
            initial_state: Some(states::CdataSection),
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("x", opts);
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert!(tokens.last().unwrap().is_eof());
        assert_eq!(tok.parse_errors().len(), 1);
        for _ in 0..5 {
            assert_eq!(tok.next_token(StopAtInsertionPoint::No), None);
        }
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn eof_after_escape_start_in_script_data() {
        let opts = TokenizerOpts {
            initial_state: Some(states::RawData(states::ScriptData)),
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("<!", opts);
        let tokens: Vec<TokenKind> = drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(tokens, vec![CharacterToken('<'), CharacterToken('!'), EOFToken]);
        assert!(tok.parse_errors().is_empty());

        let opts = TokenizerOpts {
            initial_state: Some(states::RawData(states::ScriptDataEscaped(states::Escaped))),
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("<script", opts);
        drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tok.state(), states::RawData(states::ScriptDataEscaped(states::Escaped)));
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn cdata_in_foreign_content() {
        let mut tok = Tokenizer::with_context(
            "<![CDATA[x]]>",
            TokenizerOpts::default(),
            ForeignContent,
        );
        let tokens: Vec<TokenKind> = drain(&mut tok, StopAtInsertionPoint::No)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(tokens, vec![CharacterToken('x'), EOFToken]);
    }

    #[test]
    fn cdata_in_html_is_bogus_comment() {
        let mut tok = Tokenizer::new("<![CDATA[x]]>");
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[0].kind, CommentToken(StrTendril::from_slice("[CDATA[x]]")));
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn byte_order_mark() {
        assert_eq!(text(&kinds("\u{feff}a")), "a");
        let opts = TokenizerOpts {
            discard_bom: false,
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("\u{feff}a", opts);
        assert_eq!(
            tok.next_token(StopAtInsertionPoint::No).unwrap().kind,
            CharacterToken('\u{feff}')
        );
    }

    #[test]
    fn exact_errors_are_detailed() {
        let opts = TokenizerOpts {
            exact_errors: true,
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("&#0;", opts);
        drain(&mut tok, StopAtInsertionPoint::No);
        let errors = tok.take_parse_errors();
        assert_eq!(&*errors[0].message, "Null character reference 0x000000");
        assert!(tok.parse_errors().is_empty());
    }

    #[test]
    fn bad_characters_reported_once() {
        let opts = TokenizerOpts {
            exact_errors: true,
            ..TokenizerOpts::default()
        };
        // The control character is reconsumed after the failed reference.
        let mut tok = Tokenizer::with_opts("&\u{1}", opts);
        drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tok.parse_errors().len(), 1);
    }

    #[test]
    fn profile_records_states() {
        let opts = TokenizerOpts {
            profile: true,
            ..TokenizerOpts::default()
        };
        let mut tok = Tokenizer::with_opts("<p>hi", opts);
        drain(&mut tok, StopAtInsertionPoint::No);
        let report = tok.profile_report();
        assert!(report.iter().any(|&(s, _)| s == states::Data));
        assert!(report.iter().any(|&(s, _)| s == states::TagName));
    }

    #[test]
    fn from_bytes_decodes_first() {
        let mut tok = Tokenizer::from_bytes(b"<p>\xe9", "latin1", TokenizerOpts::default()).unwrap();
        let tokens = drain(&mut tok, StopAtInsertionPoint::No);
        assert_eq!(tokens[1].kind, CharacterToken('\u{e9}'));
    }
}
