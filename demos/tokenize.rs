// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Print the tokens of an HTML document read from standard input.
//!
//!     cargo run --example tokenize [ENCODING] < page.html
//!
//! The input is decoded as UTF-8 unless an encoding label is given.

use std::env;
use std::io::{self, Read};
use std::process;

use html5tok::tokenizer::{CharacterToken, CommentToken, DoctypeToken, EOFToken, TagToken};
use html5tok::tokenizer::{EndTag, Position, StartTag};
use html5tok::{StopAtInsertionPoint, Tokenizer, TokenizerOpts};

struct TokenPrinter {
    char_run: Option<Position>,
}

impl TokenPrinter {
    fn is_char(&mut self, at: Option<Position>) {
        match (self.char_run, at) {
            (None, Some(at)) => {
                print!("{:>7}  CHAR : \"", at.to_string());
                self.char_run = Some(at);
            },
            (Some(_), None) => {
                println!("\"");
                self.char_run = None;
            },
            _ => (),
        }
    }

    fn do_char(&mut self, c: char, at: Position) {
        self.is_char(Some(at));
        print!("{}", c.escape_default());
    }

    fn print_token(&mut self, token: html5tok::Token) {
        let at = token.span.start;
        match token.kind {
            CharacterToken(c) => self.do_char(c, at),
            TagToken(tag) => {
                self.is_char(None);
                // This is not proper HTML serialization, of course.
                match tag.kind {
                    StartTag => print!("{:>7}  TAG  : <\x1b[32m{}\x1b[0m", at.to_string(), tag.name),
                    EndTag => print!("{:>7}  TAG  : <\x1b[31m/{}\x1b[0m", at.to_string(), tag.name),
                }
                for attr in tag.attrs.iter() {
                    print!(
                        " \x1b[36m{}\x1b[0m='\x1b[34m{}\x1b[0m'",
                        attr.name, attr.value
                    );
                }
                if tag.self_closing {
                    print!(" \x1b[31m/\x1b[0m");
                }
                println!(">");
            },
            CommentToken(text) => {
                self.is_char(None);
                println!("{:>7}  COMM : <!--{text}-->", at.to_string());
            },
            DoctypeToken(doctype) => {
                self.is_char(None);
                println!("{:>7}  DOCT : {doctype:?}", at.to_string());
            },
            EOFToken => {
                self.is_char(None);
                println!("{:>7}  EOF", at.to_string());
            },
        }
    }
}

fn main() {
    env_logger::init();

    let label = env::args().nth(1).unwrap_or_else(|| "utf-8".to_string());
    let mut bytes = vec![];
    if let Err(e) = io::stdin().read_to_end(&mut bytes) {
        eprintln!("can't read standard input: {e}");
        process::exit(1);
    }

    let opts = TokenizerOpts {
        profile: true,
        ..Default::default()
    };
    let mut tok = match Tokenizer::from_bytes(&bytes, &label, opts) {
        Ok(tok) => tok,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        },
    };

    let mut printer = TokenPrinter { char_run: None };
    while let Some(token) = tok.next_token(StopAtInsertionPoint::No) {
        printer.print_token(token);
    }
    printer.is_char(None);

    for err in tok.parse_errors() {
        println!("ERROR: {err}");
    }
}
