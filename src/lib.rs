// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![crate_name = "html5tok"]
#![crate_type = "lib"]

pub use markup5ever::LocalName;
pub use tendril;

pub use tokenizer::{StopAtInsertionPoint, Token, TokenKind, Tokenizer, TokenizerOpts};

mod macros;

mod util {
    pub(crate) mod str;
}

pub mod encoding;
pub mod tokenizer;
