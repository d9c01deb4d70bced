// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use html5tok::{StopAtInsertionPoint, Tokenizer, TokenizerOpts};

fn read_bench_file(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("data/bench/");
    path.push(name);
    fs::read_to_string(&path).expect("can't read file")
}

fn run_whole(input: &str, opts: &TokenizerOpts) {
    let mut tok = Tokenizer::with_opts(input, opts.clone());
    while let Some(token) = tok.next_token(StopAtInsertionPoint::No) {
        // Don't use the token, but make sure we don't get
        // optimized out entirely.
        black_box(token);
    }
}

// Write the input in chunks at the insertion point, the way a script
// calling document.write would.
fn run_written(chunks: &[String], opts: &TokenizerOpts) {
    let mut tok = Tokenizer::with_opts("", opts.clone());
    tok.update_insertion_point();
    for chunk in chunks {
        tok.insert_input_at_insertion_point(chunk);
        while let Some(token) = tok.next_token(StopAtInsertionPoint::Yes) {
            black_box(token);
        }
    }
    tok.undefine_insertion_point();
    while let Some(token) = tok.next_token(StopAtInsertionPoint::No) {
        black_box(token);
    }
}

fn run_bench(c: &mut Criterion, name: &str, label: &str, opts: TokenizerOpts) {
    let text = read_bench_file(name);

    // Repeat small files so each iteration does a comparable amount of work.
    let mut input = String::new();
    while input.len() < 64 * 1024 {
        input.push_str(&text);
    }

    c.bench_function(&format!("tokenizing {name}{label}"), |b| {
        b.iter(|| run_whole(&input, &opts))
    });

    // Break the input into chunks of 1024 chars (= a few kB).
    let chars: Vec<char> = input.chars().collect();
    let chunks: Vec<String> = chars.chunks(1024).map(|c| c.iter().collect()).collect();

    c.bench_function(&format!("tokenizing {name}{label} in writes"), |b| {
        b.iter(|| run_written(&chunks, &opts))
    });
}

fn tokenizer_benchmark(c: &mut Criterion) {
    run_bench(c, "small-fragment.html", "", Default::default());
    run_bench(c, "document.html", "", Default::default());
    run_bench(
        c,
        "document.html",
        " with exact errors",
        TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        },
    );
}

criterion_group!(benches, tokenizer_benchmark);
criterion_main!(benches);
