//! Benchmarks for lexer construction and scanning

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lexdfa::{Dfa, LexerBuilder};

const KEYWORDS: &[&str] = &[
    "from", "select", "where", "as", "if", "then", "else", "elseif", "end", "and", "or", "order",
    "group", "by", "asc", "desc", "having", "limit",
];

fn query_lexer() -> LexerBuilder<usize> {
    let mut builder = LexerBuilder::new().rule("[ \t\n\r]+", "space", |_: &str| 0);
    for (i, keyword) in KEYWORDS.iter().enumerate() {
        builder = builder.rule(*keyword, *keyword, move |_: &str| i + 1);
    }
    builder
        .rule(r"[,\(\)\*\+/]", "punct", |_: &str| 100)
        .rule(r"\-", "minus", |_: &str| 101)
        .rule("[a-z][a-zA-Z0-9]*", "id", |_: &str| 200)
        .rule(r"[0-9]+\.[0-9]+", "number", |_: &str| 201)
        .rule(r#""([^"]|(\\"))*""#, "string", |_: &str| 202)
}

fn bench_build(c: &mut Criterion) {
    let builder = query_lexer();
    c.bench_function("build_query_lexer", |b| {
        b.iter(|| builder.build().unwrap())
    });
}

fn bench_tokenize(c: &mut Criterion) {
    let mut lexer = query_lexer().build().unwrap();
    let source = "select name, total from orders where total > 10.5 and region = \"west\" \
                  group by name order by total desc limit 100.0 "
        .replace('>', "")
        .replace('=', "")
        .repeat(50);

    c.bench_function("tokenize_query", |b| {
        b.iter(|| lexer.tokenize(black_box(source.as_str())).unwrap().len())
    });
}

fn bench_serialize(c: &mut Criterion) {
    let lexer = query_lexer().build().unwrap();
    let json = lexer.to_json().unwrap();

    c.bench_function("dfa_to_json", |b| b.iter(|| lexer.to_json().unwrap()));
    c.bench_function("dfa_from_json", |b| {
        b.iter(|| Dfa::from_json(black_box(&json), lexer.handlers()).unwrap())
    });
}

criterion_group!(benches, bench_build, bench_tokenize, bench_serialize);
criterion_main!(benches);
