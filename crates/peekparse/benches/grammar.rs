//! Compare the cost of predictive and backtracking choice over an arithmetic grammar.
use divan::{black_box, Bencher};
use peekparse::{
    prelude::*,
    text::{ch, ch_if},
};

const TERMS: [usize; 4] = [16, 256, 4096, 65536];

fn fold(first: u64, rest: Vec<(char, u64)>) -> u64 {
    rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => acc.wrapping_add(rhs),
        _ => acc.wrapping_mul(rhs),
    })
}

fn number() -> Boxed<StrStream, u64> {
    ch_if(char::is_ascii_digit)
        .more()
        .map(|digits: String| digits.parse::<u64>().unwrap_or(0))
        .boxed()
}

fn predictive() -> Boxed<StrStream, u64> {
    let factor = number().or(check('(').then(lazy(predictive)).then(check(')')));
    let term = factor
        .clone()
        .then(ch('*').then(factor).many())
        .map(|(first, rest)| fold(first, rest));
    term.clone()
        .then(ch('+').then(term).many())
        .map(|(first, rest)| fold(first, rest))
        .boxed()
}

fn backtracking() -> Boxed<StrStream, u64> {
    let factor = or_backtrack(
        check('(').then(lazy(backtracking)).then(check(')')),
        number(),
    );
    let term = factor
        .clone()
        .then(ch('*').then(factor).many())
        .map(|(first, rest)| fold(first, rest));
    term.clone()
        .then(ch('+').then(term).many())
        .map(|(first, rest)| fold(first, rest))
        .boxed()
}

fn input(terms: usize) -> String {
    (0..terms)
        .map(|i| match i % 3 {
            0 => format!("{i}"),
            1 => format!("({i}*2)"),
            _ => format!("{i}*({i}+1)"),
        })
        .collect::<Vec<_>>()
        .join("+")
}

#[divan::bench(consts = TERMS)]
fn predictive_choice<const N: usize>(bencher: Bencher) {
    let grammar = predictive();
    bencher
        .with_inputs(|| StrStream::new(&input(N)))
        .bench_local_refs(|stream| black_box(grammar.parse(stream)));
}

#[divan::bench(consts = TERMS)]
fn backtracking_choice<const N: usize>(bencher: Bencher) {
    let grammar = backtracking();
    bencher
        .with_inputs(|| StrStream::new(&input(N)))
        .bench_local_refs(|stream| black_box(grammar.parse(stream)));
}

fn main() {
    divan::main();
}
