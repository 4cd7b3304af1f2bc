//! Matchers for single token trees.
use std::{
    borrow::Cow,
    fmt::{Error, Formatter},
    marker::PhantomData,
};

use derive_where::derive_where;
use proc_macro2::{Ident, Literal, Punct, TokenTree};

use crate::{
    algebra::{Shape, Unit, Value},
    context::Context,
    recovery::fail,
    stream::Stream,
    Meta, Node, ParseResult, Parser, Peek,
};

/// Consume one token tree if `extract` accepts it, yielding what it extracts.
#[derive_where(Clone; F: Clone)]
pub struct Extract<F, K = Value> {
    extract: F,
    expected: Cow<'static, str>,
    meta: Meta,
    _shape: PhantomData<K>,
}

impl<F, K> Extract<F, K> {
    pub fn new(expected: impl Into<Cow<'static, str>>, extract: F) -> Self {
        Self {
            extract,
            expected: expected.into(),
            meta: Meta::default(),
            _shape: PhantomData,
        }
    }
}

impl<F: Fn(&TokenTree) -> Option<O>, O, K: Shape> Node for Extract<F, K> {
    type Token = TokenTree;
    type Out = O;
    type Shape = K;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.expected)
    }
}

impl<F, O, K, S> Peek<S> for Extract<F, K>
where
    F: Fn(&TokenTree) -> Option<O>,
    K: Shape,
    S: Stream<Token = TokenTree>,
{
    fn peek(&self, stream: &mut S) -> bool {
        stream.peek(0).is_some_and(|tt| (self.extract)(tt).is_some())
    }
}

impl<F, O, K, S, G, L> Parser<S, G, L> for Extract<F, K>
where
    F: Fn(&TokenTree) -> Option<O>,
    K: Shape,
    S: Stream<Token = TokenTree>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        match cx.stream.peek(0).and_then(|tt| (self.extract)(tt)) {
            Some(out) => {
                cx.stream.seek(1);
                Ok(Some(out))
            }
            None => fail(self, cx),
        }
    }
}

type Extractor<O> = fn(&TokenTree) -> Option<O>;

/// Consume the punctuation character `c`.
pub fn punct(c: char) -> Extract<impl Fn(&TokenTree) -> Option<()> + Clone, Unit> {
    Extract::new(
        format!("'{c}'"),
        move |tt: &TokenTree| matches!(tt, TokenTree::Punct(p) if p.as_char() == c).then_some(()),
    )
}

pub fn any_punct() -> Extract<Extractor<Punct>> {
    Extract::new("<punct>", (|tt: &TokenTree| match tt {
        TokenTree::Punct(p) => Some(p.clone()),
        _ => None,
    }) as Extractor<Punct>)
}

/// Consume the identifier or keyword `text`.
pub fn ident(text: &'static str) -> Extract<impl Fn(&TokenTree) -> Option<()> + Clone, Unit> {
    Extract::new(text, move |tt: &TokenTree| {
        matches!(tt, TokenTree::Ident(i) if i == text).then_some(())
    })
}

pub fn any_ident() -> Extract<Extractor<Ident>> {
    Extract::new("<ident>", (|tt: &TokenTree| match tt {
        TokenTree::Ident(i) => Some(i.clone()),
        _ => None,
    }) as Extractor<Ident>)
}

pub fn literal() -> Extract<Extractor<Literal>> {
    Extract::new("<literal>", (|tt: &TokenTree| match tt {
        TokenTree::Literal(l) => Some(l.clone()),
        _ => None,
    }) as Extractor<Literal>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prelude::*, tokens::TokenTreeStream, Repr};
    use quote::quote;

    #[test]
    fn matchers() {
        let binding = ident("let")
            .then(any_ident())
            .then(punct('='))
            .then(literal())
            .then(punct(';'));
        let mut stream = TokenTreeStream::new(quote!(let x = 42;));
        let (name, value) = binding.parse(&mut stream).unwrap().unwrap();
        assert_eq!(name, "x");
        assert_eq!(value.to_string(), "42");
        assert_eq!(Repr(&binding).to_string(), "let <ident> '=' <literal> ';'");
    }

    #[test]
    fn mismatches_report_the_token() {
        let mut stream = TokenTreeStream::new(quote!(+ x));
        assert!(!any_ident().peek(&mut stream));
        assert_eq!(any_punct().parse(&mut stream).map(|p| p.map(|p| p.as_char())), Ok(Some('+')));

        let err = literal().parse(&mut stream).unwrap_err();
        assert_eq!(err.token(), Some("x"));
        assert_eq!(err.diagnostic().map(|d| d.parser.as_str()), Some("<literal>"));
    }
}
