//! Parsing [proc_macro2] token trees, for use in procedural macros.
//!
//! A [TokenTreeStream] reads the top level of a [TokenStream]. Delimited groups are single
//! tokens, and are descended into with [group].
//!
//! ```
//! use peekparse::{prelude::*, tokens::{any_ident, punct, TokenTreeStream}};
//!
//! let field = any_ident().then(punct(':')).then(any_ident());
//! let mut stream = TokenTreeStream::new(quote_like("x: usize"));
//! let (name, ty) = field.parse(&mut stream).unwrap().unwrap();
//! assert_eq!((name.to_string(), ty.to_string()), (String::from("x"), String::from("usize")));
//!
//! # fn quote_like(s: &str) -> proc_macro2::TokenStream { s.parse().unwrap() }
//! ```

use std::{
    borrow::Cow,
    fmt::{Error, Formatter},
};

use proc_macro2::{Delimiter, Span, TokenStream, TokenTree};

use crate::{
    context::Context,
    recovery::fail,
    stream::{LineCol, Stream, EOF},
    Meta, Node, ParseResult, Parser, Peek, Repr,
};

mod basic;

pub use basic::{any_ident, any_punct, ident, literal, punct, Extract};

/// A stream over the top-level token trees of a [TokenStream].
pub struct TokenTreeStream {
    tokens: Vec<TokenTree>,
    pos: usize,
    end: Option<Span>,
    name: Cow<'static, str>,
}

impl TokenTreeStream {
    pub fn new(tokens: TokenStream) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            pos: 0,
            end: None,
            name: Cow::Borrowed("<tokens>"),
        }
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Positions at the end of input are reported at `span`, the closing delimiter of the group
    /// being parsed.
    fn ending_at(mut self, span: Span) -> Self {
        self.end = Some(span);
        self
    }

    /// The span of the current token, or of the last token at the end of input.
    pub fn span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(tt) => tt.span(),
            None => self
                .end
                .or_else(|| self.tokens.last().map(TokenTree::span))
                .unwrap_or_else(Span::call_site),
        }
    }

    /// The unconsumed tokens.
    pub fn into_rest(self) -> TokenStream {
        self.tokens.into_iter().skip(self.pos).collect()
    }
}

impl From<TokenStream> for TokenTreeStream {
    fn from(tokens: TokenStream) -> Self {
        Self::new(tokens)
    }
}

impl Stream for TokenTreeStream {
    type Token = TokenTree;
    type Mark = usize;

    fn get(&mut self) -> Option<TokenTree> {
        let tt = self.tokens.get(self.pos).cloned();
        if tt.is_some() {
            self.pos += 1;
        }
        tt
    }

    fn peek(&mut self, k: usize) -> Option<&TokenTree> {
        self.tokens.get(self.pos + k)
    }

    fn seek(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len());
    }

    fn value(&mut self) -> String {
        self.tokens
            .get(self.pos)
            .map_or_else(|| EOF.to_owned(), TokenTree::to_string)
    }

    fn position(&self) -> String {
        let span = self.span();
        let start = if self.pos < self.tokens.len() {
            span.start()
        } else {
            span.end()
        };
        LineCol {
            line: start.line,
            column: start.column + 1,
        }
        .to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn mark(&mut self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: &usize) {
        self.pos = *mark;
    }
}

fn delimiters(delim: Delimiter) -> (&'static str, &'static str) {
    match delim {
        Delimiter::Parenthesis => ("(", ")"),
        Delimiter::Brace => ("{", "}"),
        Delimiter::Bracket => ("[", "]"),
        Delimiter::None => ("", ""),
    }
}

/// Parse the contents of a delimited group with `inner`, which must consume all of them.
#[derive(Clone)]
pub struct Group<P> {
    delim: Delimiter,
    inner: P,
    meta: Meta,
}

pub fn group<P>(delim: Delimiter, inner: P) -> Group<P> {
    Group {
        delim,
        inner,
        meta: Meta::default(),
    }
}

impl<P: Node<Token = TokenTree>> Node for Group<P> {
    type Token = TokenTree;
    type Out = P::Out;
    type Shape = P::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let (open, close) = delimiters(self.delim);
        write!(f, "{open}{}{close}", Repr(&self.inner))
    }
}

impl<P: Node<Token = TokenTree>, S: Stream<Token = TokenTree>> Peek<S> for Group<P> {
    fn peek(&self, stream: &mut S) -> bool {
        matches!(stream.peek(0), Some(TokenTree::Group(g)) if g.delimiter() == self.delim)
    }
}

impl<P, S, G, L> Parser<S, G, L> for Group<P>
where
    P: Parser<TokenTreeStream, G, L, Token = TokenTree>,
    S: Stream<Token = TokenTree>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<P::Out> {
        let group = match cx.stream.peek(0) {
            Some(TokenTree::Group(g)) if g.delimiter() == self.delim => g.clone(),
            _ => return fail(self, cx),
        };
        cx.stream.seek(1);

        let mut contents = TokenTreeStream::new(group.stream())
            .named(cx.stream.name().to_owned())
            .ending_at(group.span_close());
        let mut inner = cx.restream(&mut contents);
        let out = match self.inner.parse_with(&mut inner)? {
            Some(out) if inner.stream.eof(0) => Some(out),
            Some(_) => return fail(self, &mut inner),
            None => None,
        };
        match out {
            Some(out) => Ok(Some(out)),
            None => fail(self, cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use quote::quote;

    #[test]
    fn positions_follow_spans() {
        let tokens: TokenStream = "fn main() {\n    run();\n}".parse().unwrap();
        let mut stream = TokenTreeStream::new(tokens).named("main.rs");
        assert_eq!(stream.position(), "line: 1, column: 1");
        assert_eq!(stream.value(), "fn");
        stream.seek(3);
        assert_eq!(stream.position(), "line: 1, column: 11");
        stream.seek(1);
        assert_eq!(stream.value(), EOF);
        assert_eq!(stream.position(), "line: 3, column: 2");
    }

    #[test]
    fn groups_parse_their_contents() {
        let args = group(
            Delimiter::Parenthesis,
            any_ident().then(punct(',').then(any_ident()).many()),
        )
        .map(|(first, rest)| {
            std::iter::once(first)
                .chain(rest)
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
        });
        let call = ident("call").then(args);

        let mut stream = TokenTreeStream::new(quote!(call(a, b, c)));
        assert_eq!(
            call.parse(&mut stream),
            Ok(Some(vec![
                String::from("a"),
                String::from("b"),
                String::from("c")
            ]))
        );
        assert!(stream.eof(0));
    }

    #[test]
    fn groups_must_be_fully_consumed() {
        let unit = group(Delimiter::Bracket, any_ident()).name("single");
        let err = unit
            .parse(&mut TokenTreeStream::new(quote!([a b])))
            .unwrap_err();
        let diagnostic = err.diagnostic().unwrap();
        assert_eq!(diagnostic.parser, "single");
        assert_eq!(diagnostic.token, "b");

        let err = unit
            .parse(&mut TokenTreeStream::new(quote!({ a })))
            .unwrap_err();
        assert_eq!(err.token(), Some("{ a }"));
    }
}
