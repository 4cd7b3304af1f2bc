//! Combinators arranging nodes into sequences, choices and repetitions.
//!
//! The result type of each combinator is derived from its children by the [algebra](crate::algebra).
//! When a child fails, the combinator reports its own failure (see [fail]) so the diagnostic
//! names the enclosing rule, except for the zero-width [Not] and [Pred] and for [Ignore], which
//! fail quietly.
//!
//! Choice is predictive: the first alternative whose [Peek] holds is committed to. The
//! backtracking variants instead try each alternative speculatively, restoring the stream on
//! failure.

use std::{
    fmt::{Error, Formatter},
    marker::PhantomData,
};

use derive_where::derive_where;

use crate::{
    algebra::{Alternative, Either, Repeat, Sequence, Shape, Unit, Value},
    context::Context,
    error::ParseError,
    recovery::fail,
    stream::Stream,
    Meta, Node, ParseResult, Parser, Peek, Repr,
};

/// Run `a` then `b`, combining their results.
///
/// Lookahead only considers `a`. If `b` fails, the input consumed by `a` is not restored.
#[derive(Clone)]
pub struct Then<A, B> {
    a: A,
    b: B,
    meta: Meta,
}

pub fn then<A, B>(a: A, b: B) -> Then<A, B> {
    Then {
        a,
        b,
        meta: Meta::default(),
    }
}

impl<A, B> Node for Then<A, B>
where
    A: Node,
    B: Node<Token = A::Token>,
    (A::Shape, B::Shape): Sequence<A::Out, B::Out>,
{
    type Token = A::Token;
    type Out = <(A::Shape, B::Shape) as Sequence<A::Out, B::Out>>::Out;
    type Shape = <(A::Shape, B::Shape) as Sequence<A::Out, B::Out>>::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{} {}", Repr(&self.a), Repr(&self.b))
    }
}

impl<A, B, S> Peek<S> for Then<A, B>
where
    A: Peek<S>,
    B: Node<Token = A::Token>,
    (A::Shape, B::Shape): Sequence<A::Out, B::Out>,
{
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<A, B, S, G, L> Parser<S, G, L> for Then<A, B>
where
    A: Parser<S, G, L>,
    B: Parser<S, G, L, Token = A::Token>,
    S: Stream,
    (A::Shape, B::Shape): Sequence<A::Out, B::Out>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<Self::Out> {
        let Some(a) = self.a.parse_with(cx)? else {
            return fail(self, cx);
        };
        let Some(b) = self.b.parse_with(cx)? else {
            return fail(self, cx);
        };
        Ok(Some(
            <(A::Shape, B::Shape) as Sequence<A::Out, B::Out>>::join(a, b),
        ))
    }
}

/// How a [Choice] combines the results of its alternatives.
pub trait Join<A: Node, B: Node> {
    type Out;
    type Shape: Shape;

    fn left(a: A::Out) -> Self::Out;
    fn right(b: B::Out) -> Self::Out;
}

/// Collapse the alternatives into one type, see [Alternative].
#[derive(Clone, Copy, Debug)]
pub enum Collapse {}

/// Tag the alternatives with an [Either].
#[derive(Clone, Copy, Debug)]
pub enum Tagged {}

impl<A: Node, B: Node> Join<A, B> for Collapse
where
    (A::Shape, B::Shape): Alternative<A::Out, B::Out>,
{
    type Out = <(A::Shape, B::Shape) as Alternative<A::Out, B::Out>>::Out;
    type Shape = <(A::Shape, B::Shape) as Alternative<A::Out, B::Out>>::Shape;

    fn left(a: A::Out) -> Self::Out {
        <(A::Shape, B::Shape) as Alternative<A::Out, B::Out>>::left(a)
    }

    fn right(b: B::Out) -> Self::Out {
        <(A::Shape, B::Shape) as Alternative<A::Out, B::Out>>::right(b)
    }
}

impl<A: Node, B: Node> Join<A, B> for Tagged {
    type Out = Either<A::Out, B::Out>;
    type Shape = Value;

    fn left(a: A::Out) -> Self::Out {
        Either::Left(a)
    }

    fn right(b: B::Out) -> Self::Out {
        Either::Right(b)
    }
}

/// Ordered choice between two alternatives.
#[derive_where(Clone; A: Clone, B: Clone)]
pub struct Choice<A, B, J> {
    a: A,
    b: B,
    backtrack: bool,
    meta: Meta,
    _join: PhantomData<fn() -> J>,
}

/// A choice collapsing into one result type.
pub type Or<A, B> = Choice<A, B, Collapse>;

/// A choice producing an [Either].
pub type OrEither<A, B> = Choice<A, B, Tagged>;

fn choice<A, B, J>(a: A, b: B, backtrack: bool) -> Choice<A, B, J> {
    Choice {
        a,
        b,
        backtrack,
        meta: Meta::default(),
        _join: PhantomData,
    }
}

/// Parse the first of `a` and `b` that peeks successfully. Once chosen, a failing alternative
/// is not retried with the other.
pub fn or<A, B>(a: A, b: B) -> Or<A, B> {
    choice(a, b, false)
}

/// Try `a` then `b`, restoring the stream after a failed attempt. Failures of the alternatives
/// are not reported, only the failure of both.
pub fn or_backtrack<A, B>(a: A, b: B) -> Or<A, B> {
    choice(a, b, true)
}

pub fn either<A, B>(a: A, b: B) -> OrEither<A, B> {
    choice(a, b, false)
}

pub fn either_backtrack<A, B>(a: A, b: B) -> OrEither<A, B> {
    choice(a, b, true)
}

impl<A, B, J> Node for Choice<A, B, J>
where
    A: Node,
    B: Node<Token = A::Token>,
    J: Join<A, B>,
{
    type Token = A::Token;
    type Out = J::Out;
    type Shape = J::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let sep = if self.backtrack { "||" } else { "|" };
        write!(f, "({} {sep} {})", Repr(&self.a), Repr(&self.b))
    }
}

impl<A, B, J, S> Peek<S> for Choice<A, B, J>
where
    A: Peek<S>,
    B: Peek<S, Token = A::Token>,
    J: Join<A, B>,
{
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream) || self.b.peek(stream)
    }
}

impl<A, B, J, S, G, L> Parser<S, G, L> for Choice<A, B, J>
where
    A: Parser<S, G, L>,
    B: Parser<S, G, L, Token = A::Token>,
    J: Join<A, B>,
    S: Stream,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<J::Out> {
        if self.backtrack {
            return self.attempt(cx);
        }

        let res = if self.a.peek(cx.stream) {
            self.a.parse_with(cx)?.map(J::left)
        } else if self.b.peek(cx.stream) {
            self.b.parse_with(cx)?.map(J::right)
        } else {
            None
        };

        match res {
            Some(out) => Ok(Some(out)),
            None => fail(self, cx),
        }
    }
}

impl<A, B, J> Choice<A, B, J> {
    /// Try each alternative in turn, restoring the stream between attempts.
    fn attempt<S, G, L>(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<J::Out>
    where
        A: Parser<S, G, L>,
        B: Parser<S, G, L, Token = A::Token>,
        J: Join<A, B>,
        S: Stream,
    {
        let mark = cx.stream.mark();

        let res = match Self::speculate(&self.a, cx, &mark) {
            Ok(Some(a)) => Ok(Some(J::left(a))),
            Ok(None) => Self::speculate(&self.b, cx, &mark).map(|b| b.map(J::right)),
            Err(e) => Err(e),
        };

        match res {
            Ok(Some(out)) => {
                cx.stream.release(mark);
                Ok(Some(out))
            }
            Ok(None) => {
                cx.stream.reset(&mark);
                cx.stream.release(mark);
                fail(self, cx)
            }
            Err(e) => {
                cx.stream.release(mark);
                Err(e)
            }
        }
    }

    fn speculate<P, S, G, L>(
        alternative: &P,
        cx: &mut Context<'_, S, G, L>,
        mark: &S::Mark,
    ) -> Result<Option<P::Out>, ParseError>
    where
        P: Parser<S, G, L>,
        S: Stream,
    {
        if !alternative.peek(cx.stream) {
            return Ok(None);
        }
        let res = cx.speculate(|cx| alternative.parse_with(cx))?;
        if res.is_none() {
            cx.stream.reset(mark);
        }
        Ok(res)
    }
}

/// Parse `child` while it peeks successfully, collecting the results into `out`.
///
/// Stops at the end of input, when an iteration consumes nothing, or after reporting a failed
/// iteration (keeping the results so far).
fn repeat<N, A, S, G, L>(
    node: &N,
    child: &A,
    cx: &mut Context<'_, S, G, L>,
    out: &mut <A::Shape as Repeat<A::Out>>::Out,
) -> Result<(), ParseError>
where
    N: Node + ?Sized,
    A: Parser<S, G, L>,
    A::Shape: Repeat<A::Out>,
    S: Stream,
{
    while !cx.stream.eof(0) && child.peek(cx.stream) {
        cx.tick()?;
        let before = cx.stream.offset();
        match child.parse_with(cx)? {
            Some(item) => <A::Shape as Repeat<A::Out>>::push(out, item),
            None => {
                fail::<N, S, G, L, ()>(node, cx)?;
                break;
            }
        }
        if cx.stream.offset() == before {
            break;
        }
    }
    Ok(())
}

/// Zero or more repetitions. Always peeks successfully.
#[derive(Clone)]
pub struct Many<A> {
    a: A,
    meta: Meta,
}

pub fn many<A>(a: A) -> Many<A> {
    Many {
        a,
        meta: Meta::default(),
    }
}

impl<A: Node> Node for Many<A>
where
    A::Shape: Repeat<A::Out>,
{
    type Token = A::Token;
    type Out = <A::Shape as Repeat<A::Out>>::Out;
    type Shape = <A::Shape as Repeat<A::Out>>::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}*", Repr(&self.a))
    }
}

impl<A: Peek<S>, S> Peek<S> for Many<A>
where
    A::Shape: Repeat<A::Out>,
{
    fn peek(&self, _: &mut S) -> bool {
        true
    }
}

impl<A: Parser<S, G, L>, S: Stream, G, L> Parser<S, G, L> for Many<A>
where
    A::Shape: Repeat<A::Out>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<Self::Out> {
        let mut out = Default::default();
        repeat(self, &self.a, cx, &mut out)?;
        Ok(Some(out))
    }
}

/// One or more repetitions.
#[derive(Clone)]
pub struct More<A> {
    a: A,
    meta: Meta,
}

pub fn more<A>(a: A) -> More<A> {
    More {
        a,
        meta: Meta::default(),
    }
}

impl<A: Node> Node for More<A>
where
    A::Shape: Repeat<A::Out>,
{
    type Token = A::Token;
    type Out = <A::Shape as Repeat<A::Out>>::Out;
    type Shape = <A::Shape as Repeat<A::Out>>::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}+", Repr(&self.a))
    }
}

impl<A: Peek<S>, S> Peek<S> for More<A>
where
    A::Shape: Repeat<A::Out>,
{
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<A: Parser<S, G, L>, S: Stream, G, L> Parser<S, G, L> for More<A>
where
    A::Shape: Repeat<A::Out>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<Self::Out> {
        let Some(first) = self.a.parse_with(cx)? else {
            return fail(self, cx);
        };
        let mut out = Default::default();
        <A::Shape as Repeat<A::Out>>::push(&mut out, first);
        repeat(self, &self.a, cx, &mut out)?;
        Ok(Some(out))
    }
}

/// Parse the child if it peeks successfully, otherwise yield `None`.
#[derive(Clone)]
pub struct Optional<A> {
    a: A,
    meta: Meta,
}

pub fn optional<A>(a: A) -> Optional<A> {
    Optional {
        a,
        meta: Meta::default(),
    }
}

impl<A: Node> Node for Optional<A> {
    type Token = A::Token;
    type Out = Option<A::Out>;
    type Shape = Value;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}?", Repr(&self.a))
    }
}

impl<A: Peek<S>, S> Peek<S> for Optional<A> {
    fn peek(&self, _: &mut S) -> bool {
        true
    }
}

impl<A: Parser<S, G, L>, S: Stream, G, L> Parser<S, G, L> for Optional<A> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<Option<A::Out>> {
        if !self.a.peek(cx.stream) {
            return Ok(Some(None));
        }
        match self.a.parse_with(cx)? {
            Some(out) => Ok(Some(Some(out))),
            None => fail(self, cx),
        }
    }
}

macro_rules! lookahead {
    ($(#[$doc:meta])* $name:ident, $ctor:ident, $prefix:literal, |$child:ident, $stream:ident| $cond:expr) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name<A> {
            a: A,
            meta: Meta,
        }

        pub fn $ctor<A>(a: A) -> $name<A> {
            $name {
                a,
                meta: Meta::default(),
            }
        }

        impl<A: Node> Node for $name<A> {
            type Token = A::Token;
            type Out = ();
            type Shape = Unit;

            fn meta(&self) -> &Meta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut Meta {
                &mut self.meta
            }

            fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
                write!(f, concat!($prefix, "{}"), Repr(&self.a))
            }
        }

        impl<A: Peek<S>, S> Peek<S> for $name<A> {
            fn peek(&self, $stream: &mut S) -> bool {
                let $child = &self.a;
                $cond
            }
        }

        impl<A: Peek<S>, S, G, L> Parser<S, G, L> for $name<A> {
            fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<()> {
                Ok(self.peek(cx.stream).then_some(()))
            }
        }
    };
}

lookahead!(
    /// Succeeds, consuming nothing, if the child does not peek successfully.
    Not, not, "!", |child, stream| !child.peek(stream)
);

lookahead!(
    /// Succeeds, consuming nothing, if the child peeks successfully.
    Pred, pred, "&", |child, stream| child.peek(stream)
);

/// Parse the child, discarding its result.
#[derive(Clone)]
pub struct Ignore<A> {
    a: A,
    meta: Meta,
}

pub fn ignore<A>(a: A) -> Ignore<A> {
    Ignore {
        a,
        meta: Meta::default(),
    }
}

impl<A: Node> Node for Ignore<A> {
    type Token = A::Token;
    type Out = ();
    type Shape = Unit;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "-{}", Repr(&self.a))
    }
}

impl<A: Peek<S>, S> Peek<S> for Ignore<A> {
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<A: Parser<S, G, L>, S, G, L> Parser<S, G, L> for Ignore<A> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<()> {
        Ok(self.a.parse_with(cx)?.map(drop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    fn digit() -> impl Parser<StrStream, Token = char, Out = u32, Shape = Value> + Clone {
        single_if(|c: &char| c.is_ascii_digit()).map(|c| c.to_digit(10).unwrap_or(0))
    }

    #[test]
    fn sequences_flatten_and_drop_units() {
        let p = digit().then(check(',')).then(digit()).then(check(',')).then(digit());
        let mut stream = StrStream::new("1,2,3");
        assert_eq!(p.parse(&mut stream), Ok(Some((1, 2, 3))));
    }

    #[test]
    fn then_does_not_restore_on_failure() {
        let p = check('a').then(check('b'));
        let mut stream = StrStream::new("ac");
        assert_eq!(p.parse(&mut stream), Err(ParseError::from(ErrorContext {
            parser: String::from("'b'"),
            token: Some('c'),
            value: String::from("c"),
            position: String::from("index: 1"),
            stream: String::from("<string>"),
        })));
        assert_eq!(stream.offset(), 1);
    }

    #[test]
    fn predictive_choice_commits() {
        let ab = check('a').then(check('b')).name("ab");
        let ac = check('a').then(check('c')).name("ac");
        let mut stream = StrStream::new("ac");
        let err = ab.or(ac).parse(&mut stream).unwrap_err();
        assert_eq!(err.diagnostic().map(|d| d.parser.as_str()), Some("'b'"));
    }

    #[test]
    fn backtracking_choice_retries() {
        let ab = check('a').then(single('b'));
        let ac = check('a').then(single('c'));
        let mut stream = StrStream::new("ac");
        assert_eq!(ab.clone().or_backtrack(ac.clone()).parse(&mut stream), Ok(Some('c')));

        let mut stream = StrStream::new("ad");
        let err = ab.or_backtrack(ac).name("a-pair").parse(&mut stream).unwrap_err();
        assert_eq!(err.diagnostic().map(|d| d.parser.as_str()), Some("a-pair"));
        assert_eq!(stream.offset(), 0);
    }

    #[test]
    fn choice_result_types() {
        let mut stream = StrStream::new("x");
        let unit_or_char = check('y').or(single('x'));
        assert_eq!(unit_or_char.parse(&mut stream), Ok(Some(Some('x'))));

        let mut stream = StrStream::new("7");
        let tagged = single('a').either(digit());
        assert_eq!(tagged.parse(&mut stream), Ok(Some(Either::Right(7))));

        let mut stream = StrStream::new("cd");
        let pair = single('a').then(single('b')).or(single('c').map(|c: char| (c, c)));
        assert_eq!(pair.parse(&mut stream), Ok(Some(('c', 'c'))));

        // a hook yielding `()` is a value, ignoring it gives back a unit
        let mut stream = StrStream::new("d");
        let either_check = check('a').or(single('d').map(drop).ignore());
        assert_eq!(either_check.parse(&mut stream), Ok(Some(())));
        assert!(stream.eof(0));
    }

    #[test]
    fn repetition() {
        let mut stream = StrStream::new("123x");
        assert_eq!(digit().many().parse(&mut stream), Ok(Some(vec![1, 2, 3])));
        assert_eq!(digit().many().parse(&mut stream), Ok(Some(vec![])));
        assert!(digit().more().parse(&mut stream).is_err());
        assert_eq!(stream.offset(), 3);
    }

    #[test]
    fn repetition_stops_without_progress() {
        let mut stream = StrStream::new("aaa");
        let p = check('b').optional().many();
        assert_eq!(p.parse(&mut stream), Ok(Some(vec![None])));
        assert_eq!(stream.offset(), 0);
    }

    #[test]
    fn many_keeps_partial_results() {
        let pair = digit().then(check(';').no_error()).no_error();
        let p = pair.many().on_error(|_: &ErrorContext<char>| Ok(()));
        let mut stream = StrStream::new("1;2;3x");
        assert_eq!(p.parse(&mut stream), Ok(Some(vec![1, 2])));
    }

    #[test]
    fn optional_and_lookahead() {
        let mut stream = StrStream::new("ab");
        assert_eq!(check('x').optional().parse(&mut stream), Ok(Some(None)));
        assert_eq!(check('a').not().parse(&mut stream), Ok(None));
        assert_eq!(check('a').pred().parse(&mut stream), Ok(Some(())));
        assert_eq!(stream.offset(), 0);
        assert_eq!(single('a').ignore().then(single('b')).parse(&mut stream), Ok(Some('b')));
    }

    #[test]
    fn representations() {
        let p = check('a').then(check('b').or(check('c')).many()).then(check('d').not());
        assert_eq!(Repr(&p).to_string(), "'a' ('b' | 'c')* !'d'");
    }
}
