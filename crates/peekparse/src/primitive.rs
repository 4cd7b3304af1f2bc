//! Primitive nodes matching tokens directly.
//! - [Check] consumes one matching token and yields unit.
//! - [Single] consumes one matching token and constructs a value (or a boxed handle) from it.
//! - [Until] collects tokens up to, but not including, a terminator.
//! - [SeqCheck] and [SeqWith] match a fixed sequence of tokens atomically.
//!
//! Every primitive comes in a form matching a value, and a `_if` form matching a predicate.

use std::{
    fmt::{Debug, Error, Formatter},
    marker::PhantomData,
};

use derive_where::derive_where;

use crate::{
    algebra::{Repeat, Shape, Unit, Value},
    context::Context,
    recovery::fail,
    stream::Stream,
    Meta, Node, ParseResult, Parser, Peek,
};

/// Decides which tokens a primitive accepts.
pub trait Matcher<T> {
    fn matches(&self, token: &T) -> bool;

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error>;
}

/// Accepts tokens equal to the value.
#[derive(Clone, Debug)]
pub struct Is<V>(pub V);

impl<V: PartialEq + Debug> Matcher<V> for Is<V> {
    fn matches(&self, token: &V) -> bool {
        *token == self.0
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{:?}", self.0)
    }
}

/// Accepts tokens satisfying the predicate.
#[derive(Clone)]
pub struct Satisfies<F>(pub F);

impl<T, F: Fn(&T) -> bool> Matcher<T> for Satisfies<F> {
    fn matches(&self, token: &T) -> bool {
        (self.0)(token)
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "<predicate>")
    }
}

fn next_matches<S: Stream, M: Matcher<S::Token>>(matcher: &M, stream: &mut S) -> bool {
    stream.peek(0).is_some_and(|t| matcher.matches(t))
}

/// Consume one token accepted by the matcher.
#[derive_where(Clone; M: Clone)]
pub struct Check<T, M> {
    matcher: M,
    meta: Meta,
    _token: PhantomData<fn() -> T>,
}

pub fn check<T: PartialEq + Debug>(token: T) -> Check<T, Is<T>> {
    Check {
        matcher: Is(token),
        meta: Meta::default(),
        _token: PhantomData,
    }
}

pub fn check_if<T, F: Fn(&T) -> bool>(pred: F) -> Check<T, Satisfies<F>> {
    Check {
        matcher: Satisfies(pred),
        meta: Meta::default(),
        _token: PhantomData,
    }
}

impl<T, M: Matcher<T>> Node for Check<T, M> {
    type Token = T;
    type Out = ();
    type Shape = Unit;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.matcher.repr(f)
    }
}

impl<T, M: Matcher<T>, S: Stream<Token = T>> Peek<S> for Check<T, M> {
    fn peek(&self, stream: &mut S) -> bool {
        next_matches(&self.matcher, stream)
    }
}

impl<T, M: Matcher<T>, S: Stream<Token = T>, G, L> Parser<S, G, L> for Check<T, M> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<()> {
        if self.peek(cx.stream) {
            cx.stream.seek(1);
            Ok(Some(()))
        } else {
            fail(self, cx)
        }
    }
}

/// Consume one token accepted by the matcher, and construct a value from it.
#[derive_where(Clone; M: Clone, C: Clone)]
pub struct Single<T, M, C, K = Value> {
    matcher: M,
    ctor: C,
    meta: Meta,
    _token: PhantomData<fn() -> (T, K)>,
}

impl<T, M, C, K> Single<T, M, C, K> {
    pub(crate) fn build(matcher: M, ctor: C) -> Self {
        Self {
            matcher,
            ctor,
            meta: Meta::default(),
            _token: PhantomData,
        }
    }
}

fn boxed<T>(token: T) -> Box<T> {
    Box::new(token)
}

/// Consume `token`, yielding the token itself.
pub fn single<T: PartialEq + Debug>(token: T) -> Single<T, Is<T>, fn(T) -> T> {
    Single::build(Is(token), std::convert::identity as fn(T) -> T)
}

pub fn single_if<T, F: Fn(&T) -> bool>(pred: F) -> Single<T, Satisfies<F>, fn(T) -> T> {
    Single::build(Satisfies(pred), std::convert::identity as fn(T) -> T)
}

/// Consume `token`, and construct the result from it with `ctor`.
pub fn single_with<T, O, C>(token: T, ctor: C) -> Single<T, Is<T>, C>
where
    T: PartialEq + Debug,
    C: Fn(T) -> O,
{
    Single::build(Is(token), ctor)
}

/// Consume `token`, yielding it boxed.
pub fn single_ptr<T: PartialEq + Debug>(token: T) -> Single<T, Is<T>, fn(T) -> Box<T>> {
    Single::build(Is(token), boxed as fn(T) -> Box<T>)
}

pub fn single_ptr_if<T, F: Fn(&T) -> bool>(pred: F) -> Single<T, Satisfies<F>, fn(T) -> Box<T>> {
    Single::build(Satisfies(pred), boxed as fn(T) -> Box<T>)
}

impl<T, M, C, O, K> Node for Single<T, M, C, K>
where
    M: Matcher<T>,
    C: Fn(T) -> O,
    K: Shape,
{
    type Token = T;
    type Out = O;
    type Shape = K;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.matcher.repr(f)
    }
}

impl<T, M, C, O, K, S> Peek<S> for Single<T, M, C, K>
where
    M: Matcher<T>,
    C: Fn(T) -> O,
    K: Shape,
    S: Stream<Token = T>,
{
    fn peek(&self, stream: &mut S) -> bool {
        next_matches(&self.matcher, stream)
    }
}

impl<T, M, C, O, K, S, G, L> Parser<S, G, L> for Single<T, M, C, K>
where
    M: Matcher<T>,
    C: Fn(T) -> O,
    K: Shape,
    S: Stream<Token = T>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        if self.peek(cx.stream) {
            if let Some(token) = cx.stream.get() {
                return Ok(Some((self.ctor)(token)));
            }
        }
        fail(self, cx)
    }
}

/// Collect tokens up to (excluding) the first accepted by the matcher, or the end of input.
/// Fails if there is no token to collect.
///
/// The collection is decided by the shape `K` of the tokens, see [Repeat].
#[derive_where(Clone; M: Clone)]
pub struct Until<T, M, K = Value> {
    matcher: M,
    meta: Meta,
    _token: PhantomData<fn() -> (T, K)>,
}

impl<T, M, K> Until<T, M, K> {
    pub(crate) fn build(matcher: M) -> Self {
        Self {
            matcher,
            meta: Meta::default(),
            _token: PhantomData,
        }
    }
}

pub fn until<T: PartialEq + Debug>(terminator: T) -> Until<T, Is<T>> {
    Until::build(Is(terminator))
}

pub fn until_if<T, F: Fn(&T) -> bool>(pred: F) -> Until<T, Satisfies<F>> {
    Until::build(Satisfies(pred))
}

impl<T, M: Matcher<T>, K: Repeat<T>> Node for Until<T, M, K> {
    type Token = T;
    type Out = K::Out;
    type Shape = Value;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "..")?;
        self.matcher.repr(f)
    }
}

impl<T, M: Matcher<T>, K: Repeat<T>, S: Stream<Token = T>> Peek<S> for Until<T, M, K> {
    fn peek(&self, stream: &mut S) -> bool {
        stream.peek(0).is_some_and(|t| !self.matcher.matches(t))
    }
}

impl<T, M, K, S, G, L> Parser<S, G, L> for Until<T, M, K>
where
    M: Matcher<T>,
    K: Repeat<T>,
    S: Stream<Token = T>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<K::Out> {
        if !self.peek(cx.stream) {
            return fail(self, cx);
        }
        let mut collected = K::Out::default();
        while self.peek(cx.stream) {
            if let Some(token) = cx.stream.get() {
                K::push(&mut collected, token);
            }
        }
        Ok(Some(collected))
    }
}

fn seq_matches<S: Stream>(tokens: &[S::Token], stream: &mut S) -> bool
where
    S::Token: PartialEq,
{
    tokens
        .iter()
        .enumerate()
        .all(|(i, t)| stream.peek(i) == Some(t))
}

fn seq_repr<T: Debug>(tokens: &[T], f: &mut Formatter<'_>) -> Result<(), Error> {
    write!(f, "[")?;
    for (i, t) in tokens.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{t:?}")?;
    }
    write!(f, "]")
}

/// Consume an exact sequence of tokens, or nothing.
#[derive(Clone, Debug)]
pub struct SeqCheck<T> {
    tokens: Vec<T>,
    meta: Meta,
}

pub fn seq_check<T>(tokens: impl IntoIterator<Item = T>) -> SeqCheck<T> {
    SeqCheck {
        tokens: tokens.into_iter().collect(),
        meta: Meta::default(),
    }
}

impl<T: Debug> Node for SeqCheck<T> {
    type Token = T;
    type Out = ();
    type Shape = Unit;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        seq_repr(&self.tokens, f)
    }
}

impl<T: Debug + PartialEq, S: Stream<Token = T>> Peek<S> for SeqCheck<T> {
    fn peek(&self, stream: &mut S) -> bool {
        seq_matches(&self.tokens, stream)
    }
}

impl<T: Debug + PartialEq, S: Stream<Token = T>, G, L> Parser<S, G, L> for SeqCheck<T> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<()> {
        if self.peek(cx.stream) {
            cx.stream.seek(self.tokens.len());
            Ok(Some(()))
        } else {
            fail(self, cx)
        }
    }
}

/// Consume an exact sequence of tokens, constructing a value from the matched tokens.
#[derive_where(Clone; T: Clone, C: Clone)]
pub struct SeqWith<T, C> {
    tokens: Vec<T>,
    ctor: C,
    meta: Meta,
}

pub fn seq_value<T, O, C>(tokens: impl IntoIterator<Item = T>, ctor: C) -> SeqWith<T, C>
where
    C: Fn(&[T]) -> O,
{
    SeqWith {
        tokens: tokens.into_iter().collect(),
        ctor,
        meta: Meta::default(),
    }
}

fn boxed_slice<T: Clone>(tokens: &[T]) -> Box<[T]> {
    tokens.into()
}

/// Consume an exact sequence of tokens, yielding a boxed copy of them.
pub fn seq_ptr<T: Clone>(tokens: impl IntoIterator<Item = T>) -> SeqWith<T, fn(&[T]) -> Box<[T]>> {
    seq_value(tokens, boxed_slice::<T> as fn(&[T]) -> Box<[T]>)
}

impl<T: Debug, C: Fn(&[T]) -> O, O> Node for SeqWith<T, C> {
    type Token = T;
    type Out = O;
    type Shape = Value;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        seq_repr(&self.tokens, f)
    }
}

impl<T, C, O, S> Peek<S> for SeqWith<T, C>
where
    T: Debug + PartialEq,
    C: Fn(&[T]) -> O,
    S: Stream<Token = T>,
{
    fn peek(&self, stream: &mut S) -> bool {
        seq_matches(&self.tokens, stream)
    }
}

impl<T, C, O, S, G, L> Parser<S, G, L> for SeqWith<T, C>
where
    T: Debug + PartialEq,
    C: Fn(&[T]) -> O,
    S: Stream<Token = T>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        if self.peek(cx.stream) {
            cx.stream.seek(self.tokens.len());
            Ok(Some((self.ctor)(&self.tokens)))
        } else {
            fail(self, cx)
        }
    }
}
