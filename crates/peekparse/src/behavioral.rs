//! Combinators changing what a node does with its result, its state and its failures.
//! - [Map], [Action] and [Where] run a hook on the child's result. Hooks receive nothing else
//!   ([Plain]), the global state ([Global]) or both states ([Scoped]).
//! - [Boxed], [Lazy] and [Recursive] give grammars a fixed type, so rules can refer to
//!   themselves.
//! - [WithState] gives its child a fresh local state.
//! - [TryCatch] and [SyncTo] recover from failures by synchronizing the stream.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{Error, Formatter},
    marker::PhantomData,
    sync::{Arc, PoisonError, RwLock, Weak},
};

use derive_where::derive_where;
use once_cell::sync::OnceCell;

use crate::{
    algebra::{Alternative, Shape, Unit, Value},
    context::Context,
    error::{ErrorContext, ParseError},
    primitive::{Is, Matcher, Satisfies},
    recovery::{fail, skip_until},
    stream::Stream,
    Meta, Node, ParseResult, Parser, Peek, Repr,
};

/// A hook using only the value it is given.
#[derive_where(Clone; F: Clone)]
pub struct Plain<F>(pub(crate) F);

/// A hook also given the global state.
#[derive_where(Clone; F: Clone)]
pub struct Global<F, G>(pub(crate) F, pub(crate) PhantomData<fn(&mut G)>);

/// A hook also given the global and local states.
#[derive_where(Clone; F: Clone)]
pub struct Scoped<F, G, L>(pub(crate) F, pub(crate) PhantomData<fn(&mut G, &mut L)>);

/// A hook consuming a result to produce another.
pub trait Apply<I> {
    type Out;
}

pub trait ApplyIn<I, G, L>: Apply<I> {
    fn apply(&self, input: I, global: &mut G, local: &mut L) -> Self::Out;
}

impl<I, O, F: Fn(I) -> O> Apply<I> for Plain<F> {
    type Out = O;
}

impl<I, O, F: Fn(I) -> O, G, L> ApplyIn<I, G, L> for Plain<F> {
    fn apply(&self, input: I, _: &mut G, _: &mut L) -> O {
        (self.0)(input)
    }
}

impl<I, O, F: Fn(I, &mut G) -> O, G> Apply<I> for Global<F, G> {
    type Out = O;
}

impl<I, O, F: Fn(I, &mut G) -> O, G, L> ApplyIn<I, G, L> for Global<F, G> {
    fn apply(&self, input: I, global: &mut G, _: &mut L) -> O {
        (self.0)(input, global)
    }
}

impl<I, O, F: Fn(I, &mut G, &mut L) -> O, G, L> Apply<I> for Scoped<F, G, L> {
    type Out = O;
}

impl<I, O, F: Fn(I, &mut G, &mut L) -> O, G, L> ApplyIn<I, G, L> for Scoped<F, G, L> {
    fn apply(&self, input: I, global: &mut G, local: &mut L) -> O {
        (self.0)(input, global, local)
    }
}

/// A hook observing a result by reference.
pub trait Inspect<I> {
    type Out;
}

pub trait InspectIn<I, G, L>: Inspect<I> {
    fn inspect(&self, input: &I, global: &mut G, local: &mut L) -> Self::Out;
}

impl<I, O, F: Fn(&I) -> O> Inspect<I> for Plain<F> {
    type Out = O;
}

impl<I, O, F: Fn(&I) -> O, G, L> InspectIn<I, G, L> for Plain<F> {
    fn inspect(&self, input: &I, _: &mut G, _: &mut L) -> O {
        (self.0)(input)
    }
}

impl<I, O, F: Fn(&I, &mut G) -> O, G> Inspect<I> for Global<F, G> {
    type Out = O;
}

impl<I, O, F: Fn(&I, &mut G) -> O, G, L> InspectIn<I, G, L> for Global<F, G> {
    fn inspect(&self, input: &I, global: &mut G, _: &mut L) -> O {
        (self.0)(input, global)
    }
}

impl<I, O, F: Fn(&I, &mut G, &mut L) -> O, G, L> Inspect<I> for Scoped<F, G, L> {
    type Out = O;
}

impl<I, O, F: Fn(&I, &mut G, &mut L) -> O, G, L> InspectIn<I, G, L> for Scoped<F, G, L> {
    fn inspect(&self, input: &I, global: &mut G, local: &mut L) -> O {
        (self.0)(input, global, local)
    }
}

/// Transform the child's result. The result is opaque to the algebra.
#[derive(Clone)]
pub struct Map<A, H> {
    a: A,
    hook: H,
    meta: Meta,
}

impl<A, H> Map<A, H> {
    pub(crate) fn new(a: A, hook: H) -> Self {
        Self {
            a,
            hook,
            meta: Meta::default(),
        }
    }
}

impl<A: Node, H: Apply<A::Out>> Node for Map<A, H> {
    type Token = A::Token;
    type Out = H::Out;
    type Shape = Value;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.a.repr(f)
    }
}

impl<A: Peek<S>, H: Apply<A::Out>, S> Peek<S> for Map<A, H> {
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<A, H, S, G, L> Parser<S, G, L> for Map<A, H>
where
    A: Parser<S, G, L>,
    H: ApplyIn<A::Out, G, L>,
    S: Stream,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<H::Out> {
        match self.a.parse_with(cx)? {
            Some(out) => Ok(Some(self.hook.apply(out, cx.global, cx.local))),
            None => fail(self, cx),
        }
    }
}

/// Run a side effect on the child's result, keeping the result unchanged.
#[derive(Clone)]
pub struct Action<A, H> {
    a: A,
    hook: H,
    meta: Meta,
}

impl<A, H> Action<A, H> {
    pub(crate) fn new(a: A, hook: H) -> Self {
        Self {
            a,
            hook,
            meta: Meta::default(),
        }
    }
}

impl<A: Node, H: Inspect<A::Out, Out = ()>> Node for Action<A, H> {
    type Token = A::Token;
    type Out = A::Out;
    type Shape = A::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.a.repr(f)
    }
}

impl<A: Peek<S>, H: Inspect<A::Out, Out = ()>, S> Peek<S> for Action<A, H> {
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<A, H, S, G, L> Parser<S, G, L> for Action<A, H>
where
    A: Parser<S, G, L>,
    H: InspectIn<A::Out, G, L, Out = ()>,
    S: Stream,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<A::Out> {
        match self.a.parse_with(cx)? {
            Some(out) => {
                self.hook.inspect(&out, cx.global, cx.local);
                Ok(Some(out))
            }
            None => fail(self, cx),
        }
    }
}

/// Fail if the child's result is rejected by a predicate.
#[derive(Clone)]
pub struct Where<A, H> {
    a: A,
    hook: H,
    meta: Meta,
}

impl<A, H> Where<A, H> {
    pub(crate) fn new(a: A, hook: H) -> Self {
        Self {
            a,
            hook,
            meta: Meta::default(),
        }
    }
}

impl<A: Node, H: Inspect<A::Out, Out = bool>> Node for Where<A, H> {
    type Token = A::Token;
    type Out = A::Out;
    type Shape = A::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{} where <predicate>", Repr(&self.a))
    }
}

impl<A: Peek<S>, H: Inspect<A::Out, Out = bool>, S> Peek<S> for Where<A, H> {
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<A, H, S, G, L> Parser<S, G, L> for Where<A, H>
where
    A: Parser<S, G, L>,
    H: InspectIn<A::Out, G, L, Out = bool>,
    S: Stream,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<A::Out> {
        match self.a.parse_with(cx)? {
            Some(out) if self.hook.inspect(&out, cx.global, cx.local) => Ok(Some(out)),
            _ => fail(self, cx),
        }
    }
}

type DynParser<S, O, G, L, K> =
    dyn Parser<S, G, L, Token = <S as Stream>::Token, Out = O, Shape = K> + Send + Sync;

/// A type-erased parser, giving any grammar a nameable type.
#[derive_where(Clone)]
pub struct Boxed<S: Stream, O, G = (), L = (), K = Value> {
    inner: Arc<DynParser<S, O, G, L, K>>,
    meta: Meta,
}

impl<S: Stream, O, G, L, K> Boxed<S, O, G, L, K> {
    pub fn new<P>(parser: P) -> Self
    where
        P: Parser<S, G, L, Token = S::Token, Out = O, Shape = K> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(parser),
            meta: Meta::default(),
        }
    }
}

impl<S: Stream, O, G, L, K: Shape> Node for Boxed<S, O, G, L, K> {
    type Token = S::Token;
    type Out = O;
    type Shape = K;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", Repr(&*self.inner))
    }
}

impl<S: Stream, O, G, L, K: Shape> Peek<S> for Boxed<S, O, G, L, K> {
    fn peek(&self, stream: &mut S) -> bool {
        self.inner.peek(stream)
    }
}

impl<S: Stream, O, G, L, K: Shape> Parser<S, G, L> for Boxed<S, O, G, L, K> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        self.inner.parse_with(cx)
    }
}

/// A rule built by its factory on first use, then shared by every [Lazy] over the same factory.
///
/// Factories are told apart by their type, so the rule is built once per process however many
/// times the factory appears in a grammar. A factory closure should not depend on its captures.
///
/// Has no recovery of its own, failures are reported by the rule it builds.
/// ```
/// use peekparse::prelude::*;
///
/// // nested = '(' nested? ')'
/// fn nested() -> Boxed<StrStream, usize> {
///     check('(')
///         .then(lazy(nested).optional())
///         .then(check(')'))
///         .map(|inner: Option<usize>| inner.map_or(1, |depth| depth + 1))
///         .boxed()
/// }
///
/// assert_eq!(nested().parse(&mut StrStream::new("((()))")), Ok(Some(3)));
/// ```
#[derive_where(Clone)]
pub struct Lazy<S: Stream, O, G = (), L = (), K = Value> {
    resolve: Arc<dyn Fn() -> Boxed<S, O, G, L, K> + Send + Sync>,
    rule: Arc<OnceCell<Boxed<S, O, G, L, K>>>,
    meta: Meta,
}

type Rules = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static RULES: once_cell::sync::Lazy<RwLock<Rules>> = once_cell::sync::Lazy::new(Default::default);

/// The rule built by `factory`, building it if no other [Lazy] has.
fn memoized<F, S, O, G, L, K>(factory: &F) -> Boxed<S, O, G, L, K>
where
    F: Fn() -> Boxed<S, O, G, L, K> + 'static,
    S: Stream + 'static,
    O: 'static,
    G: 'static,
    L: 'static,
    K: 'static,
{
    let key = TypeId::of::<F>();
    let known = RULES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .and_then(|rule| rule.downcast_ref::<Boxed<S, O, G, L, K>>().cloned());
    if let Some(rule) = known {
        return rule;
    }

    // built outside the lock, the factory may construct other lazy rules
    let built = factory();
    let mut rules = RULES.write().unwrap_or_else(PoisonError::into_inner);
    rules
        .entry(key)
        .or_insert_with(|| Arc::new(built.clone()))
        .downcast_ref::<Boxed<S, O, G, L, K>>()
        .cloned()
        .unwrap_or(built)
}

pub fn lazy<S, O, G, L, K, F>(factory: F) -> Lazy<S, O, G, L, K>
where
    F: Fn() -> Boxed<S, O, G, L, K> + Send + Sync + 'static,
    S: Stream + 'static,
    O: 'static,
    G: 'static,
    L: 'static,
    K: 'static,
{
    Lazy {
        resolve: Arc::new(move || memoized(&factory)),
        rule: Arc::new(OnceCell::new()),
        meta: Meta::default(),
    }
}

impl<S: Stream, O, G, L, K> Lazy<S, O, G, L, K> {
    fn rule(&self) -> &Boxed<S, O, G, L, K> {
        self.rule.get_or_init(|| (self.resolve)())
    }
}

impl<S: Stream, O, G, L, K: Shape> Node for Lazy<S, O, G, L, K> {
    type Token = S::Token;
    type Out = O;
    type Shape = K;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "...")
    }
}

impl<S: Stream, O, G, L, K: Shape> Peek<S> for Lazy<S, O, G, L, K> {
    fn peek(&self, stream: &mut S) -> bool {
        self.rule().peek(stream)
    }
}

impl<S: Stream, O, G, L, K: Shape> Parser<S, G, L> for Lazy<S, O, G, L, K> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        cx.descend(self, |cx| self.rule().parse_with(cx))
    }
}

/// A rule defined in terms of itself.
/// ```
/// use peekparse::{prelude::*, behavioral::Recursive};
///
/// // list = '[' list* ']'
/// let list: Recursive<StrStream, usize> = recursive(|list| {
///     check('[').then(list.many()).then(check(']')).map(|inner: Vec<usize>| inner.len())
/// });
///
/// assert_eq!(list.parse(&mut StrStream::new("[[][[]]]")), Ok(Some(2)));
/// ```
#[derive_where(Clone)]
pub struct Recursive<S: Stream, O, G = (), L = (), K = Value> {
    rule: Arc<DynParser<S, O, G, L, K>>,
    meta: Meta,
}

/// Refers to the [Recursive] rule being defined, from inside its definition.
#[derive_where(Clone)]
pub struct RecursiveHandle<S: Stream, O, G = (), L = (), K = Value> {
    rule: Weak<DynParser<S, O, G, L, K>>,
    meta: Meta,
}

pub fn recursive<S, O, G, L, K, P>(
    define: impl FnOnce(RecursiveHandle<S, O, G, L, K>) -> P,
) -> Recursive<S, O, G, L, K>
where
    S: Stream,
    P: Parser<S, G, L, Token = S::Token, Out = O, Shape = K> + Send + Sync + 'static,
{
    let rule: Arc<P> = Arc::new_cyclic(|weak: &Weak<P>| {
        let rule: Weak<DynParser<S, O, G, L, K>> = weak.clone();
        define(RecursiveHandle {
            rule,
            meta: Meta::default(),
        })
    });
    Recursive {
        rule,
        meta: Meta::default(),
    }
}

impl<S: Stream, O, G, L, K: Shape> Node for Recursive<S, O, G, L, K> {
    type Token = S::Token;
    type Out = O;
    type Shape = K;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", Repr(&*self.rule))
    }
}

impl<S: Stream, O, G, L, K: Shape> Peek<S> for Recursive<S, O, G, L, K> {
    fn peek(&self, stream: &mut S) -> bool {
        self.rule.peek(stream)
    }
}

impl<S: Stream, O, G, L, K: Shape> Parser<S, G, L> for Recursive<S, O, G, L, K> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        cx.descend(self, |cx| self.rule.parse_with(cx))
    }
}

impl<S: Stream, O, G, L, K: Shape> Node for RecursiveHandle<S, O, G, L, K> {
    type Token = S::Token;
    type Out = O;
    type Shape = K;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "...")
    }
}

impl<S: Stream, O, G, L, K: Shape> Peek<S> for RecursiveHandle<S, O, G, L, K> {
    fn peek(&self, stream: &mut S) -> bool {
        self.rule.upgrade().is_some_and(|rule| rule.peek(stream))
    }
}

impl<S: Stream, O, G, L, K: Shape> Parser<S, G, L> for RecursiveHandle<S, O, G, L, K> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        // INV: the rule outlives its handles, unless a handle was cloned out of the definition
        let Some(rule) = self.rule.upgrade() else {
            return Err(ParseError::Detached {
                parser: Repr(self).to_string(),
            });
        };
        cx.descend(self, |cx| rule.parse_with(cx))
    }
}

/// Run the child with a fresh `T` as its local state.
#[derive_where(Clone; A: Clone)]
pub struct WithState<T, A> {
    a: A,
    meta: Meta,
    _state: PhantomData<fn() -> T>,
}

pub fn with_state<T: Default, A>(a: A) -> WithState<T, A> {
    WithState {
        a,
        meta: Meta::default(),
        _state: PhantomData,
    }
}

impl<T, A: Node> Node for WithState<T, A> {
    type Token = A::Token;
    type Out = A::Out;
    type Shape = A::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        self.a.repr(f)
    }
}

impl<T, A: Peek<S>, S> Peek<S> for WithState<T, A> {
    fn peek(&self, stream: &mut S) -> bool {
        self.a.peek(stream)
    }
}

impl<T, A, S, G, L> Parser<S, G, L> for WithState<T, A>
where
    T: Default,
    A: Parser<S, G, T>,
    S: Stream,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<A::Out> {
        let mut local = T::default();
        match self.a.parse_with(&mut cx.rescope(&mut local))? {
            Some(out) => Ok(Some(out)),
            None => fail(self, cx),
        }
    }
}

/// Observes errors caught by a [TryCatch].
pub trait Catch<G> {
    fn caught(&self, err: &ParseError, global: &mut G);
}

/// Catch errors without observing them.
#[derive(Clone, Copy, Debug)]
pub struct Silent;

impl<G> Catch<G> for Silent {
    fn caught(&self, _: &ParseError, _: &mut G) {}
}

impl<F: Fn(&ParseError), G> Catch<G> for Plain<F> {
    fn caught(&self, err: &ParseError, _: &mut G) {
        (self.0)(err)
    }
}

impl<F: Fn(&ParseError, &mut G), G> Catch<G> for Global<F, G> {
    fn caught(&self, err: &ParseError, global: &mut G) {
        (self.0)(err, global)
    }
}

/// Run `body`, and if it cannot start or fails, run `recovery` in its place.
///
/// Only syntax errors are caught, guard errors such as
/// [DepthExceeded](ParseError::DepthExceeded) propagate.
#[derive(Clone)]
pub struct TryCatch<A, R, C> {
    body: A,
    recovery: R,
    catch: C,
    meta: Meta,
}

pub fn try_catch<A, R>(body: A, recovery: R) -> TryCatch<A, R, Silent> {
    TryCatch::build(body, recovery, Silent)
}

/// As [try_catch], passing the caught error to `on_error` before recovering.
pub fn try_catch_with<A, R, F: Fn(&ParseError)>(
    body: A,
    recovery: R,
    on_error: F,
) -> TryCatch<A, R, Plain<F>> {
    TryCatch::build(body, recovery, Plain(on_error))
}

impl<A, R, C> TryCatch<A, R, C> {
    pub(crate) fn build(body: A, recovery: R, catch: C) -> Self {
        Self {
            body,
            recovery,
            catch,
            meta: Meta::default(),
        }
    }
}

impl<A, R, C> Node for TryCatch<A, R, C>
where
    A: Node,
    R: Node<Token = A::Token>,
    (A::Shape, R::Shape): Alternative<A::Out, R::Out>,
{
    type Token = A::Token;
    type Out = <(A::Shape, R::Shape) as Alternative<A::Out, R::Out>>::Out;
    type Shape = <(A::Shape, R::Shape) as Alternative<A::Out, R::Out>>::Shape;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "try {} catch {}", Repr(&self.body), Repr(&self.recovery))
    }
}

impl<A, R, C, S> Peek<S> for TryCatch<A, R, C>
where
    A: Peek<S>,
    R: Peek<S, Token = A::Token>,
    (A::Shape, R::Shape): Alternative<A::Out, R::Out>,
{
    fn peek(&self, stream: &mut S) -> bool {
        self.body.peek(stream) || self.recovery.peek(stream)
    }
}

impl<A, R, C, S, G, L> Parser<S, G, L> for TryCatch<A, R, C>
where
    A: Parser<S, G, L>,
    R: Parser<S, G, L, Token = A::Token>,
    C: Catch<G>,
    S: Stream,
    (A::Shape, R::Shape): Alternative<A::Out, R::Out>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<Self::Out> {
        let err = if self.body.peek(cx.stream) {
            match self.body.parse_with(cx) {
                Ok(Some(out)) => {
                    return Ok(Some(
                        <(A::Shape, R::Shape) as Alternative<A::Out, R::Out>>::left(out),
                    ))
                }
                Ok(None) => ErrorContext::capture(&self.body, cx.stream).into(),
                Err(e) if e.is_syntax() => e,
                Err(e) => return Err(e),
            }
        } else {
            ErrorContext::capture(&self.body, cx.stream).into()
        };

        self.catch.caught(&err, cx.global);

        match self.recovery.parse_with(cx)? {
            Some(out) => Ok(Some(
                <(A::Shape, R::Shape) as Alternative<A::Out, R::Out>>::right(out),
            )),
            None => fail(self, cx),
        }
    }
}

/// Panic-mode synchronization: discard tokens until one is accepted by the matcher (or the end of
/// input), then yield a placeholder. Always peeks successfully, and never fails.
#[derive_where(Clone; M: Clone, O: Clone)]
pub struct SyncTo<T, M, O = (), K = Unit> {
    matcher: M,
    past: bool,
    value: O,
    meta: Meta,
    _token: PhantomData<fn() -> (T, K)>,
}

fn sync_with<T, M>(matcher: M) -> SyncTo<T, M> {
    SyncTo {
        matcher,
        past: false,
        value: (),
        meta: Meta::default(),
        _token: PhantomData,
    }
}

/// Synchronize at `token`, leaving it unconsumed.
pub fn sync<T: PartialEq + std::fmt::Debug>(token: T) -> SyncTo<T, Is<T>> {
    sync_with(Is(token))
}

pub fn sync_if<T, F: Fn(&T) -> bool>(pred: F) -> SyncTo<T, Satisfies<F>> {
    sync_with(Satisfies(pred))
}

/// Synchronize at `token`, consuming it.
pub fn sync_past<T: PartialEq + std::fmt::Debug>(token: T) -> SyncTo<T, Is<T>> {
    sync(token).past()
}

/// Synchronize at `token`, yielding `placeholder`.
pub fn sync_value<T, O>(token: T, placeholder: O) -> SyncTo<T, Is<T>, O, Value>
where
    T: PartialEq + std::fmt::Debug,
    O: Clone,
{
    sync(token).yielding(placeholder)
}

impl<T, M, O, K> SyncTo<T, M, O, K> {
    /// Also consume the synchronizing token.
    pub fn past(mut self) -> Self {
        self.past = true;
        self
    }

    /// Yield `placeholder` once synchronized.
    pub fn yielding<V: Clone>(self, placeholder: V) -> SyncTo<T, M, V, Value> {
        SyncTo {
            matcher: self.matcher,
            past: self.past,
            value: placeholder,
            meta: self.meta,
            _token: PhantomData,
        }
    }
}

impl<T, M: Matcher<T>, O: Clone, K: Shape> Node for SyncTo<T, M, O, K> {
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
        write!(f, "sync(")?;
        self.matcher.repr(f)?;
        write!(f, ")")
    }
}

impl<T, M: Matcher<T>, O: Clone, K: Shape, S: Stream<Token = T>> Peek<S> for SyncTo<T, M, O, K> {
    fn peek(&self, _: &mut S) -> bool {
        true
    }
}

impl<T, M, O, K, S, G, L> Parser<S, G, L> for SyncTo<T, M, O, K>
where
    M: Matcher<T>,
    O: Clone,
    K: Shape,
    S: Stream<Token = T>,
{
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<O> {
        skip_until(cx.stream, |t| self.matcher.matches(t));
        if self.past && !cx.stream.eof(0) {
            cx.stream.seek(1);
        }
        Ok(Some(self.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prelude::*, text::ch_if};

    fn number<G, L>() -> impl Parser<StrStream, G, L, Token = char, Out = u32, Shape = Value> + Clone {
        ch_if(char::is_ascii_digit)
            .more()
            .map(|digits: String| digits.parse::<u32>().unwrap_or(0))
    }

    #[test]
    fn map_with_state() {
        let counted = number::<Vec<u32>, ()>().map_global(|n, seen: &mut Vec<u32>| {
            seen.push(n);
            n * 2
        });
        let mut seen = Vec::new();
        let mut stream = StrStream::new("21");
        assert_eq!(counted.parse_global(&mut stream, &mut seen), Ok(Some(42)));
        assert_eq!(seen, vec![21]);

        let scoped = number::<u32, usize>().map_state(|n, total: &mut u32, depth: &mut usize| {
            *total += n;
            *depth += 1;
            *depth
        });
        let (mut total, mut depth) = (0, 0);
        let mut stream = StrStream::new("5");
        assert_eq!(scoped.parse_state(&mut stream, &mut total, &mut depth), Ok(Some(1)));
        assert_eq!((total, depth), (5, 1));
    }

    #[test]
    fn actions_keep_results() {
        let logged = number::<Vec<String>, ()>().action_global(|n: &u32, log: &mut Vec<String>| log.push(n.to_string()));
        let mut log = Vec::new();
        assert_eq!(logged.parse_global(&mut StrStream::new("7"), &mut log), Ok(Some(7)));
        assert_eq!(log, vec![String::from("7")]);
    }

    #[test]
    fn filters_fail_through_recovery() {
        let even = number::<(), ()>().filter(|n: &u32| n % 2 == 0).name("even");
        assert_eq!(even.parse(&mut StrStream::new("12")), Ok(Some(12)));

        let err = even.parse(&mut StrStream::new("13")).unwrap_err();
        assert_eq!(err.diagnostic().map(|d| d.parser.as_str()), Some("even"));
    }

    #[test]
    fn local_state_is_scoped() {
        let count = check('x').action_state(|_: &(), _: &mut (), n: &mut usize| *n += 1);
        let group = check('(')
            .then(count.many())
            .then(check(')'))
            .map_state(|(), _: &mut (), n: &mut usize| *n)
            .with_state::<usize>();
        let groups = group.many();

        let mut stream = StrStream::new("(xx)(x)()");
        assert_eq!(groups.parse(&mut stream), Ok(Some(vec![2, 1, 0])));
    }

    #[test]
    fn recursive_handles_detach() {
        let mut escaped = None;
        let rule: Recursive<StrStream, ()> = recursive(|this| {
            escaped = Some(this.clone());
            check('a').then(this.optional()).map(drop)
        });
        assert_eq!(rule.parse(&mut StrStream::new("aaa")), Ok(Some(())));
        drop(rule);

        let handle = escaped.expect("handle escaped the definition");
        assert!(!handle.peek(&mut StrStream::new("a")));
        assert!(matches!(
            handle.parse(&mut StrStream::new("a")),
            Err(ParseError::Detached { .. })
        ));
    }

    #[test]
    fn depth_limit_stops_runaway_recursion() {
        fn nest() -> Boxed<StrStream, ()> {
            check('(').then(lazy(nest).optional()).map(drop).boxed()
        }
        let deep = "(".repeat(100);
        let limits = Limits::new().max_depth(10);
        let res = limits.run(&lazy(nest), &mut StrStream::new(&deep), &mut (), &mut ());
        assert!(matches!(res, Err(ParseError::DepthExceeded { limit: 10, .. })));
    }

    #[test]
    fn lazy_rules_are_built_once_per_factory() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static BUILT: AtomicUsize = AtomicUsize::new(0);
        fn ones() -> Boxed<StrStream, usize> {
            BUILT.fetch_add(1, Ordering::SeqCst);
            check('1')
                .then(lazy(ones).optional())
                .map(|rest: Option<usize>| rest.map_or(1, |n| n + 1))
                .boxed()
        }

        let rule = lazy(ones);
        let short = "1".repeat(150);
        assert_eq!(rule.parse(&mut StrStream::new(&short)), Ok(Some(150)));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);

        let long = "1".repeat(300);
        assert_eq!(rule.parse(&mut StrStream::new(&long)), Ok(Some(300)));
        assert_eq!(lazy(ones).parse(&mut StrStream::new("111")), Ok(Some(3)));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn try_catch_reports_and_synchronizes() {
        let stmt = number::<Vec<String>, ()>().then(check(';'));
        let guarded = stmt.try_catch_global(sync_past(';'), |e: &ParseError, errors: &mut Vec<String>| {
            errors.push(e.token().unwrap_or_default().to_owned())
        });
        let program = guarded.many();

        let mut errors = Vec::new();
        let mut stream = StrStream::new("1;x;3;");
        assert_eq!(
            program.parse_global(&mut stream, &mut errors),
            Ok(Some(vec![Some(1), None, Some(3)]))
        );
        assert_eq!(errors, vec![String::from("x")]);
    }

    #[test]
    fn try_catch_is_entered_where_its_recovery_applies() {
        let guarded = check('a').try_catch(sync_past(';'));
        assert!(guarded.peek(&mut StrStream::new("a")));
        assert!(guarded.peek(&mut StrStream::new("b;")));

        // the body not matching still consumes each statement up to its delimiter
        let mut stream = StrStream::new("b;c;a");
        assert_eq!(guarded.many().parse(&mut stream), Ok(Some(())));
        assert!(stream.eof(0));
    }

    #[test]
    fn try_catch_propagates_guard_errors() {
        fn nest() -> Boxed<StrStream, ()> {
            check('(').then(lazy(nest).optional()).map(drop).boxed()
        }
        let guarded = lazy(nest).try_catch(sync(';'));
        let res = Limits::new()
            .max_depth(2)
            .run(&guarded, &mut StrStream::new("((((;"), &mut (), &mut ());
        assert!(matches!(res, Err(ParseError::DepthExceeded { .. })));
    }

    #[test]
    fn sync_variants() {
        let mut stream = ContainerStream::new(vec![1, 2, 0, 5]);
        assert_eq!(sync(0).parse(&mut stream), Ok(Some(())));
        assert_eq!(stream.offset(), 2);
        assert_eq!(sync_value(9, "skipped").parse(&mut stream), Ok(Some("skipped")));
        assert_eq!(stream.offset(), 4);
        assert_eq!(sync_if(|_: &i32| true).past().parse(&mut stream), Ok(Some(())));
        assert!(stream.eof(0));
    }
}
