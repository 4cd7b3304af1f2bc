//! Method-chaining constructors for every combinator, node configuration and the entry points
//! for running a parser.

use std::{borrow::Cow, marker::PhantomData};

use crate::{
    behavioral::{
        Action, Boxed, Global, Map, Plain, Scoped, Silent, TryCatch, Where, WithState,
    },
    config::Limits,
    error::{ErrorContext, ParseError},
    recovery::{Handler, PanicRecovery},
    stream::Stream,
    structural::{
        self, Ignore, Many, More, Not, Optional, Or, OrEither, Pred, Then,
    },
    Node, ParseResult, Parser,
};

pub trait ParserExt: Node + Sized {
    /// Name the node in diagnostics, instead of rendering its grammar.
    fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.meta_mut().set_name(name);
        self
    }

    /// Handle this node's failures with `handler` instead of the default for its token type.
    ///
    /// Returning `Ok(())` swallows the failure, the node then yields no result.
    fn on_error(
        mut self,
        handler: impl Fn(&ErrorContext<Self::Token>) -> Result<(), ParseError> + Send + Sync + 'static,
    ) -> Self
    where
        Self::Token: 'static,
    {
        self.meta_mut().set_handler(Handler::new(handler));
        self
    }

    /// Synchronize the stream with `recovery` when this node fails.
    fn recover_with(mut self, recovery: PanicRecovery<Self::Token>) -> Self
    where
        Self::Token: 'static,
    {
        self.meta_mut().set_recovery(recovery);
        self
    }

    /// Fail without recovering or reporting.
    fn no_error(mut self) -> Self {
        self.meta_mut().set_silent(true);
        self
    }

    fn then<B>(self, b: B) -> Then<Self, B> {
        structural::then(self, b)
    }

    fn or<B>(self, b: B) -> Or<Self, B> {
        structural::or(self, b)
    }

    fn or_backtrack<B>(self, b: B) -> Or<Self, B> {
        structural::or_backtrack(self, b)
    }

    fn either<B>(self, b: B) -> OrEither<Self, B> {
        structural::either(self, b)
    }

    fn either_backtrack<B>(self, b: B) -> OrEither<Self, B> {
        structural::either_backtrack(self, b)
    }

    fn many(self) -> Many<Self> {
        structural::many(self)
    }

    fn more(self) -> More<Self> {
        structural::more(self)
    }

    fn optional(self) -> Optional<Self> {
        structural::optional(self)
    }

    fn not(self) -> Not<Self> {
        structural::not(self)
    }

    fn pred(self) -> Pred<Self> {
        structural::pred(self)
    }

    fn ignore(self) -> Ignore<Self> {
        structural::ignore(self)
    }

    fn map<O, F>(self, f: F) -> Map<Self, Plain<F>>
    where
        F: Fn(Self::Out) -> O,
    {
        Map::new(self, Plain(f))
    }

    fn map_global<G, O, F>(self, f: F) -> Map<Self, Global<F, G>>
    where
        F: Fn(Self::Out, &mut G) -> O,
    {
        Map::new(self, Global(f, PhantomData))
    }

    fn map_state<G, L, O, F>(self, f: F) -> Map<Self, Scoped<F, G, L>>
    where
        F: Fn(Self::Out, &mut G, &mut L) -> O,
    {
        Map::new(self, Scoped(f, PhantomData))
    }

    fn action<F>(self, f: F) -> Action<Self, Plain<F>>
    where
        F: Fn(&Self::Out),
    {
        Action::new(self, Plain(f))
    }

    fn action_global<G, F>(self, f: F) -> Action<Self, Global<F, G>>
    where
        F: Fn(&Self::Out, &mut G),
    {
        Action::new(self, Global(f, PhantomData))
    }

    fn action_state<G, L, F>(self, f: F) -> Action<Self, Scoped<F, G, L>>
    where
        F: Fn(&Self::Out, &mut G, &mut L),
    {
        Action::new(self, Scoped(f, PhantomData))
    }

    /// Reject results for which `f` is false, failing as this node.
    fn filter<F>(self, f: F) -> Where<Self, Plain<F>>
    where
        F: Fn(&Self::Out) -> bool,
    {
        Where::new(self, Plain(f))
    }

    fn filter_global<G, F>(self, f: F) -> Where<Self, Global<F, G>>
    where
        F: Fn(&Self::Out, &mut G) -> bool,
    {
        Where::new(self, Global(f, PhantomData))
    }

    fn filter_state<G, L, F>(self, f: F) -> Where<Self, Scoped<F, G, L>>
    where
        F: Fn(&Self::Out, &mut G, &mut L) -> bool,
    {
        Where::new(self, Scoped(f, PhantomData))
    }

    /// Parse with a fresh `T::default()` as the local state.
    fn with_state<T: Default>(self) -> WithState<T, Self> {
        crate::behavioral::with_state(self)
    }

    fn try_catch<R>(self, recovery: R) -> TryCatch<Self, R, Silent> {
        crate::behavioral::try_catch(self, recovery)
    }

    fn try_catch_with<R, F>(self, recovery: R, on_error: F) -> TryCatch<Self, R, Plain<F>>
    where
        F: Fn(&ParseError),
    {
        crate::behavioral::try_catch_with(self, recovery, on_error)
    }

    /// As [ParserExt::try_catch_with], also passing the global state to `on_error`.
    fn try_catch_global<R, G, F>(self, recovery: R, on_error: F) -> TryCatch<Self, R, Global<F, G>>
    where
        F: Fn(&ParseError, &mut G),
    {
        TryCatch::build(self, recovery, Global(on_error, PhantomData))
    }

    /// Erase the parser's type.
    fn boxed<S, G, L>(self) -> Boxed<S, Self::Out, G, L, Self::Shape>
    where
        S: Stream,
        Self: Parser<S, G, L, Token = S::Token> + Send + Sync + 'static,
    {
        Boxed::new(self)
    }

    /// Parse from the stream's cursor with the default [Limits].
    fn parse<S>(&self, stream: &mut S) -> ParseResult<Self::Out>
    where
        S: Stream,
        Self: Parser<S>,
    {
        Limits::default().run(self, stream, &mut (), &mut ())
    }

    fn parse_global<S, G>(&self, stream: &mut S, global: &mut G) -> ParseResult<Self::Out>
    where
        S: Stream,
        Self: Parser<S, G>,
    {
        Limits::default().run(self, stream, global, &mut ())
    }

    fn parse_state<S, G, L>(
        &self,
        stream: &mut S,
        global: &mut G,
        local: &mut L,
    ) -> ParseResult<Self::Out>
    where
        S: Stream,
        Self: Parser<S, G, L>,
    {
        Limits::default().run(self, stream, global, local)
    }
}

impl<N: Node> ParserExt for N {}
