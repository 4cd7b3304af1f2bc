//! Reporting and recovering from match failures.
//!
//! When a node fails to match, [fail] runs two independent strategies, each resolved first from
//! the node's [Meta] and then from the process-wide defaults for the stream's token type:
//! 1. Panic-mode [PanicRecovery], discarding tokens until a synchronization point (none by
//!    default).
//! 2. A [Handler], given the [ErrorContext] of the failure. By default the context is raised as
//!    a [ParseError], returning `Ok(())` swallows the failure instead.
//!
//! Nodes marked silent ([ParserExt::no_error](crate::ext::ParserExt::no_error)), and nodes run
//! speculatively by a backtracking choice, skip both.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};

use derive_where::derive_where;
use once_cell::sync::Lazy;

use crate::{
    context::Context,
    error::{ErrorContext, ParseError},
    stream::Stream,
    Meta, Node, ParseResult,
};

type HandlerFn<T> = dyn Fn(&ErrorContext<T>) -> Result<(), ParseError> + Send + Sync;

/// Receives the context of a failed match, and decides whether to raise it.
pub struct Handler<T>(Box<HandlerFn<T>>);

impl<T> Handler<T> {
    pub fn new(f: impl Fn(&ErrorContext<T>) -> Result<(), ParseError> + Send + Sync + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn call(&self, ctx: &ErrorContext<T>) -> Result<(), ParseError> {
        (self.0)(ctx)
    }
}

impl<T> Debug for Handler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler<{}>", std::any::type_name::<T>())
    }
}

/// Panic-mode recovery: discard tokens until one satisfies the synchronization predicate, or the
/// stream ends. The synchronizing token is not consumed.
#[derive_where(Clone)]
pub struct PanicRecovery<T> {
    until: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> PanicRecovery<T> {
    pub fn new(until: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            until: Arc::new(until),
        }
    }

    /// Synchronize on a specific token.
    pub fn at(token: T) -> Self
    where
        T: PartialEq + Send + Sync + 'static,
    {
        Self::new(move |t| *t == token)
    }

    /// Discard the rest of the stream.
    pub fn to_end() -> Self {
        Self::new(|_| false)
    }

    /// Returns the number of tokens discarded.
    pub fn recover<S: Stream<Token = T>>(&self, stream: &mut S) -> usize {
        skip_until(stream, |t| (self.until)(t))
    }
}

impl<T> Debug for PanicRecovery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PanicRecovery<{}>", std::any::type_name::<T>())
    }
}

/// Advance until the current token satisfies `until`, or the end of input.
pub(crate) fn skip_until<S: Stream>(stream: &mut S, until: impl Fn(&S::Token) -> bool) -> usize {
    let mut skipped = 0;
    while let Some(t) = stream.peek(0) {
        if until(t) {
            break;
        }
        stream.seek(1);
        skipped += 1;
    }
    skipped
}

#[derive(Default)]
struct Defaults {
    handlers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    recoveries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

static DEFAULTS: Lazy<RwLock<Defaults>> = Lazy::new(Default::default);

/// Set the handler used for nodes over tokens of type `T` without their own.
pub fn set_default_handler<T: 'static>(
    handler: impl Fn(&ErrorContext<T>) -> Result<(), ParseError> + Send + Sync + 'static,
) {
    let mut defaults = DEFAULTS.write().unwrap_or_else(PoisonError::into_inner);
    defaults
        .handlers
        .insert(TypeId::of::<T>(), Arc::new(Handler::new(handler)));
}

/// Set the recovery used for nodes over tokens of type `T` without their own.
pub fn set_default_recovery<T: 'static>(recovery: PanicRecovery<T>) {
    let mut defaults = DEFAULTS.write().unwrap_or_else(PoisonError::into_inner);
    defaults
        .recoveries
        .insert(TypeId::of::<T>(), Arc::new(recovery));
}

/// Restore raising errors without recovery, for tokens of type `T`.
pub fn reset_defaults<T: 'static>() {
    let mut defaults = DEFAULTS.write().unwrap_or_else(PoisonError::into_inner);
    defaults.handlers.remove(&TypeId::of::<T>());
    defaults.recoveries.remove(&TypeId::of::<T>());
}

fn default_of(
    select: impl FnOnce(&Defaults) -> Option<&Arc<dyn Any + Send + Sync>>,
) -> Option<Arc<dyn Any + Send + Sync>> {
    let defaults = DEFAULTS.read().unwrap_or_else(PoisonError::into_inner);
    select(&defaults).cloned()
}

impl Meta {
    pub fn set_handler<T: 'static>(&mut self, handler: Handler<T>) {
        self.handler = Some(Arc::new(handler));
    }

    pub fn set_recovery<T: 'static>(&mut self, recovery: PanicRecovery<T>) {
        self.recovery = Some(Arc::new(recovery));
    }

    /// The handler used on failure: this node's own, else the default for `T`.
    fn resolve_handler<T: 'static>(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.handler
            .as_ref()
            .filter(|h| h.is::<Handler<T>>())
            .cloned()
            .or_else(|| default_of(|d| d.handlers.get(&TypeId::of::<T>())))
    }

    fn resolve_recovery<T: 'static>(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.recovery
            .as_ref()
            .filter(|r| r.is::<PanicRecovery<T>>())
            .cloned()
            .or_else(|| default_of(|d| d.recoveries.get(&TypeId::of::<T>())))
    }
}

/// Report that `node` failed to match at the current position.
///
/// Returns `Ok(None)` when the failure is swallowed, and `Err(_)` when it is raised.
pub fn fail<N, S, G, L, O>(node: &N, cx: &mut Context<'_, S, G, L>) -> ParseResult<O>
where
    N: Node + ?Sized,
    S: Stream,
{
    if node.meta().is_silent() || cx.is_speculative() {
        return Ok(None);
    }

    let ctx = ErrorContext::capture(node, &mut *cx.stream);
    let meta = node.meta();

    if let Some(recovery) = meta.resolve_recovery::<S::Token>() {
        if let Some(recovery) = recovery.downcast_ref::<PanicRecovery<S::Token>>() {
            recovery.recover(&mut *cx.stream);
        }
    }

    match meta
        .resolve_handler::<S::Token>()
        .as_deref()
        .and_then(|h| h.downcast_ref::<Handler<S::Token>>())
    {
        Some(handler) => handler.call(&ctx).map(|()| None),
        None => Err(ctx.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prelude::*, stream::ContainerStream};
    use std::sync::Mutex;

    /// Tokens only used by this module, so changing their defaults cannot affect other tests.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Tok {
        Word,
        Semi,
    }

    #[test]
    fn skip_until_stops_before_sync_token() {
        let mut stream = ContainerStream::new(vec![1, 2, 0, 3]);
        let recovery = PanicRecovery::at(0);
        assert_eq!(recovery.recover(&mut stream), 2);
        assert_eq!(stream.peek(0), Some(&0));
        assert_eq!(recovery.recover(&mut stream), 0);
        assert_eq!(PanicRecovery::to_end().recover(&mut stream), 2);
        assert!(stream.eof(0));
    }

    #[test]
    fn default_handler_throws() {
        let mut stream = StrStream::new("b");
        let err = check('a').name("a").parse(&mut stream);
        assert_eq!(err.unwrap_err().token(), Some("b"));
    }

    #[test]
    fn node_handler_and_recovery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        let parser = check('x')
            .name("x")
            .on_error(move |ctx: &ErrorContext<char>| {
                if let Ok(mut log) = log.lock() {
                    log.push((ctx.parser.clone(), ctx.value.clone()));
                }
                Ok(())
            })
            .recover_with(PanicRecovery::at(';'));

        let mut stream = StrStream::new("abc;d");
        assert_eq!(parser.parse(&mut stream), Ok(None));
        assert_eq!(stream.peek(0), Some(&';'));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(String::from("x"), String::from("a"))]
        );
    }

    #[test]
    fn defaults_apply_per_token_type() {
        set_default_recovery(PanicRecovery::at(Tok::Semi));
        set_default_handler(|_: &ErrorContext<Tok>| Ok(()));

        let mut stream = ContainerStream::new(vec![Tok::Word, Tok::Word, Tok::Semi]);
        assert_eq!(check(Tok::Semi).then(check(Tok::Word)).parse(&mut stream), Ok(None));
        assert_eq!(stream.offset(), 2);

        reset_defaults::<Tok>();
        let mut stream = ContainerStream::new(vec![Tok::Word]);
        assert!(check(Tok::Semi).parse(&mut stream).is_err());
        assert_eq!(stream.offset(), 0);
    }

    #[test]
    fn silent_nodes_do_nothing() {
        let mut stream = StrStream::new("b");
        assert_eq!(
            check('a').no_error().recover_with(PanicRecovery::to_end()).parse(&mut stream),
            Ok(None)
        );
        assert_eq!(stream.offset(), 0);
    }
}
