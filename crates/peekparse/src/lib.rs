//! A predictive parser combinator library.
//!
//! Grammars are built once from [Node]s (primitive matchers, structural and behavioral
//! combinators) and then run many times against a [Stream](stream::Stream).
//! - Choice points decide using [Peek], a bounded lookahead that never consumes input.
//! - Result types are derived mechanically from the shape of the grammar (see [algebra]).
//! - Failures go through a per-node (or per-token-type default) handler and optional
//!   panic-mode recovery (see [recovery]), and can be caught with
//!   [try_catch](behavioral::try_catch).
//!
//! ```
//! use peekparse::{prelude::*, text};
//!
//! let digit = text::ch_if(char::is_ascii_digit).map(|c| c.to_digit(10).unwrap_or(0));
//! let sum = digit.clone().then(check('+').then(digit).many()).map(|(first, rest)| {
//!     rest.into_iter().fold(first, |acc, d| acc + d)
//! });
//!
//! assert_eq!(sum.parse(&mut StrStream::new("1+2+3")), Ok(Some(6)));
//! ```
#![allow(internal_features)]
#![cfg_attr(feature = "nightly", feature(rustc_attrs))]
#![warn(clippy::style)]
#![warn(clippy::perf)]
#![warn(clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use std::{
    any::Any,
    borrow::Cow,
    fmt::{Debug, Display, Error, Formatter},
    sync::Arc,
};

pub mod algebra;
pub mod behavioral;
pub mod config;
pub mod context;
pub mod error;
pub mod ext;
pub mod macros;
mod ops;
pub mod primitive;
pub mod recovery;
pub mod stream;
pub mod structural;
pub mod text;
pub mod tokens;

use algebra::Shape;
use context::Context;
use error::ParseError;

/// Everything needed to write and run a grammar.
pub mod prelude {
    pub use crate::{
        algebra::Either,
        behavioral::{
            lazy, recursive, sync, sync_if, sync_past, sync_value, try_catch, try_catch_with,
            with_state, Boxed,
        },
        config::Limits,
        context::Context,
        error::{ErrorContext, ParseError},
        ext::ParserExt,
        primitive::{
            check, check_if, seq_check, seq_ptr, seq_value, single, single_if, single_ptr,
            single_ptr_if, single_with, until, until_if,
        },
        recovery::PanicRecovery,
        stream::{ContainerStream, FileStream, MmapStream, ReaderStream, Stream, StrStream},
        structural::{
            either, either_backtrack, ignore, many, more, not, optional, or, or_backtrack, pred,
            then,
        },
        Node, ParseResult, Parser, Peek,
    };
}

/// The outcome of [Parser::parse_with].
/// - `Ok(Some(_))` the node matched.
/// - `Ok(None)` the node failed, and its failure was reported without being raised.
/// - `Err(_)` a [ParseError] is unwinding towards the nearest
///   [try_catch](behavioral::try_catch) or the caller.
pub type ParseResult<T> = Result<Option<T>, ParseError>;

/// The state-independent description of a grammar node: the token type it reads, the type it
/// produces and how that type combines with others.
#[cfg_attr(
    feature = "nightly",
    rustc_on_unimplemented(
        message = "`{Self}` is not a grammar `Node`, so it cannot be combined into a parser",
        label = "Not a `Node`",
    )
)]
pub trait Node {
    /// The tokens this node reads.
    type Token;

    /// The result produced on success.
    type Out;

    /// How [Node::Out] takes part in sequencing, choice and repetition.
    type Shape: Shape;

    fn meta(&self) -> &Meta;

    fn meta_mut(&mut self) -> &mut Meta;

    /// Produces a representation of the node for debugging and error messages.
    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error>;
}

/// Bounded lookahead over a stream.
///
/// Implementations may fill internal buffers of the stream, but must never move its cursor, and
/// must never call [Parser::parse_with].
#[cfg_attr(
    feature = "nightly",
    rustc_on_unimplemented(
        message = "`{Self}` cannot look ahead in streams of type `{S}`",
        label = "Not `Peek` over `{S}`",
    )
)]
pub trait Peek<S>: Node {
    fn peek(&self, stream: &mut S) -> bool;
}

/// A [Node] that can be run over stream `S`, with global state `G` and local state `L`.
#[cfg_attr(
    feature = "nightly",
    rustc_on_unimplemented(
        message = "`{Self}` cannot parse streams of type `{S}` with global state `{G}` and local state `{L}`",
        label = "Not a `Parser` for these types",
    )
)]
pub trait Parser<S, G = (), L = ()>: Peek<S> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<Self::Out>;
}

/// Per-node configuration: the diagnostic name, the error handler and panic-mode recovery used
/// when the node fails, and whether failures are reported at all.
#[derive(Clone, Default)]
pub struct Meta {
    name: Option<Cow<'static, str>>,
    // INV: when present, a `recovery::Handler<T>` / `recovery::PanicRecovery<T>` for the node's
    //      token type. Only set through `ParserExt`, which enforces this.
    handler: Option<Arc<dyn Any + Send + Sync>>,
    recovery: Option<Arc<dyn Any + Send + Sync>>,
    silent: bool,
}

impl Meta {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = Some(name.into());
    }

    /// If set, failures of this node are neither recovered from, nor reported.
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }
}

impl Debug for Meta {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meta")
            .field("name", &self.name)
            .field("handler", &self.handler.is_some())
            .field("recovery", &self.recovery.is_some())
            .field("silent", &self.silent)
            .finish()
    }
}

/// A simple wrapper to allow the [Node::repr] function to implement [Display].
/// Named nodes are displayed by their name.
pub struct Repr<T>(pub T);

impl<N: Node + ?Sized> Display for Repr<&N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0.meta().name() {
            Some(name) => write!(f, "{name}"),
            None => self.0.repr(f),
        }
    }
}
