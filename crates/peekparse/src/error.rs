//! Errors raised while parsing, and while building grammars and streams.
//! - [ErrorContext] describes a failing node, and is given to error handlers.
//! - [ParseError] is the only error raised by parsing, [BuildError] and [StreamError] are raised
//!   outside of it.

use std::{fmt::Display, io, path::PathBuf};
use thiserror::Error;

use crate::{stream::Stream, Node, Repr};

/// Everything known about a failure at the point it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext<T> {
    /// The name of the failing node (or its representation if unnamed).
    pub parser: String,
    /// The offending token, `None` at the end of input.
    pub token: Option<T>,
    /// The printable value of the offending token, `EOF` at the end of input.
    pub value: String,
    pub position: String,
    pub stream: String,
}

impl<T: Clone> ErrorContext<T> {
    /// Capture the context of `node` failing at the current position of `stream`.
    pub fn capture<N, S>(node: &N, stream: &mut S) -> Self
    where
        N: Node + ?Sized,
        S: Stream<Token = T>,
    {
        Self {
            parser: Repr(node).to_string(),
            token: stream.peek(0).cloned(),
            value: stream.value(),
            position: stream.position(),
            stream: stream.name().to_owned(),
        }
    }
}

/// The token-agnostic part of an [ErrorContext], carried by [ParseError::Syntax].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub parser: String,
    pub token: String,
    pub position: String,
    pub stream: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parser exception in token {}. At parser: {}, pos: {}. Stream: {}",
            self.token, self.parser, self.position, self.stream
        )
    }
}

impl<T> From<ErrorContext<T>> for Diagnostic {
    fn from(ctx: ErrorContext<T>) -> Self {
        Self {
            parser: ctx.parser,
            token: ctx.value,
            position: ctx.position,
            stream: ctx.stream,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A node failed to match, and the failure was raised by its handler.
    #[error("{0}")]
    Syntax(Box<Diagnostic>),

    #[error("recursion deeper than {limit} entering {parser}, pos: {position}")]
    DepthExceeded {
        limit: usize,
        parser: String,
        position: String,
    },

    #[error("step limit of {limit} exhausted, pos: {position}")]
    StepsExhausted { limit: u64, position: String },

    /// A [recursive](crate::behavioral::recursive) rule was used after it was dropped.
    #[error("recursive rule {parser} used after its definition was dropped")]
    Detached { parser: String },
}

impl ParseError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseError::Syntax(d) => Some(d),
            _ => None,
        }
    }

    /// The printable offending token of a syntax error.
    pub fn token(&self) -> Option<&str> {
        self.diagnostic().map(|d| d.token.as_str())
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, ParseError::Syntax(_))
    }
}

impl<T> From<ErrorContext<T>> for ParseError {
    fn from(ctx: ErrorContext<T>) -> Self {
        ParseError::Syntax(Box::new(ctx.into()))
    }
}

/// Errors from constructing grammar nodes.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors from opening stream back-ends.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("could not open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not memory-map {}", .path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A read failed mid-stream. The stream ends at the point of failure.
    #[error("read failed in {name} at {position}")]
    Io {
        name: String,
        position: String,
        #[source]
        source: io::Error,
    },
}
