//! Helper macros for long sequences and choices.

/// Sequence any number of parsers: `thens!(a, b, c)` is `then(a, then(b, c))`.
#[macro_export]
macro_rules! thens {
    ($p:expr $(,)?) => {
        $p
    };
    ($p:expr , $($ts:tt)+) => {
        $crate::structural::then($p, $crate::thens!($($ts)+))
    };
}

pub use thens;

/// Predictive choice between any number of parsers: `ors!(a, b, c)` is `or(a, or(b, c))`.
#[macro_export]
macro_rules! ors {
    ($p:expr $(,)?) => {
        $p
    };
    ($p:expr , $($ts:tt)+) => {
        $crate::structural::or($p, $crate::ors!($($ts)+))
    };
}

pub use ors;
