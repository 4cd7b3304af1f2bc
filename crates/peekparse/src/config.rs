//! Guards against runaway grammars.
//!
//! Recursive descent cannot detect a left-recursive rule, or a rule that loops without consuming
//! input, so a parse is bounded by [Limits]:
//! - `max_depth` bounds nested entries into [lazy](crate::behavioral::lazy) and
//!   [recursive](crate::behavioral::recursive) rules, well before the native stack is exhausted.
//! - `max_steps` optionally bounds the total work (repetitions and recursive entries).

use crate::{
    context::{Budget, Context},
    ParseResult, Parser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

impl Limits {
    pub const DEFAULT_DEPTH: usize = 512;

    pub const fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_DEPTH,
            max_steps: None,
        }
    }

    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub const fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub const fn unlimited_steps(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Run `parser` over `stream` within these limits.
    pub fn run<P, S, G, L>(
        &self,
        parser: &P,
        stream: &mut S,
        global: &mut G,
        local: &mut L,
    ) -> ParseResult<P::Out>
    where
        P: Parser<S, G, L> + ?Sized,
    {
        let mut budget = Budget::new(*self);
        parser.parse_with(&mut Context::new(stream, global, local, &mut budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ParseError, prelude::*};

    #[test]
    fn step_limit_stops_long_repetitions() {
        let digits = check_if(|c: &char| c.is_ascii_digit()).many();
        let limits = Limits::new().max_steps(3);

        let res = limits.run(&digits, &mut StrStream::new("12"), &mut (), &mut ());
        assert_eq!(res, Ok(Some(())));

        let res = limits.run(&digits, &mut StrStream::new("12345"), &mut (), &mut ());
        assert!(matches!(res, Err(ParseError::StepsExhausted { limit: 3, .. })));
    }

    #[test]
    fn builders() {
        let limits = Limits::default().max_depth(8).max_steps(10).unlimited_steps();
        assert_eq!(
            limits,
            Limits {
                max_depth: 8,
                max_steps: None
            }
        );
    }
}
