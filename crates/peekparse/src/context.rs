//! The mutable state threaded through a parse.

use crate::{config::Limits, error::ParseError, stream::Stream, Node, Repr};

/// Guard counters for a single parse.
#[derive(Debug, Default, Clone)]
pub struct Budget {
    limits: Limits,
    depth: usize,
    steps: u64,
    speculative: usize,
}

impl Budget {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// The number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// Everything a [Parser](crate::Parser) has access to during a parse:
/// - The stream, exclusively borrowed for the parse.
/// - Global state `G`, one value visible to every node for the whole parse.
/// - Local state `L`, rebound by [with_state](crate::behavioral::with_state) to a fresh value
///   for the duration of a subtree.
pub struct Context<'a, S, G = (), L = ()> {
    pub stream: &'a mut S,
    pub global: &'a mut G,
    pub local: &'a mut L,
    budget: &'a mut Budget,
}

impl<'a, S, G, L> Context<'a, S, G, L> {
    pub fn new(
        stream: &'a mut S,
        global: &'a mut G,
        local: &'a mut L,
        budget: &'a mut Budget,
    ) -> Self {
        Self {
            stream,
            global,
            local,
            budget,
        }
    }

    /// The same parse, with the local state replaced by `local`.
    pub fn rescope<'b, T>(&'b mut self, local: &'b mut T) -> Context<'b, S, G, T> {
        Context {
            stream: self.stream,
            global: self.global,
            local,
            budget: self.budget,
        }
    }

    /// The same parse, reading from `stream` instead.
    pub fn restream<'b, T>(&'b mut self, stream: &'b mut T) -> Context<'b, T, G, L> {
        Context {
            stream,
            global: self.global,
            local: self.local,
            budget: self.budget,
        }
    }

    /// Are failures currently expected to be retried by a backtracking choice?
    pub fn is_speculative(&self) -> bool {
        self.budget.speculative > 0
    }

    /// Run `f` with failure reporting suppressed.
    pub fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.budget.speculative += 1;
        let res = f(self);
        self.budget.speculative -= 1;
        res
    }

    pub fn budget(&self) -> &Budget {
        self.budget
    }
}

impl<S: Stream, G, L> Context<'_, S, G, L> {
    /// Count one unit of work against the step limit.
    pub fn tick(&mut self) -> Result<(), ParseError> {
        self.budget.steps += 1;
        match self.budget.limits.max_steps {
            Some(limit) if self.budget.steps > limit => Err(ParseError::StepsExhausted {
                limit,
                position: self.stream.position(),
            }),
            _ => Ok(()),
        }
    }

    /// Run `f` one level of recursion deeper, entered through `node`.
    pub fn descend<N: Node + ?Sized, T>(
        &mut self,
        node: &N,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.budget.depth >= self.budget.limits.max_depth {
            return Err(ParseError::DepthExceeded {
                limit: self.budget.limits.max_depth,
                parser: Repr(node).to_string(),
                position: self.stream.position(),
            });
        }
        self.tick()?;
        self.budget.depth += 1;
        let res = f(self);
        self.budget.depth -= 1;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn rescoped_local_state_is_separate() {
        let mut stream = StrStream::new("");
        let (mut global, mut outer) = (1u8, String::from("outer"));
        let mut budget = Budget::default();
        let mut cx = Context::new(&mut stream, &mut global, &mut outer, &mut budget);

        let mut inner = 5usize;
        {
            let scoped = cx.rescope(&mut inner);
            *scoped.local += 1;
            *scoped.global += 1;
        }
        assert_eq!(*cx.local, "outer");
        assert_eq!(*cx.global, 2);
        assert_eq!(inner, 6);
    }

    #[test]
    fn speculation_nests() {
        let mut stream = StrStream::new("");
        let (mut global, mut local, mut budget) = ((), (), Budget::default());
        let mut cx = Context::new(&mut stream, &mut global, &mut local, &mut budget);
        assert!(!cx.is_speculative());
        cx.speculate(|cx| {
            cx.speculate(|cx| assert!(cx.is_speculative()));
            assert!(cx.is_speculative());
        });
        assert!(!cx.is_speculative());
    }

    #[test]
    fn step_and_depth_limits() {
        let mut stream = StrStream::new("");
        let (mut global, mut local) = ((), ());
        let mut budget = Budget::new(Limits::default().max_steps(1).max_depth(1));
        let mut cx = Context::new(&mut stream, &mut global, &mut local, &mut budget);
        let node = check('a').name("a");

        let nested = cx.descend(&node, |cx| cx.descend(&node, |_| Ok(())));
        assert!(matches!(nested, Err(ParseError::DepthExceeded { limit: 1, .. })));
        assert!(matches!(cx.tick(), Err(ParseError::StepsExhausted { limit: 1, .. })));
    }
}
