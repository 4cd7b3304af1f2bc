//! Primitives for character streams.
//!
//! Single characters matched here have the [Text] shape, so repeating them collects a [String]
//! rather than a `Vec<char>`.
//!
//! ```
//! use peekparse::{prelude::*, text::{ch_if, literal, regex}};
//!
//! let ident = ch_if(char::is_ascii_alphabetic).more();
//! let number = regex(r"[0-9]+(\.[0-9]+)?").unwrap();
//! let assign = literal("let ").then(ident).then(check('=')).then(number);
//!
//! assert_eq!(
//!     assign.parse(&mut StrStream::new("let pi=3.14")),
//!     Ok(Some((String::from("pi"), String::from("3.14"))))
//! );
//! ```

use std::fmt::{Error, Formatter};

use crate::{
    algebra::{Text, Value},
    context::Context,
    error::BuildError,
    primitive::{seq_check, seq_value, Is, Satisfies, SeqCheck, SeqWith, Single, Until},
    recovery::fail,
    stream::TextSource,
    Meta, Node, ParseResult, Parser, Peek,
};

/// Consume the character `c`, yielding it.
pub fn ch(c: char) -> Single<char, Is<char>, fn(char) -> char, Text> {
    Single::build(Is(c), std::convert::identity as fn(char) -> char)
}

pub fn ch_if<F: Fn(&char) -> bool>(pred: F) -> Single<char, Satisfies<F>, fn(char) -> char, Text> {
    Single::build(Satisfies(pred), std::convert::identity as fn(char) -> char)
}

/// Collect characters up to (excluding) `c` into a [String].
pub fn until_ch(c: char) -> Until<char, Is<char>, Text> {
    Until::build(Is(c))
}

pub fn until_ch_if<F: Fn(&char) -> bool>(pred: F) -> Until<char, Satisfies<F>, Text> {
    Until::build(Satisfies(pred))
}

/// Consume exactly `text`, yielding unit.
pub fn literal(text: &str) -> SeqCheck<char> {
    seq_check(text.chars())
}

/// Consume exactly `text`, yielding it.
pub fn tag(text: &'static str) -> SeqWith<char, impl Fn(&[char]) -> &'static str + Clone> {
    seq_value(text.chars(), move |_: &[char]| text)
}

/// Match a regular expression anchored at the cursor, yielding the matched text.
///
/// Lookahead only sees the next `WINDOW` characters, and matches the lookahead pattern (by
/// default the pattern itself) against them. Patterns whose matches cannot be recognised from
/// such a prefix need a wider window or a dedicated [lookahead](Regex::lookahead) pattern.
///
/// In-memory sources are matched as a whole. Other sources are matched over a window that
/// doubles until the match ends inside it or the input runs out, so only as much input is read
/// as the match needs.
#[derive(Clone, Debug)]
pub struct Regex<const WINDOW: usize = 1> {
    pattern: String,
    full: regex::Regex,
    ahead: regex::Regex,
    meta: Meta,
}

fn anchored(pattern: &str) -> Result<regex::Regex, BuildError> {
    regex::Regex::new(&format!("^(?:{pattern})")).map_err(|source| BuildError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })
}

pub fn regex(pattern: &str) -> Result<Regex<1>, BuildError> {
    regex_window::<1>(pattern)
}

pub fn regex_window<const WINDOW: usize>(pattern: &str) -> Result<Regex<WINDOW>, BuildError> {
    let full = anchored(pattern)?;
    Ok(Regex {
        pattern: pattern.to_owned(),
        ahead: full.clone(),
        full,
        meta: Meta::default(),
    })
}

impl<const WINDOW: usize> Regex<WINDOW> {
    /// Decide lookahead with a different pattern over the window.
    pub fn lookahead(mut self, pattern: &str) -> Result<Self, BuildError> {
        self.ahead = anchored(pattern)?;
        Ok(self)
    }
}

/// Characters first matched against for sources not held in memory.
const SCAN: usize = 256;

impl<const WINDOW: usize> Regex<WINDOW> {
    fn find_in<S: TextSource>(&self, stream: &mut S) -> Option<String> {
        if S::IN_MEMORY {
            return self.full.find(&stream.rest(None)).map(|m| m.as_str().to_owned());
        }
        let mut window = SCAN;
        loop {
            let complete = stream.eof(window);
            let rest = stream.rest(Some(window));
            match self.full.find(&rest) {
                Some(m) if complete || m.end() < rest.len() => return Some(m.as_str().to_owned()),
                None if complete => return None,
                _ => window = window.saturating_mul(2),
            }
        }
    }
}

impl<const WINDOW: usize> Node for Regex<WINDOW> {
    type Token = char;
    type Out = String;
    type Shape = Value;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn repr(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "/{}/", self.pattern)
    }
}

impl<const WINDOW: usize, S: TextSource> Peek<S> for Regex<WINDOW> {
    fn peek(&self, stream: &mut S) -> bool {
        !stream.eof(0) && self.ahead.is_match(&stream.rest(Some(WINDOW)))
    }
}

impl<const WINDOW: usize, S: TextSource, G, L> Parser<S, G, L> for Regex<WINDOW> {
    fn parse_with(&self, cx: &mut Context<'_, S, G, L>) -> ParseResult<String> {
        match self.find_in(cx.stream) {
            Some(text) => {
                cx.stream.seek(text.chars().count());
                Ok(Some(text))
            }
            None => fail(self, cx),
        }
    }
}
