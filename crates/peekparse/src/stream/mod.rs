//! Cursors over token sources.
//! - [Stream] is the interface every parser runs against.
//! - [TextSource] gives character streams access to their remaining input, for pattern matching.
//!
//! Only [Stream::get] and [Stream::seek] (and [Stream::reset] for backtracking) move the cursor.
//! Lookahead through [Stream::peek] may fill internal buffers, but is never observable in the
//! position.

use std::borrow::Cow;

mod container;
mod mmap;
mod reader;
mod text;

pub use container::ContainerStream;
pub use mmap::MmapStream;
pub use reader::{FileStream, ReaderMark, ReaderStream};
pub use text::StrStream;

/// The printable value of a stream at the end of its input.
pub const EOF: &str = "EOF";

pub trait Stream {
    type Token: Clone + 'static;

    /// A saved cursor position, see [Stream::mark].
    type Mark: Clone;

    /// Read the current token and advance past it.
    fn get(&mut self) -> Option<Self::Token>;

    /// Read the token `k` ahead of the cursor, without advancing.
    fn peek(&mut self, k: usize) -> Option<&Self::Token>;

    /// Advance past up to `n` tokens without reading them.
    fn seek(&mut self, n: usize);

    /// Is there no token `k` ahead of the cursor?
    fn eof(&mut self, k: usize) -> bool {
        self.peek(k).is_none()
    }

    /// The printable current token, [EOF] at the end of input.
    fn value(&mut self) -> String;

    /// The printable current position.
    fn position(&self) -> String;

    fn name(&self) -> &str;

    /// The number of tokens consumed so far.
    fn offset(&self) -> usize;

    /// Save the current position. Data from the mark onwards stays available until it is
    /// [released](Stream::release).
    fn mark(&mut self) -> Self::Mark;

    /// Return the cursor to a previously saved position.
    fn reset(&mut self, mark: &Self::Mark);

    /// Give up a saved position.
    fn release(&mut self, _mark: Self::Mark) {}
}

/// Character streams that can expose their remaining input as text.
pub trait TextSource: Stream<Token = char> {
    /// Whether the whole input is held in memory, so [rest](TextSource::rest) is cheap
    /// however much of it is asked for.
    const IN_MEMORY: bool = false;

    /// The remaining input from the cursor, at most `limit` characters if given.
    fn rest(&mut self, limit: Option<usize>) -> Cow<'_, str>;
}

impl<S: Stream + ?Sized> Stream for &mut S {
    type Token = S::Token;
    type Mark = S::Mark;

    fn get(&mut self) -> Option<Self::Token> {
        (**self).get()
    }

    fn peek(&mut self, k: usize) -> Option<&Self::Token> {
        (**self).peek(k)
    }

    fn seek(&mut self, n: usize) {
        (**self).seek(n)
    }

    fn eof(&mut self, k: usize) -> bool {
        (**self).eof(k)
    }

    fn value(&mut self) -> String {
        (**self).value()
    }

    fn position(&self) -> String {
        (**self).position()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn offset(&self) -> usize {
        (**self).offset()
    }

    fn mark(&mut self) -> Self::Mark {
        (**self).mark()
    }

    fn reset(&mut self, mark: &Self::Mark) {
        (**self).reset(mark)
    }

    fn release(&mut self, mark: Self::Mark) {
        (**self).release(mark)
    }
}

/// A line and column position, both counted from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl Default for LineCol {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl LineCol {
    pub(crate) fn advance(&mut self, newline: bool) {
        if newline {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<S: Stream>(mut stream: S) -> Vec<S::Token> {
        std::iter::from_fn(|| stream.get()).collect()
    }

    #[test]
    fn forwarding_through_references() {
        let mut inner = StrStream::new("abc");
        let mut outer = &mut inner;
        assert_eq!(Stream::peek(&mut outer, 1), Some(&'b'));
        Stream::seek(&mut outer, 1);
        assert_eq!(drain(&mut inner), vec!['b', 'c']);
        assert!(inner.eof(0));
    }

    #[test]
    fn line_column_tracking() {
        let mut lc = LineCol::default();
        for c in "ab\nc".chars() {
            lc.advance(c == '\n');
        }
        assert_eq!(lc.to_string(), "line: 2, column: 2");
    }
}
