use std::borrow::Cow;

use super::{Stream, TextSource, EOF};

/// An in-memory stream of characters.
#[derive(Clone, Debug)]
pub struct StrStream {
    text: String,
    chars: Vec<char>,
    // INV: `bytes[i]` is the byte offset of `chars[i]` in `text`, with `text.len()` last
    bytes: Vec<usize>,
    pos: usize,
    name: Cow<'static, str>,
}

impl StrStream {
    pub fn new(input: &str) -> Self {
        Self::named(input, "<string>")
    }

    pub fn named(input: &str, name: impl Into<Cow<'static, str>>) -> Self {
        let (bytes, chars) = input.char_indices().unzip();
        let mut stream = Self {
            text: input.to_owned(),
            chars,
            bytes,
            pos: 0,
            name: name.into(),
        };
        stream.bytes.push(input.len());
        stream
    }

    /// The input not yet consumed.
    pub fn remaining(&self) -> &str {
        &self.text[self.bytes[self.pos]..]
    }
}

impl From<&str> for StrStream {
    fn from(input: &str) -> Self {
        Self::new(input)
    }
}

impl Stream for StrStream {
    type Token = char;
    type Mark = usize;

    fn get(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn peek(&mut self, k: usize) -> Option<&char> {
        self.chars.get(self.pos + k)
    }

    fn seek(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.chars.len());
    }

    fn value(&mut self) -> String {
        self.chars
            .get(self.pos)
            .map_or_else(|| EOF.to_owned(), char::to_string)
    }

    fn position(&self) -> String {
        format!("index: {}", self.pos)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn mark(&mut self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: &usize) {
        self.pos = *mark;
    }
}

impl TextSource for StrStream {
    const IN_MEMORY: bool = true;

    fn rest(&mut self, limit: Option<usize>) -> Cow<'_, str> {
        let end = limit.map_or(self.chars.len(), |l| (self.pos + l).min(self.chars.len()));
        Cow::Borrowed(&self.text[self.bytes[self.pos]..self.bytes[end]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_movement() {
        let mut s = StrStream::new("héllo");
        assert_eq!(s.get(), Some('h'));
        assert_eq!(s.peek(0), Some(&'é'));
        assert_eq!(s.peek(3), Some(&'o'));
        assert_eq!(s.peek(4), None);
        s.seek(10);
        assert!(s.eof(0));
        assert_eq!(s.value(), "EOF");
        assert_eq!(s.position(), "index: 5");
    }

    #[test]
    fn rest_is_windowed() {
        let mut s = StrStream::named("abcdef", "input");
        s.seek(2);
        assert_eq!(s.rest(Some(2)), "cd");
        assert_eq!(s.rest(Some(100)), "cdef");
        assert_eq!(s.rest(None), "cdef");
        assert_eq!(s.name(), "input");
    }

    #[test]
    fn rest_borrows_the_input() {
        let mut s = StrStream::new("añb€c");
        s.seek(1);
        assert!(matches!(s.rest(Some(3)), Cow::Borrowed("ñb€")));
        assert!(matches!(s.rest(None), Cow::Borrowed("ñb€c")));
        s.seek(10);
        assert_eq!(s.rest(None), "");
        assert_eq!(s.remaining(), "");
    }

    #[test]
    fn marks_restore_position() {
        let mut s = StrStream::new("xyz");
        let m = s.mark();
        s.seek(2);
        s.reset(&m);
        assert_eq!(s.offset(), 0);
        assert_eq!(s.remaining(), "xyz");
    }
}
