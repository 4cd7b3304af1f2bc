use std::{borrow::Cow, fmt, marker::PhantomData, ops::Deref};

use super::{Stream, EOF};

/// A stream over any random-access container of tokens (a [Vec], a slice, a boxed slice...).
pub struct ContainerStream<T, C = Vec<T>> {
    tokens: C,
    pos: usize,
    name: Cow<'static, str>,
    printer: fn(&T) -> String,
    _token: PhantomData<T>,
}

fn debug_print<T: fmt::Debug>(t: &T) -> String {
    format!("{t:?}")
}

fn display_print<T: fmt::Display>(t: &T) -> String {
    t.to_string()
}

impl<T, C: Deref<Target = [T]>> ContainerStream<T, C> {
    /// Tokens are printed in diagnostics through [fmt::Debug].
    pub fn new(tokens: C) -> Self
    where
        T: fmt::Debug,
    {
        Self::with_printer(tokens, debug_print::<T>)
    }

    /// Tokens are printed in diagnostics through [fmt::Display].
    pub fn displayed(tokens: C) -> Self
    where
        T: fmt::Display,
    {
        Self::with_printer(tokens, display_print::<T>)
    }

    pub fn with_printer(tokens: C, printer: fn(&T) -> String) -> Self {
        Self {
            tokens,
            pos: 0,
            name: Cow::Borrowed("<container>"),
            printer,
            _token: PhantomData,
        }
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// The tokens not yet consumed.
    pub fn remaining(&self) -> &[T] {
        &self.tokens[self.pos..]
    }

    pub fn into_inner(self) -> C {
        self.tokens
    }
}

impl<T: Clone + 'static, C: Deref<Target = [T]>> Stream for ContainerStream<T, C> {
    type Token = T;
    type Mark = usize;

    fn get(&mut self) -> Option<T> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn peek(&mut self, k: usize) -> Option<&T> {
        self.tokens.get(self.pos + k)
    }

    fn seek(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len());
    }

    fn value(&mut self) -> String {
        self.tokens
            .get(self.pos)
            .map_or_else(|| EOF.to_owned(), self.printer)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printers() {
        let mut debug = ContainerStream::new(vec!["a", "b"]);
        assert_eq!(debug.value(), "\"a\"");

        let mut display = ContainerStream::displayed(vec!["a", "b"]).named("words");
        assert_eq!(display.value(), "a");
        display.seek(2);
        assert_eq!(display.value(), "EOF");
        assert_eq!(display.name(), "words");

        let mut custom = ContainerStream::with_printer(vec![3u8], |b| format!("0x{b:02x}"));
        assert_eq!(custom.value(), "0x03");
    }

    #[test]
    fn slices_and_boxes() {
        let data: Box<[i32]> = vec![1, 2, 3].into_boxed_slice();
        let mut s = ContainerStream::new(data);
        assert_eq!(s.get(), Some(1));
        assert_eq!(s.remaining(), &[2, 3]);
        assert_eq!(s.position(), "index: 1");

        let words: &[&str] = &["x", "y"];
        let mut borrowed = ContainerStream::new(words);
        assert_eq!(borrowed.peek(1), Some(&"y"));
    }
}
