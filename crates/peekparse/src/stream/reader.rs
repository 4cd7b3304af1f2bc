use std::{
    borrow::Cow,
    collections::{BTreeMap, VecDeque},
    fs::File,
    io::{ErrorKind, Read},
    path::Path,
};

use super::{LineCol, Stream, TextSource, EOF};
use crate::error::StreamError;

/// Bytes requested from the reader at a time, also the number of consumed characters kept
/// before the buffer is compacted.
const CHUNK: usize = 8 * 1024;

/// A character stream decoded incrementally from any [Read] source.
///
/// Input is read in chunks as lookahead requires it. Consumed characters are dropped from the
/// buffer once no [mark](Stream::mark) pins them, so data is never read twice. Invalid UTF-8 is
/// replaced with [char::REPLACEMENT_CHARACTER].
///
/// A failing read ends the stream, the error is kept for [ReaderStream::take_error].
pub struct ReaderStream<R> {
    reader: Option<R>,
    undecoded: Vec<u8>,
    buffer: VecDeque<char>,
    /// The offset of `buffer[0]`.
    base: usize,
    pos: usize,
    at: LineCol,
    // INV: every key is >= base
    pins: BTreeMap<usize, usize>,
    name: String,
    error: Option<StreamError>,
}

/// A position saved in a [ReaderStream].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderMark {
    offset: usize,
    at: LineCol,
}

/// A [ReaderStream] over a file.
pub type FileStream = ReaderStream<File>;

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StreamError::Open {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::named(file, path.display().to_string()))
    }
}

impl<R: Read> ReaderStream<R> {
    pub fn new(reader: R) -> Self {
        Self::named(reader, "<reader>")
    }

    pub fn named(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader: Some(reader),
            undecoded: Vec::new(),
            buffer: VecDeque::new(),
            base: 0,
            pos: 0,
            at: LineCol::default(),
            pins: BTreeMap::new(),
            name: name.into(),
            error: None,
        }
    }

    /// The error that ended the stream early, if any.
    pub fn take_error(&mut self) -> Option<StreamError> {
        self.error.take()
    }

    /// The number of characters currently held in memory.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Ensure the character `k` ahead of the cursor is buffered, returns false if the input ends
    /// before it.
    fn fill(&mut self, k: usize) -> bool {
        while self.base + self.buffer.len() <= self.pos + k {
            if !self.read_chunk() {
                return false;
            }
        }
        true
    }

    fn fill_all(&mut self) {
        while self.read_chunk() {}
    }

    /// Read and decode one chunk, returns false once the reader is exhausted.
    fn read_chunk(&mut self) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };
        let mut chunk = [0u8; CHUNK];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => {
                    self.reader = None;
                    // a truncated final character still counts as input
                    if self.undecoded.is_empty() {
                        return false;
                    }
                    self.undecoded.clear();
                    self.buffer.push_back(char::REPLACEMENT_CHARACTER);
                    return true;
                }
                Ok(n) => {
                    self.undecoded.extend_from_slice(&chunk[..n]);
                    self.decode();
                    return true;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    self.reader = None;
                    self.error = Some(StreamError::Io {
                        name: self.name.clone(),
                        position: self.at.to_string(),
                        source,
                    });
                    return false;
                }
            }
        }
    }

    /// Move all complete characters from `undecoded` into the buffer.
    fn decode(&mut self) {
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.undecoded[start..]) {
                Ok(valid) => {
                    self.buffer.extend(valid.chars());
                    start = self.undecoded.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&self.undecoded[start..start + valid]) {
                        self.buffer.extend(s.chars());
                    }
                    match e.error_len() {
                        Some(bad) => {
                            self.buffer.push_back(char::REPLACEMENT_CHARACTER);
                            start += valid + bad;
                        }
                        // an incomplete character at the end of the chunk
                        None => {
                            start += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.undecoded.drain(..start);
    }

    fn advance(&mut self) -> Option<char> {
        if !self.fill(0) {
            return None;
        }
        let c = self.buffer[self.pos - self.base];
        self.pos += 1;
        self.at.advance(c == '\n');
        Some(c)
    }

    fn compact(&mut self) {
        let keep = self
            .pins
            .keys()
            .next()
            .map_or(self.pos, |&pinned| pinned.min(self.pos));
        if keep - self.base >= CHUNK {
            self.buffer.drain(..keep - self.base);
            self.base = keep;
        }
    }
}

impl<R: Read> Stream for ReaderStream<R> {
    type Token = char;
    type Mark = ReaderMark;

    fn get(&mut self) -> Option<char> {
        let c = self.advance();
        self.compact();
        c
    }

    fn peek(&mut self, k: usize) -> Option<&char> {
        if self.fill(k) {
            self.buffer.get(self.pos + k - self.base)
        } else {
            None
        }
    }

    fn seek(&mut self, n: usize) {
        for _ in 0..n {
            if self.advance().is_none() {
                break;
            }
        }
        self.compact();
    }

    fn value(&mut self) -> String {
        self.peek(0).map_or_else(|| EOF.to_owned(), char::to_string)
    }

    fn position(&self) -> String {
        self.at.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn offset(&self) -> usize {
        self.pos
    }

    fn mark(&mut self) -> ReaderMark {
        *self.pins.entry(self.pos).or_default() += 1;
        ReaderMark {
            offset: self.pos,
            at: self.at,
        }
    }

    fn reset(&mut self, mark: &ReaderMark) {
        // Marks that were released (or never taken here) may point at dropped data.
        if mark.offset >= self.base {
            self.pos = mark.offset;
            self.at = mark.at;
        }
    }

    fn release(&mut self, mark: ReaderMark) {
        if let Some(count) = self.pins.get_mut(&mark.offset) {
            *count -= 1;
            if *count == 0 {
                self.pins.remove(&mark.offset);
            }
        }
        self.compact();
    }
}

impl<R: Read> TextSource for ReaderStream<R> {
    fn rest(&mut self, limit: Option<usize>) -> Cow<'_, str> {
        match limit {
            Some(l) => {
                self.fill(l.saturating_sub(1));
            }
            None => self.fill_all(),
        }
        let from = self.pos - self.base;
        let to = limit.map_or(self.buffer.len(), |l| (from + l).min(self.buffer.len()));
        Cow::Owned(self.buffer.range(from..to).collect())
    }
}
