use std::{ascii, fs::File, path::Path};

use memmap2::Mmap;

use super::{LineCol, Stream, EOF};
use crate::error::StreamError;

/// A zero-copy byte stream over a memory-mapped file.
pub struct MmapStream {
    // empty files cannot be mapped
    map: Option<Mmap>,
    pos: usize,
    at: LineCol,
    name: String,
}

impl MmapStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StreamError::Open {
            path: path.to_owned(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| StreamError::Open {
                path: path.to_owned(),
                source,
            })?
            .len();

        let map = if len == 0 {
            None
        } else {
            // SAFETY: The map is only read through shared slices. Truncating or rewriting the
            //         file while it is mapped is undefined behaviour that callers must avoid, as
            //         with any use of mmap.
            Some(unsafe { Mmap::map(&file) }.map_err(|source| StreamError::Map {
                path: path.to_owned(),
                source,
            })?)
        };

        Ok(Self {
            map,
            pos: 0,
            at: LineCol::default(),
            name: path.display().to_string(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or_default()
    }

    /// The input not yet consumed.
    pub fn remaining(&self) -> &[u8] {
        &self.bytes()[self.pos..]
    }
}

impl Stream for MmapStream {
    type Token = u8;
    type Mark = (usize, LineCol);

    fn get(&mut self) -> Option<u8> {
        let b = self.bytes().get(self.pos).copied()?;
        self.pos += 1;
        self.at.advance(b == b'\n');
        Some(b)
    }

    fn peek(&mut self, k: usize) -> Option<&u8> {
        self.map.as_deref().and_then(|bytes| bytes.get(self.pos + k))
    }

    fn seek(&mut self, n: usize) {
        for _ in 0..n {
            if self.get().is_none() {
                break;
            }
        }
    }

    fn value(&mut self) -> String {
        match self.bytes().get(self.pos) {
            Some(&b) => ascii::escape_default(b).to_string(),
            None => EOF.to_owned(),
        }
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

    fn mark(&mut self) -> Self::Mark {
        (self.pos, self.at)
    }

    fn reset(&mut self, (pos, at): &Self::Mark) {
        self.pos = *pos;
        self.at = *at;
    }
}
