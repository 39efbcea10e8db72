//! Pattern buffer with tail-search prompt detection.
//!
//! Only the last N bytes of the accumulated output are searched for prompt
//! patterns, so a long `show running-config` does not make every read
//! rescan the whole output.

use bytes::BytesMut;
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Shell output read so far, with ANSI escape sequences removed.
pub struct PatternBuffer {
    buffer: BytesMut,

    /// Trailing bytes searched for a prompt.
    search_depth: usize,

    /// Kept across chunks so an escape sequence split between two reads
    /// is still recognised.
    parser: Parser,
}

/// Collects printable output while `vte` swallows escape sequences.
struct Printable<'a>(&'a mut BytesMut);

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.extend_from_slice(&[byte]);
        }
    }
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Append a chunk read from the channel, minus escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        self.parser.advance(&mut Printable(&mut self.buffer), data);
    }

    /// The last `search_depth` bytes.
    pub fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    /// Hand out everything buffered and start empty.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(super::DEFAULT_SEARCH_DEPTH)
    }
}
