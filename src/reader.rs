//! Pull-style byte sources feeding the parser.

use std::io::{self, Read};

/// A single-byte pull source.
///
/// The parser maintains its own one-byte lookahead on top of this and treats
/// the first `None` — end of input or a read failure alike — as the end of
/// the stream.
pub trait ByteReader {
    /// The next byte, or `None` at end of input.
    fn next_byte(&mut self) -> Option<u8>;
}

impl<R: ByteReader + ?Sized> ByteReader for &mut R {
    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        (**self).next_byte()
    }
}

/// Reads from an in-memory byte slice.
#[derive(Debug, Clone)]
pub struct SliceReader<'s> {
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> SliceReader<'s> {
    pub fn new(bytes: &'s [u8]) -> Self {
        SliceReader { bytes, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl<'s> From<&'s [u8]> for SliceReader<'s> {
    fn from(bytes: &'s [u8]) -> Self {
        SliceReader::new(bytes)
    }
}

impl<'s> From<&'s str> for SliceReader<'s> {
    fn from(text: &'s str) -> Self {
        SliceReader::new(text.as_bytes())
    }
}

impl ByteReader for SliceReader<'_> {
    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }
}

const IO_BUF_LEN: usize = 4096;

/// Adapts any [`io::Read`] into a [`ByteReader`], buffering internally.
///
/// An I/O error ends the stream, matching the reader contract: the parser
/// has no error channel for its byte source.
pub struct IoReader<R> {
    inner: R,
    buf: [u8; IO_BUF_LEN],
    pos: usize,
    filled: usize,
    done: bool,
}

impl<R: Read> IoReader<R> {
    pub fn new(inner: R) -> Self {
        IoReader {
            inner,
            buf: [0; IO_BUF_LEN],
            pos: 0,
            filled: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> bool {
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return false;
                }
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return true;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => {
                    self.done = true;
                    return false;
                }
            }
        }
    }
}

impl<R: Read> ByteReader for IoReader<R> {
    fn next_byte(&mut self) -> Option<u8> {
        if self.pos == self.filled {
            if self.done || !self.refill() {
                return None;
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Some(byte)
    }
}
