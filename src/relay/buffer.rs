//! Fixed-capacity per-direction byte buffer.

use std::io::{self, Read};

/// Default capacity of a [`StreamBuffer`] in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Which way bytes are flowing through the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Keystrokes from the real terminal, headed for the child.
    FromUser,
    /// Output from the child, headed for the real terminal.
    FromChild,
}

impl Direction {
    /// Marker written in front of every transcript record.
    pub fn marker(self) -> &'static str {
        match self {
            Direction::FromUser => ">>>>>>",
            Direction::FromChild => "<<<<<<",
        }
    }
}

/// Byte buffer with a framing cursor and a delivery mark.
///
/// Layout of the held bytes:
///
/// ```text
/// 0        cursor      forwarded      count        capacity
/// |handled |  classifying |  undelivered |   free     |
/// ```
///
/// `[0, cursor)` has been classified and logged and is dropped on the next
/// [`compact`](Self::compact). `[cursor, forwarded)` has been delivered and is
/// still waiting for the framer, possibly because it ends in an unterminated
/// escape sequence. `[forwarded, count)` has not been written downstream yet.
#[derive(Debug)]
pub struct StreamBuffer {
    bytes: Box<[u8]>,
    count: usize,
    cursor: usize,
    forwarded: usize,
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl StreamBuffer {
    /// Allocate a buffer holding at most `capacity` bytes. The storage is
    /// never reallocated afterwards.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            count: 0,
            cursor: 0,
            forwarded: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Free space left for the next read.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.count
    }

    /// Delivered bytes still waiting to be classified.
    pub fn pending(&self) -> &[u8] {
        &self.bytes[self.cursor..self.forwarded]
    }

    /// Bytes read but not yet delivered downstream.
    pub fn undelivered(&self) -> &[u8] {
        &self.bytes[self.forwarded..self.count]
    }

    /// Read once from `src` into the free tail of the buffer.
    ///
    /// Returns the number of bytes read; `Ok(0)` with free space left means
    /// end of stream. Callers compact first so a full buffer only happens
    /// when a single pending token fills it.
    pub fn fill_from<R: Read + ?Sized>(&mut self, src: &mut R) -> io::Result<usize> {
        let n = src.read(&mut self.bytes[self.count..])?;
        self.count += n;
        Ok(n)
    }

    /// Append bytes directly. Returns how many fit.
    pub fn extend(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.remaining());
        self.bytes[self.count..self.count + n].copy_from_slice(&data[..n]);
        self.count += n;
        n
    }

    /// Record that everything held has been written downstream.
    pub fn mark_forwarded(&mut self) {
        self.forwarded = self.count;
    }

    /// Move the framing cursor forward by `n` handled bytes.
    ///
    /// # Panics
    /// If the cursor would pass the delivery mark: a region may only be
    /// declared handled after it has been forwarded.
    pub fn advance(&mut self, n: usize) {
        assert!(
            self.cursor + n <= self.forwarded,
            "cursor {} + {} passes forwarded mark {}",
            self.cursor,
            n,
            self.forwarded
        );
        self.cursor += n;
    }

    /// Drop everything held, delivered or not.
    pub fn clear(&mut self) {
        self.count = 0;
        self.cursor = 0;
        self.forwarded = 0;
    }

    /// Shift the unhandled bytes to the front of the buffer.
    pub fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.bytes.copy_within(self.cursor..self.count, 0);
        self.count -= self.cursor;
        self.forwarded -= self.cursor;
        self.cursor = 0;
    }
}
