//! Buffered copy between one source and one destination.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};

use super::buffer::{Direction, StreamBuffer};
use super::error::RelayError;
use super::framer::{SequenceFramer, Token, TokenKind};
use crate::transcript::{TranscriptError, TranscriptLogger};

const ESC: u8 = 0x1b;

/// Result of a single [`Relay::pump`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// `n` bytes were read and delivered.
    Progress(usize),
    /// The read was interrupted or would block; try again on the next wakeup.
    Idle,
    /// The source reached end of stream (or the PTY peer went away).
    PeerClosed,
}

/// Both stream buffers, the framer and the optional transcript.
///
/// Forwarding never waits for the framer: every byte read is written to the
/// destination within the same pump. The framer only decides when bytes are
/// logged and compacted away.
pub struct Relay<L: Write = BufWriter<File>> {
    from_user: StreamBuffer,
    from_child: StreamBuffer,
    framer: SequenceFramer,
    transcript: Option<TranscriptLogger<L>>,
}

impl<L: Write> Relay<L> {
    pub fn new(capacity: usize, transcript: Option<TranscriptLogger<L>>) -> Self {
        Self {
            from_user: StreamBuffer::with_capacity(capacity),
            from_child: StreamBuffer::with_capacity(capacity),
            framer: SequenceFramer::new(),
            transcript,
        }
    }

    pub fn buffer(&self, direction: Direction) -> &StreamBuffer {
        match direction {
            Direction::FromUser => &self.from_user,
            Direction::FromChild => &self.from_child,
        }
    }

    pub fn is_logging(&self) -> bool {
        self.transcript.is_some()
    }

    pub fn transcript(&self) -> Option<&TranscriptLogger<L>> {
        self.transcript.as_ref()
    }

    /// Read once from `src`, deliver everything read to `dst`, then frame
    /// and log whatever is complete.
    pub fn pump<R, W>(
        &mut self,
        direction: Direction,
        src: &mut R,
        dst: &mut W,
    ) -> Result<PumpOutcome, RelayError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let Relay {
            from_user,
            from_child,
            framer,
            transcript,
        } = self;
        let buf = match direction {
            Direction::FromUser => from_user,
            Direction::FromChild => from_child,
        };

        buf.compact();
        debug_assert!(!buf.is_full(), "{direction:?} buffer full before read");
        let n = match buf.fill_from(src) {
            Ok(0) => return Ok(PumpOutcome::PeerClosed),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                return Ok(PumpOutcome::Idle)
            }
            Err(e) if direction == Direction::FromChild && is_pty_hangup(&e) => {
                return Ok(PumpOutcome::PeerClosed)
            }
            Err(e) => return Err(RelayError::io(read_context(direction), e)),
        };

        match dst.write_all(buf.undelivered()).and_then(|()| dst.flush()) {
            Ok(()) => buf.mark_forwarded(),
            Err(e) if direction == Direction::FromUser && is_pty_hangup(&e) => {
                return Ok(PumpOutcome::PeerClosed)
            }
            Err(e) => return Err(RelayError::io(write_context(direction), e)),
        }

        let failed = match transcript.as_mut() {
            Some(logger) => log_pending(buf, framer, logger, direction).err(),
            None => None,
        };
        if let Some(e) = failed {
            log::warn!("transcript write failed, recording stopped: {}", e);
            *transcript = None;
        }
        if transcript.is_none() {
            let handled = buf.pending().len();
            buf.advance(handled);
        }

        buf.compact();
        Ok(PumpOutcome::Progress(n))
    }

    /// Log whatever is still pending in either direction and flush the
    /// transcript. Called once when the relay stops.
    pub fn finish(&mut self) -> Result<(), RelayError> {
        let Some(logger) = self.transcript.as_mut() else {
            return Ok(());
        };
        for (direction, buf) in [
            (Direction::FromUser, &mut self.from_user),
            (Direction::FromChild, &mut self.from_child),
        ] {
            if !buf.pending().is_empty() {
                force_close(buf, &self.framer, Some(&mut *logger), direction)?;
            }
            buf.clear();
        }
        logger.flush()?;
        Ok(())
    }
}

/// Log every complete token in `buf` and move its cursor past them,
/// force-closing a sequence that has filled the buffer on its own.
fn log_pending<L: Write>(
    buf: &mut StreamBuffer,
    framer: &SequenceFramer,
    logger: &mut TranscriptLogger<L>,
    direction: Direction,
) -> Result<(), TranscriptError> {
    let handled = log_complete(buf.pending(), framer, logger, direction)?;
    buf.advance(handled);
    if handled == 0 && buf.is_full() {
        log::warn!(
            "{:?}: escape sequence exceeded buffer capacity ({} bytes), closing it",
            direction,
            buf.capacity()
        );
        force_close(buf, framer, Some(logger), direction)?;
    }
    Ok(())
}

/// Record every complete token at the front of `pending`; returns the
/// number of bytes they cover.
fn log_complete<L: Write>(
    pending: &[u8],
    framer: &SequenceFramer,
    logger: &mut TranscriptLogger<L>,
    direction: Direction,
) -> Result<usize, TranscriptError> {
    let (tokens, tail) = framer.frame(pending);
    let mut handled = 0;
    for token in &tokens {
        logger.record(direction, token)?;
        handled += token.len();
    }

    // Plain text has no terminator, so a trailing run is as complete as it
    // will get for this read. Escape sequences wait for more input, except
    // a lone ESC from the user, which is the Escape key.
    let rest = &pending[handled..];
    let kind = match tail {
        Some(TokenKind::PlainText) => Some(TokenKind::PlainText),
        Some(TokenKind::UnknownEscape) if direction == Direction::FromUser && rest == [ESC] => {
            Some(TokenKind::Escape)
        }
        _ => None,
    };
    if let Some(kind) = kind {
        let run = Token {
            kind,
            raw: rest,
            complete: true,
        };
        logger.record(direction, &run)?;
        handled = pending.len();
    }
    Ok(handled)
}

fn force_close<L: Write>(
    buf: &mut StreamBuffer,
    framer: &SequenceFramer,
    logger: Option<&mut TranscriptLogger<L>>,
    direction: Direction,
) -> Result<(), TranscriptError> {
    let handled = buf.pending().len();
    if let Some(logger) = logger {
        logger.record(direction, &framer.force_close(buf.pending()))?;
    }
    buf.advance(handled);
    Ok(())
}

/// Linux reports EIO on the master once the slave side is closed.
fn is_pty_hangup(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EIO)
}

fn read_context(direction: Direction) -> &'static str {
    match direction {
        Direction::FromUser => "read from terminal input failed",
        Direction::FromChild => "read from pty master failed",
    }
}

fn write_context(direction: Direction) -> &'static str {
    match direction {
        Direction::FromUser => "write to pty master failed",
        Direction::FromChild => "write to terminal output failed",
    }
}
