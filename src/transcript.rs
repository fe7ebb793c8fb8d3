//! Session transcript writer.
//!
//! Every framed token is appended as a header line naming its direction and
//! kind, then the token's raw bytes:
//!
//! ```text
//! >>>>>> plain
//! ls
//!
//! <<<<<< csi
//! \x1b[2J
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::relay::{Direction, Token};

/// Default number of bytes logged for a force-closed sequence.
pub const DEFAULT_MAX_ESCAPE_BYTES: usize = 10;

/// Errors raised while opening or writing a transcript.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("failed to open transcript '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write transcript: {0}")]
    Write(#[from] io::Error),
}

/// Appends `(direction, token)` records to a byte sink.
pub struct TranscriptLogger<W: Write = BufWriter<File>> {
    sink: W,
    max_escape_bytes: usize,
    records: u64,
}

impl TranscriptLogger<BufWriter<File>> {
    /// Create (or truncate) the transcript file at `path`.
    pub fn create(path: &Path, max_escape_bytes: usize) -> Result<Self, TranscriptError> {
        let file = File::create(path).map_err(|source| TranscriptError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Recording transcript to {}", path.display());
        Ok(Self::new(BufWriter::new(file), max_escape_bytes))
    }
}

impl<W: Write> TranscriptLogger<W> {
    pub fn new(sink: W, max_escape_bytes: usize) -> Self {
        Self {
            sink,
            max_escape_bytes: max_escape_bytes.max(1),
            records: 0,
        }
    }

    /// Append one token. Force-closed tokens are cut to `max_escape_bytes`.
    pub fn record(&mut self, direction: Direction, token: &Token<'_>) -> Result<(), TranscriptError> {
        if token.complete {
            writeln!(self.sink, "{} {}", direction.marker(), token.kind)?;
            self.sink.write_all(token.raw)?;
        } else {
            let shown = token.len().min(self.max_escape_bytes);
            writeln!(
                self.sink,
                "{} {} (truncated, {} bytes)",
                direction.marker(),
                token.kind,
                token.len()
            )?;
            self.sink.write_all(&token.raw[..shown])?;
        }
        self.sink.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<(), TranscriptError> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }
}
