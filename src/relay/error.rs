//! Relay error types

use std::io;
use std::panic::Location;

use crate::transcript::TranscriptError;

/// Fatal relay errors. End of stream is not an error; see
/// [`PumpOutcome::PeerClosed`](super::PumpOutcome::PeerClosed).
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A read, write or wait syscall failed.
    #[error("{location}: {context}: {source}")]
    Io {
        context: &'static str,
        location: &'static Location<'static>,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

impl RelayError {
    /// Wrap `source`, recording the caller's file and line.
    #[track_caller]
    pub fn io(context: &'static str, source: io::Error) -> Self {
        RelayError::Io {
            context,
            location: Location::caller(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_call_site() {
        let err = RelayError::io("write to terminal failed", io::ErrorKind::WriteZero.into());
        let msg = err.to_string();
        assert!(msg.contains("src/relay/error.rs"), "{msg}");
        assert!(msg.contains("write to terminal failed"), "{msg}");
    }
}
