//! PTY error types

use std::io;

/// Error type for PTY operations
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// Failed to create PTY pair
    #[error("Failed to open PTY: {0}")]
    OpenFailed(#[source] io::Error),

    /// Failed to spawn shell
    #[error("Failed to spawn shell '{shell}': {source}")]
    SpawnFailed {
        shell: String,
        #[source]
        source: io::Error,
    },

    /// PTY I/O error
    #[error("PTY I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl From<nix::errno::Errno> for PtyError {
    fn from(err: nix::errno::Errno) -> Self {
        PtyError::OpenFailed(err.into())
    }
}
