//! PTY host module - spawns the user's shell on a pseudo-terminal
//!
//! # Structure
//!
//! - [`error`] - Error types for PTY operations
//! - [`size`] - Window size handling
//! - [`host`] - PTY channel implementation
//! - [`shell`] - Shell selection utilities

mod error;
mod host;
mod shell;
mod size;

pub use error::PtyError;
pub use host::PtyChannel;
pub use shell::select_shell;
pub use size::PtySize;
