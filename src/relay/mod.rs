//! Byte relay between the user's terminal and the child PTY.
//!
//! Each direction has its own [`StreamBuffer`]. Bytes are forwarded as soon
//! as they are read; the [`SequenceFramer`] only decides how the transcript
//! groups them into plain text and escape sequences.

mod buffer;
mod error;
mod event_loop;
mod framer;
mod pump;
mod resize;
mod signals;

pub use buffer::{Direction, StreamBuffer, DEFAULT_CAPACITY};
pub use error::RelayError;
pub use event_loop::{EventLoop, ExitReason};
pub use framer::{Scan, SequenceFramer, Token, TokenKind};
pub use pump::{PumpOutcome, Relay};
pub use resize::forward_resize;
pub use signals::{SignalEvents, TERMINATION_SIGNALS};
