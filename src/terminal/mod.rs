//! Terminal management - raw mode on the real controlling terminal.

mod raw_mode;

pub use raw_mode::{make_raw, RawModeGuard};
