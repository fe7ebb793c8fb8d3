//! Window size propagation from the real terminal to the child.

use std::io;
use std::os::fd::BorrowedFd;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::pty::PtySize;

/// Copy the window size of `terminal` onto the PTY `master` and send
/// SIGWINCH to `child`.
///
/// Returns the size that was applied. The child is signalled even when the
/// size could not be copied. A failed signal delivery (the child already
/// exited) is logged and otherwise ignored.
pub fn forward_resize(
    terminal: BorrowedFd<'_>,
    master: BorrowedFd<'_>,
    child: Pid,
) -> io::Result<PtySize> {
    let applied = PtySize::of(terminal).and_then(|size| size.apply(master).map(|()| size));
    if let Ok(size) = &applied {
        log::debug!("window resized to {}x{}", size.cols, size.rows);
    }

    if let Err(e) = kill(child, Signal::SIGWINCH) {
        log::debug!("SIGWINCH to pid {} not delivered: {}", child, e);
    }
    applied
}
