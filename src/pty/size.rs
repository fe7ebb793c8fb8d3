//! Terminal window size

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

/// Terminal size configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    pub rows: u16,
    pub cols: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl Default for PtySize {
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl PtySize {
    /// Query the window size of the terminal behind `fd` (TIOCGWINSZ).
    pub fn of(fd: BorrowedFd<'_>) -> io::Result<Self> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        // SAFETY: TIOCGWINSZ fills in the winsize struct we pass.
        if unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCGWINSZ, &mut ws) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ws.into())
    }

    /// Set the window size of the terminal behind `fd` (TIOCSWINSZ). The
    /// kernel signals the terminal's foreground process group if it changed.
    pub fn apply(&self, fd: BorrowedFd<'_>) -> io::Result<()> {
        let ws = libc::winsize::from(*self);
        // SAFETY: TIOCSWINSZ only reads the winsize struct.
        if unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCSWINSZ, &ws) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl From<PtySize> for libc::winsize {
    fn from(size: PtySize) -> Self {
        libc::winsize {
            ws_row: size.rows,
            ws_col: size.cols,
            ws_xpixel: size.pixel_width,
            ws_ypixel: size.pixel_height,
        }
    }
}

impl From<libc::winsize> for PtySize {
    fn from(ws: libc::winsize) -> Self {
        Self {
            rows: ws.ws_row,
            cols: ws.ws_col,
            pixel_width: ws.ws_xpixel,
            pixel_height: ws.ws_ypixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn test_pty_size_default() {
        let size = PtySize::default();
        assert_eq!(size.rows, 24);
        assert_eq!(size.cols, 80);
    }

    #[test]
    fn test_apply_then_query_round_trips_on_pty() {
        let pair = nix::pty::openpty(None, None).expect("openpty");
        let size = PtySize {
            rows: 40,
            cols: 132,
            pixel_width: 0,
            pixel_height: 0,
        };
        size.apply(pair.master.as_fd()).unwrap();
        assert_eq!(PtySize::of(pair.slave.as_fd()).unwrap(), size);
    }

    #[test]
    fn test_query_on_non_terminal_fails() {
        let file = tempfile::tempfile().unwrap();
        assert!(PtySize::of(file.as_fd()).is_err());
    }
}
