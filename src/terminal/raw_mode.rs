//! Raw terminal mode management with panic-safe cleanup.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use nix::sys::termios::{
    tcgetattr, tcsetattr, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices, Termios,
};

/// Attributes the panic hook restores if a guard is alive when a panic
/// unwinds past it (or aborts before its drop runs).
static PANIC_RESTORE: Mutex<Option<(RawFd, Termios)>> = Mutex::new(None);

/// Guard that ensures the terminal is restored to its saved attributes on
/// drop. This handles normal exits, early returns and panics.
pub struct RawModeGuard {
    /// Duplicate of the terminal descriptor, kept open for the restore.
    fd: Option<OwnedFd>,
    /// Attributes captured on entry; `None` once restored.
    saved: Option<Termios>,
}

impl RawModeGuard {
    /// Put the terminal behind `fd` into raw mode and return a guard that
    /// restores it.
    ///
    /// If `fd` is not a terminal (piped input, CI), this is a no-op and the
    /// guard is inert.
    pub fn enter_on(fd: BorrowedFd<'_>) -> io::Result<Self> {
        let saved = match tcgetattr(fd) {
            Ok(saved) => saved,
            Err(nix::errno::Errno::ENOTTY) => {
                log::debug!("fd {} is not a terminal, raw mode skipped", fd.as_raw_fd());
                return Ok(Self {
                    fd: None,
                    saved: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let fd = fd.try_clone_to_owned()?;
        install_panic_hook();
        set_panic_restore(fd.as_raw_fd(), saved.clone());

        tcsetattr(&fd, SetArg::TCSAFLUSH, &make_raw(&saved))?;
        log::debug!("raw mode enabled on fd {}", fd.as_raw_fd());

        Ok(Self {
            fd: Some(fd),
            saved: Some(saved),
        })
    }

    /// Whether this guard still has attributes to restore.
    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// The attributes captured on entry, for handing on to a child PTY.
    pub fn saved(&self) -> Option<&Termios> {
        self.saved.as_ref()
    }

    /// Restore the saved attributes. Calling this more than once, or
    /// dropping the guard afterwards, does nothing further.
    pub fn restore(&mut self) -> io::Result<()> {
        let (Some(fd), Some(saved)) = (self.fd.as_ref(), self.saved.take()) else {
            return Ok(());
        };
        clear_panic_restore(fd.as_raw_fd());
        tcsetattr(fd, SetArg::TCSAFLUSH, &saved)?;
        log::debug!("terminal attributes restored on fd {}", fd.as_raw_fd());
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort cleanup - ignore errors during drop
        let _ = self.restore();
    }
}

/// Raw attributes derived from `saved`: no echo, no canonical line editing,
/// no signal characters, no extended input processing, no output
/// post-processing, no CR/NL translation or flow control, 8-bit clean.
pub fn make_raw(saved: &Termios) -> Termios {
    let mut raw = saved.clone();
    raw.input_flags &= !(InputFlags::BRKINT
        | InputFlags::ICRNL
        | InputFlags::INPCK
        | InputFlags::ISTRIP
        | InputFlags::IXON);
    raw.output_flags &= !OutputFlags::OPOST;
    raw.control_flags |= ControlFlags::CS8;
    raw.local_flags &= !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);
    raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    raw
}

fn set_panic_restore(fd: RawFd, saved: Termios) {
    if let Ok(mut slot) = PANIC_RESTORE.lock() {
        *slot = Some((fd, saved));
    }
}

/// Forget the panic-time restore for `fd`, leaving any newer guard's entry.
fn clear_panic_restore(fd: RawFd) {
    if let Ok(mut slot) = PANIC_RESTORE.lock() {
        if matches!(slot.as_ref(), Some((held, _)) if *held == fd) {
            *slot = None;
        }
    }
}

/// Install a panic hook that restores terminal state before panicking.
/// This ensures the terminal is usable even if the relay panics.
pub(crate) fn install_panic_hook() {
    // Only install once - check if we've already installed
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return; // Already installed
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before showing panic message
        let entry = PANIC_RESTORE.lock().ok().and_then(|mut slot| slot.take());
        if let Some((raw_fd, saved)) = entry {
            // SAFETY: the fd belongs to a live guard; guards clear this slot
            // before closing their descriptor.
            let fd = unsafe { BorrowedFd::borrow_raw(raw_fd) };
            let _ = tcsetattr(fd, SetArg::TCSAFLUSH, &saved);
        }

        // Call the original panic hook to print the panic message
        original_hook(panic_info);
    }));
}
