//! Signal delivery for the event loop.
//!
//! Handlers only set a flag and write a byte to a self-pipe. The read end of
//! the pipe is one of the descriptors the loop polls, so a signal arriving
//! just before the wait still wakes it.

use std::io::{self, ErrorKind, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGWINCH};
use signal_hook::low_level::{self, pipe};
use signal_hook::SigId;

/// Signals that end the relay.
pub const TERMINATION_SIGNALS: [libc::c_int; 4] = [SIGTERM, SIGHUP, SIGINT, SIGQUIT];

/// Registered handlers plus the pipe they wake the loop through.
pub struct SignalEvents {
    resize: Arc<AtomicBool>,
    terminate: Arc<AtomicUsize>,
    wake: UnixStream,
    ids: Vec<SigId>,
}

impl SignalEvents {
    /// Install handlers for SIGWINCH and the termination signals.
    pub fn register() -> io::Result<Self> {
        let (wake, notify) = UnixStream::pair()?;
        wake.set_nonblocking(true)?;
        notify.set_nonblocking(true)?;

        let mut events = Self {
            resize: Arc::new(AtomicBool::new(false)),
            terminate: Arc::new(AtomicUsize::new(0)),
            wake,
            ids: Vec::new(),
        };

        events
            .ids
            .push(signal_hook::flag::register(SIGWINCH, Arc::clone(&events.resize))?);
        events.ids.push(pipe::register(SIGWINCH, notify.try_clone()?)?);

        for signal in TERMINATION_SIGNALS {
            events.ids.push(signal_hook::flag::register_usize(
                signal,
                Arc::clone(&events.terminate),
                signal as usize,
            )?);
            events.ids.push(pipe::register(signal, notify.try_clone()?)?);
        }
        log::debug!("registered {} signal handlers", events.ids.len());

        Ok(events)
    }

    /// Discard wake-up bytes queued on the pipe.
    pub fn drain(&self) {
        let mut buf = [0u8; 64];
        let mut wake = &self.wake;
        loop {
            match wake.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    /// Whether a SIGWINCH arrived since the last call.
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::SeqCst)
    }

    /// The termination signal received, if any.
    pub fn termination(&self) -> Option<i32> {
        match self.terminate.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal as i32),
        }
    }
}

impl AsFd for SignalEvents {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.wake.as_fd()
    }
}

impl Drop for SignalEvents {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            low_level::unregister(id);
        }
    }
}

/// Tests that raise signals share process-wide handlers; they take this
/// lock so one test's signal is not seen by another's `SignalEvents`.
#[cfg(test)]
pub(crate) fn serialize_signal_tests() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_sets_flag_and_wakes_pipe() {
        let _serial = serialize_signal_tests();
        let events = SignalEvents::register().unwrap();
        events.drain();
        events.take_resize();

        low_level::raise(SIGWINCH).unwrap();
        assert!(events.take_resize());
        assert!(!events.take_resize());
        assert_eq!(events.termination(), None);

        let mut buf = [0u8; 8];
        let mut wake = &events.wake;
        assert!(wake.read(&mut buf).unwrap() > 0);
        events.drain();
        assert_eq!(
            wake.read(&mut buf).unwrap_err().kind(),
            ErrorKind::WouldBlock
        );
    }
}
