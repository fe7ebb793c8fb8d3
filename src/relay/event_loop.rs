//! Readiness-driven relay loop between the terminal and the PTY master.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::os::fd::AsFd;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd::Pid;

use super::buffer::Direction;
use super::error::RelayError;
use super::pump::{PumpOutcome, Relay};
use super::resize::forward_resize;
use super::signals::SignalEvents;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A read returned end of stream (or EIO on the PTY master).
    PeerClosed(Direction),
    /// The descriptor reported hangup or error with nothing left to read.
    Hangup(Direction),
    /// A termination signal was received.
    Signal(i32),
}

/// Owns the relay while it runs; borrows the descriptors it polls.
pub struct EventLoop<'a, L: Write = BufWriter<File>> {
    relay: Relay<L>,
    input: &'a File,
    output: &'a File,
    master: &'a File,
    child: Pid,
    signals: Option<&'a SignalEvents>,
}

impl<'a, L: Write> EventLoop<'a, L> {
    /// # Arguments
    /// * `input` - Terminal input, the user's keystrokes
    /// * `output` - Terminal output, where child output is shown
    /// * `master` - PTY master of the child shell
    /// * `child` - Pid that receives SIGWINCH on resize
    pub fn new(relay: Relay<L>, input: &'a File, output: &'a File, master: &'a File, child: Pid) -> Self {
        Self {
            relay,
            input,
            output,
            master,
            child,
            signals: None,
        }
    }

    /// Also wake on SIGWINCH and the termination signals.
    pub fn with_signals(mut self, signals: &'a SignalEvents) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Relay until either side closes, a termination signal arrives, or an
    /// I/O error occurs. Blocks in `poll` with no timeout between wakeups.
    pub fn run(&mut self) -> Result<ExitReason, RelayError> {
        log::debug!("relay loop started");
        loop {
            let (input_ready, master_ready, signal_ready) = match self.wait()? {
                Some(ready) => ready,
                None => continue,
            };

            if let Some(signals) = self.signals {
                if signal_ready.contains(PollFlags::POLLIN) {
                    signals.drain();
                }
                if let Some(signal) = signals.termination() {
                    log::info!("received signal {}, stopping relay", signal);
                    return Ok(ExitReason::Signal(signal));
                }
                if signals.take_resize() {
                    if let Err(e) =
                        forward_resize(self.input.as_fd(), self.master.as_fd(), self.child)
                    {
                        log::debug!("resize not forwarded: {}", e);
                    }
                }
            }

            if let Some(reason) = self.service(Direction::FromChild, master_ready)? {
                return Ok(reason);
            }
            if let Some(reason) = self.service(Direction::FromUser, input_ready)? {
                return Ok(reason);
            }
        }
    }

    /// Wait for readiness. `None` means the wait was interrupted.
    fn wait(&self) -> Result<Option<(PollFlags, PollFlags, PollFlags)>, RelayError> {
        let mut fds = vec![
            PollFd::new(self.input.as_fd(), PollFlags::POLLIN),
            PollFd::new(self.master.as_fd(), PollFlags::POLLIN),
        ];
        if let Some(signals) = self.signals {
            fds.push(PollFd::new(signals.as_fd(), PollFlags::POLLIN));
        }

        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(None),
            Err(e) => return Err(RelayError::io("poll failed", io::Error::from(e))),
        }

        let revents = |i: usize| {
            fds.get(i)
                .and_then(|fd| fd.revents())
                .unwrap_or_else(PollFlags::empty)
        };
        Ok(Some((revents(0), revents(1), revents(2))))
    }

    fn service(
        &mut self,
        direction: Direction,
        ready: PollFlags,
    ) -> Result<Option<ExitReason>, RelayError> {
        let (mut src, mut dst) = match direction {
            Direction::FromUser => (self.input, self.master),
            Direction::FromChild => (self.master, self.output),
        };

        if ready.contains(PollFlags::POLLIN) {
            return match self.relay.pump(direction, &mut src, &mut dst)? {
                PumpOutcome::PeerClosed => {
                    log::info!("{:?} stream closed", direction);
                    Ok(Some(ExitReason::PeerClosed(direction)))
                }
                PumpOutcome::Progress(_) | PumpOutcome::Idle => Ok(None),
            };
        }

        if ready.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
            log::info!("{:?} descriptor hung up ({:?})", direction, ready);
            return Ok(Some(ExitReason::Hangup(direction)));
        }
        Ok(None)
    }

    pub fn relay(&self) -> &Relay<L> {
        &self.relay
    }

    /// Give the relay back, for `finish` once the loop has stopped.
    pub fn into_relay(self) -> Relay<L> {
        self.relay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::PtySize;
    use crate::relay::signals::serialize_signal_tests;
    use crate::transcript::{TranscriptLogger, DEFAULT_MAX_ESCAPE_BYTES};
    use nix::pty::openpty;
    use signal_hook::consts::{SIGTERM, SIGWINCH};
    use signal_hook::low_level::raise;
    use std::io::{Read, Seek, SeekFrom};
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    fn socket_file(stream: UnixStream) -> File {
        File::from(OwnedFd::from(stream))
    }

    fn logging_relay() -> Relay<Vec<u8>> {
        Relay::new(
            64,
            Some(TranscriptLogger::new(Vec::new(), DEFAULT_MAX_ESCAPE_BYTES)),
        )
    }

    #[test]
    fn test_child_output_reaches_terminal_then_closes() {
        let (_user, input) = UnixStream::pair().unwrap();
        let (mut child, master) = UnixStream::pair().unwrap();
        let (input, master) = (socket_file(input), socket_file(master));
        let output = tempfile::tempfile().unwrap();

        child.write_all(b"hello\x1b[0m").unwrap();
        drop(child);

        let mut lp = EventLoop::new(logging_relay(), &input, &output, &master, Pid::this());
        let reason = lp.run().unwrap();
        assert_eq!(reason, ExitReason::PeerClosed(Direction::FromChild));

        let mut view = &output;
        view.seek(SeekFrom::Start(0)).unwrap();
        let mut shown = Vec::new();
        view.read_to_end(&mut shown).unwrap();
        assert_eq!(shown, b"hello\x1b[0m");

        let relay = lp.into_relay();
        let transcript = relay.transcript().unwrap().get_ref();
        assert_eq!(transcript, b"<<<<<< plain\nhello\n<<<<<< csi\n\x1b[0m\n");
    }

    #[test]
    fn test_user_input_reaches_child_then_closes() {
        let (mut user, input) = UnixStream::pair().unwrap();
        let (mut child, master) = UnixStream::pair().unwrap();
        let (input, master) = (socket_file(input), socket_file(master));
        let output = tempfile::tempfile().unwrap();

        user.write_all(b"ls\n").unwrap();
        drop(user);

        let relay: Relay<Vec<u8>> = Relay::new(64, None);
        let mut lp = EventLoop::new(relay, &input, &output, &master, Pid::this());
        assert_eq!(lp.run().unwrap(), ExitReason::PeerClosed(Direction::FromUser));
        assert!(!lp.relay().is_logging());

        let mut received = [0u8; 3];
        child.read_exact(&mut received).unwrap();
        assert_eq!(&received, b"ls\n");
    }

    #[test]
    fn test_termination_signal_stops_loop() {
        let _serial = serialize_signal_tests();
        let signals = SignalEvents::register().unwrap();

        let (_user, input) = UnixStream::pair().unwrap();
        let (_child, master) = UnixStream::pair().unwrap();
        let (input, master) = (socket_file(input), socket_file(master));
        let output = tempfile::tempfile().unwrap();

        raise(SIGTERM).unwrap();

        let relay: Relay<Vec<u8>> = Relay::new(64, None);
        let mut lp =
            EventLoop::new(relay, &input, &output, &master, Pid::this()).with_signals(&signals);
        assert_eq!(lp.run().unwrap(), ExitReason::Signal(SIGTERM));
    }

    #[test]
    fn test_window_change_is_forwarded_to_master() {
        let _serial = serialize_signal_tests();
        let signals = SignalEvents::register().unwrap();

        let terminal = openpty(None, None).unwrap();
        let child_pty = openpty(None, None).unwrap();
        let size = PtySize {
            rows: 33,
            cols: 99,
            pixel_width: 0,
            pixel_height: 0,
        };
        size.apply(terminal.master.as_fd()).unwrap();

        let input = File::from(terminal.slave);
        let master = File::from(child_pty.master);
        let output = tempfile::tempfile().unwrap();

        // SIGWINCH is ignored by default, so sleep keeps running.
        let mut child = std::process::Command::new("sleep").arg("5").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);

        raise(SIGWINCH).unwrap();
        // Closing the slave makes the loop stop once the resize is handled.
        drop(child_pty.slave);

        let relay: Relay<Vec<u8>> = Relay::new(64, None);
        let mut lp = EventLoop::new(relay, &input, &output, &master, pid).with_signals(&signals);
        let reason = lp.run().unwrap();
        child.kill().unwrap();
        child.wait().unwrap();

        assert!(
            matches!(
                reason,
                ExitReason::PeerClosed(Direction::FromChild) | ExitReason::Hangup(Direction::FromChild)
            ),
            "{reason:?}"
        );
        assert_eq!(PtySize::of(master.as_fd()).unwrap(), size);
    }
}
