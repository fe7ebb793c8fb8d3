//! One relay session: raw mode, child shell, relay loop, teardown.

use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::path::PathBuf;

use thiserror::Error;

use crate::cli::Args;
use crate::config::{Config, ConfigError, MAX_BUFFER_CAPACITY, MIN_BUFFER_CAPACITY};
use crate::pty::{select_shell, PtyChannel, PtyError, PtySize};
use crate::relay::{EventLoop, ExitReason, Relay, RelayError, SignalEvents};
use crate::terminal::RawModeGuard;
use crate::transcript::{TranscriptError, TranscriptLogger};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] io::Error),
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

/// Everything a session needs, after merging CLI arguments over the config.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub shell: String,
    pub cwd: Option<PathBuf>,
    pub buffer_capacity: usize,
    pub transcript: Option<PathBuf>,
    pub max_escape_bytes: usize,
}

impl SessionOptions {
    /// Merge settings: CLI args > config file > built-in defaults.
    pub fn resolve(args: &Args, config: &Config) -> Result<Self, ConfigError> {
        let buffer_capacity = args.buffer_capacity.unwrap_or(config.relay.buffer_capacity);
        if !(MIN_BUFFER_CAPACITY..=MAX_BUFFER_CAPACITY).contains(&buffer_capacity) {
            return Err(ConfigError::Invalid(format!(
                "--buffer-capacity must be between {} and {}, got {}",
                MIN_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY, buffer_capacity
            )));
        }

        let cwd = if config.shell.home_dir {
            dirs::home_dir()
        } else {
            None
        };

        Ok(Self {
            shell: select_shell(args.shell.as_deref(), config.shell.command.as_deref()),
            cwd,
            buffer_capacity,
            transcript: args.transcript.clone().or_else(|| config.transcript.path.clone()),
            max_escape_bytes: config.transcript.max_escape_bytes,
        })
    }
}

/// Run a shell on a PTY behind the current terminal until either side
/// closes or a termination signal arrives.
///
/// The terminal is back in its original mode by the time this returns,
/// whether it returns an error or not.
pub fn run(options: &SessionOptions) -> Result<ExitReason, SessionError> {
    let input = File::from(io::stdin().as_fd().try_clone_to_owned()?);
    let output = File::from(io::stdout().as_fd().try_clone_to_owned()?);

    let size = PtySize::of(input.as_fd()).unwrap_or_else(|e| {
        log::debug!("terminal size unavailable ({}), using {:?}", e, PtySize::default());
        PtySize::default()
    });

    let transcript = match &options.transcript {
        Some(path) => Some(TranscriptLogger::create(path, options.max_escape_bytes)?),
        None => None,
    };
    let signals = SignalEvents::register()?;

    let mut guard = RawModeGuard::enter_on(input.as_fd())?;
    let mut pty = PtyChannel::spawn(&options.shell, size, guard.saved(), options.cwd.as_deref())?;

    let relay = Relay::new(options.buffer_capacity, transcript);
    let mut event_loop =
        EventLoop::new(relay, &input, &output, pty.master(), pty.pid()).with_signals(&signals);
    let result = event_loop.run();
    let finished = event_loop.into_relay().finish();

    let restored = guard.restore();
    if let Err(e) = &restored {
        log::error!("could not restore terminal attributes: {}", e);
    }
    reap(&mut pty);

    let reason = outcome(result, finished, restored)?;
    log::info!("session ended: {:?}", reason);
    Ok(reason)
}

/// The loop's own error takes precedence over teardown failures.
fn outcome(
    result: Result<ExitReason, RelayError>,
    finished: Result<(), RelayError>,
    restored: io::Result<()>,
) -> Result<ExitReason, SessionError> {
    let reason = result?;
    finished?;
    restored?;
    Ok(reason)
}

/// Log the shell's exit status if it has already exited. A shell that is
/// still running gets SIGHUP when the master is closed.
fn reap(pty: &mut PtyChannel) {
    match pty.try_wait() {
        Ok(Some(status)) => log::info!("shell (pid {}) exited: {}", pty.pid(), status),
        Ok(None) => log::info!("shell (pid {}) still running, closing its terminal", pty.pid()),
        Err(e) => log::warn!("could not check shell status: {}", e),
    }
}
