//! PTY channel - the child shell and the master side of its terminal

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::pty::{openpty, OpenptyResult};
use nix::sys::termios::Termios;
use nix::unistd::Pid;

use super::error::PtyError;
use super::size::PtySize;

/// A shell running on the slave side of a PTY. The parent keeps only the
/// master, which reads the shell's output and writes its input.
pub struct PtyChannel {
    master: File,
    child: Child,
}

impl PtyChannel {
    /// Spawn `shell` on a fresh PTY.
    ///
    /// # Arguments
    /// * `shell` - Path to the shell, started with no arguments
    /// * `size` - Initial window size
    /// * `attributes` - Terminal attributes to copy onto the slave
    /// * `cwd` - Working directory for the shell
    pub fn spawn(
        shell: &str,
        size: PtySize,
        attributes: Option<&Termios>,
        cwd: Option<&Path>,
    ) -> Result<Self, PtyError> {
        let winsize = libc::winsize::from(size);
        let OpenptyResult { master, slave } = openpty(&winsize, attributes)?;

        let master_raw = master.as_raw_fd();
        let slave_raw = slave.as_raw_fd();

        let mut cmd = Command::new(shell);
        cmd.stdin(Stdio::from(slave.try_clone()?))
            .stdout(Stdio::from(slave.try_clone()?))
            .stderr(Stdio::from(slave));
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        // SAFETY: runs between fork and exec; setsid, ioctl and close are
        // async-signal-safe. stdio already points at the slave here.
        unsafe {
            cmd.pre_exec(move || {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                libc::close(master_raw);
                if slave_raw > libc::STDERR_FILENO {
                    libc::close(slave_raw);
                }
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|source| PtyError::SpawnFailed {
            shell: shell.to_string(),
            source,
        })?;
        log::info!("Spawned {} (pid {}) on {}x{} pty", shell, child.id(), size.cols, size.rows);

        Ok(Self {
            master: File::from(master),
            child,
        })
    }

    /// The master side, readable for child output and writable for input.
    pub fn master(&self) -> &File {
        &self.master
    }

    /// Process id of the shell, for signal delivery.
    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    /// Check if the shell process has exited
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, PtyError> {
        Ok(self.child.try_wait()?)
    }

    /// Wait for the shell process to exit
    pub fn wait(&mut self) -> Result<ExitStatus, PtyError> {
        Ok(self.child.wait()?)
    }
}
