//! PTY transport with portable-pty.
//!
//! The remote session is an `ssh` (or relay) child process spawned on a
//! local PTY so the remote side behaves as it would for a human operator:
//! it prints prompts, echoes input and pages nothing.

use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, error, info};

use nfctl_core::{Error, Result};

use crate::channel::ByteChannel;

// Wide pane so long status lines do not wrap and break line framing.
const PTY_ROWS: u16 = 24;
const PTY_COLS: u16 = 400;

/// Handle to a spawned transport process on a PTY.
pub struct PtyTransport {
    /// Kept for the lifetime of the child; dropping the master closes the PTY
    _master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for PtyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTransport").finish_non_exhaustive()
    }
}

impl PtyTransport {
    /// Spawn `command args...` on a fresh PTY.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self> {
        info!("Spawning transport: command='{}' args={:?}", command, args);

        let pty_system = native_pty_system();

        let pty_size = PtySize {
            rows: PTY_ROWS,
            cols: PTY_COLS,
            pixel_width: 0,
            pixel_height: 0,
        };

        debug!("Opening PTY with native system");
        let pair = pty_system.openpty(pty_size).map_err(|e| {
            error!("Failed to open PTY: {}", e);
            Error::Connect(format!("failed to open PTY: {e}"))
        })?;

        let mut cmd = CommandBuilder::new(command);
        for arg in args {
            cmd.arg(arg);
        }

        debug!("Spawning child process: {}", command);
        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            error!("Failed to spawn command '{}': {}", command, e);
            Error::Connect(format!("failed to spawn command: {e}"))
        })?;

        let writer = pair.master.take_writer().map_err(|e| {
            error!("Failed to take PTY writer: {}", e);
            Error::Connect(format!("failed to take writer: {e}"))
        })?;

        let reader = pair.master.try_clone_reader().map_err(|e| {
            error!("Failed to clone PTY reader: {}", e);
            Error::Connect(format!("failed to clone reader: {e}"))
        })?;

        // Set the master to non-blocking mode; the framer's poll loop
        // depends on read returning empty instead of blocking.
        #[cfg(unix)]
        {
            if let Some(master_fd) = pair.master.as_raw_fd() {
                unsafe {
                    let flags = libc::fcntl(master_fd, libc::F_GETFL, 0);
                    if flags != -1 {
                        let result =
                            libc::fcntl(master_fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                        if result == -1 {
                            error!("Failed to set master PTY to non-blocking mode");
                        } else {
                            debug!("Set master PTY FD {} to non-blocking mode", master_fd);
                        }
                    }
                }
            }
        }

        info!("Transport spawned successfully: command='{}'", command);

        Ok(Self {
            _master: pair.master,
            child,
            writer,
            reader,
        })
    }
}

impl ByteChannel for PtyTransport {
    fn read(&mut self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; 4096];

        match self.reader.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                if n > 0 {
                    debug!("Read {} bytes from transport", n);
                }
                Ok(buffer)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // No data available, expected in non-blocking mode
                Ok(Vec::new())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        debug!("Writing {} bytes to transport", data.len());
        self.writer.write_all(data).map_err(Error::Io)?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    fn kill(&mut self) -> Result<()> {
        info!("Killing transport process");
        self.child
            .kill()
            .map_err(|e| Error::Connect(format!("kill failed: {e}")))
    }
}
