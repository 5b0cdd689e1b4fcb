//! Byte-level transport seam.

use nfctl_core::Result;

/// One bidirectional byte stream to a remote interactive shell.
///
/// The framer drives any implementation the same way: non-blocking reads
/// in a poll loop, whole-command writes. Production uses
/// [`crate::transport::PtyTransport`]; tests use
/// [`crate::testing::ScriptedChannel`].
pub trait ByteChannel: Send {
    /// Read whatever bytes are available without blocking.
    ///
    /// Returns an empty vec when no data is pending.
    fn read(&mut self) -> Result<Vec<u8>>;

    /// Write all bytes to the remote side.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Whether the underlying process/stream is still alive.
    fn is_alive(&mut self) -> bool;

    /// Tear the stream down. Safe to call more than once.
    fn kill(&mut self) -> Result<()>;
}
