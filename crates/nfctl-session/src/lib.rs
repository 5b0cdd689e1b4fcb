//! # nfctl-session
//!
//! Session transport framer for nfctl.
//!
//! This crate turns one noisy remote character stream (echoed input,
//! changing prompts, control sequences) into a call/response primitive:
//!
//! - PTY transport for the remote shell process (direct or via relay)
//! - ANSI control-sequence stripping
//! - Prompt learning and prompt-reappearance framing
//! - Privileged/config mode transitions
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends only on nfctl-core and
//! owns all byte-level I/O. The engine above it sees complete reply bodies.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ansi;
pub mod channel;
pub mod session;
pub mod testing;
pub mod transport;

// Re-export commonly used types
pub use channel::ByteChannel;
pub use session::{CommandSession, Session};
pub use transport::PtyTransport;
