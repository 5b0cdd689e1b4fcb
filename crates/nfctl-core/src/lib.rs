//! # nfctl-core
//!
//! Core types for nfctl.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other nfctl crates. It provides:
//!
//! - Status model (Mode, TargetStatus, ProcessStatus)
//! - Error types
//! - Configuration (targets, relays, vendor profiles, timing)
//! - Phase reporting (severity-tagged operator lines)
//! - Session identity
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other nfctl crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all modules
pub mod config;
pub mod error;
pub mod report;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use config::{
    LineTemplateConfig, NetworkConfig, RelayTemplate, TargetEntry, TimingSettings, VendorProfile,
};
pub use error::{Error, Result};
pub use report::{NullReporter, Reporter, Severity, TracingReporter};
pub use session::SessionId;
pub use status::{Mode, ProcessStatus, TargetStatus};
