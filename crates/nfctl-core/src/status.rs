//! Status model: run modes, sampled target status, process outcome flags.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Caller intent for one process run.
///
/// `Up` and `Down` mutate the target; the remaining modes are read-only.
/// Immutable once set on a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Put the target in service
    Up,
    /// Take the target out of service
    Down,
    /// Read and display the current status only
    Show,
    /// Display target information
    Info,
    /// List configured targets
    List,
}

impl Mode {
    /// Whether this mode changes remote state.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Mode::Up | Mode::Down)
    }

    /// The target status this mode drives toward, if any.
    pub fn desired_status(&self) -> Option<TargetStatus> {
        match self {
            Mode::Up => Some(TargetStatus::Up),
            Mode::Down => Some(TargetStatus::Down),
            _ => None,
        }
    }

    /// Lowercase name used in reports and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Up => "up",
            Mode::Down => "down",
            Mode::Show => "show",
            Mode::Info => "info",
            Mode::List => "list",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Mode::Up),
            "down" => Ok(Mode::Down),
            "show" => Ok(Mode::Show),
            "info" => Ok(Mode::Info),
            "list" => Ok(Mode::List),
            other => Err(Error::Config(format!("unknown mode: {other}"))),
        }
    }
}

/// Tri-state sampled observation of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    /// Target is in service
    Up,
    /// Target is out of service
    Down,
    /// Status could not be determined
    Unknown,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetStatus::Up => "up",
            TargetStatus::Down => "down",
            TargetStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// Outcome flags accumulated over one process run.
    ///
    /// Individual bits record what happened at each phase; the named unions
    /// let callers test "was this acceptable" with one membership check.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ProcessStatus: u32 {
        /// Session could not be opened
        const SSH_NG = 1 << 0;

        /// Pre-check failed (status unobtainable or necessity undecidable)
        const PRE_CHECK_NG = 1 << 1;

        /// Read-only mode, or status not comparable to the request
        const SHOW_OR_UNKNOWN = 1 << 2;

        /// Requested state already in effect (idempotent no-op)
        const ALREADY_CHANGED = 1 << 3;

        /// Requested state differs from observed state
        const NEED_TO_CHANGE = 1 << 4;

        /// Change command issued and accepted
        const CHANGE_OK = 1 << 5;

        /// Change command rejected or issuance failed
        const CHANGE_NG = 1 << 6;

        /// Validate and commit both reported success
        const COMMIT_OK = 1 << 7;

        /// Validate or commit failed; edit was aborted
        const COMMIT_NG = 1 << 8;

        /// Post-check observed the requested state
        const POST_CHECK_OK = 1 << 9;

        /// Post-check observed a different or unknown state
        const POST_CHECK_NG = 1 << 10;

        /// Unexpected failure caught at the process boundary
        const EXCEPTION_NG = 1 << 11;

        /// Operation classified as service affecting
        const HAZARDOUS = 1 << 12;

        /// Operation classified as not service affecting
        const NON_HAZARDOUS = 1 << 13;

        /// Batch stop marker: stop after this target, outcome acceptable
        const STOP_OK = 1 << 14;

        /// Batch stop marker: stop after this target, outcome not acceptable
        const STOP_NG = 1 << 15;

        /// No change required: read-only run or already in requested state
        const NEED_NOT_CHANGE = Self::SHOW_OR_UNKNOWN.bits() | Self::ALREADY_CHANGED.bits();

        /// Acceptable outcomes
        const OK = Self::NEED_NOT_CHANGE.bits() | Self::POST_CHECK_OK.bits();

        /// Failed outcomes
        const NG = Self::SSH_NG.bits()
            | Self::PRE_CHECK_NG.bits()
            | Self::CHANGE_NG.bits()
            | Self::COMMIT_NG.bits()
            | Self::POST_CHECK_NG.bits()
            | Self::EXCEPTION_NG.bits();
    }
}

impl ProcessStatus {
    /// Whether the run ended in an acceptable outcome.
    pub fn is_ok(&self) -> bool {
        self.intersects(ProcessStatus::OK)
    }

    /// Whether any failure bit is set.
    pub fn is_ng(&self) -> bool {
        self.intersects(ProcessStatus::NG)
    }

    /// Short label for the most significant outcome bit, for summaries.
    pub fn label(&self) -> &'static str {
        if self.contains(ProcessStatus::EXCEPTION_NG) {
            "exception"
        } else if self.contains(ProcessStatus::SSH_NG) {
            "session failed"
        } else if self.contains(ProcessStatus::PRE_CHECK_NG) {
            "pre-check failed"
        } else if self.contains(ProcessStatus::COMMIT_NG) {
            "commit failed"
        } else if self.contains(ProcessStatus::CHANGE_NG) {
            "change failed"
        } else if self.contains(ProcessStatus::POST_CHECK_NG) {
            "post-check failed"
        } else if self.contains(ProcessStatus::POST_CHECK_OK) {
            "changed"
        } else if self.contains(ProcessStatus::ALREADY_CHANGED) {
            "already in requested state"
        } else if self.contains(ProcessStatus::SHOW_OR_UNKNOWN) {
            "read only"
        } else {
            "incomplete"
        }
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::empty()
    }
}
