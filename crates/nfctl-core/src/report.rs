//! Phase reporting.
//!
//! Each notable phase of a process run emits one human-readable line
//! through a [`Reporter`]. The sink is pluggable; the default forwards to
//! `tracing` so report lines share the operator's log stream.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::status::Mode;

/// Severity tag of a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress note
    Info,
    /// Failure
    Error,
    /// Phase completed as requested
    Success,
    /// Final classification of a run
    Result,
    /// Supporting detail (raw status, decisions)
    Detail,
}

impl Severity {
    /// Lowercase tag used in the report line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Error => "error",
            Severity::Success => "success",
            Severity::Result => "result",
            Severity::Detail => "detail",
        }
    }
}

/// Format one report line.
///
/// The shape is fixed: `[severity]:[mode]:[timestamp]:[alias](target):[message]`.
pub fn format_line(
    severity: Severity,
    mode: Mode,
    timestamp: DateTime<Utc>,
    alias: &str,
    target: &str,
    message: &str,
) -> String {
    format!(
        "[{}]:[{}]:[{}]:[{}({})]:[{}]",
        severity.as_str(),
        mode.as_str(),
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        alias,
        target,
        message
    )
}

/// Sink for phase report lines.
pub trait Reporter {
    /// Emit one report line for a phase event.
    fn report(&self, severity: Severity, mode: Mode, alias: &str, target: &str, message: &str);
}

/// Default reporter: stamps the line and forwards it to `tracing`.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, severity: Severity, mode: Mode, alias: &str, target: &str, message: &str) {
        let line = format_line(severity, mode, Utc::now(), alias, target, message);
        match severity {
            Severity::Error => tracing::error!("{line}"),
            Severity::Detail => tracing::debug!("{line}"),
            _ => tracing::info!("{line}"),
        }
    }
}

/// Reporter that discards everything. Used by read-only helper runs.
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _: Severity, _: Mode, _: &str, _: &str, _: &str) {}
}
