//! Vendor adapter contract.
//!
//! The engine is one concrete state machine; everything target-specific
//! lives behind this strategy trait. An adapter supplies commands, status
//! words, commit vocabulary and status-reading logic, and may override
//! the issuance hooks while leaving the generic validate/commit/abort
//! routine to the engine.

use nfctl_core::{Mode, Result, TargetStatus};
use nfctl_session::CommandSession;

/// Target-specific strategy consumed by the process engine.
pub trait NfAdapter {
    /// The command issued for a mode, if the vendor defines one.
    fn command(&self, mode: Mode) -> Option<String>;

    /// Read the target's operational status over the session.
    ///
    /// `Ok(None)` means the reply was received but no status could be
    /// extracted from it.
    fn read_status(&self, session: &mut dyn CommandSession) -> Result<Option<TargetStatus>>;

    /// Display word for a status, used in report lines.
    fn status_word(&self, status: TargetStatus) -> String {
        match status {
            TargetStatus::Up => "in use".to_string(),
            TargetStatus::Down => "out of use".to_string(),
            TargetStatus::Unknown => "unknown".to_string(),
        }
    }

    /// Audit comment recorded with each commit.
    fn commit_comment(&self) -> String {
        "state change by nfctl".to_string()
    }

    /// Vendor validate command and the literal marker of a successful reply.
    fn validate_step(&self) -> (String, String) {
        (
            "commit check".to_string(),
            "configuration check succeeds".to_string(),
        )
    }

    /// Vendor commit command for `comment`, and the literal marker of a
    /// successful reply.
    fn commit_step(&self, comment: &str) -> (String, String) {
        (
            format!("commit comment \"{comment}\""),
            "commit complete".to_string(),
        )
    }

    /// Marker a vendor error line carries.
    fn error_marker(&self) -> String {
        "error:".to_string()
    }

    /// Issue the up-command. Override to customize issuance; the engine
    /// still wraps whatever this does in validate/commit/abort.
    fn to_up(&self, session: &mut dyn CommandSession) -> Result<bool> {
        self.issue(session, Mode::Up)
    }

    /// Issue the down-command. Override point, like [`NfAdapter::to_up`].
    fn to_down(&self, session: &mut dyn CommandSession) -> Result<bool> {
        self.issue(session, Mode::Down)
    }

    /// Generic issuance: send the mode's command and reject the attempt
    /// when the vendor error marker shows up in the reply.
    fn issue(&self, session: &mut dyn CommandSession, mode: Mode) -> Result<bool> {
        let Some(command) = self.command(mode) else {
            return Ok(false);
        };
        let timeout = session.command_timeout();
        let reply = session.send(&command, timeout)?;
        let marker = self.error_marker().to_lowercase();
        Ok(!reply.to_lowercase().contains(&marker))
    }
}
