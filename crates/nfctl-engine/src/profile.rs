//! Config-driven vendor adapter.

use nfctl_core::{Mode, NetworkConfig, Result, TargetStatus, VendorProfile};
use nfctl_session::CommandSession;
use tracing::debug;

use crate::adapter::NfAdapter;
use crate::parser::{OutputParser, TemplateParser};

/// Adapter built entirely from a [`VendorProfile`].
///
/// Commands, markers, status words and line templates all come from
/// configuration, so supporting a new vendor family usually means a new
/// profile, not new code.
pub struct GenericAdapter {
    profile: VendorProfile,
    parser: TemplateParser,
}

impl GenericAdapter {
    /// Build an adapter from a vendor profile.
    pub fn new(profile: &VendorProfile) -> Result<Self> {
        let parser = TemplateParser::new(&profile.templates)?;
        Ok(Self {
            profile: profile.clone(),
            parser,
        })
    }

    /// Build the adapter for a configured target.
    pub fn for_target(config: &NetworkConfig, alias: &str) -> Result<Self> {
        let target = config.target(alias)?;
        Self::new(config.vendor(&target.vendor)?)
    }

    fn classify(&self, word: &str) -> TargetStatus {
        let word = word.trim().to_lowercase();
        if self.profile.up_values.iter().any(|v| v.to_lowercase() == word) {
            TargetStatus::Up
        } else if self
            .profile
            .down_values
            .iter()
            .any(|v| v.to_lowercase() == word)
        {
            TargetStatus::Down
        } else {
            TargetStatus::Unknown
        }
    }
}

impl NfAdapter for GenericAdapter {
    fn command(&self, mode: Mode) -> Option<String> {
        self.profile.command(mode).map(str::to_string)
    }

    fn read_status(&self, session: &mut dyn CommandSession) -> Result<Option<TargetStatus>> {
        let timeout = session.command_timeout();
        let reply = session.send(&self.profile.show_command, timeout)?;
        let records = self.parser.parse(&reply)?;

        let field = &self.profile.status_field;
        let Some(record) = records.iter().find(|r| r.contains_key(field)) else {
            debug!("No record carries status field '{}'", field);
            return Ok(None);
        };

        let status = self.classify(&record[field]);
        debug!("Status word '{}' classified as {}", record[field], status);
        Ok(Some(status))
    }

    fn status_word(&self, status: TargetStatus) -> String {
        match status {
            TargetStatus::Up => self
                .profile
                .up_values
                .first()
                .cloned()
                .unwrap_or_else(|| "in use".to_string()),
            TargetStatus::Down => self
                .profile
                .down_values
                .first()
                .cloned()
                .unwrap_or_else(|| "out of use".to_string()),
            TargetStatus::Unknown => "unknown".to_string(),
        }
    }

    fn commit_comment(&self) -> String {
        self.profile.commit_comment.clone()
    }

    fn validate_step(&self) -> (String, String) {
        (
            self.profile.validate_command.clone(),
            self.profile.validate_marker.clone(),
        )
    }

    fn commit_step(&self, comment: &str) -> (String, String) {
        (
            self.profile.commit_command.replace("{comment}", comment),
            self.profile.commit_marker.clone(),
        )
    }

    fn error_marker(&self) -> String {
        self.profile.error_marker.clone()
    }
}
