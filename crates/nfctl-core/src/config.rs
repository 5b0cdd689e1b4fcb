//! Configuration types for nfctl.
//!
//! Loaded once at startup from a JSON file and shared read-only across
//! target runs. Lookup failures surface as [`Error::ConfigMissing`] so the
//! caller can refuse to open a session with partial data.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::status::Mode;

/// Top-level configuration loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connection directory: alias -> target
    pub targets: BTreeMap<String, TargetEntry>,
    /// Relay command templates, referenced by name from targets
    pub relays: BTreeMap<String, RelayTemplate>,
    /// Vendor profiles, referenced by name from targets
    pub vendors: BTreeMap<String, VendorProfile>,
    /// Poll, timeout and settle timing
    pub timing: TimingSettings,
}

impl NetworkConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: NetworkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;

        for (alias, target) in &self.targets {
            if target.host.trim().is_empty() {
                return Err(Error::Config(format!("target '{alias}' has an empty host")));
            }
            if let Some(relay) = &target.relay {
                if !self.relays.contains_key(relay) {
                    return Err(Error::Config(format!(
                        "target '{alias}' references unknown relay '{relay}'"
                    )));
                }
            }
            if !self.vendors.contains_key(&target.vendor) {
                return Err(Error::Config(format!(
                    "target '{alias}' references unknown vendor '{}'",
                    target.vendor
                )));
            }
        }

        for (name, vendor) in &self.vendors {
            vendor.validate(name)?;
        }

        Ok(())
    }

    /// Look up a target by alias.
    pub fn target(&self, alias: &str) -> Result<&TargetEntry> {
        self.targets
            .get(alias)
            .ok_or_else(|| Error::ConfigMissing(format!("target '{alias}'")))
    }

    /// Look up a vendor profile by name.
    pub fn vendor(&self, name: &str) -> Result<&VendorProfile> {
        self.vendors
            .get(name)
            .ok_or_else(|| Error::ConfigMissing(format!("vendor '{name}'")))
    }

    /// Look up a relay template by name.
    pub fn relay(&self, name: &str) -> Result<&RelayTemplate> {
        self.relays
            .get(name)
            .ok_or_else(|| Error::ConfigMissing(format!("relay '{name}'")))
    }
}

/// One entry in the connection directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    /// Remote host name or address
    pub host: String,
    /// Remote port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login user
    pub user: String,
    /// Relay template name, if the session tunnels through one
    #[serde(default)]
    pub relay: Option<String>,
    /// Vendor profile name
    pub vendor: String,
}

fn default_port() -> u16 {
    22
}

impl TargetEntry {
    /// host:port display form used in report lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Relay command template with `{host}`, `{port}` and `{user}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayTemplate {
    /// Full command line, split on whitespace after substitution
    pub command: String,
}

impl RelayTemplate {
    /// Substitute placeholders and split into argv.
    pub fn build(&self, host: &str, port: u16, user: &str) -> Result<Vec<String>> {
        let rendered = self
            .command
            .replace("{host}", host)
            .replace("{port}", &port.to_string())
            .replace("{user}", user);

        if rendered.contains('{') {
            return Err(Error::RelayBuild(format!(
                "unresolved placeholder in '{rendered}'"
            )));
        }

        let argv: Vec<String> = rendered.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(Error::RelayBuild("empty relay command".to_string()));
        }
        Ok(argv)
    }
}

/// Vendor-specific commands, markers and output templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorProfile {
    /// Command that prints the target's operational status
    pub show_command: String,
    /// Command that puts the target in service
    pub up_command: Option<String>,
    /// Command that takes the target out of service
    pub down_command: Option<String>,
    /// Keyword that enters configuration mode
    pub config_enter: String,
    /// Keyword that leaves configuration mode
    pub config_exit: String,
    /// Keyword that discards uncommitted edits on a forced exit
    pub config_abort: String,
    /// Vendor validate step
    pub validate_command: String,
    /// Literal marker expected in a successful validate reply
    pub validate_marker: String,
    /// Commit command; `{comment}` is replaced with the commit comment
    pub commit_command: String,
    /// Literal marker expected in a successful commit reply
    pub commit_marker: String,
    /// Literal marker a vendor error line starts with
    pub error_marker: String,
    /// Audit comment recorded with each commit
    pub commit_comment: String,
    /// Record field holding the status word
    pub status_field: String,
    /// Status words meaning "in service"
    pub up_values: Vec<String>,
    /// Status words meaning "out of service"
    pub down_values: Vec<String>,
    /// Line templates for parsing the show command's output
    pub templates: Vec<LineTemplateConfig>,
}

impl Default for VendorProfile {
    fn default() -> Self {
        Self {
            show_command: String::new(),
            up_command: None,
            down_command: None,
            config_enter: "configure".to_string(),
            config_exit: "exit".to_string(),
            config_abort: "rollback 0".to_string(),
            validate_command: "commit check".to_string(),
            validate_marker: "configuration check succeeds".to_string(),
            commit_command: "commit comment \"{comment}\"".to_string(),
            commit_marker: "commit complete".to_string(),
            error_marker: "error:".to_string(),
            commit_comment: "state change by nfctl".to_string(),
            status_field: "status".to_string(),
            up_values: vec!["up".to_string(), "in use".to_string()],
            down_values: vec!["down".to_string(), "out of use".to_string()],
            templates: Vec::new(),
        }
    }
}

impl VendorProfile {
    /// The command issued for a mode, if the vendor defines one.
    pub fn command(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Up => self.up_command.as_deref(),
            Mode::Down => self.down_command.as_deref(),
            Mode::Show => Some(self.show_command.as_str()),
            Mode::Info | Mode::List => None,
        }
    }

    /// Validate the profile.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.show_command.trim().is_empty() {
            return Err(Error::Config(format!(
                "vendor '{name}' has an empty show_command"
            )));
        }
        if !self.commit_command.contains("{comment}") {
            return Err(Error::Config(format!(
                "vendor '{name}' commit_command has no {{comment}} placeholder"
            )));
        }
        for template in &self.templates {
            template.validate(name)?;
        }
        Ok(())
    }
}

/// One line template: a regex with named captures yielding record fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTemplateConfig {
    /// Template name (identifier)
    pub name: String,
    /// Regular expression with named capture groups
    pub pattern: String,
}

impl LineTemplateConfig {
    /// Validate the template definition.
    pub fn validate(&self, vendor: &str) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config(format!(
                "vendor '{vendor}' has a template with an empty name"
            )));
        }
        regex::Regex::new(&self.pattern).map_err(|e| {
            Error::Config(format!(
                "vendor '{vendor}' template '{}' has an invalid pattern: {e}",
                self.name
            ))
        })?;
        Ok(())
    }
}

/// Poll, timeout and settle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Bound on the initial read after connect, in milliseconds
    pub connect_timeout_ms: u64,
    /// Bound on each command/reply exchange, in milliseconds
    pub command_timeout_ms: u64,
    /// Fixed sleep between reads of the poll loop, in milliseconds
    pub poll_interval_ms: u64,
    /// Fixed wait between a change attempt and the post-check, in milliseconds
    pub settle_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 15_000,
            command_timeout_ms: 10_000,
            poll_interval_ms: 100,
            settle_delay_ms: 3_000,
        }
    }
}

impl TimingSettings {
    /// Validate timing values.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "timing.poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.command_timeout_ms == 0 {
            return Err(Error::Config("timing timeouts must be > 0".to_string()));
        }
        Ok(())
    }

    /// Bound on the initial read after connect.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Bound on each command/reply exchange.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Fixed sleep between reads of the poll loop.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Fixed wait between a change attempt and the post-check.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
      "targets": {
        "nf01": { "host": "192.0.2.10", "user": "ops", "vendor": "junox" },
        "nf02": { "host": "192.0.2.11", "port": 2222, "user": "ops",
                  "relay": "bastion", "vendor": "junox" }
      },
      "relays": {
        "bastion": { "command": "ssh -tt bastion.example.net ssh {user}@{host} -p {port}" }
      },
      "vendors": {
        "junox": {
          "show_command": "show service nf",
          "up_command": "set service nf enable",
          "down_command": "set service nf disable",
          "templates": [
            { "name": "service_line",
              "pattern": "^(?P<name>\\S+)\\s+(?P<status>in use|out of use)$" }
          ]
        }
      },
      "timing": { "settle_delay_ms": 500 }
    }
    "#;

    #[test]
    fn test_default_config_validates() {
        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = NetworkConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.target("nf01").unwrap().port, 22);
        assert_eq!(config.target("nf02").unwrap().port, 2222);
        assert_eq!(config.timing.settle_delay_ms, 500);
        // untouched sections keep their defaults
        assert_eq!(config.timing.poll_interval_ms, 100);
        let vendor = config.vendor("junox").unwrap();
        assert_eq!(vendor.config_enter, "configure");
    }

    #[test]
    fn test_missing_target_lookup() {
        let config = NetworkConfig::from_json(SAMPLE).unwrap();
        let err = config.target("nf99").unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }

    #[test]
    fn test_unknown_relay_reference() {
        let json = r#"{
          "targets": { "a": { "host": "h", "user": "u", "relay": "nope", "vendor": "v" } },
          "vendors": { "v": { "show_command": "show" } }
        }"#;
        assert!(NetworkConfig::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_vendor_reference() {
        let json = r#"{
          "targets": { "a": { "host": "h", "user": "u", "vendor": "nope" } }
        }"#;
        assert!(NetworkConfig::from_json(json).is_err());
    }

    #[test]
    fn test_relay_build() {
        let config = NetworkConfig::from_json(SAMPLE).unwrap();
        let relay = config.relay("bastion").unwrap();
        let argv = relay.build("192.0.2.11", 2222, "ops").unwrap();
        assert_eq!(
            argv,
            vec![
                "ssh", "-tt", "bastion.example.net", "ssh", "ops@192.0.2.11", "-p", "2222"
            ]
        );
    }

    #[test]
    fn test_relay_unresolved_placeholder() {
        let relay = RelayTemplate {
            command: "ssh {jump} {user}@{host}".to_string(),
        };
        let err = relay.build("h", 22, "u").unwrap_err();
        assert!(matches!(err, Error::RelayBuild(_)));
    }

    #[test]
    fn test_relay_empty_command() {
        let relay = RelayTemplate {
            command: "   ".to_string(),
        };
        assert!(relay.build("h", 22, "u").is_err());
    }

    #[test]
    fn test_invalid_template_pattern() {
        let json = r#"{
          "vendors": {
            "v": {
              "show_command": "show",
              "templates": [ { "name": "bad", "pattern": "([unclosed" } ]
            }
          }
        }"#;
        assert!(NetworkConfig::from_json(json).is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let json = r#"{ "timing": { "poll_interval_ms": 0 } }"#;
        assert!(NetworkConfig::from_json(json).is_err());
    }

    #[test]
    fn test_vendor_command_by_mode() {
        let config = NetworkConfig::from_json(SAMPLE).unwrap();
        let vendor = config.vendor("junox").unwrap();
        assert_eq!(vendor.command(Mode::Up), Some("set service nf enable"));
        assert_eq!(vendor.command(Mode::Down), Some("set service nf disable"));
        assert_eq!(vendor.command(Mode::Show), Some("show service nf"));
        assert_eq!(vendor.command(Mode::Info), None);
        assert_eq!(vendor.command(Mode::List), None);
    }

    #[test]
    fn test_commit_command_placeholder_required() {
        let mut vendor = VendorProfile {
            show_command: "show".to_string(),
            ..Default::default()
        };
        vendor.commit_command = "commit".to_string();
        assert!(vendor.validate("v").is_err());
    }
}
