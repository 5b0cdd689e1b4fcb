//! Batch loop: one sequential process run per requested target.

use tracing::info;

use nfctl_core::{Mode, NetworkConfig, ProcessStatus, Reporter, Severity};
use nfctl_engine::{ConfigSessionFactory, GenericAdapter, Process};

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Requested mode
    pub mode: Mode,
    /// Path to the JSON configuration file
    pub config_path: String,
    /// Target aliases, in run order
    pub aliases: Vec<String>,
    /// Skip the interactive confirm gate
    pub assume_yes: bool,
}

/// Parse `nfctl <mode> <config.json> <alias>... [--yes]`.
pub fn parse_args(args: &[String]) -> Result<RunOptions, String> {
    let mut positional = Vec::new();
    let mut assume_yes = false;

    for arg in args {
        match arg.as_str() {
            "--yes" | "-y" => assume_yes = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown flag: {other}"));
            }
            other => positional.push(other.to_string()),
        }
    }

    if positional.len() < 2 {
        return Err("usage: nfctl <mode> <config.json> <alias>... [--yes]".to_string());
    }

    let mode: Mode = positional[0]
        .parse()
        .map_err(|e| format!("{e}"))?;
    let config_path = positional[1].clone();
    let aliases = positional[2..].to_vec();

    if aliases.is_empty() && mode != Mode::List {
        return Err("at least one target alias is required".to_string());
    }

    Ok(RunOptions {
        mode,
        config_path,
        aliases,
        assume_yes,
    })
}

/// Run the workflow for each alias in order. Nothing runs in parallel;
/// one target's outcome never short-circuits the next.
pub fn run_batch(
    config: &NetworkConfig,
    mode: Mode,
    aliases: &[String],
    reporter: &dyn Reporter,
) -> Vec<(String, ProcessStatus)> {
    let mut results = Vec::with_capacity(aliases.len());
    for alias in aliases {
        let status = run_one(config, mode, alias, reporter);
        results.push((alias.clone(), status));
    }
    results
}

fn run_one(
    config: &NetworkConfig,
    mode: Mode,
    alias: &str,
    reporter: &dyn Reporter,
) -> ProcessStatus {
    let target_display = config
        .target(alias)
        .map(|t| t.endpoint())
        .unwrap_or_else(|_| "unresolved".to_string());

    let adapter = match GenericAdapter::for_target(config, alias) {
        Ok(adapter) => adapter,
        Err(e) => {
            reporter.report(
                Severity::Error,
                mode,
                alias,
                &target_display,
                &format!("adapter build failed: {e}"),
            );
            return ProcessStatus::SSH_NG;
        }
    };

    let factory = ConfigSessionFactory::new(config, alias);
    let mut process = Process::new(
        adapter,
        mode,
        alias,
        &target_display,
        config.timing.settle_delay(),
        reporter,
    );
    process.run(&factory)
}

/// Render the `list` mode output: every configured target.
pub fn list_targets(config: &NetworkConfig) -> Vec<String> {
    config
        .targets
        .iter()
        .map(|(alias, target)| {
            format!(
                "{alias}  {}  vendor={}  relay={}",
                target.endpoint(),
                target.vendor,
                target.relay.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

/// Render the `info` mode output for the requested aliases.
pub fn target_info(config: &NetworkConfig, aliases: &[String]) -> Vec<String> {
    aliases
        .iter()
        .map(|alias| match config.target(alias) {
            Ok(target) => format!(
                "{alias}: host={} port={} user={} vendor={} relay={}",
                target.host,
                target.port,
                target.user,
                target.vendor,
                target.relay.as_deref().unwrap_or("-")
            ),
            Err(_) => format!("{alias}: not configured"),
        })
        .collect()
}

/// Log a one-line summary and derive the process exit code:
/// 0 iff every target ended in the OK group.
pub fn summarize(results: &[(String, ProcessStatus)]) -> i32 {
    let ok = results.iter().filter(|(_, s)| s.is_ok()).count();
    let ng = results.len() - ok;
    info!("Batch finished: {} ok, {} ng of {} targets", ok, ng, results.len());
    for (alias, status) in results {
        info!("  {alias}: {}", status.label());
    }
    if ng == 0 {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_basic() {
        let options = parse_args(&args(&["up", "net.json", "nf01", "nf02"])).unwrap();
        assert_eq!(options.mode, Mode::Up);
        assert_eq!(options.config_path, "net.json");
        assert_eq!(options.aliases, vec!["nf01", "nf02"]);
        assert!(!options.assume_yes);
    }

    #[test]
    fn test_parse_args_yes_flag() {
        let options = parse_args(&args(&["down", "net.json", "nf01", "--yes"])).unwrap();
        assert!(options.assume_yes);
        assert_eq!(options.aliases, vec!["nf01"]);
    }

    #[test]
    fn test_parse_args_list_needs_no_alias() {
        let options = parse_args(&args(&["list", "net.json"])).unwrap();
        assert_eq!(options.mode, Mode::List);
        assert!(options.aliases.is_empty());
    }

    #[test]
    fn test_parse_args_missing_alias() {
        assert!(parse_args(&args(&["up", "net.json"])).is_err());
    }

    #[test]
    fn test_parse_args_unknown_mode() {
        assert!(parse_args(&args(&["restart", "net.json", "nf01"])).is_err());
    }

    #[test]
    fn test_parse_args_unknown_flag() {
        assert!(parse_args(&args(&["up", "net.json", "nf01", "--force"])).is_err());
    }

    #[test]
    fn test_summarize_exit_codes() {
        let all_ok = vec![
            ("a".to_string(), ProcessStatus::ALREADY_CHANGED),
            ("b".to_string(), ProcessStatus::POST_CHECK_OK),
        ];
        assert_eq!(summarize(&all_ok), 0);

        let one_ng = vec![
            ("a".to_string(), ProcessStatus::POST_CHECK_OK),
            ("b".to_string(), ProcessStatus::SSH_NG),
        ];
        assert_eq!(summarize(&one_ng), 1);

        assert_eq!(summarize(&[]), 0);
    }

    #[test]
    fn test_list_and_info_rendering() {
        let config = NetworkConfig::from_json(
            r#"{
              "targets": {
                "nf01": { "host": "192.0.2.10", "user": "ops", "vendor": "v" }
              },
              "vendors": { "v": { "show_command": "show" } }
            }"#,
        )
        .unwrap();

        let listed = list_targets(&config);
        assert_eq!(listed.len(), 1);
        assert!(listed[0].contains("nf01"));
        assert!(listed[0].contains("192.0.2.10:22"));

        let info = target_info(&config, &["nf01".to_string(), "nf99".to_string()]);
        assert!(info[0].contains("host=192.0.2.10"));
        assert!(info[1].contains("not configured"));
    }

    #[test]
    fn test_run_one_unknown_target_is_session_failure() {
        let config = NetworkConfig::default();
        let reporter = nfctl_core::NullReporter;
        let status = run_one(&config, Mode::Up, "ghost", &reporter);
        assert_eq!(status, ProcessStatus::SSH_NG);
    }
}
