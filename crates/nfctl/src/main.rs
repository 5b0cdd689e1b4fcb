//! # nfctl
//!
//! Operator CLI for transactional in/out-of-service switching of remote
//! network functions.
//!
//! ## Overview
//!
//! One invocation runs one mode against one or more configured targets,
//! sequentially:
//! - `up`/`down`: pre-check, transactional change, post-check
//! - `show`: read and classify the current status only
//! - `info`/`list`: print configuration, no session opened
//!
//! ## Architecture
//!
//! This is Layer 3 - the operator binary that ties together:
//! - nfctl-core: status model, configuration, reporting
//! - nfctl-session: session transport framer
//! - nfctl-engine: process state machine

mod runner;

use std::io::{BufRead, Write};

use nfctl_core::{Mode, NetworkConfig, TracingReporter};

use crate::runner::{list_targets, parse_args, run_batch, summarize, target_info, RunOptions};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        "nfctl starting: mode={}, config='{}', {} target(s)",
        options.mode,
        options.config_path,
        options.aliases.len()
    );

    let config = match NetworkConfig::from_file(&options.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Read-only configuration views never open a session.
    match options.mode {
        Mode::List => {
            for line in list_targets(&config) {
                println!("{line}");
            }
            return;
        }
        Mode::Info => {
            for line in target_info(&config, &options.aliases) {
                println!("{line}");
            }
            return;
        }
        _ => {}
    }

    // One-time confirm/abort gate, before any session opens.
    if options.mode.is_mutating() && !options.assume_yes && !confirm(&options) {
        tracing::info!("Aborted by operator before any session opened");
        std::process::exit(2);
    }

    let reporter = TracingReporter;
    let results = run_batch(&config, options.mode, &options.aliases, &reporter);

    tracing::info!("nfctl shutting down");
    std::process::exit(summarize(&results));
}

fn confirm(options: &RunOptions) -> bool {
    print!(
        "About to run '{}' against {} target(s): {}. Proceed? [y/N] ",
        options.mode,
        options.aliases.len(),
        options.aliases.join(", ")
    );
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}
