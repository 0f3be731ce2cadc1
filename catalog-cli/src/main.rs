//! `catalog` - inspect and check catalog configuration documents.
//!
//! Commands:
//! - `catalog definitions <file>`: summarize a definitions document
//! - `catalog collection <file> [--public]`: list merged field configurations
//! - `catalog roundtrip <file> [--kind]`: parse, write, re-parse and compare
//! - `catalog split <item> --collection <file>`: public/private split of an item
//! - `catalog summary <item> --collection <file> --field <type>`: one-line field summary
//! - `catalog matches <item> --collection <file>`: evaluate collection rules for an item
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use catalog_cli::{run, Cli, CommandContext, Settings};

const DEBUG_FILTER: &str = "catalog_cli=debug,catalog_config=debug";
const FALLBACK_FILTER: &str = "warn";

fn main() {
    let cli = Cli::parse();
    std::process::exit(result_to_exit(execute(cli)));
}

/// Filter in force before settings are read, and whether settings may replace it.
///
/// `--debug` and `RUST_LOG` pin the filter; otherwise `log_filter` from settings
/// takes over once loaded.
fn startup_filter(debug: bool, rust_log: Option<&str>) -> (String, bool) {
    match (debug, rust_log) {
        (true, _) => (DEBUG_FILTER.to_string(), true),
        (false, Some(directives)) => (directives.to_string(), true),
        (false, None) => (FALLBACK_FILTER.to_string(), false),
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (directives, pinned) = startup_filter(cli.debug, rust_log.as_deref());

    // Initialize tracing before settings load so their logging is visible
    let (filter, handle) = reload::Layer::new(EnvFilter::new(directives));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let working_dir = std::env::current_dir().context("reading the working directory")?;
    let settings = Settings::load(&working_dir, cli.config.as_deref())?;
    if !pinned {
        handle
            .reload(EnvFilter::new(&settings.log_filter))
            .context("applying log_filter from settings")?;
    }

    let mut definitions = settings.definitions;
    definitions.extend(cli.definitions);
    let ctx = CommandContext {
        definitions,
        format: cli.format.unwrap_or(settings.format),
    };

    let output = run(cli.command, &ctx)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

/// Convert a `Result<(), E: Debug>` to an exit code.
fn result_to_exit<E: std::fmt::Debug>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_pins_debug_filter() {
        assert_eq!(startup_filter(true, Some("error")), (DEBUG_FILTER.to_string(), true));
    }

    #[test]
    fn test_rust_log_pins_filter() {
        assert_eq!(startup_filter(false, Some("info")), ("info".to_string(), true));
    }

    #[test]
    fn test_settings_may_replace_fallback_filter() {
        assert_eq!(startup_filter(false, None), (FALLBACK_FILTER.to_string(), false));
    }

    #[test]
    fn test_result_to_exit_ok() {
        let result: Result<(), String> = Ok(());
        assert_eq!(result_to_exit(result), 0);
    }

    #[test]
    fn test_result_to_exit_err() {
        let result: Result<(), String> = Err("something failed".to_string());
        assert_eq!(result_to_exit(result), 1);
    }
}
