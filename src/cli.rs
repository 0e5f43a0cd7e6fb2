// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::document::check_key;
use crate::config::loader::DEFAULT_ENV_PREFIX;
use crate::sources::Source;

/// Command-line arguments for `ingest-config`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ingest-config",
    version,
    about = "Load, validate and resolve configuration for the genomics ingestion jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (JSON or TOML).
    ///
    /// Default: `ingest.json` in the current working directory.
    #[arg(value_name = "CONFIG", default_value = "ingest.json")]
    pub config: PathBuf,

    /// Resolve the job for this ingestion source and check its inputs.
    #[arg(long, short = 'm', value_enum, value_name = "SOURCE")]
    pub mode: Option<Source>,

    /// Also report unrecognised keys, and fail on any violation.
    #[arg(long)]
    pub strict: bool,

    /// Substitute a value before validation (repeatable), e.g.
    /// `--set db.host=mysql.internal`.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    /// Prefix for environment overrides (`<PREFIX>_DB_HOST`, ...).
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,

    /// Ignore environment overrides.
    #[arg(long)]
    pub no_env: bool,

    /// Print the normalised document as JSON (password included; handle with care).
    #[arg(long)]
    pub dump: bool,

    /// Keep running and re-validate whenever the config file changes.
    #[arg(long, conflicts_with_all = ["mode", "dump", "overrides"])]
    pub watch: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `INGEST_CONFIG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let Some((key, value)) = s.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{s}'"));
    };
    let key = key.trim();
    check_key("--set", key).map_err(|e| e.to_string())?;
    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_and_overrides() {
        let args = CliArgs::try_parse_from([
            "ingest-config",
            "conf/ingest.json",
            "--mode",
            "clinvar",
            "--set",
            "db.host=mysql.internal",
            "--set",
            "db.password=a=b",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("conf/ingest.json"));
        assert_eq!(args.mode, Some(Source::Clinvar));
        assert_eq!(
            args.overrides,
            vec![
                ("db.host".to_string(), "mysql.internal".to_string()),
                ("db.password".to_string(), "a=b".to_string()),
            ]
        );
        assert_eq!(args.env_prefix, "INGEST");
    }

    #[test]
    fn rejects_malformed_override() {
        assert!(CliArgs::try_parse_from(["ingest-config", "--set", "nokey"]).is_err());
        assert!(CliArgs::try_parse_from(["ingest-config", "--set", "=v"]).is_err());
        for bad in ["db..host=x", ".host=x", "db.=x", "-=x"] {
            assert!(
                CliArgs::try_parse_from(["ingest-config", "--set", bad]).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn watch_conflicts_with_mode() {
        assert!(CliArgs::try_parse_from(["ingest-config", "--watch", "--mode", "gtf"]).is_err());
    }
}
