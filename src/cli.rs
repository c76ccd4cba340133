//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

/// LedgerLens - ask questions about construction cost ledgers
///
/// Answers natural-language questions about per-project cost ledgers
/// using a local model served by Ollama. Without --query it starts an
/// interactive prompt; type `exit` or `quit` to leave.
///
/// Examples:
///   ledgerlens --data-dir ./ledgers
///   ledgerlens --query "average cost of bridge works"
///   ledgerlens --query "sub-items of earthwork in p1.txt" --format json
///   ledgerlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the ledger files
    ///
    /// Defaults to `data`, or the value in .ledgerlens.toml.
    #[arg(short, long, value_name = "DIR", env = "LEDGERLENS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Ollama model used by the intent, finder and validator steps
    #[arg(short, long, env = "LEDGERLENS_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ledgerlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Timeout for each model call, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Time limit for answering one query, in seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Number of ledger files analysed at once
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Ledger file extension, without the dot
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Answer a single query and exit
    #[arg(short = 'Q', long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ledgerlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments. Usage errors exit with code 1.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(args) => args,
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
                _ => {
                    let _ = e.print();
                    std::process::exit(1);
                }
            },
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.deadline == Some(0) {
            return Err("Deadline must be at least 1 second".to_string());
        }

        if let Some(ref ext) = self.extension {
            if ext.is_empty() || ext.contains(['/', '\\']) {
                return Err(format!("Invalid ledger extension: {:?}", ext));
            }
        }

        if let Some(ref query) = self.query {
            if query.trim().is_empty() {
                return Err("Query must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data_dir: None,
            model: None,
            ollama_url: None,
            config: None,
            timeout: None,
            deadline: None,
            concurrency: None,
            format: None,
            extension: None,
            query: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_limits() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.deadline = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.extension = Some("../txt".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.init_config = true;
        args.concurrency = Some(0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "ledgerlens",
            "--data-dir",
            "ledgers",
            "--format",
            "json",
            "--concurrency",
            "4",
            "-Q",
            "average bridge cost",
        ])
        .unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("ledgers")));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.concurrency, Some(4));
        assert_eq!(args.query.as_deref(), Some("average bridge cost"));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
