//! LedgerLens - question answering over construction cost ledgers
//!
//! A CLI tool that uses a local Ollama model to route questions about
//! per-project cost ledgers to one of two analyses: the sub-items of a
//! work package in one project, or the average cost of a work category
//! across all projects.
//!
//! Exit codes:
//!   0 - Success, including leaving the interactive prompt
//!   1 - Invalid arguments or startup failure

mod agent;
mod analysis;
mod cli;
mod config;
mod error;
mod ledger;
mod models;
mod report;
mod workflow;

use agent::{LlmCandidateFinder, LlmCandidateValidator, LlmIntentPlanner, OllamaClient, Ports};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::QueryReport;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workflow::QueryEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("LedgerLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Startup failed: {}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .ledgerlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the data directory, model, and limits.");
    Ok(())
}

/// Initialize logging based on verbosity settings. Logs go to stderr so
/// reports on stdout stay clean.
fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Build the engine and answer one query or run the interactive prompt.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let client = Arc::new(OllamaClient::new(config.llm_config())?);
    let ports = Ports::new(
        Arc::new(LlmIntentPlanner::new(client.clone())),
        Arc::new(LlmCandidateFinder::new(client.clone())),
        Arc::new(LlmCandidateValidator::new(client.clone())),
    );

    let settings = config.engine_settings(!args.quiet);
    let engine = QueryEngine::new(ports, settings);
    let format = config.general.format;

    info!(
        "Model {} at {}, ledgers in {}",
        client.model_name(),
        config.model.ollama_url,
        engine.settings().data_dir.display()
    );

    if let Some(ref query) = args.query {
        let report = engine.answer(query).await;
        return print_report(&report, format);
    }

    run_repl(BufReader::new(tokio::io::stdin()), &engine, format).await?;
    Ok(())
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Blank,
    Exit,
    Query(&'a str),
}

fn parse_repl_line(line: &str) -> ReplCommand<'_> {
    let query = line.trim();
    if query.is_empty() {
        ReplCommand::Blank
    } else if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
        ReplCommand::Exit
    } else {
        ReplCommand::Query(query)
    }
}

const PROMPT: &str = "\nquestion> ";

/// JSON output keeps stdout for reports only.
fn prompt_on_stderr(format: OutputFormat) -> bool {
    format == OutputFormat::Json
}

fn write_prompt(format: OutputFormat, text: &str) -> Result<()> {
    let mut out: Box<dyn Write> = if prompt_on_stderr(format) {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };
    write!(out, "{}", text).context("Failed to write prompt")?;
    out.flush().context("Failed to flush prompt")
}

/// Read-query-print loop. Ends on `exit`, `quit`, or end of input.
/// Returns the number of queries answered.
async fn run_repl<R>(input: R, engine: &QueryEngine, format: OutputFormat) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0;

    loop {
        write_prompt(format, PROMPT)?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            write_prompt(format, "\n")?;
            break;
        };

        let query = match parse_repl_line(&line) {
            ReplCommand::Blank => continue,
            ReplCommand::Exit => break,
            ReplCommand::Query(query) => query,
        };

        let report = engine.answer(query).await;
        answered += 1;
        if let Err(e) = print_report(&report, format) {
            warn!("Could not print report: {}", e);
        }
    }

    info!("Bye after {} queries", answered);
    Ok(answered)
}

fn print_report(report: &QueryReport, format: OutputFormat) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Text => report::generate_text_report(report),
    };
    println!("{}", output);
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
