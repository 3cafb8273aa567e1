//! airtable-mcp: MCP server exposing Airtable to AI assistants
//!
//! Translates MCP tool calls into Airtable REST API requests. The personal
//! access token is read from `AIRTABLE_API_KEY` at startup.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use airtable_mcp::airtable::AirtableGateway;
use airtable_mcp::config::{self, ApiToken};
use airtable_mcp::mcp::server::McpServer;
use airtable_mcp::tools::ToolDispatcher;

/// MCP server exposing Airtable bases, tables and records.
///
/// Requires the `AIRTABLE_API_KEY` environment variable to hold an Airtable
/// personal access token.
#[derive(Parser, Debug)]
#[command(name = "airtable-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries MCP messages.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the airtable-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The token is required before anything is served
    let token = match ApiToken::from_env() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_url = %cfg.airtable.api_url,
        timeout_secs = cfg.airtable.timeout_secs,
        "Starting airtable-mcp server"
    );

    let gateway = match AirtableGateway::new(&token, &cfg.airtable) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "Failed to initialise Airtable gateway");
            return ExitCode::FAILURE;
        }
    };
    drop(token);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!("MCP server ready, waiting for client connection...");

    // The stdio handles must be created inside the runtime
    let result = runtime.block_on(async move {
        let mut server = McpServer::new(ToolDispatcher::new(gateway));
        server.run().await
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
