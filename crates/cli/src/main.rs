//! IronJudge CLI: the main entry point.
//!
//! Commands:
//! - `run`: Drive the engine toward an objective in the terminal
//! - `serve`: Start the HTTP/SSE gateway
//! - `tools`: Print the tool catalog the model sees
//! - `check`: Sanity-check the local tools (bash, python, file I/O)
//! - `init`: Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ironjudge",
    about = "IronJudge: autonomous think/act/observe execution runtime",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.ironjudge/config.toml
    #[arg(short, long, global = true, env = "IRONJUDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine on an objective
    Run {
        /// The objective; prompted for on stdin when omitted
        objective: Option<String>,

        /// Print raw telemetry events as JSON lines
        #[arg(long)]
        json: bool,

        /// Override the iteration budget
        #[arg(short, long)]
        max_iterations: Option<u32>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the registered tools
    Tools,

    /// Check that the local tools work
    Check,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so `run --json` keeps stdout clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            objective,
            json,
            max_iterations,
        } => commands::run::run(config_path, objective, json, max_iterations).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Tools => commands::tools::run(config_path)?,
        Commands::Check => commands::check::run(config_path).await?,
        Commands::Init { force } => commands::init::run(config_path, force)?,
    }

    Ok(())
}
