//! Wayfinder CLI: the main entry point.
//!
//! Commands:
//! - `plan`    Classify a request and print the plan it would get
//! - `run`     Run a request through the full loop against demo tools
//! - `config`  Show, validate or locate the configuration

use clap::{Parser, Subcommand};

mod commands;

use commands::RequestArgs;

#[derive(Parser)]
#[command(
    name = "wayfinder",
    about = "Wayfinder: classify, plan and dispatch notebook requests",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request and print its plan without running any tool
    Plan {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Run a request through classify, plan, dispatch and reflection
    Run {
        #[command(flatten)]
        request: RequestArgs,

        /// Print the outcome as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Print every domain event as it was published
        #[arg(long)]
        events: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (file + environment)
    Show {
        /// Render as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Print the built-in defaults as TOML
    Default,
    /// Validate the configuration file
    Validate,
    /// Show the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Plan { request } => commands::plan::run(request).await?,
        Commands::Run {
            request,
            json,
            events,
        } => commands::run::run(request, json, events).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => commands::config_cmd::show(json)?,
            ConfigAction::Default => commands::config_cmd::defaults(),
            ConfigAction::Validate => commands::config_cmd::validate()?,
            ConfigAction::Path => commands::config_cmd::path(),
        },
    }

    Ok(())
}
