use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tripcraft::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for tripcraft::AppCommand {
    fn from(cmd: Commands) -> tripcraft::AppCommand {
        match cmd {
            Commands::Serve => tripcraft::AppCommand::Serve,
            Commands::Rate { pairs } => tripcraft::AppCommand::Rate { pairs },
            Commands::Plan { request } => tripcraft::AppCommand::Plan { request },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP API server
    Serve,
    /// Look up exchange rates, e.g. `rate USD EUR` or `rate EGP/AED`
    Rate {
        #[arg(required = true, num_args = 1..)]
        pairs: Vec<String>,
    },
    /// Generate an itinerary for a trip request JSON file
    Plan {
        /// Path to the trip request
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => tripcraft::cli::setup::setup(cli.config_path.as_deref()),
        Some(cmd) => tripcraft::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
