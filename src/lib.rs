pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::config::AppConfig;

pub enum AppCommand {
    Serve,
    Rate { pairs: Vec<String> },
    Plan { request: PathBuf },
}

pub async fn run_command(command: AppCommand, config_path: Option<&Path>) -> Result<()> {
    info!("tripcraft {} starting...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(config_path)?.with_env();
    debug!(
        "Loaded config: listen={} fx_providers={} llm_model={}",
        config.server.listen_addr,
        config.fx.providers.len(),
        config.llm.model
    );

    match command {
        AppCommand::Serve => cli::serve::run(&config).await,
        AppCommand::Rate { pairs } => {
            let fx = api::fx_service_from_config(&config)?;
            cli::rate::run(&fx, &pairs).await
        }
        AppCommand::Plan { request } => {
            let planner = api::planner_from_config(&config)?;
            cli::plan::run(&planner, &request).await
        }
    }
}
