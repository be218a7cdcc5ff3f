use std::path::Path;

use anyhow::Result;
use selfiebox_core::config::Config;

pub async fn run(config: Config, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        tracing::info!("Config file: {}", config_path.display());
    } else {
        tracing::info!("No config file at {}, using defaults", config_path.display());
    }
    selfiebox_bot::run(config).await
}
