use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, AppConfig};
use crate::gateway::RestGateway;
use crate::services::MarketContext;

pub const CONFIG_DIR_VAR: &str = "TAILOR_MARKET_CONFIG_DIR";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var(CONFIG_DIR_VAR) {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("tailor-market")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Where the signed-in session is kept between invocations.
pub fn session_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("session.json"))
}

/// Build a context over the configured backend and resume any saved session.
pub async fn connect() -> anyhow::Result<MarketContext> {
    let mut app_config: AppConfig = match config::config() {
        Some(installed) => installed.clone(),
        None => AppConfig::from_env()?,
    };
    if app_config.gateway.session_file.is_none() {
        app_config.gateway.session_file = Some(session_path()?);
    }

    let gateway = RestGateway::new(&app_config)?;
    let ctx = MarketContext::new(Arc::new(gateway));
    ctx.start().await;
    Ok(ctx)
}
