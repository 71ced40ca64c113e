//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{BotError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP_)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    // APP_UPBIT__ACCESS_KEY style overrides
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| BotError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| BotError::Configuration(e.to_string()))
}

/// Load credentials-bearing configuration from environment variables only
///
/// Reads `UPBIT_ACCESS_KEY` / `UPBIT_SECRET_KEY` and
/// `TELEGRAM_TOKEN` / `TELEGRAM_CHAT_ID`, everything else defaulted.
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut cfg = AppConfig {
        upbit: super::types::UpbitConfig {
            access_key: std::env::var("UPBIT_ACCESS_KEY").ok(),
            secret_key: std::env::var("UPBIT_SECRET_KEY").ok(),
            ..Default::default()
        },
        telegram: None,
        trading: Default::default(),
        risk: Default::default(),
        settings: Default::default(),
    };

    if let (Ok(token), Ok(chat_id)) = (
        std::env::var("TELEGRAM_TOKEN"),
        std::env::var("TELEGRAM_CHAT_ID"),
    ) {
        cfg.telegram = Some(super::types::TelegramConfig {
            bot_token: token,
            chat_id,
            api_url: "https://api.telegram.org".to_string(),
        });
    }

    Ok(cfg)
}
