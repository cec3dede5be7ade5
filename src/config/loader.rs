//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::usecases::fallback::MAX_BATCH_SIZE;

/// Default config path when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    users = config.dashboard.user_ids.len(),
    batch_size = config.ltp.batch_size,
    poll_interval_secs = config.ltp.poll_interval_secs,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.backend.base_url.trim().is_empty(),
    "Backend base_url must not be empty"
  );
  if let Some(ws_url) = &config.backend.ws_url {
    anyhow::ensure!(!ws_url.trim().is_empty(), "Backend ws_url must not be empty when set");
  }
  anyhow::ensure!(
    config.backend.max_concurrent > 0,
    "max_concurrent must be positive"
  );

  anyhow::ensure!(
    (1..=MAX_BATCH_SIZE).contains(&config.ltp.batch_size),
    "ltp.batch_size must be in [1, {MAX_BATCH_SIZE}], got {}",
    config.ltp.batch_size
  );
  anyhow::ensure!(
    config.ltp.poll_interval_secs > 0,
    "ltp.poll_interval_secs must be positive"
  );

  for (i, user) in config.dashboard.user_ids.iter().enumerate() {
    anyhow::ensure!(!user.trim().is_empty(), "dashboard.user_ids[{i}] is empty");
  }

  Ok(())
}
