use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Largest accepted `analysis.stale_after_days`; keeps date arithmetic in range.
pub const MAX_STALE_AFTER_DAYS: i64 = 365 * 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: String,
    pub drive: DriveConfig,
    pub analysis: AnalysisConfig,
    pub deletion: DeletionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on records claimed per analysis pass.
    pub batch_size: usize,
    /// Files strictly larger than this are flagged.
    pub large_file_threshold_bytes: i64,
    /// Files last modified strictly longer ago than this are flagged.
    pub stale_after_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeletionConfig {
    pub parallelism: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "janitor.db".to_string(),
            drive: DriveConfig::default(),
            analysis: AnalysisConfig::default(),
            deletion: DeletionConfig::default(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            page_size: 1000,
            timeout_secs: 30,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            large_file_threshold_bytes: 100 * 1024 * 1024,
            stale_after_days: 730,
        }
    }
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.analysis.batch_size == 0 {
            return Err(Error::InvalidInput(
                "analysis.batch_size must be at least 1".to_string(),
            ));
        }
        if self.deletion.parallelism == 0 {
            return Err(Error::InvalidInput(
                "deletion.parallelism must be at least 1".to_string(),
            ));
        }
        if self.drive.page_size == 0 {
            return Err(Error::InvalidInput(
                "drive.page_size must be at least 1".to_string(),
            ));
        }
        if self.analysis.stale_after_days < 0 || self.analysis.large_file_threshold_bytes < 0 {
            return Err(Error::InvalidInput(
                "analysis thresholds must not be negative".to_string(),
            ));
        }
        if self.analysis.stale_after_days > MAX_STALE_AFTER_DAYS {
            return Err(Error::InvalidInput(format!(
                "analysis.stale_after_days must be at most {}",
                MAX_STALE_AFTER_DAYS
            )));
        }
        Ok(())
    }
}

/// Load `Config.toml` (optional) with `JANITOR_*` environment overrides,
/// e.g. `JANITOR_ANALYSIS__BATCH_SIZE=50`.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let config = build_configuration()?.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}

fn build_configuration() -> Result<Config, ConfigError> {
    Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("JANITOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
}
