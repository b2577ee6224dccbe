/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use soul_loudness::NormalizationTarget;
use soul_playback::NormalizerSettings;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "soul-loudness.toml";

/// Environment variable prefix (`SOUL_LOUDNESS_FETCH__TIMEOUT_SECS=30`)
pub const ENV_PREFIX: &str = "SOUL_LOUDNESS";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_normalizer")]
    pub normalizer: NormalizerSection,

    #[serde(default)]
    pub settings: NormalizerSettings,

    #[serde(default = "default_fetch")]
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NormalizerSection {
    /// Preset name (`streaming`, `replaygain`, `broadcast`) or LUFS value
    #[serde(default = "default_target")]
    pub target: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist. Without one, `soul-loudness.toml` in
    /// the working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with SOUL_LOUDNESS_)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.target()?;

        if self.fetch.timeout_secs == 0 {
            return Err(CliError::Config(
                "fetch timeout must be at least one second".to_string(),
            ));
        }
        if !self.settings.peak_ceiling_db.is_finite() || self.settings.peak_ceiling_db > 0.0 {
            return Err(CliError::Config(format!(
                "peak ceiling must be at or below 0 dBFS, got {}",
                self.settings.peak_ceiling_db
            )));
        }
        if !self.settings.max_gain_db.is_finite() || self.settings.max_gain_db < 0.0 {
            return Err(CliError::Config(format!(
                "max gain must be non-negative, got {}",
                self.settings.max_gain_db
            )));
        }

        Ok(())
    }

    /// Parsed normalization target
    pub fn target(&self) -> Result<NormalizationTarget> {
        NormalizationTarget::from_str(&self.normalizer.target)
            .ok_or_else(|| CliError::InvalidTarget(self.normalizer.target.clone()))
    }
}

// Default values
fn default_normalizer() -> NormalizerSection {
    NormalizerSection {
        target: default_target(),
    }
}

fn default_target() -> String {
    NormalizationTarget::default().as_string()
}

fn default_fetch() -> FetchSettings {
    FetchSettings {
        timeout_secs: default_timeout_secs(),
    }
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            normalizer: default_normalizer(),
            settings: NormalizerSettings::default(),
            fetch: default_fetch(),
        }
    }
}
