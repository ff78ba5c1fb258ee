// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::options::{Preset, RateControl};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Location of the FFmpeg build carrying the SVT-HEVC plugin. The
    /// only required external configuration; defaults to PATH lookup.
    #[serde(default = "default_ffmpeg_binary")]
    pub binary: PathBuf,

    /// ffprobe used for media inspection.
    #[serde(default = "default_ffprobe_binary")]
    pub ffprobe: PathBuf,

    /// Seconds a cancelled encode gets to exit before it is killed.
    #[serde(default = "default_cancel_grace_secs")]
    pub cancel_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default preset for new encodes.
    #[serde(default = "default_preset")]
    pub preset: Preset,

    /// Default rate control mode.
    #[serde(default = "default_rate_control")]
    pub rate_control: RateControl,

    /// Default quality value (CRF for crf mode, kbps otherwise).
    #[serde(default = "default_quality")]
    pub quality: i64,

    /// Whether encodes may replace existing output files.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_ffmpeg_binary() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_binary() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_cancel_grace_secs() -> u64 {
    5
}

fn default_preset() -> Preset {
    Preset::Medium
}

fn default_rate_control() -> RateControl {
    RateControl::Crf
}

fn default_quality() -> i64 {
    23
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary: default_ffmpeg_binary(),
            ffprobe: default_ffprobe_binary(),
            cancel_grace_secs: default_cancel_grace_secs(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            rate_control: default_rate_control(),
            quality: default_quality(),
            overwrite: false, // Default to rejecting existing outputs
        }
    }
}

impl EncoderConfig {
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("svtenc")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("svtenc")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or fall back to built-in defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            let config: Config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;

            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a default config file if it doesn't exist
    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            let config = Config::default();
            config.save()?;
        }
        Ok(())
    }
}
