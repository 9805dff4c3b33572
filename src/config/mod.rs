// Configuration management for wavepeek
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{bail, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioSettings,
    pub sampling: SamplingConfig,
    pub visualization: VisualizationConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub volume: f32, // 0.0 to 1.0
    pub fft_size: usize,
    pub smoothing: f32, // analyser time smoothing, 0.0 = none
    pub min_db: f32,
    pub max_db: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub progress_interval_ms: u64,
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub group_size: usize, // raw bins averaged into one bar
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub user_agent: String,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 0.8,
            fft_size: 512,  // 256 bins
            smoothing: 0.8, // same as the web analyser default
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 250,
            frame_interval_ms: 16, // ~60fps
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self { group_size: 8 }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("wavepeek/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SamplingConfig {
    // tokio intervals panic on a zero period, so these never go below 1ms
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if !(0.0..=1.0).contains(&audio.volume) {
            bail!("audio.volume must be within 0.0..=1.0, got {}", audio.volume);
        }
        if !audio.fft_size.is_power_of_two() || !(32..=32768).contains(&audio.fft_size) {
            bail!("audio.fft_size must be a power of two in 32..=32768, got {}", audio.fft_size);
        }
        if !(0.0..=1.0).contains(&audio.smoothing) {
            bail!("audio.smoothing must be within 0.0..=1.0, got {}", audio.smoothing);
        }
        if audio.min_db >= audio.max_db {
            bail!("audio.min_db ({}) must be below audio.max_db ({})", audio.min_db, audio.max_db);
        }
        if self.sampling.progress_interval_ms == 0 || self.sampling.frame_interval_ms == 0 {
            bail!("sampling intervals must be greater than zero");
        }
        if self.visualization.group_size == 0 {
            bail!("visualization.group_size must be at least 1");
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("wavepeek");

        Ok(config_dir.join("config.toml"))
    }
}
