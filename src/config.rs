use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::play::matcher::Timing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "GenerationConfig::default_key")]
    pub key: String,
    #[serde(default = "GenerationConfig::default_timesig")]
    pub timesig: String,
    #[serde(default = "GenerationConfig::default_difficulty")]
    pub difficulty: String,
    #[serde(default = "GenerationConfig::default_max_poly")]
    pub max_poly: u8,
    #[serde(default = "GenerationConfig::default_target_count")]
    pub target_count: usize,
}

impl GenerationConfig {
    fn default_key() -> String {
        "C".to_string()
    }
    fn default_timesig() -> String {
        "4/4".to_string()
    }
    fn default_difficulty() -> String {
        "easy".to_string()
    }
    fn default_max_poly() -> u8 {
        4
    }
    fn default_target_count() -> usize {
        24
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            key: Self::default_key(),
            timesig: Self::default_timesig(),
            difficulty: Self::default_difficulty(),
            max_poly: Self::default_max_poly(),
            target_count: Self::default_target_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "PlaybackConfig::default_bpm")]
    pub bpm: f32,
}

impl PlaybackConfig {
    fn default_bpm() -> f32 {
        90.0
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            bpm: Self::default_bpm(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub timing: Timing,
}

impl AppConfig {
    /// Read the config if present; otherwise write a fully commented default
    /// file and return the defaults. Parse failures fall back to defaults
    /// with a warning rather than aborting.
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("failed to parse config {path}: {err}; using defaults");
                    }
                },
                Err(err) => {
                    warn!("failed to read config {path}: {err}; using defaults");
                }
            }
            return Self::default();
        }

        // File does not exist: write commented defaults and return them.
        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                let mut commented = String::new();
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        commented.push('\n');
                    } else if trimmed.starts_with('[') && trimmed.ends_with(']') {
                        commented.push_str(line);
                        commented.push('\n');
                    } else {
                        commented.push_str("# ");
                        commented.push_str(line);
                        commented.push('\n');
                    }
                }
                if let Err(err) = fs::write(path_obj, commented) {
                    warn!("failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                warn!("failed to serialize default config: {err}");
            }
        }
        default_cfg
    }
}
