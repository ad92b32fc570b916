use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEVICE_URL: &str = "http://sparkle-matrix.local";

/// Application configuration, read from a JSON file and overridden by CLI flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Base URL of the device API (without the `/api` suffix)
    pub device_url: String,
    /// Key sent as `apiKey`; without one, device sync is disabled
    pub api_key: Option<String>,
    /// Directory holding the preset storage file
    pub presets_dir: Option<PathBuf>,
    /// How long "Applied" stays on the button
    pub applied_hold_ms: u64,
    /// Press duration that counts as a long press on a preset
    pub long_press_ms: u64,
}

impl AppConfig {
    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// Import config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sparkle-matrix").join("config.json"))
    }

    pub fn applied_hold(&self) -> Duration {
        Duration::from_millis(self.applied_hold_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            device_url: DEFAULT_DEVICE_URL.to_string(),
            api_key: None,
            presets_dir: None,
            applied_hold_ms: 1500,
            long_press_ms: 500,
        }
    }
}
