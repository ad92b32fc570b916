use crate::settings::Configuration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage key holding the whole preset collection
pub const PRESETS_KEY: &str = "sparkle-presets";

pub type PresetId = u64;

/// A named, persisted configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Creation time in milliseconds, bumped when needed to stay unique
    pub id: PresetId,
    pub name: String,
    #[serde(flatten)]
    pub configuration: Configuration,
}

/// Durable string key-value storage
pub trait Storage {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), String>;
}

/// One `<key>.json` file per key inside a directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the default storage directory path
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sparkle-matrix"))
    }

    fn path(&self, key: &str) -> PathBuf {
        // Sanitize filename
        let filename = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect::<String>();
        self.dir.join(format!("{}.json", filename))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create storage directory: {}", e))?;
        fs::write(self.path(key), value).map_err(|e| format!("Failed to write {}: {}", key, e))
    }
}

/// In-process storage, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), String> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Ordered preset collection backed by [`Storage`].
///
/// Read once when opened and rewritten in full on every change. Storage
/// problems are logged, never returned: the in-memory list stays authoritative.
pub struct PresetStore {
    storage: Box<dyn Storage>,
    presets: Vec<Preset>,
}

impl PresetStore {
    pub fn open(storage: Box<dyn Storage>) -> Self {
        let presets = match storage.read(PRESETS_KEY) {
            Some(content) => match serde_json::from_str::<Vec<Preset>>(&content) {
                Ok(presets) => presets
                    .into_iter()
                    .map(|p| Preset {
                        configuration: p.configuration.normalized(),
                        ..p
                    })
                    .collect(),
                Err(e) => {
                    log::warn!("Ignoring unreadable presets: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        log::info!("Loaded {} presets", presets.len());
        Self { storage, presets }
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    /// Append a preset, named `Preset {n}` when no name is given
    pub fn save(&mut self, name: Option<&str>, config: &Configuration) -> Preset {
        let name = match name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("Preset {}", self.presets.len() + 1),
        };
        let preset = Preset {
            id: self.next_id(),
            name,
            configuration: config.clone(),
        };
        self.presets.push(preset.clone());
        self.persist();
        log::info!("Saved preset {:?} ({})", preset.name, preset.id);
        preset
    }

    /// Remove a preset; returns false if it wasn't there
    pub fn delete(&mut self, id: PresetId) -> bool {
        let Some(pos) = self.presets.iter().position(|p| p.id == id) else {
            return false;
        };
        let removed = self.presets.remove(pos);
        self.persist();
        log::info!("Deleted preset {:?} ({})", removed.name, removed.id);
        true
    }

    fn next_id(&self) -> PresetId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let last = self.presets.iter().map(|p| p.id).max().unwrap_or(0);
        now.max(last + 1)
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.presets) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize presets: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.write(PRESETS_KEY, &json) {
            log::warn!("{}", e);
        }
    }
}

pub fn find_by_id(presets: &[Preset], id: PresetId) -> Option<&Preset> {
    presets.iter().find(|p| p.id == id)
}

/// First entry of `presets` matching `config`, in list order
pub fn find_matching<'a>(presets: &'a [Preset], config: &Configuration) -> Option<&'a Preset> {
    presets.iter().find(|p| p.configuration == *config)
}
