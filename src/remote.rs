use crate::palette;
use crate::settings::Configuration;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Why a device request failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Unreachable, or the device answered with a non-2xx status
    #[error("network error: {0}")]
    Network(String),
    /// The device answered with a body we couldn't read
    #[error("malformed device response: {0}")]
    Decode(String),
    /// No API key configured; nothing was sent
    #[error("no API key configured")]
    NoApiKey,
}

/// Settings as the device API encodes them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSettings {
    pub colors: Vec<u32>,
    pub num_sparkles: u32,
    pub sparkle_size: u32,
    pub speed: u32,
}

impl From<&Configuration> for WireSettings {
    fn from(config: &Configuration) -> Self {
        Self {
            colors: config.colors(),
            num_sparkles: config.num_sparkles,
            sparkle_size: config.sparkle_size,
            speed: config.speed,
        }
    }
}

impl WireSettings {
    /// Map onto the palette. Settings with no palette color at all can't be
    /// represented, so they are a decode error rather than a guess.
    pub fn to_configuration(&self) -> Result<Configuration, RemoteError> {
        if !self.colors.iter().any(|&rgb| palette::index_of(rgb).is_some()) {
            return Err(RemoteError::Decode(format!(
                "no palette colors in {:x?}",
                self.colors
            )));
        }
        Ok(Configuration::from_colors(
            &self.colors,
            self.num_sparkles,
            self.sparkle_size,
            self.speed,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct WireGenerated {
    theme: String,
    #[serde(flatten)]
    settings: WireSettings,
}

/// A themed configuration suggested by the device's generator endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPreset {
    pub theme: String,
    pub configuration: Configuration,
}

/// Access to the device's current settings
pub trait RemoteSettingsClient: Send + Sync {
    fn has_api_key(&self) -> bool;
    fn fetch_current(&self) -> Result<Configuration, RemoteError>;
    fn push(&self, config: &Configuration) -> Result<(), RemoteError>;
    fn generate(&self) -> Result<GeneratedPreset, RemoteError>;
}

/// Device reached over HTTP
pub struct HttpRemote {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("sparkle-matrix/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn key(&self) -> Result<&str, RemoteError> {
        self.api_key.as_deref().ok_or(RemoteError::NoApiKey)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, RemoteError> {
        let key = self.key()?;
        let response = self
            .client
            .get(self.url(path))
            .query(&[("apiKey", key)])
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RemoteError::Network(format!(
                "GET /api/{} returned {}",
                path,
                response.status()
            )));
        }
        let body = response
            .text()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

impl RemoteSettingsClient for HttpRemote {
    fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch_current(&self) -> Result<Configuration, RemoteError> {
        let wire: WireSettings = self.get_json("settings")?;
        log::debug!("Device reports {:?}", wire);
        wire.to_configuration()
    }

    fn push(&self, config: &Configuration) -> Result<(), RemoteError> {
        let key = self.key()?;
        let body = WireSettings::from(config);
        let response = self
            .client
            .post(self.url("settings"))
            .query(&[("apiKey", key)])
            .json(&body)
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RemoteError::Network(format!(
                "POST /api/settings returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn generate(&self) -> Result<GeneratedPreset, RemoteError> {
        let generated: WireGenerated = self.get_json("generate")?;
        Ok(GeneratedPreset {
            configuration: generated.settings.to_configuration()?,
            theme: generated.theme,
        })
    }
}

#[derive(Debug)]
struct MemoryDevice {
    settings: WireSettings,
    online: bool,
    suggestion: Option<(String, WireSettings)>,
    pushes: usize,
}

/// In-process stand-in for the device.
///
/// Reports colors in reverse palette order, like a device that keeps its own
/// ordering.
#[derive(Debug)]
pub struct MemoryRemote {
    device: Mutex<MemoryDevice>,
    has_key: bool,
}

impl MemoryRemote {
    pub fn new(initial: &Configuration) -> Self {
        Self {
            device: Mutex::new(MemoryDevice {
                settings: WireSettings::from(initial),
                online: true,
                suggestion: None,
                pushes: 0,
            }),
            has_key: true,
        }
    }

    /// Same device, but the client has no key so every call short-circuits
    pub fn without_key(initial: &Configuration) -> Self {
        Self {
            has_key: false,
            ..Self::new(initial)
        }
    }

    #[cfg(test)]
    pub fn set_online(&self, online: bool) {
        self.with_device(|d| d.online = online);
    }

    pub fn set_suggestion(&self, theme: &str, config: &Configuration) {
        self.with_device(|d| d.suggestion = Some((theme.to_string(), WireSettings::from(config))));
    }

    #[cfg(test)]
    pub fn current(&self) -> Configuration {
        self.with_device(|d| d.settings.to_configuration().unwrap())
    }

    #[cfg(test)]
    pub fn push_count(&self) -> usize {
        self.with_device(|d| d.pushes)
    }

    fn with_device<T>(&self, f: impl FnOnce(&mut MemoryDevice) -> T) -> T {
        let mut device = match self.device.lock() {
            Ok(device) => device,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut device)
    }

    fn check(&self, device: &MemoryDevice) -> Result<(), RemoteError> {
        if !self.has_key {
            return Err(RemoteError::NoApiKey);
        }
        if !device.online {
            return Err(RemoteError::Network("device unreachable".to_string()));
        }
        Ok(())
    }
}

impl RemoteSettingsClient for MemoryRemote {
    fn has_api_key(&self) -> bool {
        self.has_key
    }

    fn fetch_current(&self) -> Result<Configuration, RemoteError> {
        self.with_device(|d| {
            self.check(d)?;
            d.settings.to_configuration()
        })
    }

    fn push(&self, config: &Configuration) -> Result<(), RemoteError> {
        self.with_device(|d| {
            self.check(d)?;
            let mut wire = WireSettings::from(config);
            wire.colors.reverse();
            d.settings = wire;
            d.pushes += 1;
            Ok(())
        })
    }

    fn generate(&self) -> Result<GeneratedPreset, RemoteError> {
        self.with_device(|d| {
            self.check(d)?;
            let (theme, settings) = d
                .suggestion
                .clone()
                .ok_or_else(|| RemoteError::Network("generator unavailable".to_string()))?;
            Ok(GeneratedPreset {
                theme,
                configuration: settings.to_configuration()?,
            })
        })
    }
}
