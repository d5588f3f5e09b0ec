//! Clarion configuration: where sounds live, how they are fetched, and the
//! sound manifest itself.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::types::{AudioFormat, SoundDescriptor};

/// Default crossfade duration in seconds.
pub const DEFAULT_CROSSFADE_SECS: f64 = 3.0;

/// Name of the config file inside the platform config directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Root that sound locators are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AssetRoot {
    /// Local directory.
    Directory(PathBuf),
    /// Remote base URL (`http` or `https`).
    Url(Url),
}

impl AssetRoot {
    /// Parse an asset root: `http(s)://` prefixes are URLs, anything else is a
    /// directory.
    pub fn parse(value: &str) -> Result<Self> {
        if value.starts_with("http://") || value.starts_with("https://") {
            let mut url = Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid asset URL {value}: {e}")))?;
            // Url::join drops the last segment unless the base ends in '/'
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            Ok(Self::Url(url))
        } else {
            Ok(Self::Directory(PathBuf::from(value)))
        }
    }

    /// Resolve a relative directory against `base`. URLs and absolute
    /// directories are returned unchanged.
    #[must_use]
    pub fn relative_to(self, base: &Path) -> Self {
        match self {
            Self::Directory(dir) if dir.is_relative() => Self::Directory(base.join(dir)),
            other => other,
        }
    }
}

impl Default for AssetRoot {
    fn default() -> Self {
        Self::Directory(PathBuf::from("."))
    }
}

impl TryFrom<String> for AssetRoot {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AssetRoot> for String {
    fn from(root: AssetRoot) -> Self {
        root.to_string()
    }
}

impl fmt::Display for AssetRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Output stream settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Preferred output device name. `None` selects the host default.
    #[serde(default)]
    pub device: Option<String>,
    /// Requested buffer size in frames. `None` lets the host decide.
    #[serde(default)]
    pub buffer_size: Option<u32>,
}

const fn default_crossfade_secs() -> f64 {
    DEFAULT_CROSSFADE_SECS
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarionConfig {
    /// Where sound locators are resolved.
    #[serde(default)]
    pub assets: AssetRoot,
    /// Forced container format. `None` runs the format probe.
    #[serde(default)]
    pub format: Option<AudioFormat>,
    /// Default crossfade duration in seconds.
    #[serde(default = "default_crossfade_secs")]
    pub crossfade_secs: f64,
    /// Output stream settings.
    #[serde(default)]
    pub output: OutputSettings,
    /// Sounds to register at startup.
    #[serde(default)]
    pub sounds: Vec<SoundDescriptor>,
}

impl Default for ClarionConfig {
    fn default() -> Self {
        Self {
            assets: AssetRoot::default(),
            format: None,
            crossfade_secs: DEFAULT_CROSSFADE_SECS,
            output: OutputSettings::default(),
            sounds: Vec::new(),
        }
    }
}

impl ClarionConfig {
    /// Platform default config path, e.g. `~/.config/clarion/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "clarion", "Clarion")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A relative asset directory is resolved against
    /// the directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        let mut config = Self::from_json(&text)?;
        if let Some(parent) = path.parent() {
            config.assets = config.assets.relative_to(parent);
        }

        info!(
            "Loaded {} sounds from {} (assets: {})",
            config.sounds.len(),
            path.display(),
            config.assets
        );
        Ok(config)
    }

    /// Load `path` if given, else the platform default path if it exists,
    /// else the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check ids are unique, volumes are non-negative and the crossfade
    /// duration is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.crossfade_secs.is_finite() || self.crossfade_secs <= 0.0 {
            return Err(Error::Config(format!(
                "crossfade_secs must be positive, got {}",
                self.crossfade_secs
            )));
        }

        let mut seen = HashSet::new();
        for sound in &self.sounds {
            sound
                .validate()
                .map_err(|e| Error::Config(e.to_string()))?;
            if !seen.insert(sound.id.as_str()) {
                return Err(Error::Config(format!("Duplicate sound id: {}", sound.id)));
            }
        }

        Ok(())
    }

    /// Sounds belonging to `group`.
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a SoundDescriptor> + 'a {
        self.sounds.iter().filter(move |s| s.in_group(group))
    }
}
