//! The config schema and its on-disk RON form.
//!
//! Every section defaults itself, so a partial or outdated `karst.ron`
//! still loads; unknown keys are ignored rather than rejected.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level karst configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World identity and seed.
    pub world: WorldConfig,
    /// Surface height field parameters.
    pub surface: SurfaceConfig,
    /// Cave biome generator settings.
    pub cavegen: WorldGenConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World identity settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed driving every deterministic generator.
    pub seed: u64,
    /// Display name of the world.
    pub name: String,
}

/// Surface height field settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Number of fBm octaves for the height field.
    pub octaves: u32,
    /// Frequency of the broadest octave.
    pub base_frequency: f64,
    /// Amplitude of the broadest octave in world units.
    pub amplitude: f64,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Constant height offset added to every column.
    pub base_height: i32,
}

/// Cave biome generation settings: one free-form subtree per generator id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldGenConfig {
    /// Per-generator option subtrees, keyed by generator id.
    pub generators: HashMap<String, GeneratorConfig>,
}

impl WorldGenConfig {
    /// The subtree for a generator id, or an empty one. Generators whose id
    /// has no entry decide for themselves what their defaults are.
    pub fn generator(&self, id: &str) -> GeneratorConfig {
        self.generators.get(id).cloned().unwrap_or_default()
    }
}

/// A free-form option bag for one generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig(pub HashMap<String, ConfigValue>);

impl GeneratorConfig {
    /// Whether the subtree carries no options at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    /// Numeric option; integers widen to f64.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A list option whose elements are all strings.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        match self.0.get(key)? {
            ConfigValue::List(items) => items
                .iter()
                .map(|v| match v {
                    ConfigValue::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

/// A single untyped option value inside a generator subtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            name: "karst".to_string(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            octaves: 6,
            base_frequency: 0.001,
            amplitude: 400.0,
            lacunarity: 2.0,
            persistence: 0.5,
            base_height: 0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: String::new(),
        }
    }
}

// --- persistence ---

/// File name used inside the config directory.
pub const CONFIG_FILE: &str = "karst.ron";

impl Config {
    /// Load the config from `dir`, seeding the directory with a default
    /// `karst.ron` on first run.
    ///
    /// Reads first and treats "not found" as the first-run signal, so there
    /// is no exists-then-read window.
    pub fn load_or_create(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::parse(&path, &text)?;
                tracing::debug!(path = %path.display(), "config loaded");
                Ok(config)
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save(dir)?;
                tracing::info!(path = %path.display(), "seeded default config");
                Ok(config)
            }
            Err(source) => Err(ConfigError::Io {
                op: "read",
                path,
                source,
            }),
        }
    }

    /// Write the config into `dir`, creating the directory as needed.
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let rendered = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::Encode)?;
        let path = dir.join(CONFIG_FILE);
        let written =
            std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, rendered));
        written.map_err(|source| ConfigError::Io {
            op: "write",
            path,
            source,
        })
    }

    /// Check the file for out-of-band edits.
    ///
    /// Returns `Some` carrying the fresh config when the on-disk contents
    /// no longer describe `self`. A missing file is an error here, not a
    /// first run: something deleted the config out from under us.
    pub fn reload(&self, dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            op: "read",
            path: path.clone(),
            source,
        })?;
        let fresh = Self::parse(&path, &text)?;
        if fresh == *self {
            return Ok(None);
        }
        tracing::info!(path = %path.display(), "config changed on disk");
        Ok(Some(fresh))
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }
}
