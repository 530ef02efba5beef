//! Configuration for karst world generation.
//!
//! Settings persist to disk as RON files. Unknown fields are ignored and
//! missing sections fall back to defaults, so configs stay forward and
//! backward compatible. Cave-biome generators receive free-form subtrees
//! keyed by generator id; each generator interprets its own keys.

mod config;
mod error;

pub use config::{
    CONFIG_FILE, Config, ConfigValue, DebugConfig, GeneratorConfig, SurfaceConfig, WorldConfig,
    WorldGenConfig,
};
pub use error::ConfigError;
