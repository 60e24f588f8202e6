use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::{
    log,
    pool::{CacheSettings, PoolError, PoolResult},
};

// ----------------------------------------------
// CacheConfig
// ----------------------------------------------

// Per-template cache configuration. `name` matches the template name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub name: String,
    #[serde(flatten)]
    pub settings: CacheSettings,
}

impl CacheConfig {
    pub fn new(name: &str, settings: CacheSettings) -> Self {
        Self { name: name.to_string(), settings }
    }
}

// ----------------------------------------------
// PoolConfigs
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)] // Missing fields in the config file get defaults from PoolConfigs::default().
pub struct PoolConfigs {
    pub pool_name: String,
    pub log_level: log::Level,
    pub caches: Vec<CacheConfig>,
}

impl Default for PoolConfigs {
    fn default() -> Self {
        Self {
            pool_name: crate::pool::registry::DEFAULT_POOL_NAME.into(),
            log_level: log::Level::Info,
            caches: Vec::new(),
        }
    }
}

impl PoolConfigs {
    pub fn find(&self, name: &str) -> Option<&CacheConfig> {
        self.caches.iter().find(|config| config.name == name)
    }

    pub fn apply_log_level(&self) {
        log::set_level(self.log_level);
    }

    pub fn from_json_str(json: &str) -> PoolResult<Self> {
        serde_json::from_str(json).map_err(|err| PoolError::Config(err.to_string()))
    }

    pub fn to_json_string(&self, pretty_print: bool) -> PoolResult<String> {
        let result = if pretty_print {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        result.map_err(|err| PoolError::Config(err.to_string()))
    }

    pub fn try_load_file<P>(path: P) -> PoolResult<Self>
        where P: AsRef<Path>
    {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| PoolError::Config(format!("failed to read {path:?}: {err}")))?;
        Self::from_json_str(&json)
    }

    // Either succeeds loading the config file or returns a default config.
    pub fn load_file<P>(path: P) -> Self
        where P: AsRef<Path>
    {
        let path = path.as_ref();
        match Self::try_load_file(path) {
            Ok(configs) => configs,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to load pool configs from {path:?}: {err}");
                Self::default()
            }
        }
    }

    // Saves current configs to file.
    pub fn save_file<P>(&self, path: P) -> bool
        where P: AsRef<Path>
    {
        let path = path.as_ref();

        // Make sure the directory exists. Ignore any errors since this
        // might fail if any element of the path already exists.
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }

        let json = match self.to_json_string(true) {
            Ok(json) => json,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to serialize pool configs: {err}");
                return false;
            }
        };

        if let Err(err) = std::fs::write(path, json) {
            log::error!(log::channel!("config"), "Failed to write pool configs to {path:?}: {err}");
            return false;
        }

        true
    }
}

// ----------------------------------------------
// Unit Tests
// ----------------------------------------------
