//! Runtime settings and logging setup.
//!
//! Settings are layered: the defaults below, then an optional settings file
//! in any format the `config` crate understands, then environment variables
//! prefixed with `THINGRAPH` using `__` between sections, for example
//! `THINGRAPH__STORE__MODE=sqlite`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, ThingraphError};
use crate::mapper::EntityMapper;
use crate::memory::MemoryStore;
use crate::persist::SqliteStore;
use crate::registry::TypeRegistry;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub mode: StoreMode,
    /// Database file for the sqlite mode; an in-memory database when absent.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// JSON type table, see [`TypeRegistry::from_json`].
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
}
impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: "info".to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub registry: RegistrySettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Loads the layered settings. A given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix("THINGRAPH").separator("__"));
        let settings: Settings = builder.build()?.try_deserialize()?;
        debug!(?settings, "settings loaded");
        Ok(settings)
    }
    /// The configured type registry, or an empty one when no table is set.
    pub fn registry(&self) -> Result<TypeRegistry> {
        match &self.registry.path {
            Some(path) => TypeRegistry::from_path(path),
            None => Ok(TypeRegistry::empty()),
        }
    }
    pub fn open_store(&self, mapper: Arc<EntityMapper>) -> Result<Box<dyn Store + Send>> {
        match self.store.mode {
            StoreMode::Memory => Ok(Box::new(MemoryStore::new(mapper))),
            StoreMode::Sqlite => Ok(Box::new(SqliteStore::from_settings(&self.store, mapper)?)),
        }
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over the configured
/// filter. Does nothing when a subscriber is already installed.
pub fn init_tracing(logging: &LoggingSettings) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.filter)
            .map_err(|e| ThingraphError::Config(format!("Invalid log filter '{}': {}", logging.filter, e)))?,
    };
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        debug!("tracing subscriber already installed");
    }
    Ok(())
}
