//! Registry persistence
//!
//! The registry's structural state (symbols, enabled flags, display names) is
//! written as JSON after every structural mutation:
//!
//! ```json
//! { "markets": { "GC=F": "enabled", "CL=F": "disabled" },
//!   "marketNames": { "GC=F": "Gold" } }
//! ```
//!
//! Object key order is preserved on both read and write, so 1-based command
//! indices survive a restart. Snapshots are never persisted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::registry::{MarketEntry, MarketRegistry};

/// Persisted enabled flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Enabled,
    Disabled,
}

impl MarketStatus {
    pub fn is_enabled(self) -> bool {
        self == MarketStatus::Enabled
    }
}

impl From<bool> for MarketStatus {
    fn from(enabled: bool) -> Self {
        if enabled {
            MarketStatus::Enabled
        } else {
            MarketStatus::Disabled
        }
    }
}

/// On-disk document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default, with = "ordered_map")]
    pub markets: Vec<(String, MarketStatus)>,
    #[serde(default, with = "ordered_map")]
    pub market_names: Vec<(String, String)>,
}

impl PersistedState {
    pub(crate) fn from_entries(entries: &[MarketEntry]) -> Self {
        Self {
            markets: entries
                .iter()
                .map(|e| (e.symbol.clone(), MarketStatus::from(e.enabled)))
                .collect(),
            market_names: entries
                .iter()
                .filter_map(|e| e.display_name.clone().map(|n| (e.symbol.clone(), n)))
                .collect(),
        }
    }
}

/// JSON objects as ordered `(key, value)` lists
mod ordered_map {
    use std::fmt;
    use std::marker::PhantomData;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, V>(entries: &Vec<(String, V)>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Vec<(String, V)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Persistence failures. Logged by callers, never fatal.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed state file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON file holding the persisted registry
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry; a missing or corrupt file yields an empty registry
    pub fn load(&self) -> MarketRegistry {
        match self.try_load() {
            Ok(Some(state)) => {
                let registry = MarketRegistry::from_persisted(&state);
                info!(
                    path = %self.path.display(),
                    markets = registry.len(),
                    "Loaded market registry"
                );
                registry
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No state file, starting with empty registry");
                MarketRegistry::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load state file, starting with empty registry");
                MarketRegistry::new()
            }
        }
    }

    /// Read the state file; `Ok(None)` when it does not exist
    pub fn try_load(&self) -> Result<Option<PersistedState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let state = serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Overwrite the state file with `state`
    ///
    /// Writes a sibling temp file and renames it over the target so a crash
    /// mid-write never leaves a truncated document.
    pub fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}
