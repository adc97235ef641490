//! Persisted key-value preferences.
//!
//! Stored as a flat JSON object. A missing file is an empty store; a corrupt
//! one is logged and replaced on the next save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::scene::SceneId;

/// Key under which the debug overlay remembers the scene to start in.
pub const PREFERRED_SCENE_KEY: &str = "tableau.debug.preferred-scene";

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to access preferences '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed preferences '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode preference '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct Preferences {
    path: Option<PathBuf>,
    values: BTreeMap<String, Value>,
}

impl Preferences {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Read preferences from `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| PrefsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PrefsError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            values,
        })
    }

    /// Like [`Preferences::load`], but starts empty when the file can't be read.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(&path) {
            Ok(prefs) => prefs,
            Err(err) => {
                log::warn!("{}; starting with defaults", err);
                Self {
                    path: Some(path),
                    values: BTreeMap::new(),
                }
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Typed lookup. Values of the wrong shape read as missing.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("ignoring preference '{}': {}", key, err);
                None
            }
        }
    }

    /// Store a value and write the file.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PrefsError> {
        let value = serde_json::to_value(value).map_err(|source| PrefsError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.values.insert(key.to_string(), value);
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), PrefsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            PrefsError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PrefsError::Io {
                path: path.clone(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| PrefsError::Io {
            path: path.clone(),
            source,
        })
    }

    pub fn preferred_scene(&self) -> Option<SceneId> {
        self.get::<String>(PREFERRED_SCENE_KEY).map(SceneId::from)
    }

    pub fn set_preferred_scene(&mut self, scene: &SceneId) -> Result<(), PrefsError> {
        self.set(PREFERRED_SCENE_KEY, scene.as_str())
    }

    pub fn clear_preferred_scene(&mut self) -> Result<(), PrefsError> {
        self.remove(PREFERRED_SCENE_KEY)
    }
}
