use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::SessionStore;
use crate::error::{Result, SecurityError};

/// Session persisted as a JSON object on disk, rewritten on every `set`.
pub struct FileSessionStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, Value>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let cache = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                // The file may hold keys owned by others; refuse it rather than overwrite it
                serde_json::from_str(&content).map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable session file");
                    SecurityError::Serialization(e)
                })?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, cache: &HashMap<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(cache)?;

        // Write then rename so readers of the file never see a partial record
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let cache = self.cache.read().map_err(|_| {
            SecurityError::SessionUnavailable("session lock poisoned".to_string())
        })?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| {
            SecurityError::SessionUnavailable("session lock poisoned".to_string())
        })?;

        let mut updated = cache.clone();
        updated.insert(key.to_string(), value);

        // Cache only changes once the file holds the same entries
        self.save(&updated)?;
        *cache = updated;
        Ok(())
    }
}
