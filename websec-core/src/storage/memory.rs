use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use super::SessionStore;
use crate::error::{Result, SecurityError};

/// In-process session with an explicit start/end lifecycle.
#[derive(Debug)]
pub struct MemorySessionStore {
    entries: RwLock<Option<HashMap<String, Value>>>,
}

impl MemorySessionStore {
    /// A store with an active, empty session.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Some(HashMap::new())),
        }
    }

    /// A store whose session has not been started yet.
    pub fn unstarted() -> Self {
        Self {
            entries: RwLock::new(None),
        }
    }

    pub fn start(&self) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.is_none() {
            *entries = Some(HashMap::new());
        }
        Ok(())
    }

    /// Ends the session and drops every entry.
    pub fn end(&self) -> Result<()> {
        *self.entries.write().map_err(|_| poisoned())? = None;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.entries.read().map(|e| e.is_some()).unwrap_or(false)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let session = entries.as_ref().ok_or_else(not_started)?;
        Ok(session.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let session = entries.as_mut().ok_or_else(not_started)?;
        session.insert(key.to_string(), value);
        Ok(())
    }
}

fn not_started() -> SecurityError {
    SecurityError::SessionUnavailable("a session has not been started".to_string())
}

fn poisoned() -> SecurityError {
    SecurityError::SessionUnavailable("session lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_and_set() {
        let store = MemorySessionStore::new();
        assert!(store.get("missing").unwrap().is_none());

        store.set("csrf-token:form", json!({"token": "abc", "expire": 0})).unwrap();
        assert_eq!(
            store.get("csrf-token:form").unwrap(),
            Some(json!({"token": "abc", "expire": 0}))
        );
    }

    #[test]
    fn test_unstarted_session_is_unavailable() {
        let store = MemorySessionStore::unstarted();
        assert!(!store.is_active());
        assert!(matches!(store.get("k"), Err(SecurityError::SessionUnavailable(_))));
        assert!(matches!(store.set("k", json!(1)), Err(SecurityError::SessionUnavailable(_))));

        store.start().unwrap();
        assert!(store.is_active());
        store.set("k", json!(1)).unwrap();
    }

    #[test]
    fn test_end_drops_entries() {
        let store = MemorySessionStore::new();
        store.set("k", json!("v")).unwrap();
        store.end().unwrap();
        store.start().unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
