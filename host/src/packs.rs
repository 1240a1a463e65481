//! Compendium packs served from a directory of JSON files.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tabletop_engine::{error::Result, Error, SourceStore};

/// Read-only pack store.
///
/// A pack named `srd.items` lives at `<dir>/srd.items.json` and holds an
/// array of raw entries. Packs are read on first use and cached.
#[derive(Debug, Default)]
pub struct PackStore {
    dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Arc<Vec<Value>>>>,
}

impl PackStore {
    /// Create a store reading from `dir`, or an empty store for `None`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, pack: &str) -> Option<Arc<Vec<Value>>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pack)
            .cloned()
    }

    async fn load(&self, pack: &str) -> Result<Arc<Vec<Value>>> {
        if let Some(entries) = self.cached(pack) {
            return Ok(entries);
        }

        let not_found = || Error::NotFound {
            what: "pack".to_string(),
            key: pack.to_string(),
        };
        if pack.is_empty() || pack.contains(['/', '\\']) || pack.starts_with('.') {
            return Err(not_found());
        }
        let Some(dir) = &self.dir else {
            return Err(not_found());
        };

        let path = dir.join(format!("{pack}.json"));
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(Error::Request(format!("reading pack {pack}: {e}"))),
        };
        let entries: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidPayload(format!("pack {pack} is not a JSON array: {e}")))?;

        tracing::debug!(pack, entries = entries.len(), "pack loaded");

        let entries = Arc::new(entries);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pack.to_string(), Arc::clone(&entries));
        Ok(entries)
    }
}

impl SourceStore for PackStore {
    async fn fetch_entry(&self, source_name: &str, entry_id: &str) -> Result<Option<Value>> {
        let entries = self.load(source_name).await?;
        Ok(entries
            .iter()
            .find(|entry| entry.get("_id").and_then(Value::as_str) == Some(entry_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pack_dir(name: &str, packs: &[(&str, Value)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabletop-packs-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (pack, entries) in packs {
            std::fs::write(dir.join(format!("{pack}.json")), entries.to_string()).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn fetch_existing_entry() {
        let dir = pack_dir(
            "fetch",
            &[("srd.items", json!([{"_id": "rope", "name": "Rope"}]))],
        );
        let store = PackStore::new(Some(dir));

        let entry = store.fetch_entry("srd.items", "rope").await.unwrap();
        assert_eq!(entry, Some(json!({"_id": "rope", "name": "Rope"})));

        let missing = store.fetch_entry("srd.items", "lantern").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn missing_pack_is_not_found() {
        let store = PackStore::new(Some(pack_dir("missing", &[])));
        let err = store.fetch_entry("srd.spells", "fireball").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn path_traversal_is_not_found() {
        let store = PackStore::new(Some(pack_dir("traversal", &[])));
        let err = store.fetch_entry("../etc/passwd", "root").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn store_without_dir_has_no_packs() {
        let store = PackStore::new(None);
        let err = store.fetch_entry("srd.items", "rope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn malformed_pack_is_invalid_payload() {
        let dir = pack_dir("malformed", &[("broken", json!({"not": "an array"}))]);
        let store = PackStore::new(Some(dir));
        let err = store.fetch_entry("broken", "x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }
}
