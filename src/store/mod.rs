pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use anyhow::{Context, Result};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::debug;

/// Name of the collection holding expenses and rates.
pub const LEDGER_COLLECTION: &str = "ledger";

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens (or creates) the on-disk keyspace under `data_path/store`.
    pub fn open(data_path: &Path) -> Result<Self> {
        let store_dir = data_path.join("store");
        std::fs::create_dir_all(&store_dir)
            .with_context(|| format!("Failed to create directory: {}", store_dir.display()))?;
        let keyspace = fjall::Config::new(&store_dir)
            .open()
            .with_context(|| format!("Failed to open store at {}", store_dir.display()))?;
        debug!("Opened store at {}", store_dir.display());

        Ok(Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: Some(keyspace),
        })
    }

    /// A store without disk backing; only non-persisted collections are available.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if create_if_missing {
            let mut collections = self
                .collections
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !collections.contains_key(name) {
                let new_collection: Option<Arc<dyn KeyValueCollection>> = if persist {
                    self.keyspace.as_ref().and_then(|ks| {
                        ks.open_partition(name, PartitionCreateOptions::default())
                            .map_err(|e| debug!("Failed to open partition {}: {}", name, e))
                            .ok()
                            .map(|partition| {
                                Arc::new(DiskCollection::new(ks.clone(), partition))
                                    as Arc<dyn KeyValueCollection>
                            })
                    })
                } else {
                    Some(Arc::new(MemoryCollection::new()))
                };

                match new_collection {
                    Some(collection) => {
                        collections.insert(name.to_string(), collection);
                    }
                    None => return None,
                }
            }
        }

        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        collections.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_persisted_collection_is_shared() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();

        let first = store.get_collection(LEDGER_COLLECTION, true, true).unwrap();
        first.put(b"rate-2024-03-01", b"1300").await.unwrap();

        let second = store.get_collection(LEDGER_COLLECTION, true, false).unwrap();
        assert_eq!(second.get(b"rate-2024-03-01").await, Some(b"1300".to_vec()));
    }

    #[test]
    fn test_missing_collection_without_create() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("other", false, false).is_none());
        assert!(store.get_collection("other", false, true).is_some());
    }

    #[test]
    fn test_in_memory_store_cannot_persist() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection(LEDGER_COLLECTION, true, true).is_none());
    }
}
