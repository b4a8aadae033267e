use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::{debug, warn};

/// A collection backed by a `fjall` partition. Every write is synced to disk
/// before `put` returns.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.partition.get(key) {
            Ok(Some(value)) => {
                debug!("Disk HIT for key: {}", String::from_utf8_lossy(key));
                Some(value.to_vec())
            }
            Ok(None) => {
                debug!("Disk MISS for key: {}", String::from_utf8_lossy(key));
                None
            }
            Err(e) => {
                warn!("Failed to read key {}: {}", String::from_utf8_lossy(key), e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.partition
            .insert(key, value)
            .with_context(|| format!("Failed to write key: {}", String::from_utf8_lossy(key)))?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist store to disk")?;
        debug!("Disk PUT for key: {}", String::from_utf8_lossy(key));
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.partition
            .prefix(prefix)
            .map(|item| {
                let (k, v) = item?;
                Ok::<_, anyhow::Error>((k.to_vec(), v.to_vec()))
            })
            .collect()
    }
}
