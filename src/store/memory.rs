//! In-process backends. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{BlobStore, DocumentBackend};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryBackend {
  collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
    let cols = self.collections.read().await;
    Ok(cols.get(collection).and_then(|c| c.get(id)).cloned())
  }

  async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
    let mut cols = self.collections.write().await;
    cols.entry(collection.to_string()).or_default().insert(id.to_string(), doc);
    Ok(())
  }

  async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
    let cols = self.collections.read().await;
    Ok(cols
      .get(collection)
      .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
      .unwrap_or_default())
  }
}

/// Keeps uploaded bytes in memory and hands out `memory://` URLs.
#[derive(Default)]
pub struct MemoryBlobStore {
  blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
  pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
    self.blobs.read().await.get(path).cloned()
  }

  pub async fn len(&self) -> usize {
    self.blobs.read().await.len()
  }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
  async fn upload_png(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
    self.blobs.write().await.insert(path.to_string(), bytes);
    Ok(format!("memory://{}", path))
  }
}
