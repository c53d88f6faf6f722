//! Persistence: a document store for challenges/idioms and a blob store for images.
//!
//! Backends only move raw JSON documents (`DocumentBackend`). `DocumentStore` layers the
//! typed collections on top, and that is where legacy shapes are normalized.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::StoreConfig;
use crate::domain::{ChallengeRecord, DailyIdiomRecord};
use crate::error::{ConfigError, StoreError};
use crate::normalize::{challenge_from_document, idioms_from_document};

pub mod firestore;
pub mod gcs;
pub mod memory;

pub use firestore::FirestoreBackend;
pub use gcs::GcsBlobStore;
pub use memory::{MemoryBackend, MemoryBlobStore};

pub const CHALLENGES: &str = "challenges";
pub const DAILY_IDIOMS: &str = "daily_idioms";

/// Raw document access keyed by collection and id.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
  /// `Ok(None)` when the document does not exist.
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

  /// Replace the whole document, creating it if absent. No preconditions: last writer wins.
  async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

  /// Every document in the collection as `(id, body)`, in no particular order.
  async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;
}

/// Image uploads.
#[async_trait]
pub trait BlobStore: Send + Sync {
  /// Upload PNG bytes at `path` and return a publicly readable URL.
  async fn upload_png(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError>;
}

/// Construct the document and blob stores named by configuration.
pub fn from_config(cfg: &StoreConfig) -> Result<(DocumentStore, Arc<dyn BlobStore>), ConfigError> {
  match cfg {
    StoreConfig::Memory => {
      info!(target: "store", "Using in-memory document store (data is lost on restart)");
      Ok((DocumentStore::memory(), Arc::new(MemoryBlobStore::default())))
    }
    StoreConfig::Firestore(fs) => {
      info!(target: "store", project = %fs.project_id, database = %fs.database, emulator = fs.emulator_host.is_some(), bucket = %fs.bucket, "Using Firestore document store");
      Ok((
        DocumentStore::new(Arc::new(FirestoreBackend::new(fs)?)),
        Arc::new(GcsBlobStore::new(fs)?),
      ))
    }
  }
}

/// Typed view over the `challenges` and `daily_idioms` collections.
#[derive(Clone)]
pub struct DocumentStore {
  backend: Arc<dyn DocumentBackend>,
}

impl DocumentStore {
  pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
    Self { backend }
  }

  /// In-memory store, mostly for tests and local runs.
  pub fn memory() -> Self {
    Self::new(Arc::new(MemoryBackend::default()))
  }

  pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
    &self.backend
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_challenge(&self, date: &str) -> Result<Option<ChallengeRecord>, StoreError> {
    match self.backend.get(CHALLENGES, date).await? {
      Some(doc) => Ok(Some(challenge_from_document(date, doc)?)),
      None => Ok(None),
    }
  }

  /// Whole-record upsert keyed by `record.date`.
  #[instrument(level = "debug", skip(self, record), fields(date = %record.date, words = record.words.len()))]
  pub async fn put_challenge(&self, record: &ChallengeRecord) -> Result<(), StoreError> {
    let doc = serde_json::to_value(record)?;
    self.backend.set(CHALLENGES, &record.date, doc).await
  }

  /// All challenges, newest date first. A document that cannot be decoded fails the
  /// whole read: a partial history would let its words be picked again.
  #[instrument(level = "debug", skip(self))]
  pub async fn list_challenges(&self) -> Result<Vec<ChallengeRecord>, StoreError> {
    let mut out = self.backend.list(CHALLENGES).await?
      .into_iter()
      .map(|(id, doc)| challenge_from_document(&id, doc))
      .collect::<Result<Vec<_>, _>>()?;
    out.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(out)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn get_idioms(&self, date: &str) -> Result<Option<DailyIdiomRecord>, StoreError> {
    match self.backend.get(DAILY_IDIOMS, date).await? {
      Some(doc) => Ok(Some(idioms_from_document(date, doc)?)),
      None => Ok(None),
    }
  }

  #[instrument(level = "debug", skip(self, record), fields(date = %record.date, idioms = record.idioms.len()))]
  pub async fn put_idioms(&self, record: &DailyIdiomRecord) -> Result<(), StoreError> {
    let doc = serde_json::to_value(record)?;
    self.backend.set(DAILY_IDIOMS, &record.date, doc).await
  }

  /// All idiom records, newest date first. Decode failures propagate.
  #[instrument(level = "debug", skip(self))]
  pub async fn list_idioms(&self) -> Result<Vec<DailyIdiomRecord>, StoreError> {
    let mut out = self.backend.list(DAILY_IDIOMS).await?
      .into_iter()
      .map(|(id, doc)| idioms_from_document(&id, doc))
      .collect::<Result<Vec<_>, _>>()?;
    out.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::WordEntry;
  use serde_json::json;

  fn full(date: &str) -> ChallengeRecord {
    ChallengeRecord {
      date: date.into(),
      words: vec!["x".into()],
      word_data: vec![WordEntry::new("x", "/x/", "def", "s", "a", "sent")],
      story: "A story.".into(),
      feedback: "Nice.".into(),
      story_image_url: "memory://story-images/a.png".into(),
    }
  }

  #[tokio::test]
  async fn absent_date_reads_none() {
    let store = DocumentStore::memory();
    assert!(store.get_challenge("2024-01-01").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn second_upsert_replaces_whole_record() {
    let store = DocumentStore::memory();
    let words_only = ChallengeRecord::words_only("2024-01-01", vec!["x".into()], vec![WordEntry::new("x", "", "", "", "", "")]);
    store.put_challenge(&words_only).await.unwrap();
    assert_eq!(store.get_challenge("2024-01-01").await.unwrap().unwrap(), words_only);

    let complete = full("2024-01-01");
    store.put_challenge(&complete).await.unwrap();
    assert_eq!(store.get_challenge("2024-01-01").await.unwrap().unwrap(), complete);
    assert_eq!(store.list_challenges().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn history_is_newest_first_and_normalized() {
    let store = DocumentStore::memory();
    store.backend().set(CHALLENGES, "2023-12-30", json!({
      "date": "2023-12-30",
      "words": ["old"],
      "word_data": [["old", "/əʊld/", "not new", "aged", "new", "An old tree."]]
    })).await.unwrap();
    store.put_challenge(&full("2024-01-02")).await.unwrap();
    store.put_challenge(&full("2024-01-01")).await.unwrap();

    let all = store.list_challenges().await.unwrap();
    let dates: Vec<_> = all.iter().map(|r| r.date.as_str()).collect();
    assert_eq!(dates, ["2024-01-02", "2024-01-01", "2023-12-30"]);
    assert_eq!(all[2].word_data[0].meaning, "not new");
  }

  #[tokio::test]
  async fn undecodable_challenge_fails_the_history_read() {
    let store = DocumentStore::memory();
    store.put_challenge(&full("2024-01-01")).await.unwrap();
    store.backend().set(CHALLENGES, "broken", json!({ "words": "not-a-list" })).await.unwrap();
    let err = store.list_challenges().await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { ref id, .. } if id == "broken"));
  }

  #[tokio::test]
  async fn idiom_records_round_trip_with_defaults() {
    let store = DocumentStore::memory();
    store.backend().set(DAILY_IDIOMS, "2024-01-01", json!({
      "date": "2024-01-01",
      "idioms": [{ "word": "spill the beans" }]
    })).await.unwrap();
    let rec = store.get_idioms("2024-01-01").await.unwrap().unwrap();
    assert_eq!(rec.idioms[0].forms, "N/A");
    assert!(rec.idioms[0].sentences.is_empty());
    assert_eq!(store.list_idioms().await.unwrap().len(), 1);
  }
}
