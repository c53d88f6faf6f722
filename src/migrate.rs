//! One-off import of the legacy TinyDB `db.json` into the document store.
//!
//! Two layouts exist in the wild: `{"challenges": {"1": {...}, "2": {...}}}` and
//! `{"challenges": [{...}, {...}]}`. Each entry is normalized to the keyed word-data
//! shape and upserted with its date as the document id, so re-running is harmless.
//! Local illustrations referenced as `/images/<file>` are re-uploaded to the blob store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::MigrateError;
use crate::normalize::challenge_from_document;
use crate::store::{BlobStore, DocumentStore};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
  pub migrated: usize,
  pub failed: usize,
}

/// Pull the challenge entries out of a TinyDB dump. An empty table counts as missing.
pub fn parse_tinydb(text: &str, path: &str) -> Result<Vec<Value>, MigrateError> {
  let data: Value = serde_json::from_str(text)
    .map_err(|e| MigrateError::Parse { path: path.to_string(), source: e })?;
  let entries: Vec<Value> = match data.get("challenges") {
    Some(Value::Object(docs)) => docs.values().cloned().collect(),
    Some(Value::Array(docs)) => docs.clone(),
    _ => Vec::new(),
  };
  if entries.is_empty() {
    return Err(MigrateError::NoChallenges(path.to_string()));
  }
  Ok(entries)
}

/// `/images/<file>` → `<images_dir>/<file>`.
pub fn local_image_path(images_dir: &Path, old_url: &str) -> PathBuf {
  let file = old_url.strip_prefix("/images/").unwrap_or(old_url).trim_start_matches('/');
  images_dir.join(file)
}

/// Import every entry. Per-entry problems are counted and logged; only unreadable
/// input aborts the run.
#[instrument(level = "info", skip(store, blobs))]
pub async fn migrate(
  store: &DocumentStore,
  blobs: &dyn BlobStore,
  db_path: &Path,
  images_dir: &Path,
) -> Result<MigrationReport, MigrateError> {
  let path = db_path.display().to_string();
  let text = tokio::fs::read_to_string(db_path)
    .await
    .map_err(|e| MigrateError::Read { path: path.clone(), source: e })?;
  let entries = parse_tinydb(&text, &path)?;
  info!(target: "migrate", %path, entries = entries.len(), "Read legacy entries");

  let mut report = MigrationReport::default();
  for entry in entries {
    let date = match entry.get("date").and_then(Value::as_str).filter(|d| !d.trim().is_empty()) {
      Some(d) => d.to_string(),
      None => {
        warn!(target: "migrate", "Skipping entry with no date");
        report.failed += 1;
        continue;
      }
    };
    let old_url = entry.get("story_image_url").and_then(Value::as_str).unwrap_or_default().to_string();

    let mut record = match challenge_from_document(&date, entry) {
      Ok(r) => r,
      Err(e) => {
        warn!(target: "migrate", %date, error = %e, "Skipping undecodable entry");
        report.failed += 1;
        continue;
      }
    };
    record.story_image_url = migrate_image(blobs, images_dir, &date, &old_url).await;

    match store.put_challenge(&record).await {
      Ok(()) => {
        info!(target: "migrate", %date, words = record.words.len(), has_image = !record.story_image_url.is_empty(), "Migrated entry");
        report.migrated += 1;
      }
      Err(e) => {
        warn!(target: "migrate", %date, error = %e, "Upsert failed");
        report.failed += 1;
      }
    }
  }

  info!(target: "migrate", migrated = report.migrated, failed = report.failed, "Migration complete");
  Ok(report)
}

/// New public URL, or "" when there is no image, the file is gone, or the upload fails.
async fn migrate_image(blobs: &dyn BlobStore, images_dir: &Path, date: &str, old_url: &str) -> String {
  if old_url.is_empty() {
    return String::new();
  }
  let local = local_image_path(images_dir, old_url);
  let bytes = match tokio::fs::read(&local).await {
    Ok(b) => b,
    Err(e) => {
      warn!(target: "migrate", %date, path = %local.display(), error = %e, "Image file not found; skipping image");
      return String::new();
    }
  };
  let target = format!("story-images/migrated-{}-{}.png", date, Uuid::new_v4());
  match blobs.upload_png(&target, bytes).await {
    Ok(url) => url,
    Err(e) => {
      warn!(target: "migrate", %date, error = %e, "Image upload failed");
      String::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Lexemes;
  use crate::store::MemoryBlobStore;
  use serde_json::json;

  #[test]
  fn both_tinydb_layouts_parse() {
    let dict = json!({ "challenges": { "1": { "date": "2024-01-01" }, "2": { "date": "2024-01-02" } } });
    assert_eq!(parse_tinydb(&dict.to_string(), "db.json").unwrap().len(), 2);

    let list = json!({ "challenges": [{ "date": "2024-01-01" }] });
    assert_eq!(parse_tinydb(&list.to_string(), "db.json").unwrap().len(), 1);

    let empty = json!({ "_default": {} });
    assert!(matches!(parse_tinydb(&empty.to_string(), "db.json"), Err(MigrateError::NoChallenges(_))));
    assert!(matches!(parse_tinydb("{", "db.json"), Err(MigrateError::Parse { .. })));
  }

  #[test]
  fn image_paths_map_into_local_dir() {
    let dir = Path::new("image_storage");
    assert_eq!(local_image_path(dir, "/images/abc.png"), PathBuf::from("image_storage/abc.png"));
    assert_eq!(local_image_path(dir, "abc.png"), PathBuf::from("image_storage/abc.png"));
  }

  #[tokio::test]
  async fn entries_are_normalized_and_images_reuploaded() {
    let tmp = tempfile::tempdir().unwrap();
    let images = tmp.path().join("image_storage");
    std::fs::create_dir(&images).unwrap();
    std::fs::write(images.join("day1.png"), [0x89, b'P', b'N', b'G']).unwrap();

    let db = json!({ "challenges": {
      "1": {
        "date": "2024-01-01",
        "words": ["brave"],
        "word_data": [["brave", "/breɪv/", "showing courage", "bold", "cowardly", "She was brave."]],
        "story": "A brave cat.",
        "feedback": "Good.",
        "story_image_url": "/images/day1.png"
      },
      "2": { "words": ["orphan"] },
      "3": {
        "date": "2024-01-02",
        "words": ["calm"],
        "word_data": [{ "word": "calm", "synonyms": ["quiet", "still"] }],
        "story_image_url": "/images/missing.png"
      }
    }});
    let db_path = tmp.path().join("db.json");
    std::fs::write(&db_path, db.to_string()).unwrap();

    let store = DocumentStore::memory();
    let blobs = MemoryBlobStore::default();
    let report = migrate(&store, &blobs, &db_path, &images).await.unwrap();
    assert_eq!(report, MigrationReport { migrated: 2, failed: 1 });

    let day1 = store.get_challenge("2024-01-01").await.unwrap().unwrap();
    assert_eq!(day1.word_data[0].meaning, "showing courage");
    assert_eq!(day1.story, "A brave cat.");
    assert!(day1.story_image_url.starts_with("memory://story-images/migrated-2024-01-01-"));
    assert_eq!(blobs.len().await, 1);

    let day2 = store.get_challenge("2024-01-02").await.unwrap().unwrap();
    assert_eq!(day2.story_image_url, "");
    assert_eq!(day2.word_data[0].synonyms, Lexemes::List(vec!["quiet".into(), "still".into()]));

    // Re-running upserts the same ids.
    migrate(&store, &blobs, &db_path, &images).await.unwrap();
    assert_eq!(store.list_challenges().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn unreadable_db_aborts() {
    let store = DocumentStore::memory();
    let blobs = MemoryBlobStore::default();
    let err = migrate(&store, &blobs, Path::new("/nonexistent/db.json"), Path::new("img")).await.unwrap_err();
    assert!(matches!(err, MigrateError::Read { .. }));
  }
}
