//! fluentleap-migrate · import a legacy TinyDB `db.json` into the configured document store.
//!
//! Uses the same store variables as the server (DOCUMENT_STORE, FIRESTORE_*, STORAGE_BUCKET,
//! GOOGLE_ACCESS_TOKEN); no model key is needed.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use fluentleap_backend::config::StoreConfig;
use fluentleap_backend::{migrate, store, telemetry};

/// Command line arguments for the migration tool
#[derive(Parser, Debug)]
#[command(name = "fluentleap-migrate", version, about, long_about = None)]
struct Args {
  /// TinyDB JSON file to import
  #[arg(long, default_value = "db.json")]
  db: PathBuf,

  /// Directory holding the files referenced as `/images/<file>`
  #[arg(long, default_value = "image_storage")]
  images: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();
  let args = Args::parse();

  let cfg = StoreConfig::from_env().inspect_err(|e| error!(target: "migrate", error = %e, "Invalid store configuration"))?;
  if matches!(cfg, StoreConfig::Memory) {
    info!(target: "migrate", "DOCUMENT_STORE=memory: entries are validated but not persisted");
  }
  let (docs, blobs) = store::from_config(&cfg)?;

  let report = migrate::migrate(&docs, blobs.as_ref(), &args.db, &args.images).await?;
  println!("{}", serde_json::to_string(&report)?);
  Ok(())
}
