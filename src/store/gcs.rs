//! Google Cloud Storage (JSON API) blob store for story illustrations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{info, instrument};

use super::firestore::extract_google_error;
use super::BlobStore;
use crate::config::FirestoreConfig;
use crate::error::{ConfigError, StoreError};

const UPLOAD_ROOT: &str = "https://storage.googleapis.com/upload/storage/v1";
const PUBLIC_ROOT: &str = "https://storage.googleapis.com";

pub struct GcsBlobStore {
  client: reqwest::Client,
  bucket: String,
  access_token: Option<String>,
}

impl GcsBlobStore {
  pub fn new(cfg: &FirestoreConfig) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
    Ok(Self { client, bucket: cfg.bucket.clone(), access_token: cfg.access_token.clone() })
  }

  pub fn public_url(&self, path: &str) -> String {
    format!("{}/{}/{}", PUBLIC_ROOT, self.bucket, path)
  }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
  #[instrument(level = "info", skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
  async fn upload_png(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
    let url = format!("{}/b/{}/o", UPLOAD_ROOT, self.bucket);
    let mut req = self.client.post(url)
      .query(&[("uploadType", "media"), ("name", path), ("predefinedAcl", "publicRead")])
      .header(CONTENT_TYPE, "image/png")
      .body(bytes);
    if let Some(token) = &self.access_token {
      req = req.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let res = req.send().await?;
    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      return Err(StoreError::Status { status, message: extract_google_error(&body).unwrap_or(body) });
    }
    let public = self.public_url(path);
    info!(target: "store", %path, "Uploaded image");
    Ok(public)
  }
}
