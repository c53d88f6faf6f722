//! Firestore REST (v1) document backend.
//!
//! Documents travel as Firestore typed values (`{"stringValue": ...}`, `{"mapValue": ...}`);
//! `encode_fields` / `decode_fields` convert between those and plain JSON.
//! Firestore rejects arrays directly nested in arrays, so legacy positional word data
//! can be read from it but never written back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use tracing::{debug, instrument};

use super::DocumentBackend;
use crate::config::FirestoreConfig;
use crate::error::{ConfigError, StoreError};

const PAGE_SIZE: &str = "300";

pub struct FirestoreBackend {
  client: reqwest::Client,
  /// `.../v1/projects/{project}/databases/{db}/documents`
  documents_url: String,
  bearer: String,
}

impl FirestoreBackend {
  pub fn new(cfg: &FirestoreConfig) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

    // The emulator accepts "owner" as a token that bypasses security rules.
    let (root, bearer) = match (&cfg.emulator_host, &cfg.access_token) {
      (Some(host), _) => (format!("http://{}/v1", host), "owner".to_string()),
      (None, Some(token)) => ("https://firestore.googleapis.com/v1".to_string(), token.clone()),
      (None, None) => return Err(ConfigError::MissingVar("GOOGLE_ACCESS_TOKEN")),
    };
    let documents_url = format!("{}/projects/{}/databases/{}/documents", root, cfg.project_id, cfg.database);
    Ok(Self { client, documents_url, bearer })
  }

  fn doc_url(&self, collection: &str, id: &str) -> String {
    format!("{}/{}/{}", self.documents_url, collection, id)
  }
}

#[derive(Deserialize)]
struct FsDocument {
  #[serde(default)] name: String,
  #[serde(default)] fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct FsListResponse {
  #[serde(default)] documents: Vec<FsDocument>,
  #[serde(default, rename = "nextPageToken")] next_page_token: Option<String>,
}

#[async_trait]
impl DocumentBackend for FirestoreBackend {
  #[instrument(level = "debug", skip(self))]
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
    let res = self.client.get(self.doc_url(collection, id))
      .header(AUTHORIZATION, format!("Bearer {}", self.bearer))
      .send().await?;
    if res.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let res = check_status(res).await?;
    let doc: FsDocument = res.json().await?;
    Ok(Some(Value::Object(decode_fields(&doc.fields))))
  }

  #[instrument(level = "debug", skip(self, doc))]
  async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
    let fields = match &doc {
      Value::Object(m) => encode_fields(m),
      _ => return Err(StoreError::Decode { id: id.to_string(), message: "document body must be an object".into() }),
    };
    // PATCH without an update mask replaces every field and creates missing documents.
    let res = self.client.patch(self.doc_url(collection, id))
      .header(AUTHORIZATION, format!("Bearer {}", self.bearer))
      .json(&json!({ "fields": fields }))
      .send().await?;
    check_status(res).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
    let url = format!("{}/{}", self.documents_url, collection);
    let mut out = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
      let mut req = self.client.get(&url)
        .header(AUTHORIZATION, format!("Bearer {}", self.bearer))
        .query(&[("pageSize", PAGE_SIZE)]);
      if let Some(tok) = &page_token {
        req = req.query(&[("pageToken", tok.as_str())]);
      }
      let res = check_status(req.send().await?).await?;
      let page: FsListResponse = res.json().await?;
      for doc in page.documents {
        let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
        out.push((id, Value::Object(decode_fields(&doc.fields))));
      }
      match page.next_page_token {
        Some(tok) if !tok.is_empty() => page_token = Some(tok),
        _ => break,
      }
    }
    debug!(target: "store", %collection, documents = out.len(), "Listed collection");
    Ok(out)
  }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, StoreError> {
  if res.status().is_success() {
    return Ok(res);
  }
  let status = res.status().as_u16();
  let body = res.text().await.unwrap_or_default();
  Err(StoreError::Status { status, message: extract_google_error(&body).unwrap_or(body) })
}

/// Google APIs wrap errors as `{"error": {"message": ...}}`.
pub(crate) fn extract_google_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

pub fn encode_fields(m: &Map<String, Value>) -> Map<String, Value> {
  m.iter().map(|(k, v)| (k.clone(), encode_value(v))).collect()
}

pub fn encode_value(v: &Value) -> Value {
  match v {
    Value::Null => json!({ "nullValue": null }),
    Value::Bool(b) => json!({ "booleanValue": b }),
    Value::Number(n) => match n.as_i64() {
      Some(i) => json!({ "integerValue": i.to_string() }),
      None => json!({ "doubleValue": n.as_f64() }),
    },
    Value::String(s) => json!({ "stringValue": s }),
    Value::Array(items) => json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } }),
    Value::Object(m) => json!({ "mapValue": { "fields": encode_fields(m) } }),
  }
}

pub fn decode_fields(m: &Map<String, Value>) -> Map<String, Value> {
  m.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect()
}

/// Unknown or malformed typed values decode to `null`.
pub fn decode_value(v: &Value) -> Value {
  let Some((kind, inner)) = v.as_object().and_then(|o| o.iter().next()) else {
    return Value::Null;
  };
  match kind.as_str() {
    "stringValue" | "booleanValue" | "timestampValue" | "referenceValue" | "bytesValue" | "geoPointValue" => inner.clone(),
    "nullValue" => Value::Null,
    "integerValue" => match inner {
      Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
      Value::Number(n) => Value::Number(n.clone()),
      _ => Value::Null,
    },
    "doubleValue" => inner.as_f64().and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null),
    "arrayValue" => Value::Array(
      inner.get("values")
        .and_then(Value::as_array)
        .map(|vs| vs.iter().map(decode_value).collect())
        .unwrap_or_default(),
    ),
    "mapValue" => Value::Object(
      inner.get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .unwrap_or_default(),
    ),
    _ => Value::Null,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nested_document_encodes_and_decodes() {
    let doc = json!({
      "date": "2024-01-01",
      "words": ["a", "b"],
      "word_data": [{ "word": "a", "synonyms": ["x", "y"], "rank": 3, "score": 0.5, "ok": true, "note": null }],
      "story": ""
    });
    let fields = encode_fields(doc.as_object().unwrap());
    assert_eq!(fields["words"], json!({ "arrayValue": { "values": [{ "stringValue": "a" }, { "stringValue": "b" }] } }));
    assert_eq!(fields["word_data"]["arrayValue"]["values"][0]["mapValue"]["fields"]["rank"], json!({ "integerValue": "3" }));
    assert_eq!(Value::Object(decode_fields(&fields)), doc);
  }

  #[test]
  fn server_shapes_decode() {
    // Firestore omits `values`/`fields` for empty arrays and maps.
    assert_eq!(decode_value(&json!({ "arrayValue": {} })), json!([]));
    assert_eq!(decode_value(&json!({ "mapValue": {} })), json!({}));
    assert_eq!(decode_value(&json!({ "timestampValue": "2024-01-01T00:00:00Z" })), json!("2024-01-01T00:00:00Z"));
    assert_eq!(decode_value(&json!({ "integerValue": "nope" })), Value::Null);
    assert_eq!(decode_value(&json!("bare")), Value::Null);
  }

  #[test]
  fn emulator_config_uses_plain_http() {
    let cfg = FirestoreConfig {
      project_id: "demo".into(),
      database: "(default)".into(),
      emulator_host: Some("localhost:8080".into()),
      access_token: None,
      bucket: "demo.appspot.com".into(),
    };
    let fs = FirestoreBackend::new(&cfg).unwrap();
    assert_eq!(fs.doc_url("challenges", "2024-01-01"), "http://localhost:8080/v1/projects/demo/databases/(default)/documents/challenges/2024-01-01");
  }

  #[test]
  fn google_error_message() {
    assert_eq!(extract_google_error(r#"{"error":{"code":403,"message":"denied"}}"#).as_deref(), Some("denied"));
  }
}
