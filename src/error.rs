//! Error taxonomy: configuration (fatal at startup), store I/O, migration input, and
//! request-level errors.
//!
//! Model generation failures are deliberately absent: they never leave the
//! generator boundary and surface as `Outcome::Fallback` instead.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::error;

/// Missing or invalid startup configuration. The process does not serve traffic.
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("missing required environment variable {0}")]
  MissingVar(&'static str),

  #[error("invalid value for {var}: {value}")]
  InvalidVar { var: &'static str, value: String },

  #[error("word list {path} could not be read: {source}")]
  WordList { path: String, #[source] source: std::io::Error },

  #[error("word list has {found} distinct words, need at least {needed}")]
  TooFewWords { found: usize, needed: usize },

  #[error("agent config {path} is invalid: {message}")]
  AgentConfig { path: String, message: String },

  #[error("HTTP client could not be built: {0}")]
  HttpClient(String),
}

/// Document/blob store failures.
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("store transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("store returned HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("document {id} could not be decoded: {message}")]
  Decode { id: String, message: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Failures that stop a migration run before any entry is processed.
#[derive(Error, Debug)]
pub enum MigrateError {
  #[error("could not read {path}: {source}")]
  Read { path: String, #[source] source: std::io::Error },

  #[error("{path} is not valid JSON: {source}")]
  Parse { path: String, #[source] source: serde_json::Error },

  #[error("no 'challenges' entries found in {0}")]
  NoChallenges(String),
}

/// Errors a request handler can return.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  NotFound(String),

  #[error("No words available to load")]
  NoWordsAvailable,

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("{0}")]
  Upstream(String),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::NoWordsAvailable | AppError::Store(_) | AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "fluentleap_backend", error = %self, "Request failed");
    }
    (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_mapping() {
    assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::NoWordsAvailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let store = StoreError::Status { status: 503, message: "down".into() };
    assert_eq!(AppError::from(store).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
