//! FluentLeap · Vocabulary Backend
//!
//! - Axum JSON API
//! - OpenAI for word data, feedback, illustrations, idioms, grammar drills and speech
//! - Firestore + Cloud Storage persistence (or in-memory for local runs)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   WORD_LIST_PATH      : newline-separated word list (default "oxford_5000.txt")
//!   WORDS_PER_DAY       : default 5
//!   IDIOMS_PER_DAY      : default 3
//!   OPENAI_API_KEY      : required
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   DOCUMENT_STORE      : "firestore" (default) or "memory"
//!   FIRESTORE_PROJECT_ID, STORAGE_BUCKET, GOOGLE_ACCESS_TOKEN / FIRESTORE_EMULATOR_HOST
//!   AGENT_CONFIG_PATH   : path to TOML prompt overrides
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use fluentleap_backend::config::AppConfig;
use fluentleap_backend::routes::build_router;
use fluentleap_backend::state::AppState;
use fluentleap_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Configuration problems stop the process before it binds.
  let cfg = AppConfig::from_env().inspect_err(|e| error!(target: "fluentleap_backend", error = %e, "Invalid configuration"))?;
  let state = Arc::new(AppState::from_config(&cfg).inspect_err(|e| error!(target: "fluentleap_backend", error = %e, "Startup failed"))?);
  info!(target: "fluentleap_backend", words = state.words.len(), words_per_day = state.words_per_day, idioms_per_day = state.idioms_per_day, "State ready");

  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "fluentleap_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
