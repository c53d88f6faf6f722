//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic::{self, today_str};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_root() -> impl IntoResponse {
  Json(RootOut { message: "FluentLeap vocabulary API", version: env!("CARGO_PKG_VERSION") })
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_today(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let date = today_str();
  let rec = logic::today_challenge(&state, &date).await?;
  info!(target: "challenge", %date, words = rec.words.len(), state = ?rec.state(), "HTTP today served");
  Ok(Json(rec))
}

#[instrument(level = "info", skip(state, body), fields(story_len = body.story.len()))]
pub async fn http_post_story(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StoryIn>,
) -> Result<impl IntoResponse, AppError> {
  let date = today_str();
  let feedback = logic::submit_story(&state, &date, &body.story).await?;
  Ok(Json(FeedbackOut { feedback }))
}

#[instrument(level = "info", skip(state), fields(word = ?q.word))]
pub async fn http_get_lookup(
  State(state): State<Arc<AppState>>,
  Query(q): Query<WordQuery>,
) -> Result<impl IntoResponse, AppError> {
  let entry = logic::lookup(&state, q.word.as_deref()).await?;
  Ok(Json(entry))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_history(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let all = logic::history(&state).await?;
  info!(target: "challenge", days = all.len(), "HTTP history served");
  Ok(Json(all))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_review_words(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let words = logic::review_words(&state).await?;
  info!(target: "challenge", words = words.len(), "HTTP review words served");
  Ok(Json(words))
}

#[instrument(level = "info", skip(state), fields(word = ?q.word))]
pub async fn http_get_audio(
  State(state): State<Arc<AppState>>,
  Query(q): Query<WordQuery>,
) -> Result<impl IntoResponse, AppError> {
  let bytes = logic::audio(&state, q.word.as_deref()).await?;
  let disposition = format!("inline; filename=\"{}.mp3\"", header_safe(q.word.as_deref().unwrap_or_default().trim()));
  Ok(([(CONTENT_TYPE, "audio/mpeg".to_string()), (CONTENT_DISPOSITION, disposition)], bytes))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_grammar(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::grammar(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_today_idioms(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let date = today_str();
  let rec = logic::today_idioms(&state, &date).await?;
  info!(target: "idioms", %date, idioms = rec.idioms.len(), "HTTP idioms served");
  Ok(Json(rec))
}

/// Keep filenames inside a quoted header parameter.
fn header_safe(word: &str) -> String {
  word
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '\'' | ' ') { c } else { '_' })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::header_safe;

  #[test]
  fn filename_is_header_safe() {
    assert_eq!(header_safe("ice cream"), "ice cream");
    assert_eq!(header_safe("naïve\"x"), "na_ve_x");
  }
}
