//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - get-or-create of the day's challenge (word selection + vocab generation)
//!   - story submission (feedback, illustration, image upload, merge into the record)
//!   - lookup, history, review words, audio, grammar drills
//!   - get-or-create of the day's idioms

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ChallengeRecord, DailyIdiomRecord, GrammarChallenge, WordEntry};
use crate::error::AppError;
use crate::seeds::{fallback_idioms, placeholder_entry};
use crate::selector::{avoid_list, select_daily_idioms, select_daily_words};
use crate::state::AppState;

/// Upper bound on the idiom avoid-list sent to the model.
const IDIOM_AVOID_LIMIT: usize = 200;

/// Today's key, `YYYY-MM-DD` in server local time.
pub fn today_str() -> String {
  chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Return the challenge for `date`, creating it on first access.
///
/// Creation is serialized within this process and re-checks the store after taking
/// the lock. Separate processes can still race; the later write wins.
#[instrument(level = "info", skip(state), fields(%date))]
pub async fn today_challenge(state: &AppState, date: &str) -> Result<ChallengeRecord, AppError> {
  if let Some(rec) = state.store.get_challenge(date).await? {
    debug!(target: "challenge", %date, state = ?rec.state(), "Serving existing challenge");
    return Ok(rec);
  }

  let _guard = state.challenge_lock.lock().await;
  if let Some(rec) = state.store.get_challenge(date).await? {
    debug!(target: "challenge", %date, "Challenge created by a concurrent request");
    return Ok(rec);
  }

  let history = state.store.list_challenges().await?;
  let selection = {
    let mut rng = rand::thread_rng();
    select_daily_words(&history, &state.words, state.words_per_day, &mut rng)
  };
  if selection.words.is_empty() {
    return Err(AppError::NoWordsAvailable);
  }
  if selection.degraded {
    warn!(target: "challenge", %date, picked = selection.words.len(), wanted = state.words_per_day, history = history.len(), "Word list exhausted; serving a degraded selection");
  }

  let generated = state.generator.generate_vocab_batch(&selection.words).await;
  let origin = generated.origin();
  if generated.is_fallback() {
    warn!(target: "challenge", %date, "Model unavailable; storing placeholder word data");
  }
  let word_data = align_word_data(&selection.words, generated.into_inner());

  let record = ChallengeRecord::words_only(date, selection.words, word_data);
  state.store.put_challenge(&record).await?;
  info!(target: "challenge", %date, words = ?record.words, %origin, degraded = selection.degraded, "Created daily challenge");
  Ok(record)
}

/// One entry per word, matched by word text (case-insensitive) rather than position.
/// Words the model skipped get a placeholder; extra entries are discarded.
pub fn align_word_data(words: &[String], entries: Vec<WordEntry>) -> Vec<WordEntry> {
  let mut by_word: HashMap<String, WordEntry> = HashMap::new();
  for e in entries {
    by_word.entry(e.word.trim().to_lowercase()).or_insert(e);
  }
  words
    .iter()
    .map(|w| by_word.remove(&w.trim().to_lowercase()).unwrap_or_else(|| placeholder_entry(w)))
    .collect()
}

/// Store the user's story for `date` with model feedback and an illustration.
/// Re-submission overwrites story, feedback and image (last story wins).
#[instrument(level = "info", skip(state, story), fields(%date, story_len = story.len()))]
pub async fn submit_story(state: &AppState, date: &str, story: &str) -> Result<String, AppError> {
  if story.trim().is_empty() {
    return Err(AppError::BadRequest("No story provided".into()));
  }
  let record = state.store.get_challenge(date).await?.ok_or_else(|| {
    AppError::NotFound("Today's challenge not found. Please GET /api/today first.".into())
  })?;

  let feedback = state.generator.generate_feedback(story).await;
  info!(target: "challenge", %date, origin = feedback.origin(), feedback_len = feedback.as_ref().len(), "Story feedback ready");
  let feedback = feedback.into_inner();

  let story_image_url = match state.generator.generate_illustration(story).await.into_inner() {
    Some(bytes) => upload_illustration(state, date, bytes).await,
    None => String::new(),
  };

  let updated = ChallengeRecord {
    story: story.to_string(),
    feedback: feedback.clone(),
    story_image_url,
    ..record
  };
  state.store.put_challenge(&updated).await?;
  info!(target: "challenge", %date, has_image = !updated.story_image_url.is_empty(), "Story saved");
  Ok(feedback)
}

/// Upload failures degrade to "no image".
async fn upload_illustration(state: &AppState, date: &str, bytes: Vec<u8>) -> String {
  let path = format!("story-images/story-{}-{}.png", date, Uuid::new_v4());
  match state.blobs.upload_png(&path, bytes).await {
    Ok(url) => {
      info!(target: "challenge", %date, %url, "Illustration uploaded");
      url
    }
    Err(e) => {
      warn!(target: "challenge", %date, %path, error = %e, "Illustration upload failed; saving story without image");
      String::new()
    }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn lookup(state: &AppState, word: Option<&str>) -> Result<WordEntry, AppError> {
  let word = required_word(word)?;
  let entry = state.generator.lookup_word(word).await;
  debug!(target: "fluentleap_backend", %word, origin = entry.origin(), "Lookup served");
  Ok(entry.into_inner())
}

#[instrument(level = "info", skip(state))]
pub async fn history(state: &AppState) -> Result<Vec<ChallengeRecord>, AppError> {
  Ok(state.store.list_challenges().await?)
}

/// Every word seen so far, once each, in random order.
#[instrument(level = "info", skip(state))]
pub async fn review_words(state: &AppState) -> Result<Vec<WordEntry>, AppError> {
  let history = state.store.list_challenges().await?;
  let mut unique = unique_word_entries(&history);
  unique.shuffle(&mut rand::thread_rng());
  Ok(unique)
}

/// First entry per `word` in history order.
pub fn unique_word_entries(history: &[ChallengeRecord]) -> Vec<WordEntry> {
  let mut seen = HashSet::new();
  history
    .iter()
    .flat_map(|r| r.word_data.iter())
    .filter(|e| seen.insert(e.word.clone()))
    .cloned()
    .collect()
}

/// MPEG pronunciation of a word, synthesized on every call.
#[instrument(level = "info", skip(state))]
pub async fn audio(state: &AppState, word: Option<&str>) -> Result<Vec<u8>, AppError> {
  let word = required_word(word)?;
  state
    .speech
    .synthesize(word)
    .await
    .map_err(|e| AppError::Upstream(format!("Failed to generate audio: {}", e)))
}

#[instrument(level = "info", skip(state))]
pub async fn grammar(state: &AppState) -> GrammarChallenge {
  let g = state.generator.generate_grammar_challenge().await;
  debug!(target: "fluentleap_backend", origin = g.origin(), "Grammar challenge served");
  g.into_inner()
}

/// Return the idioms for `date`, creating them once on first access.
#[instrument(level = "info", skip(state), fields(%date))]
pub async fn today_idioms(state: &AppState, date: &str) -> Result<DailyIdiomRecord, AppError> {
  if let Some(rec) = state.store.get_idioms(date).await? {
    return Ok(rec);
  }

  let _guard = state.idiom_lock.lock().await;
  if let Some(rec) = state.store.get_idioms(date).await? {
    return Ok(rec);
  }

  let history = state.store.list_idioms().await?;
  let avoid = avoid_list(&history, IDIOM_AVOID_LIMIT);
  let generated = state.generator.generate_idiom_batch(&avoid, state.idioms_per_day).await;
  let origin = generated.origin();

  let selection = {
    let mut rng = rand::thread_rng();
    select_daily_idioms(generated.into_inner(), state.idioms_per_day, &fallback_idioms(), &mut rng)
  };
  if selection.degraded {
    warn!(target: "idioms", %date, picked = selection.idioms.len(), wanted = state.idioms_per_day, %origin, "Serving a degraded idiom selection");
  }

  let record = DailyIdiomRecord { date: date.to_string(), idioms: selection.idioms };
  state.store.put_idioms(&record).await?;
  info!(target: "idioms", %date, count = record.idioms.len(), %origin, "Created daily idioms");
  Ok(record)
}

fn required_word(word: Option<&str>) -> Result<&str, AppError> {
  match word.map(str::trim) {
    Some(w) if !w.is_empty() => Ok(w),
    _ => Err(AppError::BadRequest("No word parameter provided".into())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| w.to_string()).collect()
  }

  #[test]
  fn alignment_is_by_word_text() {
    let entries = vec![
      WordEntry::new("Cherry", "/c/", "fruit c", "", "", ""),
      WordEntry::new("apple", "/a/", "fruit a", "", "", ""),
      WordEntry::new("zebra", "/z/", "animal", "", "", ""),
    ];
    let out = align_word_data(&words(&["apple", "banana", "cherry"]), entries);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].meaning, "fruit a");
    assert_eq!(out[1], placeholder_entry("banana"));
    assert_eq!(out[2].meaning, "fruit c");
  }

  #[test]
  fn unique_entries_keep_first_occurrence() {
    let newer = ChallengeRecord::words_only("2024-01-02", words(&["a", "b"]), vec![
      WordEntry::new("a", "", "newer a", "", "", ""),
      WordEntry::new("b", "", "b", "", "", ""),
    ]);
    let older = ChallengeRecord::words_only("2024-01-01", words(&["a"]), vec![
      WordEntry::new("a", "", "older a", "", "", ""),
    ]);
    let out = unique_word_entries(&[newer, older]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].meaning, "newer a");
  }

  #[test]
  fn word_parameter_is_required() {
    assert!(matches!(required_word(None), Err(AppError::BadRequest(_))));
    assert!(matches!(required_word(Some("  ")), Err(AppError::BadRequest(_))));
    assert_eq!(required_word(Some(" ice ")).unwrap(), "ice");
  }

  #[test]
  fn today_is_iso_date() {
    let d = today_str();
    assert!(chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d").is_ok());
  }
}
