//! Converting persisted lexical data into the canonical keyed shape.
//!
//! Two encodings of the same entry exist in stored documents:
//!   - positional: `["word", "/ipa/", "meaning", "syn1,syn2", "ant1,ant2", "sentence", ...]`
//!   - keyed:      `{"word": ..., "ipa": ..., ...}`
//! They are resolved here, once, so the rest of the backend only sees `WordEntry`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{value_text, ChallengeRecord, DailyIdiomRecord, IdiomEntry, Lexemes, WordEntry};
use crate::error::StoreError;

const POSITIONAL_FIELDS: usize = 6;

/// One element of a stored `word_data` array, before normalization.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawWordData {
  Positional(Vec<Value>),
  Keyed(WordEntry),
  Other(Value),
}

/// Positional entries with at least six items become keyed entries, keyed entries
/// pass through unchanged, anything else is dropped. Never fails.
pub fn normalize(raw: Vec<RawWordData>) -> Vec<WordEntry> {
  raw.into_iter().filter_map(normalize_one).collect()
}

fn normalize_one(raw: RawWordData) -> Option<WordEntry> {
  match raw {
    RawWordData::Keyed(entry) => Some(entry),
    RawWordData::Positional(items) if items.len() >= POSITIONAL_FIELDS => Some(WordEntry {
      word: value_text(&items[0]),
      ipa: value_text(&items[1]),
      meaning: value_text(&items[2]),
      synonyms: Lexemes::from_value(&items[3]),
      antonyms: Lexemes::from_value(&items[4]),
      sentence: value_text(&items[5]),
      extra: Map::new(),
    }),
    RawWordData::Positional(_) | RawWordData::Other(_) => None,
  }
}

#[derive(Deserialize)]
struct StoredChallenge {
  #[serde(default)] date: String,
  #[serde(default)] words: Vec<String>,
  #[serde(default)] word_data: Vec<RawWordData>,
  #[serde(default)] story: Option<String>,
  #[serde(default)] feedback: Option<String>,
  #[serde(default)] story_image_url: Option<String>,
}

/// Decode a stored challenge document (any historical shape) into a `ChallengeRecord`.
/// The document id is the date; it wins when the body lacks a `date` field.
pub fn challenge_from_document(id: &str, doc: Value) -> Result<ChallengeRecord, StoreError> {
  let stored: StoredChallenge = serde_json::from_value(doc)
    .map_err(|e| StoreError::Decode { id: id.to_string(), message: e.to_string() })?;
  let date = if stored.date.is_empty() { id.to_string() } else { stored.date };
  Ok(ChallengeRecord {
    date,
    words: stored.words,
    word_data: normalize(stored.word_data),
    story: stored.story.unwrap_or_default(),
    feedback: stored.feedback.unwrap_or_default(),
    story_image_url: stored.story_image_url.unwrap_or_default(),
  })
}

/// Fill idiom defaults: `word` becomes "Error", other text fields "N/A",
/// `sentences` an empty list. Non-object entries are dropped.
pub fn clean_idioms(raw: Vec<Value>) -> Vec<IdiomEntry> {
  raw.into_iter()
    .filter_map(|v| match v {
      Value::Object(m) => Some(clean_idiom(&m)),
      _ => None,
    })
    .collect()
}

fn clean_idiom(m: &Map<String, Value>) -> IdiomEntry {
  IdiomEntry {
    word: text_field(m, "word", "Error"),
    ipa: text_field(m, "ipa", "N/A"),
    meaning: text_field(m, "meaning", "N/A"),
    synonyms: text_field(m, "synonyms", "N/A"),
    antonyms: text_field(m, "antonyms", "N/A"),
    collocations: text_field(m, "collocations", "N/A"),
    sentences: match m.get("sentences") {
      Some(Value::Array(items)) => items.iter().filter_map(|s| s.as_str().map(str::to_string)).collect(),
      Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
      _ => Vec::new(),
    },
    forms: text_field(m, "forms", "N/A"),
  }
}

fn text_field(m: &Map<String, Value>, key: &str, default: &str) -> String {
  match m.get(key) {
    Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
    Some(Value::Array(items)) if !items.is_empty() => items
      .iter()
      .filter_map(Value::as_str)
      .collect::<Vec<_>>()
      .join(", "),
    _ => default.to_string(),
  }
}

#[derive(Deserialize)]
struct StoredIdioms {
  #[serde(default)] date: String,
  #[serde(default)] idioms: Vec<Value>,
}

pub fn idioms_from_document(id: &str, doc: Value) -> Result<DailyIdiomRecord, StoreError> {
  let stored: StoredIdioms = serde_json::from_value(doc)
    .map_err(|e| StoreError::Decode { id: id.to_string(), message: e.to_string() })?;
  let date = if stored.date.is_empty() { id.to_string() } else { stored.date };
  Ok(DailyIdiomRecord { date, idioms: clean_idioms(stored.idioms) })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn raw(v: Value) -> Vec<RawWordData> {
    serde_json::from_value(v).unwrap()
  }

  #[test]
  fn positional_tuple_becomes_keyed() {
    let out = normalize(raw(json!([["x", "/x/", "def", "s1,s2", "a1,a2", "sentence"]])));
    assert_eq!(out, vec![WordEntry::new("x", "/x/", "def", "s1,s2", "a1,a2", "sentence")]);
  }

  #[test]
  fn trailing_positions_are_ignored() {
    let out = normalize(raw(json!([["x", "/x/", "def", "s", "a", "sentence", "extra", 7]])));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].sentence, "sentence");
    assert!(out[0].extra.is_empty());
  }

  #[test]
  fn keyed_entry_is_unchanged() {
    let keyed = json!({
      "word": "calm", "ipa": "/kɑːm/", "meaning": "peaceful",
      "synonyms": "still, quiet", "antonyms": "agitated", "sentence": "Stay calm.",
      "level": "B1"
    });
    let out = normalize(raw(json!([keyed.clone()])));
    assert_eq!(out.len(), 1);
    assert_eq!(serde_json::to_value(&out[0]).unwrap(), keyed);
  }

  #[test]
  fn keyed_entries_with_null_or_numeric_fields_survive() {
    let out = normalize(raw(json!([
      { "word": "calm", "ipa": "/kɑːm/", "meaning": "peaceful", "synonyms": "still", "antonyms": null, "sentence": "Stay calm." },
      { "word": "brave", "ipa": null, "meaning": "bold", "synonyms": ["bold", 1], "antonyms": "timid", "sentence": 42 }
    ])));
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].antonyms, Lexemes::Joined(String::new()));
    assert_eq!(out[1].ipa, "");
    assert_eq!(out[1].synonyms, Lexemes::List(vec!["bold".into(), "1".into()]));
    assert_eq!(out[1].sentence, "42");
  }

  #[test]
  fn decoded_document_keeps_one_entry_per_word() {
    let doc = json!({
      "date": "2024-03-01",
      "words": ["calm", "brave"],
      "word_data": [
        { "word": "calm", "ipa": "/kɑːm/", "meaning": "peaceful", "synonyms": "still", "antonyms": null, "sentence": "Stay calm." },
        ["brave", null, "bold", "daring", "timid", "Be brave."]
      ]
    });
    let rec = challenge_from_document("2024-03-01", doc).unwrap();
    assert_eq!(rec.word_data.len(), rec.words.len());
    assert_eq!(rec.word_data[0].word, "calm");
    assert_eq!(rec.word_data[1].ipa, "");
  }

  #[test]
  fn wrong_shapes_are_dropped() {
    let out = normalize(raw(json!([["too", "short"], "loose string", 42, null, ["a","b","c","d","e","f"]])));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].word, "a");
  }

  #[test]
  fn positional_non_strings_render_as_text() {
    let out = normalize(raw(json!([["seven", 7, null, ["a", "b"], true, "s"]])));
    assert_eq!(out[0].ipa, "7");
    assert_eq!(out[0].meaning, "");
    assert_eq!(out[0].synonyms, Lexemes::List(vec!["a".into(), "b".into()]));
    assert_eq!(out[0].antonyms, Lexemes::Joined("true".into()));
  }

  #[test]
  fn legacy_document_decodes() {
    let doc = json!({
      "words": ["x"],
      "word_data": [["x", "/x/", "def", "s", "a", "sent"]],
      "story": null
    });
    let rec = challenge_from_document("2024-01-02", doc).unwrap();
    assert_eq!(rec.date, "2024-01-02");
    assert_eq!(rec.word_data[0].meaning, "def");
    assert_eq!(rec.story, "");
    assert_eq!(rec.story_image_url, "");
  }

  #[test]
  fn idioms_get_defaults() {
    let out = clean_idioms(vec![
      json!({ "word": "break the ice", "sentences": ["She broke the ice."], "synonyms": ["start", "open"] }),
      json!({ "meaning": "" }),
      json!("junk"),
    ]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].ipa, "N/A");
    assert_eq!(out[0].synonyms, "start, open");
    assert_eq!(out[0].sentences, vec!["She broke the ice.".to_string()]);
    assert_eq!(out[1].word, "Error");
    assert_eq!(out[1].meaning, "N/A");
    assert!(out[1].sentences.is_empty());
  }
}
