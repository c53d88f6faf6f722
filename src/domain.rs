//! Domain models: daily challenge records, lexical entries, idioms and grammar drills.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Text view of any JSON value: `null` is empty, strings are themselves, lists are
/// comma-joined, other values are their JSON text.
pub fn value_text(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    Value::Array(items) => items
      .iter()
      .filter(|i| !i.is_null())
      .map(value_text)
      .collect::<Vec<_>>()
      .join(", "),
    other => other.to_string(),
  }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(value_text(&Value::deserialize(d)?))
}

/// Synonyms/antonyms arrive either as one comma-joined string or as a list.
/// The shape that was read is the shape that gets written back.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Lexemes {
  Joined(String),
  List(Vec<String>),
}
impl Default for Lexemes {
  fn default() -> Self { Lexemes::Joined(String::new()) }
}
impl From<&str> for Lexemes {
  fn from(s: &str) -> Self { Lexemes::Joined(s.to_string()) }
}
impl<'de> Deserialize<'de> for Lexemes {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    Ok(Lexemes::from_value(&Value::deserialize(d)?))
  }
}
impl Lexemes {
  /// Lists stay lists (items rendered as text, nulls skipped); anything else is joined text.
  pub fn from_value(v: &Value) -> Self {
    match v {
      Value::Array(items) => Lexemes::List(items.iter().filter(|i| !i.is_null()).map(value_text).collect()),
      other => Lexemes::Joined(value_text(other)),
    }
  }

  /// Comma-joined view regardless of the stored shape.
  pub fn joined(&self) -> String {
    match self {
      Lexemes::Joined(s) => s.clone(),
      Lexemes::List(v) => v.join(", "),
    }
  }
}

/// Canonical (keyed) lexical data for one vocabulary word.
///
/// Keys the backend does not know about are kept in `extra` so a read/write
/// cycle never loses data written by other clients. Known fields accept any JSON
/// value (`null` reads as empty), so one odd field never discards the entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WordEntry {
  #[serde(default, deserialize_with = "lenient_text")] pub word: String,
  #[serde(default, deserialize_with = "lenient_text")] pub ipa: String,
  #[serde(default, deserialize_with = "lenient_text")] pub meaning: String,
  #[serde(default)] pub synonyms: Lexemes,
  #[serde(default)] pub antonyms: Lexemes,
  #[serde(default, deserialize_with = "lenient_text")] pub sentence: String,
  #[serde(flatten)] pub extra: Map<String, Value>,
}

impl WordEntry {
  pub fn new(word: &str, ipa: &str, meaning: &str, synonyms: &str, antonyms: &str, sentence: &str) -> Self {
    Self {
      word: word.to_string(),
      ipa: ipa.to_string(),
      meaning: meaning.to_string(),
      synonyms: synonyms.into(),
      antonyms: antonyms.into(),
      sentence: sentence.to_string(),
      extra: Map::new(),
    }
  }
}

/// Where a challenge is in its lifecycle. `Absent` is represented by `Option::None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeState {
  WordsOnly,
  Complete,
}

/// One document per calendar day in the `challenges` collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChallengeRecord {
  pub date: String,
  #[serde(default)] pub words: Vec<String>,
  #[serde(default)] pub word_data: Vec<WordEntry>,
  #[serde(default)] pub story: String,
  #[serde(default)] pub feedback: String,
  #[serde(default)] pub story_image_url: String,
}

impl ChallengeRecord {
  /// The shape written on first access of a day: words only, story fields empty.
  pub fn words_only(date: &str, words: Vec<String>, word_data: Vec<WordEntry>) -> Self {
    Self {
      date: date.to_string(),
      words,
      word_data,
      story: String::new(),
      feedback: String::new(),
      story_image_url: String::new(),
    }
  }

  pub fn state(&self) -> ChallengeState {
    if self.story.is_empty() { ChallengeState::WordsOnly } else { ChallengeState::Complete }
  }
}

/// Idiom entry as stored in `daily_idioms`. Always produced by `normalize::clean_idioms`,
/// so every field is populated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdiomEntry {
  pub word: String,
  pub ipa: String,
  pub meaning: String,
  pub synonyms: String,
  pub antonyms: String,
  pub collocations: String,
  pub sentences: Vec<String>,
  pub forms: String,
}

/// Created once per date, never updated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyIdiomRecord {
  pub date: String,
  #[serde(default)] pub idioms: Vec<IdiomEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrammarProblem {
  pub id: u32,
  pub incorrect: String,
  pub correct: String,
}

/// Short "fix the sentence" drill. Generated on demand, not persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrammarChallenge {
  pub title: String,
  pub description: String,
  #[serde(default)] pub problems: Vec<GrammarProblem>,
}
