//! Static candidate word list, loaded once at startup.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::error::ConfigError;

/// Immutable, de-duplicated list of candidate vocabulary words (source order kept).
#[derive(Clone, Debug, Default)]
pub struct WordSource {
  words: Vec<String>,
}

impl WordSource {
  /// Keep trimmed, non-empty lines starting with a letter; drop repeats.
  pub fn from_words<I, S>(words: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut seen = HashSet::new();
    let words = words
      .into_iter()
      .map(|w| w.as_ref().trim().to_string())
      .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
      .filter(|w| seen.insert(w.clone()))
      .collect();
    Self { words }
  }

  /// Read the list from disk. A list shorter than `min_len` cannot fill a day.
  pub fn load(path: impl AsRef<Path>, min_len: usize) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::WordList { path: path.display().to_string(), source })?;
    let src = Self::from_words(text.lines());
    if src.len() < min_len {
      return Err(ConfigError::TooFewWords { found: src.len(), needed: min_len });
    }
    info!(target: "fluentleap_backend", path = %path.display(), words = src.len(), "Loaded word list");
    Ok(src)
  }

  pub fn words(&self) -> &[String] { &self.words }
  pub fn len(&self) -> usize { self.words.len() }
  pub fn is_empty(&self) -> bool { self.words.is_empty() }
}
