//! Content generation seam.
//!
//! Every operation is one attempt followed, on failure, by one documented fallback.
//! The fallback is part of the return type so callers see degraded content as a
//! branch rather than a swallowed exception.

use async_trait::async_trait;

use crate::domain::{GrammarChallenge, IdiomEntry, WordEntry};

/// A generated value, or the fallback that replaced it.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
  Model(T),
  Fallback(T),
}

impl<T> Outcome<T> {
  pub fn is_fallback(&self) -> bool { matches!(self, Outcome::Fallback(_)) }

  pub fn into_inner(self) -> T {
    match self {
      Outcome::Model(v) | Outcome::Fallback(v) => v,
    }
  }

  pub fn as_ref(&self) -> &T {
    match self {
      Outcome::Model(v) | Outcome::Fallback(v) => v,
    }
  }

  /// Short label for logs.
  pub fn origin(&self) -> &'static str {
    match self {
      Outcome::Model(_) => "model",
      Outcome::Fallback(_) => "fallback",
    }
  }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
  /// Lexical data for the day's words. Fallback: one placeholder per word.
  async fn generate_vocab_batch(&self, words: &[String]) -> Outcome<Vec<WordEntry>>;

  /// Lexical data for one looked-up word. Fallback: a lookup placeholder.
  async fn lookup_word(&self, word: &str) -> Outcome<WordEntry>;

  /// Prose feedback on a story. Fallback: templated praise wrapping the story.
  async fn generate_feedback(&self, story: &str) -> Outcome<String>;

  /// PNG bytes illustrating a story. Fallback: `None`, which is a normal outcome.
  async fn generate_illustration(&self, story: &str) -> Outcome<Option<Vec<u8>>>;

  /// Up to `count` idioms not in `avoid`, with idiom defaults applied. Fallback: empty.
  async fn generate_idiom_batch(&self, avoid: &[String], count: usize) -> Outcome<Vec<IdiomEntry>>;

  /// A fresh grammar drill. Fallback: the built-in "Your/You're" drill.
  async fn generate_grammar_challenge(&self) -> Outcome<GrammarChallenge>;
}

/// Text-to-speech. Unlike the generator there is no fallback audio; failures reach the caller.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
  /// MPEG audio for `text`.
  async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outcome_accessors() {
    let m = Outcome::Model(3);
    let f = Outcome::Fallback(4);
    assert!(!m.is_fallback());
    assert!(f.is_fallback());
    assert_eq!(*m.as_ref(), 3);
    assert_eq!(f.origin(), "fallback");
    assert_eq!(f.into_inner(), 4);
  }
}
