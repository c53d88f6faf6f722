//! Daily word and idiom selection.
//!
//! Everything here is pure: history snapshots and the RNG come from the caller,
//! nothing touches the store or the model.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{ChallengeRecord, DailyIdiomRecord, IdiomEntry};
use crate::words::WordSource;

/// Result of a daily pick. `degraded` means the no-repeat rule could not be honored
/// in full: either a short batch or a reset to the whole source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
  pub words: Vec<String>,
  pub degraded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdiomSelection {
  pub idioms: Vec<IdiomEntry>,
  pub degraded: bool,
}

/// Union of `words` over every historical challenge.
pub fn used_words(history: &[ChallengeRecord]) -> HashSet<String> {
  history.iter().flat_map(|r| r.words.iter().cloned()).collect()
}


/// Pick today's words.
///
/// 1. at least `count` unused words: `count` distinct ones, uniformly;
/// 2. some but fewer than `count` unused: all of them (short batch, degraded);
/// 3. none unused: `count` distinct words from the whole source (reset, degraded).
///
/// The source must hold at least `count` words; `WordSource::load` enforces that.
pub fn select_daily_words<R: Rng + ?Sized>(
  history: &[ChallengeRecord],
  source: &WordSource,
  count: usize,
  rng: &mut R,
) -> Selection {
  let used = used_words(history);
  let unused: Vec<&String> = source.words().iter().filter(|w| !used.contains(*w)).collect();

  if unused.len() >= count {
    let words = unused.choose_multiple(rng, count).map(|w| (*w).clone()).collect();
    Selection { words, degraded: false }
  } else if !unused.is_empty() {
    let mut words: Vec<String> = unused.into_iter().cloned().collect();
    words.shuffle(rng);
    Selection { words, degraded: true }
  } else {
    let words = source.words().choose_multiple(rng, count).cloned().collect();
    Selection { words, degraded: true }
  }
}

/// Bounded avoid-list for the idiom generator.
///
/// `history` must be newest first (as `DocumentStore::list_idioms` returns it). The most
/// recent `limit` distinct idioms are kept, then sorted so prompts are stable.
pub fn avoid_list(history: &[DailyIdiomRecord], limit: usize) -> Vec<String> {
  let mut seen = HashSet::new();
  let mut v: Vec<String> = history
    .iter()
    .flat_map(|r| r.idioms.iter().map(|i| i.word.clone()))
    .filter(|w| seen.insert(w.clone()))
    .take(limit)
    .collect();
  v.sort();
  v
}

/// Pick today's idioms from a batch the generator produced against the avoid-list.
/// The generator is trusted to have honored it; nothing is re-filtered here.
///
/// Same three branches as words: full batch, short batch (degraded), or, when the
/// generator gave nothing, `count` idioms from the built-in `fallback` set (degraded).
pub fn select_daily_idioms<R: Rng + ?Sized>(
  mut generated: Vec<IdiomEntry>,
  count: usize,
  fallback: &[IdiomEntry],
  rng: &mut R,
) -> IdiomSelection {
  if generated.len() >= count {
    generated.truncate(count);
    IdiomSelection { idioms: generated, degraded: false }
  } else if !generated.is_empty() {
    IdiomSelection { idioms: generated, degraded: true }
  } else {
    let idioms = fallback.choose_multiple(rng, count).cloned().collect();
    IdiomSelection { idioms, degraded: true }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn day(date: &str, words: &[&str]) -> ChallengeRecord {
    ChallengeRecord::words_only(date, words.iter().map(|w| w.to_string()).collect(), vec![])
  }

  fn idiom(word: &str) -> IdiomEntry {
    IdiomEntry {
      word: word.into(),
      ipa: "N/A".into(),
      meaning: "N/A".into(),
      synonyms: "N/A".into(),
      antonyms: "N/A".into(),
      collocations: "N/A".into(),
      sentences: vec![],
      forms: "N/A".into(),
    }
  }

  fn fruit() -> WordSource {
    WordSource::from_words(["apple", "banana", "cherry", "date", "elder"])
  }

  #[test]
  fn full_source_empty_history() {
    let mut rng = StdRng::seed_from_u64(7);
    let sel = select_daily_words(&[], &fruit(), 5, &mut rng);
    assert!(!sel.degraded);
    let got: HashSet<_> = sel.words.iter().cloned().collect();
    let want: HashSet<_> = fruit().words().iter().cloned().collect();
    assert_eq!(got, want);
  }

  #[test]
  fn picks_only_unused_distinct_words() {
    let source = WordSource::from_words((0..40).map(|i| format!("w{i}")));
    let history = vec![
      day("2024-01-01", &["w0", "w1", "w2", "w3", "w4"]),
      day("2024-01-02", &["w5", "w6", "w7", "w8", "w9"]),
    ];
    let used = used_words(&history);
    for seed in 0..50 {
      let mut rng = StdRng::seed_from_u64(seed);
      let sel = select_daily_words(&history, &source, 5, &mut rng);
      assert!(!sel.degraded);
      assert_eq!(sel.words.len(), 5);
      let distinct: HashSet<_> = sel.words.iter().collect();
      assert_eq!(distinct.len(), 5);
      assert!(sel.words.iter().all(|w| !used.contains(w) && source.words().contains(w)));
    }
  }

  #[test]
  fn short_batch_is_exactly_the_unused_words() {
    let history = vec![day("2024-01-01", &["apple", "banana", "cherry"])];
    let mut rng = StdRng::seed_from_u64(1);
    let sel = select_daily_words(&history, &fruit(), 5, &mut rng);
    assert!(sel.degraded);
    let got: HashSet<_> = sel.words.into_iter().collect();
    assert_eq!(got, HashSet::from(["date".to_string(), "elder".to_string()]));
  }

  #[test]
  fn small_source_returns_all_of_it_degraded() {
    let source = WordSource::from_words(["one", "two", "three"]);
    let mut rng = StdRng::seed_from_u64(3);
    let sel = select_daily_words(&[], &source, 5, &mut rng);
    assert!(sel.degraded);
    assert_eq!(sel.words.len(), 3);
  }

  #[test]
  fn exhausted_history_resets_to_full_source() {
    let history = vec![day("2024-01-01", &["apple", "banana", "cherry", "date", "elder"])];
    let source = fruit();
    for seed in 0..20 {
      let mut rng = StdRng::seed_from_u64(seed);
      let sel = select_daily_words(&history, &source, 3, &mut rng);
      assert!(sel.degraded);
      assert_eq!(sel.words.len(), 3);
      let distinct: HashSet<_> = sel.words.iter().collect();
      assert_eq!(distinct.len(), 3);
      assert!(sel.words.iter().all(|w| source.words().contains(w)));
    }
  }

  #[test]
  fn same_seed_same_pick() {
    let source = WordSource::from_words((0..100).map(|i| format!("w{i}")));
    let a = select_daily_words(&[], &source, 5, &mut StdRng::seed_from_u64(42));
    let b = select_daily_words(&[], &source, 5, &mut StdRng::seed_from_u64(42));
    assert_eq!(a, b);
  }

  #[test]
  fn idiom_branches() {
    let fallback = vec![idiom("f1"), idiom("f2"), idiom("f3"), idiom("f4")];
    let mut rng = StdRng::seed_from_u64(0);

    let full = select_daily_idioms(vec![idiom("a"), idiom("b"), idiom("c"), idiom("d")], 3, &fallback, &mut rng);
    assert!(!full.degraded);
    assert_eq!(full.idioms.iter().map(|i| i.word.as_str()).collect::<Vec<_>>(), ["a", "b", "c"]);

    let short = select_daily_idioms(vec![idiom("a")], 3, &fallback, &mut rng);
    assert!(short.degraded);
    assert_eq!(short.idioms.len(), 1);

    let reset = select_daily_idioms(vec![], 3, &fallback, &mut rng);
    assert!(reset.degraded);
    assert_eq!(reset.idioms.len(), 3);
    assert!(reset.idioms.iter().all(|i| i.word.starts_with('f')));
  }

  #[test]
  fn avoid_list_is_sorted_and_deduped() {
    let history = vec![
      DailyIdiomRecord { date: "2024-01-02".into(), idioms: vec![idiom("c"), idiom("a")] },
      DailyIdiomRecord { date: "2024-01-01".into(), idioms: vec![idiom("b"), idiom("a")] },
    ];
    assert_eq!(avoid_list(&history, 10), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
  }

  #[test]
  fn avoid_list_cap_keeps_most_recent_idioms() {
    let mut history = vec![DailyIdiomRecord { date: "2024-12-31".into(), idioms: vec![idiom("zip your lip")] }];
    for day in 0..200 {
      history.push(DailyIdiomRecord {
        date: format!("2023-{day:03}"),
        idioms: vec![idiom(&format!("a idiom {day:03}"))],
      });
    }
    let avoid = avoid_list(&history, 200);
    assert_eq!(avoid.len(), 200);
    assert!(avoid.contains(&"zip your lip".to_string()));
    assert!(!avoid.contains(&"a idiom 199".to_string()));
  }
}
