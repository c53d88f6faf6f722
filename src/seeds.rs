//! Built-in fallback content served when the model is unavailable or misbehaves.

use crate::domain::{GrammarChallenge, GrammarProblem, IdiomEntry, WordEntry};

/// Placeholder for a daily word whose lexical data could not be generated.
pub fn placeholder_entry(word: &str) -> WordEntry {
  WordEntry::new(word, "N/A", "Error loading data from AI.", "N/A", "N/A", "N/A")
}

/// Placeholder for a failed single-word lookup.
pub fn lookup_placeholder(word: &str) -> WordEntry {
  WordEntry::new(word, "N/A", "Error loading data.", "N/A", "N/A", "N/A")
}

/// Encouraging feedback that hands the story back unchanged as the "best version".
pub fn fallback_feedback(story: &str) -> String {
  format!(
    "### Corrections:\nNone.\n\n### Suggestions:\nGreat job using the words!\n\n### Best Version:\n{}",
    story
  )
}

pub fn fallback_grammar_challenge() -> GrammarChallenge {
  GrammarChallenge {
    title: "Grammar Fix-Up: Your/You're".into(),
    description: "Correct the grammar in the sentences below. (Error: Could not load from AI)".into(),
    problems: vec![
      GrammarProblem {
        id: 1,
        incorrect: "Your going to be late.".into(),
        correct: "You're going to be late.".into(),
      },
      GrammarProblem {
        id: 2,
        incorrect: "Is this you're book?".into(),
        correct: "Is this your book?".into(),
      },
    ],
  }
}

/// Small hand-curated idiom set. Repeats are acceptable here: it is only used
/// when the generator returns nothing.
pub fn fallback_idioms() -> Vec<IdiomEntry> {
  #[allow(clippy::too_many_arguments)]
  fn item(word: &str, ipa: &str, meaning: &str, synonyms: &str, antonyms: &str, collocations: &str, sentences: &[&str], forms: &str) -> IdiomEntry {
    IdiomEntry {
      word: word.into(),
      ipa: ipa.into(),
      meaning: meaning.into(),
      synonyms: synonyms.into(),
      antonyms: antonyms.into(),
      collocations: collocations.into(),
      sentences: sentences.iter().map(|s| s.to_string()).collect(),
      forms: forms.into(),
    }
  }
  vec![
    item(
      "break the ice", "/breɪk ði aɪs/", "to make people feel more relaxed at first meeting",
      "warm up, open up", "make awkward", "break the ice with someone, try to break the ice",
      &["He told a joke to break the ice.", "Games help new classmates break the ice."],
      "breaks the ice, broke the ice, breaking the ice",
    ),
    item(
      "hit the books", "/hɪt ðə bʊks/", "to study hard",
      "study, cram", "slack off", "hit the books hard, time to hit the books",
      &["I have to hit the books before the exam."],
      "hits the books, hit the books, hitting the books",
    ),
    item(
      "once in a blue moon", "/wʌns ɪn ə bluː muːn/", "very rarely",
      "rarely, seldom", "often, constantly", "only once in a blue moon",
      &["We only eat out once in a blue moon."],
      "N/A",
    ),
    item(
      "under the weather", "/ˈʌndə ðə ˈweðə/", "feeling slightly ill",
      "unwell, off colour", "healthy, fit", "feel under the weather, a bit under the weather",
      &["She stayed home because she felt under the weather."],
      "N/A",
    ),
    item(
      "piece of cake", "/piːs əv keɪk/", "something very easy",
      "breeze, cinch", "ordeal, struggle", "a piece of cake",
      &["The quiz was a piece of cake."],
      "N/A",
    ),
    item(
      "cost an arm and a leg", "/kɒst ən ɑːm ənd ə leɡ/", "to be very expensive",
      "be pricey, be steep", "be cheap", "cost someone an arm and a leg",
      &["That new phone cost an arm and a leg."],
      "costs, cost, costing an arm and a leg",
    ),
  ]
}
