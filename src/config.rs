//! Startup configuration: environment variables plus optional TOML prompt overrides.
//!
//! Everything is read once in `AppConfig::from_env`. Missing required values are
//! a `ConfigError` and the process exits before binding a port.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

/// Optional TOML file at AGENT_CONFIG_PATH. Only prompts are configurable.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the model client. Templates use `{name}` placeholders.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub vocab_system: String,
  pub vocab_user_template: String,
  pub lookup_system: String,
  pub lookup_user_template: String,
  pub feedback_system: String,
  pub feedback_user_template: String,
  pub image_prompt_template: String,
  pub idiom_system: String,
  pub idiom_user_template: String,
  pub grammar_system: String,
  pub grammar_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      vocab_system: "You are an English vocabulary tutor bot. You MUST reply with a single, valid JSON object. The object must have a single key \"word_data\", which is a list. Each item in the list must be an object with keys: \"word\", \"ipa\", \"meaning\", \"synonyms\", \"antonyms\", \"sentence\". \"meaning\" is a short, clear definition (max 12 words). \"synonyms\" is a comma-separated string of 3 synonyms. \"antonyms\" is a comma-separated string of 3 antonyms (or \"none\"). \"sentence\" is a natural English sentence using the word.".into(),
      vocab_user_template: "Generate the vocabulary data for these {count} words: {words}".into(),
      lookup_system: "You are an English vocabulary tutor bot. You MUST reply with a single, valid JSON object with keys: \"word\", \"ipa\", \"meaning\", \"synonyms\", \"antonyms\", \"sentence\".".into(),
      lookup_user_template: "Generate the vocabulary data for this word: {word}".into(),
      feedback_system: "You are a helpful and concise English writing tutor. A student wrote a short story. Provide feedback following this structure EXACTLY:\n### Corrections:\n(List any grammar or spelling corrections. If none, write \"None.\")\n\n### Suggestions:\n(Give 1-2 short, actionable suggestions for improvement.)\n\n### Best Version:\n(Provide a revised version of the story. Keep it close to the original length.)\n\nKeep your feedback positive and encouraging. Do not add any extra text outside this structure.".into(),
      feedback_user_template: "Here is the story:\n---\n{story}\n---".into(),
      image_prompt_template: "Generate an image for the following story. Style: vibrant digital art. Do not include any text or words in the image.\n\nStory:\n\"{story}\"".into(),
      idiom_system: "You are an English idiom tutor bot. You MUST reply with a single, valid JSON object with a single key \"idioms\", a list of objects with keys: \"word\" (the idiom), \"ipa\", \"meaning\", \"synonyms\", \"antonyms\", \"collocations\", \"sentences\" (a list of 2 example sentences), \"forms\" (inflected forms, or \"N/A\").".into(),
      idiom_user_template: "Generate {count} common English idioms. Do NOT use any of these: {avoid}".into(),
      grammar_system: "You are an English grammar quiz generator. Create a new grammar challenge about a common English error (e.g., their/there/they're, your/you're, its/it's, affect/effect). Reply with only a single, valid JSON object: {\"title\": \"Grammar Fix-Up: <Topic>\", \"description\": \"Correct the grammar in the sentences below. Type your corrected sentence in the box.\", \"problems\": [{\"id\": 1, \"incorrect\": \"...\", \"correct\": \"...\"}]}".into(),
      grammar_user_template: "Generate a new grammar challenge with {count} problems.".into(),
    }
  }
}

/// Model endpoint settings.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
  pub api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub image_model: String,
  pub tts_model: String,
  pub tts_voice: String,
  pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct FirestoreConfig {
  pub project_id: String,
  pub database: String,
  /// `host:port` of a local emulator; requests then go over plain HTTP without auth.
  pub emulator_host: Option<String>,
  pub access_token: Option<String>,
  pub bucket: String,
}

#[derive(Clone, Debug)]
pub enum StoreConfig {
  Memory,
  Firestore(FirestoreConfig),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  pub word_list_path: PathBuf,
  pub words_per_day: usize,
  pub idioms_per_day: usize,
  pub openai: OpenAiConfig,
  pub store: StoreConfig,
  pub prompts: Prompts,
}

impl StoreConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// `DOCUMENT_STORE` plus the Firestore/Storage variables. Shared with the migration tool,
  /// which needs a store but no model client.
  pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let var = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |k: &'static str| var(k).ok_or(ConfigError::MissingVar(k));

    match var("DOCUMENT_STORE").as_deref().unwrap_or("firestore") {
      "memory" => Ok(StoreConfig::Memory),
      "firestore" => {
        let emulator_host = var("FIRESTORE_EMULATOR_HOST");
        let access_token = var("GOOGLE_ACCESS_TOKEN");
        if emulator_host.is_none() && access_token.is_none() {
          return Err(ConfigError::MissingVar("GOOGLE_ACCESS_TOKEN"));
        }
        Ok(StoreConfig::Firestore(FirestoreConfig {
          project_id: required("FIRESTORE_PROJECT_ID")?,
          database: var("FIRESTORE_DATABASE").unwrap_or_else(|| "(default)".into()),
          emulator_host,
          access_token,
          bucket: required("STORAGE_BUCKET")?,
        }))
      }
      other => Err(ConfigError::InvalidVar { var: "DOCUMENT_STORE", value: other.to_string() }),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build from any key lookup; `from_env` passes the process environment.
  pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let var = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |k: &'static str| var(k).ok_or(ConfigError::MissingVar(k));

    let port = parse_or(var("PORT"), "PORT", 3000u16)?;
    let words_per_day = parse_or(var("WORDS_PER_DAY"), "WORDS_PER_DAY", 5usize)?;
    let idioms_per_day = parse_or(var("IDIOMS_PER_DAY"), "IDIOMS_PER_DAY", 3usize)?;
    if words_per_day == 0 {
      return Err(ConfigError::InvalidVar { var: "WORDS_PER_DAY", value: "0".into() });
    }

    let openai = OpenAiConfig {
      api_key: required("OPENAI_API_KEY")?,
      base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into()),
      text_model: var("OPENAI_TEXT_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
      image_model: var("OPENAI_IMAGE_MODEL").unwrap_or_else(|| "gpt-image-1".into()),
      tts_model: var("OPENAI_TTS_MODEL").unwrap_or_else(|| "tts-1".into()),
      tts_voice: var("OPENAI_TTS_VOICE").unwrap_or_else(|| "alloy".into()),
      timeout_secs: parse_or(var("OPENAI_TIMEOUT_SECS"), "OPENAI_TIMEOUT_SECS", 60u64)?,
    };

    let store = StoreConfig::from_lookup(&get)?;

    let prompts = match var("AGENT_CONFIG_PATH") {
      Some(path) => load_agent_config(&path)?.prompts,
      None => Prompts::default(),
    };

    Ok(Self {
      port,
      word_list_path: PathBuf::from(var("WORD_LIST_PATH").unwrap_or_else(|| "oxford_5000.txt".into())),
      words_per_day,
      idioms_per_day,
      openai,
      store,
      prompts,
    })
  }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
  match raw {
    None => Ok(default),
    Some(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidVar { var, value: v }),
  }
}

/// Read prompt overrides from a TOML file. Unset keys keep their defaults.
pub fn load_agent_config(path: &str) -> Result<AgentConfig, ConfigError> {
  let text = std::fs::read_to_string(path)
    .map_err(|e| ConfigError::AgentConfig { path: path.to_string(), message: e.to_string() })?;
  let cfg = toml::from_str::<AgentConfig>(&text)
    .map_err(|e| ConfigError::AgentConfig { path: path.to_string(), message: e.to_string() })?;
  info!(target: "fluentleap_backend", %path, "Loaded agent config (TOML)");
  Ok(cfg)
}
