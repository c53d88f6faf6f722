//! Minimal OpenAI client for our use-cases.
//!
//! We call chat.completions (plain text or strict JSON object), images.generations
//! (base64 PNG) and audio.speech (MPEG). Calls are instrumented and log model names,
//! latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key or story bodies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::{OpenAiConfig, Prompts};
use crate::domain::{GrammarChallenge, IdiomEntry, WordEntry};
use crate::error::ConfigError;
use crate::generator::{ContentGenerator, Outcome, SpeechSynthesizer};
use crate::normalize::{clean_idioms, normalize, RawWordData};
use crate::seeds::{fallback_feedback, fallback_grammar_challenge, lookup_placeholder, placeholder_entry};
use crate::util::{fill_template, strip_json_fence, trunc_for_log};

const UA: &str = "fluentleap-backend/0.1";
const FEEDBACK_MARKER: &str = "### Corrections:";
const GRAMMAR_PROBLEMS: &str = "2";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub image_model: String,
  pub tts_model: String,
  pub tts_voice: String,
  pub prompts: Prompts,
}

impl OpenAI {
  pub fn new(cfg: &OpenAiConfig, prompts: Prompts) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()
      .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

    Ok(Self {
      client,
      api_key: cfg.api_key.clone(),
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      text_model: cfg.text_model.clone(),
      image_model: cfg.image_model.clone(),
      tts_model: cfg.tts_model.clone(),
      tts_voice: cfg.tts_voice.clone(),
      prompts,
    })
  }

  fn post(&self, path: &str) -> reqwest::RequestBuilder {
    self.client.post(format!("{}{}", self.base_url, path))
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
  }

  /// Send a chat completion and return the first choice's text.
  async fn chat(&self, system: &str, user: &str, temperature: f32, json: bool) -> Result<String, String> {
    let req = ChatCompletionRequest {
      model: self.text_model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.post("/chat/completions").json(&req).send().await.map_err(|e| e.to_string())?;
    let res = check_status(res).await?;

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default()
      .trim()
      .to_string())
  }

  /// Plain-text chat completion. Used for feedback.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.text_model))]
  async fn chat_plain(&self, system: &str, user: &str, temperature: f32) -> Result<String, String> {
    self.chat(system, user, temperature, false).await
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.text_model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(&self, system: &str, user: &str, temperature: f32) -> Result<T, String> {
    let text = self.chat(system, user, temperature, true).await?;
    serde_json::from_str::<T>(strip_json_fence(&text)).map_err(|e| {
      warn!(preview = %trunc_for_log(&text, 160), "Model reply is not the expected JSON");
      format!("JSON parse error: {}", e)
    })
  }

  async fn vocab_batch(&self, words: &[String]) -> Result<Vec<WordEntry>, String> {
    #[derive(Deserialize)]
    struct Batch { #[serde(default)] word_data: Vec<RawWordData> }

    let joined = words.join(", ");
    let count = words.len().to_string();
    let user = fill_template(&self.prompts.vocab_user_template, &[("words", joined.as_str()), ("count", count.as_str())]);
    let batch: Batch = self.chat_json(&self.prompts.vocab_system, &user, 0.4).await?;
    let entries = normalize(batch.word_data);
    if entries.is_empty() {
      return Err("model returned empty word data".into());
    }
    Ok(entries)
  }

  async fn lookup(&self, word: &str) -> Result<WordEntry, String> {
    let user = fill_template(&self.prompts.lookup_user_template, &[("word", word)]);
    let mut entry: WordEntry = self.chat_json(&self.prompts.lookup_system, &user, 0.2).await?;
    if entry.word.trim().is_empty() {
      entry.word = word.to_string();
    }
    Ok(entry)
  }

  async fn feedback(&self, story: &str) -> Result<String, String> {
    let user = fill_template(&self.prompts.feedback_user_template, &[("story", story)]);
    let text = self.chat_plain(&self.prompts.feedback_system, &user, 0.5).await?;
    if !text.contains(FEEDBACK_MARKER) {
      return Err("model did not follow the feedback format".into());
    }
    Ok(text)
  }

  #[instrument(level = "info", skip(self, story), fields(model = %self.image_model, story_len = story.len()))]
  async fn illustration(&self, story: &str) -> Result<Vec<u8>, String> {
    let prompt = fill_template(&self.prompts.image_prompt_template, &[("story", story)]);
    // dall-e models default to URLs; gpt-image models only return base64 and reject the field.
    let response_format = self.image_model.starts_with("dall-e").then(|| "b64_json".to_string());
    let req = ImageRequest {
      model: self.image_model.clone(),
      prompt,
      n: 1,
      size: "1024x1024".into(),
      response_format,
    };
    let res = self.post("/images/generations").json(&req).send().await.map_err(|e| e.to_string())?;
    let res = check_status(res).await?;
    let body: ImageResponse = res.json().await.map_err(|e| e.to_string())?;
    decode_image(body)
  }

  async fn idiom_batch(&self, avoid: &[String], count: usize) -> Result<Vec<IdiomEntry>, String> {
    #[derive(Deserialize)]
    struct Batch { #[serde(default)] idioms: Vec<serde_json::Value> }

    let avoid = if avoid.is_empty() { "(none)".to_string() } else { avoid.join(", ") };
    let count = count.to_string();
    let user = fill_template(&self.prompts.idiom_user_template, &[("count", count.as_str()), ("avoid", avoid.as_str())]);
    let batch: Batch = self.chat_json(&self.prompts.idiom_system, &user, 0.9).await?;
    Ok(clean_idioms(batch.idioms))
  }

  async fn grammar(&self) -> Result<GrammarChallenge, String> {
    let user = fill_template(&self.prompts.grammar_user_template, &[("count", GRAMMAR_PROBLEMS)]);
    let g: GrammarChallenge = self.chat_json(&self.prompts.grammar_system, &user, 0.9).await?;
    if g.title.trim().is_empty() {
      return Err("grammar challenge without title".into());
    }
    Ok(g)
  }
}

#[async_trait]
impl ContentGenerator for OpenAI {
  #[instrument(level = "info", skip(self, words), fields(count = words.len()))]
  async fn generate_vocab_batch(&self, words: &[String]) -> Outcome<Vec<WordEntry>> {
    let start = Instant::now();
    match self.vocab_batch(words).await {
      Ok(v) => {
        info!(elapsed = ?start.elapsed(), entries = v.len(), "Vocab batch generated");
        Outcome::Model(v)
      }
      Err(e) => {
        error!(elapsed = ?start.elapsed(), error = %e, "Vocab batch failed; using placeholders");
        Outcome::Fallback(words.iter().map(|w| placeholder_entry(w)).collect())
      }
    }
  }

  #[instrument(level = "info", skip(self), fields(%word))]
  async fn lookup_word(&self, word: &str) -> Outcome<WordEntry> {
    match self.lookup(word).await {
      Ok(entry) => Outcome::Model(entry),
      Err(e) => {
        error!(error = %e, "Lookup failed; using placeholder");
        Outcome::Fallback(lookup_placeholder(word))
      }
    }
  }

  #[instrument(level = "info", skip(self, story), fields(story_len = story.len()))]
  async fn generate_feedback(&self, story: &str) -> Outcome<String> {
    match self.feedback(story).await {
      Ok(text) => Outcome::Model(text),
      Err(e) => {
        error!(error = %e, "Feedback failed; using templated feedback");
        Outcome::Fallback(fallback_feedback(story))
      }
    }
  }

  async fn generate_illustration(&self, story: &str) -> Outcome<Option<Vec<u8>>> {
    let start = Instant::now();
    match self.illustration(story).await {
      Ok(bytes) => {
        info!(elapsed = ?start.elapsed(), bytes = bytes.len(), "Illustration generated");
        Outcome::Model(Some(bytes))
      }
      Err(e) => {
        warn!(elapsed = ?start.elapsed(), error = %e, "Illustration unavailable; continuing without image");
        Outcome::Fallback(None)
      }
    }
  }

  #[instrument(level = "info", skip(self, avoid), fields(avoid_len = avoid.len()))]
  async fn generate_idiom_batch(&self, avoid: &[String], count: usize) -> Outcome<Vec<IdiomEntry>> {
    match self.idiom_batch(avoid, count).await {
      Ok(v) => Outcome::Model(v),
      Err(e) => {
        error!(target: "idioms", error = %e, "Idiom batch failed");
        Outcome::Fallback(Vec::new())
      }
    }
  }

  #[instrument(level = "info", skip(self))]
  async fn generate_grammar_challenge(&self) -> Outcome<GrammarChallenge> {
    match self.grammar().await {
      Ok(g) => Outcome::Model(g),
      Err(e) => {
        error!(error = %e, "Grammar challenge failed; using built-in drill");
        Outcome::Fallback(fallback_grammar_challenge())
      }
    }
  }
}

#[async_trait]
impl SpeechSynthesizer for OpenAI {
  #[instrument(level = "info", skip(self, text), fields(model = %self.tts_model, text_len = text.len()))]
  async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String> {
    let req = SpeechRequest {
      model: self.tts_model.clone(),
      voice: self.tts_voice.clone(),
      input: text.to_string(),
      response_format: "mp3".into(),
    };
    let res = self.post("/audio/speech").json(&req).send().await.map_err(|e| e.to_string())?;
    let res = check_status(res).await?;
    let bytes = res.bytes().await.map_err(|e| e.to_string())?;
    Ok(bytes.to_vec())
  }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, String> {
  if res.status().is_success() {
    return Ok(res);
  }
  let status = res.status();
  let body = res.text().await.unwrap_or_default();
  let msg = extract_openai_error(&body).unwrap_or(body);
  Err(format!("OpenAI HTTP {}: {}", status, msg))
}

fn decode_image(body: ImageResponse) -> Result<Vec<u8>, String> {
  let b64 = body.data.into_iter()
    .find_map(|d| d.b64_json)
    .ok_or_else(|| "response did not contain image data".to_string())?;
  base64::engine::general_purpose::STANDARD
    .decode(b64.as_bytes())
    .map_err(|e| format!("invalid base64 image: {}", e))
}

// --- Request/response DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ImageRequest {
  model: String,
  prompt: String,
  n: u8,
  size: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<String>,
}
#[derive(Deserialize)]
struct ImageResponse { #[serde(default)] data: Vec<ImageDatum> }
#[derive(Deserialize)]
struct ImageDatum { #[serde(default)] b64_json: Option<String> }

#[derive(Serialize)]
struct SpeechRequest {
  model: String,
  voice: String,
  input: String,
  response_format: String,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_message_is_extracted() {
    let body = r#"{"error":{"message":"Your request was rejected by the safety system.","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Your request was rejected by the safety system."));
    assert!(extract_openai_error("<html>bad gateway</html>").is_none());
  }

  #[test]
  fn image_payload_decodes() {
    let body: ImageResponse = serde_json::from_str(r#"{"data":[{"b64_json":"iVBORw0K"}]}"#).unwrap();
    assert_eq!(decode_image(body).unwrap(), vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a]);

    let empty: ImageResponse = serde_json::from_str(r#"{"data":[{"url":"https://x"}]}"#).unwrap();
    assert!(decode_image(empty).is_err());
  }

  /// Nothing listens on the discard port, so every call fails at connect time.
  fn unreachable_client() -> OpenAI {
    let cfg = OpenAiConfig {
      api_key: "sk-test".into(),
      base_url: "http://127.0.0.1:9".into(),
      text_model: "gpt-4o-mini".into(),
      image_model: "gpt-image-1".into(),
      tts_model: "tts-1".into(),
      tts_voice: "alloy".into(),
      timeout_secs: 5,
    };
    OpenAI::new(&cfg, Prompts::default()).unwrap()
  }

  #[tokio::test]
  async fn vocab_batch_failure_yields_one_placeholder_per_word() {
    let words: Vec<String> = ["abandon", "brave", "calm", "delight", "eager"].iter().map(|w| w.to_string()).collect();
    let out = unreachable_client().generate_vocab_batch(&words).await;
    assert!(out.is_fallback());
    let entries = out.into_inner();
    assert_eq!(entries.len(), 5);
    for (entry, word) in entries.iter().zip(&words) {
      assert_eq!(*entry, placeholder_entry(word));
    }
  }

  #[tokio::test]
  async fn text_calls_fall_back_to_builtin_content() {
    let ai = unreachable_client();
    assert_eq!(ai.generate_feedback("My story.").await, Outcome::Fallback(fallback_feedback("My story.")));
    assert_eq!(ai.lookup_word("calm").await, Outcome::Fallback(lookup_placeholder("calm")));
    assert_eq!(ai.generate_grammar_challenge().await, Outcome::Fallback(fallback_grammar_challenge()));
    assert_eq!(ai.generate_idiom_batch(&[], 3).await, Outcome::Fallback(Vec::new()));
  }

  #[tokio::test]
  async fn illustration_and_speech_failures() {
    let ai = unreachable_client();
    assert_eq!(ai.generate_illustration("A cat.").await, Outcome::Fallback(None));
    assert!(ai.synthesize("calm").await.is_err());
  }
}
