//! Application state: store handles, model client, word list and creation guards.
//!
//! Every external client is constructed here once and injected as a trait object,
//! so handlers and tests never reach for globals.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::generator::{ContentGenerator, SpeechSynthesizer};
use crate::openai::OpenAI;
use crate::store::{self, BlobStore, DocumentStore};
use crate::words::WordSource;

/// External collaborators the service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: DocumentStore,
    pub blobs: Arc<dyn BlobStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

pub struct AppState {
    pub store: DocumentStore,
    pub blobs: Arc<dyn BlobStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub words: WordSource,
    pub words_per_day: usize,
    pub idioms_per_day: usize,
    /// Serializes get-or-create of a day's challenge within this process.
    pub(crate) challenge_lock: Mutex<()>,
    /// Same for the day's idiom record.
    pub(crate) idiom_lock: Mutex<()>,
}

impl AppState {
    pub fn new(c: Collaborators, words: WordSource, words_per_day: usize, idioms_per_day: usize) -> Self {
        Self {
            store: c.store,
            blobs: c.blobs,
            generator: c.generator,
            speech: c.speech,
            words,
            words_per_day,
            idioms_per_day,
            challenge_lock: Mutex::new(()),
            idiom_lock: Mutex::new(()),
        }
    }

    /// Build state from configuration: load the word list, construct the model
    /// client and the store backends. Any failure here is fatal.
    #[instrument(level = "info", skip_all)]
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ConfigError> {
        let words = WordSource::load(&cfg.word_list_path, cfg.words_per_day)?;

        let openai = Arc::new(OpenAI::new(&cfg.openai, cfg.prompts.clone())?);
        info!(target: "fluentleap_backend", base_url = %openai.base_url, text_model = %openai.text_model, image_model = %openai.image_model, tts_model = %openai.tts_model, "Model client ready");

        let (store, blobs) = store::from_config(&cfg.store)?;

        let collaborators = Collaborators {
            store,
            blobs,
            generator: openai.clone(),
            speech: openai,
        };
        Ok(Self::new(collaborators, words, cfg.words_per_day, cfg.idioms_per_day))
    }
}
