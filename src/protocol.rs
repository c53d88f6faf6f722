//! Public HTTP request/response DTOs (serde ready).
//! Records from `domain` are returned as-is; only the envelopes live here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StoryIn {
    #[serde(default)]
    pub story: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackOut {
    pub feedback: String,
}

/// `?word=` for lookup and audio. Absent and empty are both rejected downstream.
#[derive(Debug, Deserialize)]
pub struct WordQuery {
    pub word: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct RootOut {
    pub message: &'static str,
    pub version: &'static str,
}
