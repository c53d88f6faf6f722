//! FluentLeap · daily vocabulary backend.
//!
//! Each calendar day gets a set of words the user has not seen before, enriched by a
//! language model, plus a story-writing exercise with feedback and an illustration.

pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod logic;
pub mod migrate;
pub mod normalize;
pub mod openai;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod selector;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
pub mod words;
