//! Prompt analysis: language detection, intent classification and task
//! decomposition.
//!
//! Every analyzer works without a backend. When a chat client is supplied the
//! LLM is tried first and the local heuristics are the fallback.

/// Bounded, TTL'd intent result cache
pub mod cache;
/// Task decomposition into dependent subtasks
pub mod decompose;
/// Intent classification
pub mod intent;
/// Lenient JSON extraction from model replies
pub mod json;
/// Indicator-based language detection
pub mod language;
/// Ordered keyword rules for heuristic classification
pub mod rules;

pub use cache::IntentCache;
pub use decompose::TaskDecomposer;
pub use intent::IntentAnalyzer;
pub use json::extract_json_object;
pub use language::{Language, detect_language};
