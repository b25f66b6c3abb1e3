//! Core types and capability ports for the cortex routing core.
//!
//! This crate provides the error type raised by backend collaborators, the
//! narrow capability traits the routing core depends on, and in-memory mock
//! backends used across the workspace's tests.

#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Test allows"
    )
)]

/// Error types and result definitions.
pub mod error;
/// In-memory backend implementations for tests and local wiring.
pub mod mock;
/// Lock helpers that ignore poisoning.
pub mod sync;
/// Capability traits for chat, agent, retrieval, NLP and web backends.
pub mod traits;
/// Request and response types exchanged with backends.
pub mod types;

pub use error::{Error, Result};
pub use sync::{IgnoreLock, IgnoreRwLock};
pub use traits::{
    AgentExecutor, AgentMatcher, Backends, ChatClient, NlpClient, RetrievalClient, WebSearcher,
};
pub use types::{
    AgentMatch, AgentReply, AugmentedPrompt, ChatMessage, ChatRequest, ChatResponse, ChatRole,
    RetrievedDocument, TokenUsage, WebResult,
};
