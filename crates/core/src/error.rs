//! Error types for the Engram domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own enum; the top-level [`Error`] folds them together. The
//! propagation policy is graceful degradation: stage-local failures inside
//! the turn pipeline degrade (empty recall, fail-closed qualification,
//! fallback commit, terminal reply marker) rather than aborting the turn.
//! The one turn-aborting case is [`EngineError::TurnInProgress`].

use thiserror::Error;
use crate::session::SessionId;

/// The top-level error type for all Engram operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Language model error: {0}")]
    LanguageModel(#[from] LanguageModelError),

    #[error("Knowledge store error: {0}")]
    KnowledgeStore(#[from] KnowledgeStoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("State validation failed: {0}")]
    StateValidation(#[from] StateValidationError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the Language Model capability.
#[derive(Debug, Clone, Error)]
pub enum LanguageModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response did not match the requested shape: {0}")]
    InvalidResponse(String),
}

/// Failures of the Knowledge Store capability.
#[derive(Debug, Clone, Error)]
pub enum KnowledgeStoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Compressor output that fails schema conformance.
///
/// Carries every violated constraint so the repair retry can quote them.
#[derive(Debug, Clone, Error)]
#[error("state validation failed: {}", issues.join("; "))]
pub struct StateValidationError {
    pub issues: Vec<String>,
}

/// Turn-pipeline errors surfaced to callers.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A turn for this session is already mid-pipeline. Nothing is queued;
    /// the caller retries later.
    #[error("turn already in progress for session {0}")]
    TurnInProgress(SessionId),
}
