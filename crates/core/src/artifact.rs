//! KnowledgeStore trait and the Artifact fact record.
//!
//! The Knowledge Store is the engine's long-term memory: durable fact
//! records with semantic search. Artifacts are append-only — superseding
//! facts are new records, never in-place mutations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::KnowledgeStoreError;
use crate::session::SessionId;

/// Which session/turn an artifact was consolidated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRef {
    pub session_id: SessionId,
    pub turn: u64,
}

/// A persisted long-term fact record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique id for this fact.
    pub id: String,

    /// The fact text.
    pub text: String,

    /// Similarity representation. Opaque to the engine; stores that do not
    /// embed leave it `None` and rank by keyword relevance.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,

    /// When this fact was recorded.
    pub created_at: DateTime<Utc>,

    /// The turn this fact was extracted from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TurnRef>,

    /// Relevance score, set by search operations.
    #[serde(default)]
    pub score: f32,
}

impl Artifact {
    /// A new fact with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            embedding: None,
            created_at: Utc::now(),
            origin: None,
            score: 0.0,
        }
    }

    pub fn with_origin(mut self, origin: TurnRef) -> Self {
        self.origin = Some(origin);
        self
    }

    /// A short digest of the fact for state references: the first line,
    /// truncated on a char boundary.
    pub fn digest(&self) -> String {
        const DIGEST_CHARS: usize = 80;
        let first_line = self.text.lines().next().unwrap_or("");
        first_line.chars().take(DIGEST_CHARS).collect()
    }

    /// The reference stored in a cognitive state instead of the payload.
    pub fn to_ref(&self) -> ArtifactRef {
        ArtifactRef {
            id: self.id.clone(),
            digest: self.digest(),
        }
    }
}

/// A reference to an artifact, resolvable via [`KnowledgeStore::get`].
///
/// States carry these, never artifact payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub id: String,
    pub digest: String,
}

/// A semantic search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactQuery {
    /// The search text.
    pub text: String,

    /// Maximum number of results (recall fan-out K).
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Minimum relevance score threshold.
    #[serde(default)]
    pub min_score: f32,
}

fn default_limit() -> usize {
    5
}

impl ArtifactQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self { text: text.into(), limit, min_score: 0.0 }
    }
}

/// The Knowledge Store capability.
///
/// Assumed safe for concurrent reads and writes across sessions; the
/// within-session write-then-read ordering is the engine's responsibility.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The store name (e.g., "in_memory", "semantic").
    fn name(&self) -> &str;

    /// Append a new fact record. Returns its id.
    async fn append(&self, artifact: Artifact) -> Result<String, KnowledgeStoreError>;

    /// Search for the most relevant facts, ranked by descending score.
    async fn search(&self, query: ArtifactQuery) -> Result<Vec<Artifact>, KnowledgeStoreError>;

    /// Resolve a fact by id.
    async fn get(&self, id: &str) -> Result<Option<Artifact>, KnowledgeStoreError>;

    /// Total fact count.
    async fn count(&self) -> Result<usize, KnowledgeStoreError>;
}
