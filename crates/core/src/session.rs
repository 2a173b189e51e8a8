//! Session domain types.
//!
//! A session is one isolated conversation: an identifier, the current
//! [`CognitiveState`], and a turn counter. Sessions are created on the first
//! input bearing an unseen identifier and live until explicitly evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::state::CognitiveState;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a session is within its turn pipeline.
///
/// `Finalizing` runs as a side branch off `Committed`/`Responding`; it is
/// tracked by the session's finalize slot rather than by this phase value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    Recalling,
    Qualifying,
    Compressing,
    Committed,
    Responding,
}

/// One isolated conversation's runtime state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// The single bounded state carried between turns. Replaced wholly on
    /// each commit, never appended to.
    pub state: CognitiveState,

    /// Number of committed turns.
    pub turn: u64,

    /// Current pipeline phase, for diagnostics.
    #[serde(default)]
    pub phase: TurnPhase,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session with the default/empty state.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: CognitiveState::initial(),
            turn: 0,
            phase: TurnPhase::Idle,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the state and bump the turn counter.
    pub fn commit(&mut self, state: CognitiveState) {
        self.state = state;
        self.turn += 1;
        self.updated_at = Utc::now();
    }
}
