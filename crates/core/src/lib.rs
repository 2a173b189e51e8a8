//! # Engram Core
//!
//! Domain types, capability traits, and error definitions for the Engram
//! bounded-state engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The engine never talks to a concrete LLM provider or vector store. Both
//! are narrow capability traits defined here ([`LanguageModel`],
//! [`KnowledgeStore`]); implementations live in their respective crates and
//! are swapped behind these contracts. Everything the engine carries between
//! turns is the [`CognitiveState`] — a fixed-shape, size-bounded record that
//! is wholly replaced each turn, never appended to.

pub mod artifact;
pub mod error;
pub mod model;
pub mod persona;
pub mod session;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use artifact::{Artifact, ArtifactQuery, ArtifactRef, KnowledgeStore, TurnRef};
pub use error::{
    EngineError, Error, KnowledgeStoreError, LanguageModelError, Result, StateValidationError,
};
pub use model::{ChatMessage, ChatRole, Completion, CompletionChunk, CompletionRequest, LanguageModel};
pub use persona::Persona;
pub use session::{Session, SessionId, TurnPhase};
pub use state::{CognitiveState, StateBounds};
