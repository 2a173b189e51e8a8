//! Knowledge store implementations for Engram.
//!
//! The engine only knows the `KnowledgeStore` trait. This crate ships:
//! - [`InMemoryStore`] — keyword + vector scoring over an in-process Vec
//! - [`SemanticStore`] — wraps any store and a `LanguageModel`'s embeddings
//! - [`ReflectiveLog`] — the file-based per-session journal and MEMORY.md

pub mod in_memory;
pub mod reflect;
pub mod semantic;
pub mod vector;

pub use in_memory::InMemoryStore;
pub use reflect::ReflectiveLog;
pub use semantic::SemanticStore;
pub use vector::{cosine_similarity, rank_by_similarity};
