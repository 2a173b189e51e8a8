//! In-memory knowledge store — keyword scoring with optional vector ranking.
//!
//! Useful for tests and single-process deployments. Facts that carry an
//! embedding are ranked by cosine similarity when the query provides one
//! (via [`SemanticStore`](crate::SemanticStore)); otherwise scoring is
//! keyword occurrence density.

use async_trait::async_trait;
use engram_core::artifact::{Artifact, ArtifactQuery, KnowledgeStore};
use engram_core::error::KnowledgeStoreError;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An in-memory, append-only artifact store.
pub struct InMemoryStore {
    artifacts: Arc<RwLock<Vec<Artifact>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            artifacts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of all artifacts, for vector ranking by a wrapper.
    pub(crate) async fn snapshot(&self) -> Vec<Artifact> {
        self.artifacts.read().await.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, mut artifact: Artifact) -> Result<String, KnowledgeStoreError> {
        if artifact.id.is_empty() {
            artifact.id = Uuid::new_v4().to_string();
        }
        let id = artifact.id.clone();
        self.artifacts.write().await.push(artifact);
        Ok(id)
    }

    async fn search(&self, query: ArtifactQuery) -> Result<Vec<Artifact>, KnowledgeStoreError> {
        let artifacts = self.artifacts.read().await;
        let query_lower = query.text.to_lowercase();

        // Score by keyword occurrence of the query's terms.
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<Artifact> = artifacts
            .iter()
            .filter_map(|a| {
                let content_lower = a.text.to_lowercase();
                let occurrences: usize = terms
                    .iter()
                    .map(|t| content_lower.matches(t).count())
                    .sum();
                if occurrences == 0 {
                    return None;
                }
                let mut scored = a.clone();
                scored.score =
                    occurrences as f32 / (content_lower.len() as f32 / 100.0).max(1.0);
                Some(scored)
            })
            .filter(|a| a.score >= query.min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(query.limit);
        Ok(results)
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>, KnowledgeStoreError> {
        Ok(self.artifacts.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn count(&self) -> Result<usize, KnowledgeStoreError> {
        Ok(self.artifacts.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_assigns_id_when_empty() {
        let store = InMemoryStore::new();
        let mut artifact = Artifact::new("The user's name is Jack");
        artifact.id = String::new();
        let id = store.append(artifact).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_ranks_by_occurrence() {
        let store = InMemoryStore::new();
        store.append(Artifact::new("rust rust rust")).await.unwrap();
        store.append(Artifact::new("rust once, in a much longer text about other topics entirely")).await.unwrap();
        store.append(Artifact::new("nothing relevant here")).await.unwrap();

        let results = store.search(ArtifactQuery::new("rust", 10)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "rust rust rust");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let store = InMemoryStore::new();
        for i in 0..10 {
            store.append(Artifact::new(format!("weather report {i}"))).await.unwrap();
        }
        let results = store.search(ArtifactQuery::new("weather", 3)).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn empty_query_is_empty_result() {
        let store = InMemoryStore::new();
        store.append(Artifact::new("something")).await.unwrap();
        let results = store.search(ArtifactQuery::new("   ", 5)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn get_resolves_by_id() {
        let store = InMemoryStore::new();
        let artifact = Artifact::new("findable");
        let id = artifact.id.clone();
        store.append(artifact).await.unwrap();

        let found = store.get(&id).await.unwrap().unwrap();
        assert_eq!(found.text, "findable");
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
