//! Semantic store — embedding-backed search over the in-memory store.
//!
//! Embeds artifact text on append and query text on search through the
//! language model's embedding endpoint, ranking by cosine similarity.
//! When embedding fails (backend down, not configured), both paths degrade
//! to keyword search instead of failing the turn.

use async_trait::async_trait;
use engram_core::artifact::{Artifact, ArtifactQuery, KnowledgeStore};
use engram_core::error::KnowledgeStoreError;
use engram_core::model::LanguageModel;
use std::sync::Arc;
use tracing::warn;

use crate::in_memory::InMemoryStore;
use crate::vector::rank_by_similarity;

/// An embedding wrapper around [`InMemoryStore`].
pub struct SemanticStore {
    inner: InMemoryStore,
    model: Arc<dyn LanguageModel>,
}

impl SemanticStore {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            inner: InMemoryStore::new(),
            model,
        }
    }

    async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
        match self.model.embed(vec![text.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => Some(vectors.remove(0)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Embedding failed, falling back to keyword scoring");
                None
            }
        }
    }
}

#[async_trait]
impl KnowledgeStore for SemanticStore {
    fn name(&self) -> &str {
        "semantic"
    }

    async fn append(&self, mut artifact: Artifact) -> Result<String, KnowledgeStoreError> {
        if artifact.embedding.is_none() {
            artifact.embedding = self.embed_one(&artifact.text).await;
        }
        self.inner.append(artifact).await
    }

    async fn search(&self, query: ArtifactQuery) -> Result<Vec<Artifact>, KnowledgeStoreError> {
        if let Some(query_embedding) = self.embed_one(&query.text).await {
            let snapshot = self.inner.snapshot().await;
            let ranked =
                rank_by_similarity(&snapshot, &query_embedding, query.limit, query.min_score);
            if !ranked.is_empty() {
                return Ok(ranked);
            }
            // Nothing embedded yet; fall through to keyword scoring.
        }
        self.inner.search(query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>, KnowledgeStoreError> {
        self.inner.get(id).await
    }

    async fn count(&self) -> Result<usize, KnowledgeStoreError> {
        self.inner.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::error::LanguageModelError;
    use engram_core::model::{Completion, CompletionRequest};

    /// Embeds deterministically: each text maps to a 2-d unit vector keyed
    /// by its first byte, so "apple..." and "apricot..." land close together.
    struct StubEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, LanguageModelError> {
            Ok(Completion { content: String::new(), model: "stub".into() })
        }

        async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, LanguageModelError> {
            if self.fail {
                return Err(LanguageModelError::NotConfigured("no embeddings".into()));
            }
            Ok(inputs
                .iter()
                .map(|t| {
                    let angle = (t.bytes().next().unwrap_or(0) as f32) / 255.0;
                    vec![angle.cos(), angle.sin()]
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn search_ranks_by_embedding_similarity() {
        let store = SemanticStore::new(Arc::new(StubEmbedder { fail: false }));
        store.append(Artifact::new("apple pie recipe")).await.unwrap();
        store.append(Artifact::new("zebra migration")).await.unwrap();

        let results = store
            .search(ArtifactQuery::new("apricot jam", 2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        // 'a' (apple/apricot) beats 'z' in the stub's angle space.
        assert_eq!(results[0].text, "apple pie recipe");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn embed_failure_degrades_to_keyword() {
        let store = SemanticStore::new(Arc::new(StubEmbedder { fail: true }));
        store.append(Artifact::new("tokyo weather is sunny")).await.unwrap();

        let results = store.search(ArtifactQuery::new("weather", 5)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("tokyo"));
    }

    #[tokio::test]
    async fn appended_artifacts_keep_provided_embedding() {
        let store = SemanticStore::new(Arc::new(StubEmbedder { fail: true }));
        let mut artifact = Artifact::new("pre-embedded");
        artifact.embedding = Some(vec![1.0, 0.0]);
        store.append(artifact).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
