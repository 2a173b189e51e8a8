//! Recall stage: fetch candidate artifacts from the knowledge store.
//!
//! Retrieval is best-effort. A store failure or timeout degrades to an
//! empty candidate set; the turn proceeds without external knowledge.

use std::sync::Arc;
use std::time::Duration;

use engram_core::artifact::{Artifact, ArtifactQuery, KnowledgeStore};
use engram_core::state::CognitiveState;
use tracing::warn;

/// Build the recall query from the current input plus the prior state's
/// semantic gist and focal entities, so follow-up turns ("cancel it")
/// still retrieve the topic and entities under discussion.
pub fn recall_query(input: &str, prior: &CognitiveState, k: usize) -> ArtifactQuery {
    let mut text = input.to_string();
    if !prior.semantic_gist.is_empty() {
        text.push('\n');
        text.push_str(&prior.semantic_gist);
    }
    for entity in &prior.focal_entities {
        text.push(' ');
        text.push_str(entity);
    }
    ArtifactQuery::new(text, k)
}

pub async fn recall(
    store: &Arc<dyn KnowledgeStore>,
    input: &str,
    prior: &CognitiveState,
    k: usize,
    timeout: Duration,
) -> Vec<Artifact> {
    let query = recall_query(input, prior, k);
    match tokio::time::timeout(timeout, store.search(query)).await {
        Ok(Ok(artifacts)) => artifacts,
        Ok(Err(err)) => {
            warn!(store = store.name(), error = %err, "recall failed, continuing without artifacts");
            Vec::new()
        }
        Err(_) => {
            warn!(store = store.name(), timeout_secs = timeout.as_secs(), "recall timed out");
            Vec::new()
        }
    }
}
