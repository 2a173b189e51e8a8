//! Finalize stage: background consolidation after the reply is sent.
//!
//! Runs off the request path. Extracts durable facts from the exchange into
//! the knowledge store and MEMORY.md, and journals the raw exchange. Every
//! failure here is logged and swallowed; a lost consolidation costs future
//! recall quality, never the turn that already completed.

use std::sync::Arc;
use std::time::Duration;

use engram_core::artifact::{Artifact, KnowledgeStore, TurnRef};
use engram_core::model::{CompletionRequest, LanguageModel};
use engram_core::session::SessionId;
use engram_store::ReflectiveLog;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::prompt;

#[derive(Debug, Deserialize)]
struct Extracted {
    facts: Vec<String>,
}

/// Consolidates one finished turn into long-term memory.
pub struct Finalizer {
    model: Arc<dyn LanguageModel>,
    model_name: String,
    knowledge: Arc<dyn KnowledgeStore>,
    reflect: Arc<ReflectiveLog>,
    timeout: Duration,
}

impl Finalizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        model_name: impl Into<String>,
        knowledge: Arc<dyn KnowledgeStore>,
        reflect: Arc<ReflectiveLog>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            knowledge,
            reflect,
            timeout,
        }
    }

    /// Consolidate one exchange. Never fails the caller.
    pub async fn consolidate(
        &self,
        session_id: &SessionId,
        turn: u64,
        input: &str,
        reply: &str,
        gist: &str,
    ) {
        if let Err(err) = self.reflect.append_journal(session_id, turn, input, reply) {
            warn!(session = %session_id, turn, error = %err, "journal append failed");
        }

        let origin = TurnRef { session_id: session_id.clone(), turn };

        // The raw exchange is retrievable too, not just distilled facts.
        let exchange = Artifact::new(format!("User: {input}\nAgent: {reply}"))
            .with_origin(origin.clone());
        if let Err(err) = self.knowledge.append(exchange).await {
            warn!(session = %session_id, turn, error = %err, "exchange append failed");
        }

        let facts = self.extract_facts(input, reply, gist).await;
        if facts.is_empty() {
            debug!(session = %session_id, turn, "No durable facts this turn");
            return;
        }

        for fact in &facts {
            let artifact = Artifact::new(fact.clone()).with_origin(origin.clone());
            if let Err(err) = self.knowledge.append(artifact).await {
                warn!(session = %session_id, turn, error = %err, "fact append failed");
            }
        }
        if let Err(err) = self.reflect.append_facts(&facts) {
            warn!(session = %session_id, turn, error = %err, "long-term memory append failed");
        }
        debug!(session = %session_id, turn, count = facts.len(), "Facts consolidated");
    }

    async fn extract_facts(&self, input: &str, reply: &str, gist: &str) -> Vec<String> {
        let request = CompletionRequest::new(
            &self.model_name,
            prompt::extract_facts_system(input, reply, gist),
            input,
        )
        .with_temperature(0.0)
        .with_schema(prompt::extract_facts_schema());

        let extracted = match tokio::time::timeout(self.timeout, self.model.complete(request)).await
        {
            Ok(Ok(completion)) => completion.parse_json::<Extracted>(),
            Ok(Err(err)) => {
                warn!(error = %err, "fact extraction call failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "fact extraction timed out");
                return Vec::new();
            }
        };

        match extracted {
            Ok(e) => e
                .facts
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            Err(err) => {
                warn!(error = %err, "fact extraction output unparseable");
                Vec::new()
            }
        }
    }
}
