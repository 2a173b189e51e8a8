//! Shared mocks for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use engram_core::artifact::{Artifact, ArtifactQuery, KnowledgeStore};
use engram_core::error::{KnowledgeStoreError, LanguageModelError};
use engram_core::model::{Completion, CompletionRequest, LanguageModel};
use engram_core::state::CognitiveState;
use engram_store::InMemoryStore;

/// A language model that replays a fixed script of responses.
///
/// Each `complete()` call pops the next scripted reply; the requests it
/// received are recorded for assertions.
pub(crate) struct MockModel {
    replies: Mutex<VecDeque<Result<String, LanguageModelError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn push_ok(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_err(&self, err: LanguageModelError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    /// A model whose every call fails.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Delay every call, for timeout tests (pair with `tokio::time::pause`).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_system_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.messages.first())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LanguageModelError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(Completion { content, model: "mock".into() }),
            Some(Err(err)) => Err(err),
            None => Err(LanguageModelError::ApiError {
                status_code: 500,
                message: "mock script exhausted".into(),
            }),
        }
    }
}

/// A knowledge store over [`InMemoryStore`], optionally failing every call.
pub(crate) struct MockStore {
    inner: InMemoryStore,
    fail: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self { inner: InMemoryStore::new(), fail: false }
    }

    pub fn failing() -> Self {
        Self { inner: InMemoryStore::new(), fail: true }
    }
}

#[async_trait]
impl KnowledgeStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn append(&self, artifact: Artifact) -> Result<String, KnowledgeStoreError> {
        if self.fail {
            return Err(KnowledgeStoreError::Unavailable("mock store down".into()));
        }
        self.inner.append(artifact).await
    }

    async fn search(&self, query: ArtifactQuery) -> Result<Vec<Artifact>, KnowledgeStoreError> {
        if self.fail {
            return Err(KnowledgeStoreError::Unavailable("mock store down".into()));
        }
        self.inner.search(query).await
    }

    async fn get(&self, id: &str) -> Result<Option<Artifact>, KnowledgeStoreError> {
        if self.fail {
            return Err(KnowledgeStoreError::Unavailable("mock store down".into()));
        }
        self.inner.get(id).await
    }

    async fn count(&self) -> Result<usize, KnowledgeStoreError> {
        if self.fail {
            return Err(KnowledgeStoreError::Unavailable("mock store down".into()));
        }
        self.inner.count().await
    }
}

/// A valid compressor reply for `gist`, serialized the way the model would
/// return it.
pub(crate) fn state_reply(gist: &str) -> String {
    let mut state = CognitiveState::initial();
    state.episodic_trace = format!("discussed {gist}");
    state.semantic_gist = gist.to_string();
    state.goal_orientation = "assist the user".into();
    state.uncertainty_signal = "none".into();
    serde_json::to_string(&state).unwrap()
}
