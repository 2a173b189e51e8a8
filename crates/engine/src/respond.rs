//! Action stage: stream the user-facing reply from the committed state.
//!
//! The reply model sees the committed state and the current input, nothing
//! else. A generation failure surfaces as a terminal [`ReplyEvent::Error`];
//! the state committed earlier this turn stays committed.

use std::sync::Arc;
use std::time::Duration;

use engram_core::model::{CompletionRequest, LanguageModel};
use engram_core::session::SessionId;
use engram_core::state::CognitiveState;
use tokio::sync::mpsc;
use tracing::warn;

use crate::prompt;

/// One event in a turn's reply stream.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyEvent {
    /// A partial content delta.
    Chunk { content: String },

    /// The reply completed; the turn's commit is identified for the caller.
    Done { session_id: SessionId, turn: u64 },

    /// The reply failed. Terminal; no chunks follow.
    Error { message: String },
}

impl ReplyEvent {
    /// The SSE event name for this variant.
    pub fn event_type(&self) -> &'static str {
        match self {
            ReplyEvent::Chunk { .. } => "chunk",
            ReplyEvent::Done { .. } => "done",
            ReplyEvent::Error { .. } => "error",
        }
    }
}

/// What a reply stream produced.
#[derive(Debug)]
pub struct ReplyOutcome {
    /// The accumulated reply text. On failure this is the partial text
    /// gathered so far, so finalize can consolidate what was actually said.
    pub text: String,

    /// False when the stream ended with a terminal error already sent.
    pub completed: bool,
}

/// Stream the reply into `tx`.
pub async fn respond(
    model: &Arc<dyn LanguageModel>,
    model_name: &str,
    persona: &str,
    state: &CognitiveState,
    input: &str,
    timeout: Duration,
    tx: &mpsc::Sender<ReplyEvent>,
) -> ReplyOutcome {
    let request = CompletionRequest::new(model_name, prompt::respond_system(persona, state), input);

    // One deadline for the whole reply, so a stream that trickles chunks
    // forever is still cut off at the configured timeout.
    let deadline = tokio::time::Instant::now() + timeout;

    let mut rx = match tokio::time::timeout_at(deadline, model.stream(request)).await {
        Ok(Ok(rx)) => rx,
        Ok(Err(err)) => {
            warn!(error = %err, "reply stream failed to open");
            let _ = tx.send(ReplyEvent::Error { message: err.to_string() }).await;
            return ReplyOutcome { text: String::new(), completed: false };
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "reply stream timed out opening");
            let _ = tx
                .send(ReplyEvent::Error { message: "reply generation timed out".into() })
                .await;
            return ReplyOutcome { text: String::new(), completed: false };
        }
    };

    let mut full = String::new();
    loop {
        let chunk = match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(err))) => {
                warn!(error = %err, "reply stream interrupted");
                let _ = tx.send(ReplyEvent::Error { message: err.to_string() }).await;
                return ReplyOutcome { text: full, completed: false };
            }
            Ok(None) => break,
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "reply exceeded its deadline");
                let _ = tx
                    .send(ReplyEvent::Error { message: "reply generation timed out".into() })
                    .await;
                return ReplyOutcome { text: full, completed: false };
            }
        };
        if let Some(content) = chunk.content {
            if !content.is_empty() {
                full.push_str(&content);
                if tx.send(ReplyEvent::Chunk { content }).await.is_err() {
                    // Receiver gone; the turn still finalizes with this text.
                    return ReplyOutcome { text: full, completed: true };
                }
            }
        }
        if chunk.done {
            break;
        }
    }
    ReplyOutcome { text: full, completed: true }
}
