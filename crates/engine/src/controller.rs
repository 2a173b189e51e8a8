//! The turn controller — wires the five stages into a pipeline.
//!
//! `submit` drives Recall, Qualify, and Compress & Commit inline, then
//! spawns a driver task that streams the reply and finalizes. The turn gate
//! is held from admission until the reply stream ends; the finalize slot is
//! claimed before `submit` returns, so the next turn's Recall always waits
//! for this turn's consolidation.

use std::sync::Arc;
use std::time::Duration;

use engram_config::AppConfig;
use engram_core::artifact::KnowledgeStore;
use engram_core::error::EngineError;
use engram_core::model::LanguageModel;
use engram_core::persona::Persona;
use engram_core::session::{Session, SessionId, TurnPhase};
use engram_core::state::CognitiveState;
use engram_store::ReflectiveLog;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::finalize::Finalizer;
use crate::respond::ReplyEvent;
use crate::session_store::SessionStore;
use crate::{compress, prompt, qualify, recall, respond};

/// A running turn, handed to the caller once the new state is committed.
pub struct TurnHandle {
    pub session_id: SessionId,

    /// The turn number this commit produced.
    pub turn: u64,

    /// The committed state.
    pub state: CognitiveState,

    /// True when compression failed and the prior state was carried forward.
    pub fell_back: bool,

    /// The reply stream: chunks, then exactly one `done` or `error`.
    pub events: mpsc::Receiver<ReplyEvent>,
}

/// Orchestrates turns across sessions.
pub struct Controller {
    model: Arc<dyn LanguageModel>,
    knowledge: Arc<dyn KnowledgeStore>,
    sessions: Arc<SessionStore>,
    reflect: Arc<ReflectiveLog>,
    finalizer: Arc<Finalizer>,
    persona: Persona,
    config: AppConfig,
}

impl Controller {
    pub fn new(
        config: AppConfig,
        model: Arc<dyn LanguageModel>,
        knowledge: Arc<dyn KnowledgeStore>,
        reflect: Arc<ReflectiveLog>,
        persona: Persona,
    ) -> Self {
        let finalizer = Arc::new(Finalizer::new(
            model.clone(),
            config.compressor_model(),
            knowledge.clone(),
            reflect.clone(),
            Duration::from_secs(config.engine.compress_timeout_secs),
        ));
        Self {
            model,
            knowledge,
            sessions: Arc::new(SessionStore::new()),
            reflect,
            finalizer,
            persona,
            config,
        }
    }

    /// Run one turn for `session_id`.
    ///
    /// Returns once the new state is committed and the reply stream is
    /// launched. `Err(TurnInProgress)` when the session is mid-turn.
    pub async fn submit(
        &self,
        session_id: SessionId,
        input: String,
    ) -> Result<TurnHandle, EngineError> {
        let engine = &self.config.engine;
        let slot = self.sessions.get_or_create(&session_id).await;

        let Some(turn_guard) = slot.try_begin_turn() else {
            return Err(EngineError::TurnInProgress(session_id));
        };

        // The previous turn's consolidation must land before this Recall,
        // so "remember X" followed by "what did I say?" round-trips.
        slot.await_finalize_clear().await;

        let prior = slot.snapshot().await.state;

        slot.set_phase(TurnPhase::Recalling).await;
        let candidates = recall::recall(
            &self.knowledge,
            &input,
            &prior,
            engine.recall_k,
            Duration::from_secs(engine.recall_timeout_secs),
        )
        .await;
        if engine.debug_trace {
            debug!(
                session = %session_id,
                candidates = ?candidates.iter().map(|a| a.digest()).collect::<Vec<_>>(),
                "Recall complete"
            );
            if !candidates.is_empty() {
                debug!(
                    session = %session_id,
                    prompt = %prompt::qualify_system(&input, &prior, &candidates),
                    "Qualify prompt"
                );
            }
        }

        slot.set_phase(TurnPhase::Qualifying).await;
        let qualified = qualify::qualify(
            &self.model,
            self.config.compressor_model(),
            &input,
            &prior,
            candidates,
            Duration::from_secs(engine.qualify_timeout_secs),
        )
        .await;
        if engine.debug_trace {
            debug!(
                session = %session_id,
                qualified = ?qualified.iter().map(|a| a.digest()).collect::<Vec<_>>(),
                "Qualify complete"
            );
        }

        let long_term = self.reflect.read_long_term();
        if engine.debug_trace {
            debug!(
                session = %session_id,
                prompt = %prompt::compress_system(
                    self.persona.rules_text(),
                    &long_term,
                    &prior,
                    &qualified,
                    &input,
                    None,
                ),
                "Compress prompt"
            );
        }

        slot.set_phase(TurnPhase::Compressing).await;
        let outcome = compress::compress(
            &self.model,
            self.config.compressor_model(),
            self.persona.rules_text(),
            &long_term,
            &prior,
            &qualified,
            &input,
            &engine.bounds,
            engine.compress_retries,
            Duration::from_secs(engine.compress_timeout_secs),
        )
        .await;

        let turn = slot.commit(outcome.state.clone()).await;
        info!(session = %session_id, turn, fell_back = outcome.fell_back, "State committed");
        if engine.debug_trace {
            debug!(
                session = %session_id,
                turn,
                state = %serde_json::to_string(&outcome.state).unwrap_or_default(),
                "Committed state"
            );
        }

        slot.set_phase(TurnPhase::Responding).await;

        // Claimed while the turn gate is still held, so no later turn can
        // slip in between commit and consolidation.
        let finalize_guard = slot.claim_finalize_slot().await;

        let (tx, rx) = mpsc::channel(64);
        let driver = TurnDriver {
            model: self.model.clone(),
            finalizer: self.finalizer.clone(),
            slot: slot.clone(),
            session_id: session_id.clone(),
            turn,
            model_name: self.config.model.clone(),
            persona: self.persona.instruction_text(),
            state: outcome.state.clone(),
            input,
            respond_timeout: Duration::from_secs(engine.respond_timeout_secs),
            debug_trace: engine.debug_trace,
        };
        tokio::spawn(driver.run(tx, turn_guard, finalize_guard));

        Ok(TurnHandle {
            session_id,
            turn,
            state: outcome.state,
            fell_back: outcome.fell_back,
            events: rx,
        })
    }

    /// Read a session's committed state. `None` for an unknown id.
    pub async fn read_session(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.read(session_id).await
    }

    /// Remove a session. Returns whether it existed; refused with
    /// `TurnInProgress` while a turn is mid-pipeline.
    pub async fn evict_session(&self, session_id: &SessionId) -> Result<bool, EngineError> {
        self.sessions.evict(session_id).await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }
}

/// The spawned half of a turn: stream the reply, then consolidate.
struct TurnDriver {
    model: Arc<dyn LanguageModel>,
    finalizer: Arc<Finalizer>,
    slot: Arc<crate::session_store::SessionSlot>,
    session_id: SessionId,
    turn: u64,
    model_name: String,
    persona: String,
    state: CognitiveState,
    input: String,
    respond_timeout: Duration,
    debug_trace: bool,
}

impl TurnDriver {
    async fn run(
        self,
        tx: mpsc::Sender<ReplyEvent>,
        turn_guard: tokio::sync::OwnedMutexGuard<()>,
        finalize_guard: tokio::sync::OwnedMutexGuard<()>,
    ) {
        if self.debug_trace {
            debug!(
                session = %self.session_id,
                prompt = %prompt::respond_system(&self.persona, &self.state),
                "Respond prompt"
            );
        }
        let reply = respond::respond(
            &self.model,
            &self.model_name,
            &self.persona,
            &self.state,
            &self.input,
            self.respond_timeout,
            &tx,
        )
        .await;

        if reply.completed {
            let _ = tx
                .send(ReplyEvent::Done {
                    session_id: self.session_id.clone(),
                    turn: self.turn,
                })
                .await;
        }
        self.slot.set_phase(TurnPhase::Idle).await;
        // Reply delivered; the session may admit its next turn. The gate
        // drops before the channel closes, so a caller that drained the
        // stream never races a still-held gate. Recall for the next turn
        // still waits on the finalize slot held below.
        drop(turn_guard);
        drop(tx);

        self.finalizer
            .consolidate(
                &self.session_id,
                self.turn,
                &self.input,
                &reply.text,
                &self.state.semantic_gist,
            )
            .await;
        drop(finalize_guard);
    }
}
