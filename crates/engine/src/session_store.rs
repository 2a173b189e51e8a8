//! Session store — per-key guards and atomic state commits.
//!
//! Locking discipline:
//!
//! - `turn_gate` serializes turns within one session. It is acquired with
//!   `try_lock`, so a second input while a turn is mid-pipeline is rejected
//!   instead of queued. Different sessions never share a gate.
//! - `session` holds the record behind an `RwLock`; the pipeline only takes
//!   the write half for the instant of commit, so `read` observes either
//!   the prior state or the fully validated new one — never a partial.
//! - `finalize` is the single-slot finalize queue: the finalizer task holds
//!   it while consolidating, and the next turn awaits it before Recall.
//!
//! The map itself is behind one `RwLock`, taken only for slot lookup and
//! creation — never across a capability call.

use engram_core::error::EngineError;
use engram_core::session::{Session, SessionId, TurnPhase};
use engram_core::state::CognitiveState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Everything the engine keeps per session.
pub struct SessionSlot {
    turn_gate: Arc<Mutex<()>>,
    session: RwLock<Session>,
    finalize: Arc<Mutex<()>>,
}

impl SessionSlot {
    fn new(id: SessionId) -> Self {
        Self {
            turn_gate: Arc::new(Mutex::new(())),
            session: RwLock::new(Session::new(id)),
            finalize: Arc::new(Mutex::new(())),
        }
    }

    /// Try to start a turn. `None` means a turn is already in progress.
    pub fn try_begin_turn(&self) -> Option<OwnedMutexGuard<()>> {
        self.turn_gate.clone().try_lock_owned().ok()
    }

    /// Wait until the previous turn's finalizer has cleared its slot.
    pub async fn await_finalize_clear(&self) {
        drop(self.finalize.lock().await);
    }

    /// Claim the finalize slot for a spawned finalizer task.
    ///
    /// Must be called while holding the turn gate, so only this turn can
    /// claim it.
    pub async fn claim_finalize_slot(&self) -> OwnedMutexGuard<()> {
        self.finalize.clone().lock_owned().await
    }

    /// Clone of the current session record.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn set_phase(&self, phase: TurnPhase) {
        self.session.write().await.phase = phase;
    }

    /// Atomically replace the state and bump the turn counter.
    ///
    /// Returns the new turn number. Callers validate before calling; the
    /// write lock is held only for the swap.
    pub async fn commit(&self, state: CognitiveState) -> u64 {
        let mut session = self.session.write().await;
        session.commit(state);
        session.phase = TurnPhase::Committed;
        session.turn
    }
}

/// Process-wide map of sessions, injected wherever sessions are needed.
pub struct SessionStore {
    slots: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch or create the slot for a session id. Idempotent and task-safe:
    /// concurrent callers for the same unseen id end up sharing one slot.
    pub async fn get_or_create(&self, id: &SessionId) -> Arc<SessionSlot> {
        if let Some(slot) = self.slots.read().await.get(id) {
            return slot.clone();
        }

        let mut slots = self.slots.write().await;
        // Re-check: another task may have created it between locks.
        if let Some(slot) = slots.get(id) {
            return slot.clone();
        }
        debug!(session = %id, "Creating session");
        let slot = Arc::new(SessionSlot::new(id.clone()));
        slots.insert(id.clone(), slot.clone());
        slot
    }

    /// Current session record, or `None` for an unknown id.
    pub async fn read(&self, id: &SessionId) -> Option<Session> {
        let slot = self.slots.read().await.get(id).cloned()?;
        Some(slot.snapshot().await)
    }

    /// Explicitly remove a session. Returns whether it existed.
    ///
    /// Refused with `TurnInProgress` while the session is mid-turn, and
    /// waits out a still-running finalizer, so a recreated session with
    /// the same id cannot start Recall ahead of the old consolidation.
    pub async fn evict(&self, id: &SessionId) -> Result<bool, EngineError> {
        let slot = match self.slots.read().await.get(id).cloned() {
            Some(slot) => slot,
            None => return Ok(false),
        };
        let Some(_gate) = slot.try_begin_turn() else {
            return Err(EngineError::TurnInProgress(id.clone()));
        };
        slot.await_finalize_clear().await;
        Ok(self.slots.write().await.remove(id).is_some())
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let id = SessionId::from("s1");
        let a = store.get_or_create(&id).await;
        let b = store.get_or_create(&id).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn read_unknown_session_is_none() {
        let store = SessionStore::new();
        assert!(store.read(&SessionId::from("ghost")).await.is_none());
    }

    #[tokio::test]
    async fn read_known_session_returns_state() {
        let store = SessionStore::new();
        let id = SessionId::from("s1");
        store.get_or_create(&id).await;
        let session = store.read(&id).await.unwrap();
        assert_eq!(session.turn, 0);
        assert_eq!(session.state, CognitiveState::initial());
    }

    #[tokio::test]
    async fn second_turn_attempt_is_rejected_while_first_holds_gate() {
        let store = SessionStore::new();
        let id = SessionId::from("s1");
        let slot = store.get_or_create(&id).await;

        let guard = slot.try_begin_turn().expect("first turn should start");
        assert!(slot.try_begin_turn().is_none(), "second turn must be rejected");
        drop(guard);
        assert!(slot.try_begin_turn().is_some());
    }

    #[tokio::test]
    async fn different_sessions_do_not_block_each_other() {
        let store = SessionStore::new();
        let a = store.get_or_create(&SessionId::from("a")).await;
        let b = store.get_or_create(&SessionId::from("b")).await;

        let _guard_a = a.try_begin_turn().unwrap();
        assert!(b.try_begin_turn().is_some());
    }

    #[tokio::test]
    async fn commit_replaces_state_and_is_visible_to_read() {
        let store = SessionStore::new();
        let id = SessionId::from("s1");
        let slot = store.get_or_create(&id).await;

        let mut state = CognitiveState::initial();
        state.semantic_gist = "committed".into();
        let turn = slot.commit(state).await;
        assert_eq!(turn, 1);

        let session = store.read(&id).await.unwrap();
        assert_eq!(session.state.semantic_gist, "committed");
        assert_eq!(session.turn, 1);
    }

    #[tokio::test]
    async fn evict_removes_session() {
        let store = SessionStore::new();
        let id = SessionId::from("s1");
        store.get_or_create(&id).await;
        assert!(store.evict(&id).await.unwrap());
        assert!(!store.evict(&id).await.unwrap());
        assert!(store.read(&id).await.is_none());
    }

    #[tokio::test]
    async fn evict_is_refused_while_a_turn_holds_the_gate() {
        let store = SessionStore::new();
        let id = SessionId::from("s1");
        let slot = store.get_or_create(&id).await;

        let guard = slot.try_begin_turn().unwrap();
        assert!(matches!(
            store.evict(&id).await,
            Err(EngineError::TurnInProgress(_))
        ));
        assert!(store.read(&id).await.is_some());

        drop(guard);
        assert!(store.evict(&id).await.unwrap());
    }

    #[tokio::test]
    async fn evict_waits_for_the_finalizer_to_clear() {
        let store = Arc::new(SessionStore::new());
        let id = SessionId::from("s1");
        let slot = store.get_or_create(&id).await;

        let guard = slot.claim_finalize_slot().await;

        let store2 = store.clone();
        let id2 = id.clone();
        let evictor = tokio::spawn(async move { store2.evict(&id2).await });

        tokio::task::yield_now().await;
        assert!(!evictor.is_finished());

        drop(guard);
        assert!(evictor.await.unwrap().unwrap());
        assert!(store.read(&id).await.is_none());
    }

    #[tokio::test]
    async fn finalize_slot_blocks_until_cleared() {
        let store = SessionStore::new();
        let slot = store.get_or_create(&SessionId::from("s1")).await;

        let guard = slot.claim_finalize_slot().await;

        let slot2 = slot.clone();
        let waiter = tokio::spawn(async move {
            slot2.await_finalize_clear().await;
        });

        // Give the waiter a chance to block on the slot.
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }
}
