//! The Engram turn pipeline — the heart of the system.
//!
//! Each incoming turn runs five stages against the session's bounded state:
//!
//! 1. **Recall** — query the knowledge store for candidate facts
//! 2. **Qualify** — keep only the candidates this turn actually needs
//! 3. **Compress & Commit** — fuse input, prior state, and qualified facts
//!    into a new bounded state and make it the session's current state
//! 4. **Action** — generate the user-facing reply from the committed state
//!    and current input only (no transcript)
//! 5. **Finalize** — in the background, consolidate durable facts into the
//!    knowledge store and the reflective log
//!
//! Sessions are independent units of concurrency; within a session, turns
//! are strictly serialized and Finalize(t) always completes before
//! Recall(t+1) begins.

pub mod compress;
pub mod controller;
pub mod finalize;
pub mod prompt;
pub mod qualify;
pub mod recall;
pub mod respond;
pub mod session_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use compress::CompressOutcome;
pub use controller::{Controller, TurnHandle};
pub use finalize::Finalizer;
pub use respond::{ReplyEvent, ReplyOutcome};
pub use session_store::{SessionSlot, SessionStore};
