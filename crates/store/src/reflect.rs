//! Reflective log — the file-based journal the Finalizer appends to.
//!
//! Layout under the persona settings directory:
//!
//! ```text
//! <settings>/<name>/
//!   MEMORY.md                 # long-term facts, one bullet per fact
//!   memory/<session>/<date>.md  # daily journal per session
//! ```
//!
//! Human-inspectable markdown, appended on every finalized turn. Failures
//! here are the caller's to log; they never fail a turn.

use chrono::Utc;
use engram_core::error::KnowledgeStoreError;
use engram_core::session::SessionId;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-session daily journal plus a long-term MEMORY.md.
pub struct ReflectiveLog {
    base_dir: PathBuf,
}

impl ReflectiveLog {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn memory_file(&self) -> PathBuf {
        self.base_dir.join("MEMORY.md")
    }

    /// Today's journal file for a session.
    pub fn journal_path(&self, session_id: &SessionId) -> PathBuf {
        let today = Utc::now().format("%Y-%m-%d");
        self.base_dir
            .join("memory")
            .join(session_id.as_str())
            .join(format!("{today}.md"))
    }

    /// Append one turn's exchange to the session's daily journal.
    pub fn append_journal(
        &self,
        session_id: &SessionId,
        turn: u64,
        user_input: &str,
        reply: &str,
    ) -> Result<(), KnowledgeStoreError> {
        let path = self.journal_path(session_id);
        ensure_parent(&path)?;

        let timestamp = Utc::now().format("%H:%M:%S");
        let entry =
            format!("\n## [{timestamp}] turn {turn}\n**User**: {user_input}\n\n**Agent**: {reply}\n");

        append_to_file(&path, &entry)?;
        debug!(session = %session_id, turn, "Journal entry appended");
        Ok(())
    }

    /// Append durable facts to MEMORY.md, one bullet per fact.
    pub fn append_facts(&self, facts: &[String]) -> Result<(), KnowledgeStoreError> {
        if facts.is_empty() {
            return Ok(());
        }
        let path = self.memory_file();
        ensure_parent(&path)?;

        if !path.exists() {
            std::fs::write(&path, "# Long-term Memory\n\n")
                .map_err(|e| KnowledgeStoreError::Storage(e.to_string()))?;
        }

        let mut block = String::new();
        for fact in facts {
            block.push_str(&format!("- {fact}\n"));
        }
        append_to_file(&path, &block)
    }

    /// The full long-term memory text, empty when none exists yet.
    pub fn read_long_term(&self) -> String {
        std::fs::read_to_string(self.memory_file()).unwrap_or_default()
    }
}

fn ensure_parent(path: &Path) -> Result<(), KnowledgeStoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| KnowledgeStoreError::Storage(e.to_string()))?;
    }
    Ok(())
}

fn append_to_file(path: &Path, content: &str) -> Result<(), KnowledgeStoreError> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| KnowledgeStoreError::Storage(e.to_string()))?;
    file.write_all(content.as_bytes())
        .map_err(|e| KnowledgeStoreError::Storage(e.to_string()))
}
