//! Persona — free-text instruction content for the compressor and responder.
//!
//! Loaded from optional markdown files under the configured persona
//! directory:
//!
//! - `SOUL.md`   — personality, tone, style
//! - `USER.md`   — user-specific facts and preferences
//! - `AGENTS.md` — standing behavior rules and protocols
//!
//! Each file is optional; missing files are skipped. The engine treats the
//! assembled text as an uninterpreted parameter — it is concatenated into
//! prompts, never parsed.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const SOUL_FILE: &str = "SOUL.md";
pub const USER_FILE: &str = "USER.md";
pub const AGENTS_FILE: &str = "AGENTS.md";

/// Opaque system-instruction content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Persona {
    /// Personality and tone.
    pub soul: String,

    /// User facts and preferences.
    pub user: String,

    /// Standing behavior rules.
    pub agents: String,

    /// Which files were loaded, for diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loaded_files: Vec<String>,
}

impl Persona {
    /// Load persona files from a directory. Missing files are skipped.
    pub fn load(dir: &Path) -> Self {
        let mut persona = Persona::default();

        for (name, slot) in [
            (SOUL_FILE, &mut persona.soul as &mut String),
            (USER_FILE, &mut persona.user),
            (AGENTS_FILE, &mut persona.agents),
        ] {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    *slot = content;
                    persona.loaded_files.push(name.to_string());
                }
                Err(_) => {
                    debug!(file = %path.display(), "Persona file not found, skipping");
                }
            }
        }

        persona
    }

    /// The full instruction text, sections in load order, blanks dropped.
    pub fn instruction_text(&self) -> String {
        [&self.soul, &self.user, &self.agents]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Only the standing rules, for the compressor prompt.
    pub fn rules_text(&self) -> &str {
        &self.agents
    }
}
