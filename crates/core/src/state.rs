//! The Bounded Cognitive State — the sole memory object carried between turns.
//!
//! Instead of replaying a transcript, each session carries exactly one
//! [`CognitiveState`]. The compressor replaces it wholly every turn; nothing
//! ever appends to it, so its size is independent of conversation length.
//! Collection fields are capped by [`StateBounds`] from configuration.

use serde::{Deserialize, Serialize};
use crate::artifact::ArtifactRef;
use crate::error::StateValidationError;

/// The fixed-shape memory object for one session.
///
/// All fields are replaced together on commit. `goal_orientation` and
/// `constraints` are the sticky fields: the compressor must carry them
/// forward unless the turn's input explicitly revises them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveState {
    /// Most recent observed facts, inputs, and tool results (short).
    pub episodic_trace: String,

    /// Abstract summary of the current topic or situation (short).
    pub semantic_gist: String,

    /// Identifiers currently relevant, first-occurrence order, no duplicates.
    pub focal_entities: Vec<String>,

    /// Causal / temporal dependency statements. May be empty.
    #[serde(default)]
    pub relational_map: Vec<String>,

    /// The standing task objective.
    pub goal_orientation: String,

    /// Hard rules that must never be silently dropped.
    pub constraints: Vec<String>,

    /// Anticipated next step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictive_cue: Option<String>,

    /// Open risks and unverified items.
    pub uncertainty_signal: String,

    /// References to external facts used this turn — never inlined payloads.
    #[serde(default)]
    pub retrieved_artifacts: Vec<ArtifactRef>,
}

impl CognitiveState {
    /// The default/empty state a session starts from.
    pub fn initial() -> Self {
        Self {
            episodic_trace: String::new(),
            semantic_gist: String::new(),
            focal_entities: Vec::new(),
            relational_map: Vec::new(),
            goal_orientation: String::new(),
            constraints: Vec::new(),
            predictive_cue: None,
            uncertainty_signal: String::new(),
            retrieved_artifacts: Vec::new(),
        }
    }

    /// Suppress duplicate focal entities, keeping first-occurrence order.
    ///
    /// Duplicates are an invariant violation the model produces routinely,
    /// so they are normalized away rather than rejected.
    pub fn normalize(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.focal_entities.retain(|e| seen.insert(e.clone()));
    }

    /// Structural validation against the configured bounds.
    ///
    /// Collects every violation so a repair prompt can quote all of them
    /// at once instead of failing one field at a time.
    pub fn validate(&self, bounds: &StateBounds) -> Result<(), StateValidationError> {
        let mut issues = Vec::new();

        for (field, text) in [
            ("episodic_trace", &self.episodic_trace),
            ("semantic_gist", &self.semantic_gist),
            ("goal_orientation", &self.goal_orientation),
            ("uncertainty_signal", &self.uncertainty_signal),
        ] {
            if text.chars().count() > bounds.max_text_chars {
                issues.push(format!(
                    "{field} exceeds {} characters ({})",
                    bounds.max_text_chars,
                    text.chars().count()
                ));
            }
        }
        if let Some(cue) = &self.predictive_cue {
            if cue.chars().count() > bounds.max_text_chars {
                issues.push(format!(
                    "predictive_cue exceeds {} characters ({})",
                    bounds.max_text_chars,
                    cue.chars().count()
                ));
            }
        }

        for (field, len, max) in [
            ("focal_entities", self.focal_entities.len(), bounds.max_entities),
            ("relational_map", self.relational_map.len(), bounds.max_relations),
            ("constraints", self.constraints.len(), bounds.max_constraints),
            (
                "retrieved_artifacts",
                self.retrieved_artifacts.len(),
                bounds.max_artifacts,
            ),
        ] {
            if len > max {
                issues.push(format!("{field} has {len} entries, limit is {max}"));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(StateValidationError { issues })
        }
    }

    /// JSON schema for structured-output requests, mirroring the serde shape.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "episodic_trace": {
                    "type": "string",
                    "description": "Concise record of the most recent observed facts, inputs, and results"
                },
                "semantic_gist": {
                    "type": "string",
                    "description": "Abstract summary of the current topic or situation"
                },
                "focal_entities": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Identifiers currently relevant (names, ids, systems)"
                },
                "relational_map": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Causal or temporal dependency statements between events"
                },
                "goal_orientation": {
                    "type": "string",
                    "description": "The standing task objective; keep unchanged unless explicitly revised"
                },
                "constraints": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Hard rules that must never be dropped; keep unchanged unless explicitly revised"
                },
                "predictive_cue": {
                    "type": ["string", "null"],
                    "description": "Anticipated next step, if any"
                },
                "uncertainty_signal": {
                    "type": "string",
                    "description": "Open risks and unverified items"
                },
                "retrieved_artifacts": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "digest": { "type": "string" }
                        },
                        "required": ["id", "digest"]
                    },
                    "description": "References to external facts used this turn, never full copies"
                }
            },
            "required": [
                "episodic_trace", "semantic_gist", "focal_entities",
                "goal_orientation", "constraints", "uncertainty_signal"
            ]
        })
    }
}

impl Default for CognitiveState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Size caps for the state's fields, from configuration.
///
/// The caps make the serialized state a few KB at most, regardless of how
/// many turns a session has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateBounds {
    /// Max characters for each text field.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Max entries in `focal_entities`.
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,

    /// Max entries in `relational_map`.
    #[serde(default = "default_max_relations")]
    pub max_relations: usize,

    /// Max entries in `constraints`.
    #[serde(default = "default_max_constraints")]
    pub max_constraints: usize,

    /// Max entries in `retrieved_artifacts`.
    #[serde(default = "default_max_artifacts")]
    pub max_artifacts: usize,
}

fn default_max_text_chars() -> usize {
    600
}
fn default_max_entities() -> usize {
    12
}
fn default_max_relations() -> usize {
    10
}
fn default_max_constraints() -> usize {
    12
}
fn default_max_artifacts() -> usize {
    8
}

impl Default for StateBounds {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            max_entities: default_max_entities(),
            max_relations: default_max_relations(),
            max_constraints: default_max_constraints(),
            max_artifacts: default_max_artifacts(),
        }
    }
}
