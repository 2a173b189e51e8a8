//! Prompt assembly for the pipeline stages.
//!
//! Persona content is spliced in verbatim — it is opaque instruction text,
//! never parsed. State snapshots are passed as pretty-printed JSON so the
//! model sees exactly what it must replace.

use engram_core::artifact::Artifact;
use engram_core::state::CognitiveState;

fn state_json(state: &CognitiveState) -> String {
    serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".into())
}

fn artifact_list(artifacts: &[Artifact]) -> String {
    if artifacts.is_empty() {
        return "(none)".into();
    }
    artifacts
        .iter()
        .map(|a| format!("- [{}] {}", a.id, a.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System prompt for the Qualify stage.
///
/// The model acts as a screener: from the retrieved candidates, keep only
/// what the current decision genuinely needs, and answer with ids only.
pub fn qualify_system(input: &str, prior: &CognitiveState, candidates: &[Artifact]) -> String {
    format!(
        "You are an information screener for a conversational agent.\n\
         From the retrieved facts below, select only those that are \
         essential for deciding how to respond to the current input. \
         Exclude anything tangential or already inferable from the current \
         state.\n\n\
         # Previous State\n{prev}\n\n\
         # Current Input\n{input}\n\n\
         # Retrieved Facts\n{candidates}\n\n\
         Answer with the ids of the selected facts only. Select none if \
         none are essential.",
        prev = state_json(prior),
        candidates = artifact_list(candidates),
    )
}

/// JSON schema for the qualify response.
pub fn qualify_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "selected_ids": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Ids of the facts essential for this turn"
            }
        },
        "required": ["selected_ids"]
    })
}

/// System prompt for the Compress & Commit stage.
///
/// `repair` carries the validation error of a failed previous attempt.
pub fn compress_system(
    rules: &str,
    long_term: &str,
    prior: &CognitiveState,
    qualified: &[Artifact],
    input: &str,
    repair: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are the cognitive manager of a conversational agent. You do \
         not store transcripts; you maintain a single bounded state object \
         and replace it wholly every turn.\n\n\
         # Standing Rules\n{rules}\n\n\
         # Existing Long-term Knowledge\n{long_term}\n\
         Do not duplicate facts already present in long-term knowledge.\n\n\
         # Previous State\n{prev}\n\n\
         # Qualified External Facts\n{artifacts}\n\n\
         # Current Input\n{input}\n\n\
         Produce the new state. Rules:\n\
         1. Keep goal_orientation and constraints unchanged unless the \
         input explicitly revises or completes them. Never drop a \
         constraint silently.\n\
         2. Aggressively discard unimportant detail; every field describes \
         the present, not the history.\n\
         3. episodic_trace records only the most recent events, briefly.\n\
         4. semantic_gist summarizes the overall situation.\n\
         5. Keep every text field short and every list small.",
        rules = if rules.trim().is_empty() { "(none)" } else { rules },
        long_term = if long_term.trim().is_empty() { "(none)\n" } else { long_term },
        prev = if prior == &CognitiveState::initial() {
            "(none: first turn)".to_string()
        } else {
            state_json(prior)
        },
        artifacts = artifact_list(qualified),
    );

    if let Some(error) = repair {
        prompt.push_str(&format!(
            "\n\nYour previous attempt was rejected: {error}\n\
             Produce a corrected state that fixes every listed issue."
        ));
    }

    prompt
}

/// System prompt for the Action stage — the user-facing reply.
///
/// The committed state is the agent's entire context; there is no
/// transcript to fall back on.
pub fn respond_system(persona: &str, state: &CognitiveState) -> String {
    format!(
        "{persona}\n\n\
         You are a conversational assistant. Your only context is the \
         compressed cognitive state below — there is no raw conversation \
         history.\n\n\
         # Current Cognitive State\n{state}\n\n\
         Respond to the user's input based on this state. Always honor the \
         constraints.",
        persona = persona.trim(),
        state = state_json(state),
    )
}

/// System prompt for fact extraction in the Finalize stage.
pub fn extract_facts_system(input: &str, reply: &str, gist: &str) -> String {
    format!(
        "You are the memory curator of a conversational agent. Extract \
         facts from this exchange that are worth remembering across \
         sessions.\n\n\
         Extract: user attributes and introductions, stable preferences, \
         project decisions, standing prohibitions.\n\
         Exclude: greetings and pleasantries, one-off topics like today's \
         weather, feedback about the agent itself.\n\n\
         # Current Input\n{input}\n\n\
         # Agent Reply\n{reply}\n\n\
         # Context\n{gist}\n\n\
         Answer with concise, self-contained fact statements. Answer with \
         none if nothing qualifies."
    )
}

/// JSON schema for the fact-extraction response.
pub fn extract_facts_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "facts": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Facts worth persisting across sessions"
            }
        },
        "required": ["facts"]
    })
}
