//! Compress & Commit stage: produce the next bounded state.
//!
//! The compressor is asked for a whole replacement state in one structured
//! call. Malformed or bound-violating output gets one repair retry that
//! quotes the exact violations; a second failure (or any transport error)
//! falls back to carrying the prior state forward with an uncertainty note,
//! so a bad model turn never corrupts or loses session state.

use std::sync::Arc;
use std::time::Duration;

use engram_core::artifact::Artifact;
use engram_core::model::{CompletionRequest, LanguageModel};
use engram_core::state::{CognitiveState, StateBounds};
use tracing::warn;

use crate::prompt;

/// The state the turn will commit, and how it was obtained.
#[derive(Debug, Clone)]
pub struct CompressOutcome {
    pub state: CognitiveState,
    /// True when compression failed and the prior state was carried forward.
    pub fell_back: bool,
}

fn fallback(prior: &CognitiveState) -> CompressOutcome {
    let mut state = prior.clone();
    state.uncertainty_signal =
        "State update failed this turn; the previous state was carried forward.".into();
    CompressOutcome { state, fell_back: true }
}

/// Apply the sticky-field guard: a compressor that returns an empty goal or
/// an empty constraint list while the prior had them is treated as an
/// accidental drop, not a deliberate revision.
fn carry_forward(state: &mut CognitiveState, prior: &CognitiveState) {
    if state.goal_orientation.trim().is_empty() && !prior.goal_orientation.is_empty() {
        state.goal_orientation = prior.goal_orientation.clone();
    }
    if state.constraints.is_empty() && !prior.constraints.is_empty() {
        state.constraints = prior.constraints.clone();
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn compress(
    model: &Arc<dyn LanguageModel>,
    model_name: &str,
    rules: &str,
    long_term: &str,
    prior: &CognitiveState,
    qualified: &[Artifact],
    input: &str,
    bounds: &StateBounds,
    retries: u32,
    timeout: Duration,
) -> CompressOutcome {
    let mut repair: Option<String> = None;

    for attempt in 0..=retries {
        let request = CompletionRequest::new(
            model_name,
            prompt::compress_system(rules, long_term, prior, qualified, input, repair.as_deref()),
            input,
        )
        .with_temperature(0.1)
        .with_schema(CognitiveState::json_schema());

        let completion = match tokio::time::timeout(timeout, model.complete(request)).await {
            Ok(Ok(completion)) => completion,
            Ok(Err(err)) => {
                // Transport failures will not improve on a reworded retry.
                warn!(error = %err, "compressor call failed, carrying prior state forward");
                return fallback(prior);
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "compressor timed out, carrying prior state forward");
                return fallback(prior);
            }
        };

        let issue = match completion.parse_json::<CognitiveState>() {
            Ok(mut state) => {
                state.normalize();
                carry_forward(&mut state, prior);
                // The state references qualified facts; it never embeds them.
                state.retrieved_artifacts = qualified.iter().map(Artifact::to_ref).collect();
                match state.validate(bounds) {
                    Ok(()) => return CompressOutcome { state, fell_back: false },
                    Err(err) => err.to_string(),
                }
            }
            Err(err) => err.to_string(),
        };

        warn!(attempt, error = %issue, "compressor output rejected");
        repair = Some(issue);
    }

    fallback(prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{state_reply, MockModel};

    fn prior_with_rules() -> CognitiveState {
        let mut prior = CognitiveState::initial();
        prior.goal_orientation = "Complete the hotel reservation".into();
        prior.constraints = vec!["Cancellations only on weekdays".into()];
        prior
    }

    async fn run(
        model: MockModel,
        prior: &CognitiveState,
        qualified: &[Artifact],
        bounds: &StateBounds,
    ) -> CompressOutcome {
        let model: Arc<dyn LanguageModel> = Arc::new(model);
        compress(
            &model,
            "m",
            "",
            "",
            prior,
            qualified,
            "input",
            bounds,
            1,
            Duration::from_secs(5),
        )
        .await
    }

    #[tokio::test]
    async fn valid_output_commits_first_try() {
        let outcome = run(
            MockModel::scripted([state_reply("vacation planning")]),
            &CognitiveState::initial(),
            &[],
            &StateBounds::default(),
        )
        .await;
        assert!(!outcome.fell_back);
        assert_eq!(outcome.state.semantic_gist, "vacation planning");
    }

    #[tokio::test]
    async fn malformed_then_valid_uses_repair_retry() {
        let model = MockModel::scripted(["this is not json", &state_reply("recovered")]);
        let outcome = run(model, &CognitiveState::initial(), &[], &StateBounds::default()).await;
        assert!(!outcome.fell_back);
        assert_eq!(outcome.state.semantic_gist, "recovered");
    }

    #[tokio::test]
    async fn repair_prompt_quotes_the_violation() {
        let mut oversized = CognitiveState::initial();
        oversized.episodic_trace = "x".repeat(700);
        oversized.goal_orientation = "g".into();
        oversized.uncertainty_signal = "u".into();
        let model = MockModel::scripted([
            serde_json::to_string(&oversized).unwrap(),
            state_reply("ok"),
        ]);
        let model = Arc::new(model);
        let dyn_model: Arc<dyn LanguageModel> = model.clone();
        let outcome = compress(
            &dyn_model,
            "m",
            "",
            "",
            &CognitiveState::initial(),
            &[],
            "input",
            &StateBounds::default(),
            1,
            Duration::from_secs(5),
        )
        .await;
        assert!(!outcome.fell_back);
        assert!(model.last_system_prompt().contains("episodic_trace exceeds 600"));
    }

    #[tokio::test]
    async fn two_strikes_fall_back_to_prior_state() {
        let prior = prior_with_rules();
        let outcome = run(
            MockModel::scripted(["garbage", "more garbage"]),
            &prior,
            &[],
            &StateBounds::default(),
        )
        .await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.state.goal_orientation, prior.goal_orientation);
        assert_eq!(outcome.state.constraints, prior.constraints);
        assert!(outcome.state.uncertainty_signal.contains("carried forward"));
    }

    #[tokio::test]
    async fn transport_error_falls_back_without_retry() {
        let model = MockModel::failing();
        let model = Arc::new(model);
        let dyn_model: Arc<dyn LanguageModel> = model.clone();
        let prior = prior_with_rules();
        let outcome = compress(
            &dyn_model,
            "m",
            "",
            "",
            &prior,
            &[],
            "input",
            &StateBounds::default(),
            1,
            Duration::from_secs(5),
        )
        .await;
        assert!(outcome.fell_back);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn sticky_fields_survive_an_accidental_drop() {
        let mut dropped = CognitiveState::initial();
        dropped.episodic_trace = "t".into();
        dropped.semantic_gist = "g".into();
        dropped.uncertainty_signal = "none".into();
        // goal and constraints left empty by the model
        let model = MockModel::scripted([serde_json::to_string(&dropped).unwrap()]);
        let prior = prior_with_rules();
        let outcome = run(model, &prior, &[], &StateBounds::default()).await;
        assert!(!outcome.fell_back);
        assert_eq!(outcome.state.goal_orientation, "Complete the hotel reservation");
        assert_eq!(outcome.state.constraints, vec!["Cancellations only on weekdays"]);
    }

    #[tokio::test]
    async fn qualified_facts_are_stored_as_refs() {
        let fact = Artifact::new("The user's name is Jack");
        let outcome = run(
            MockModel::scripted([state_reply("greeting")]),
            &CognitiveState::initial(),
            std::slice::from_ref(&fact),
            &StateBounds::default(),
        )
        .await;
        assert_eq!(outcome.state.retrieved_artifacts.len(), 1);
        assert_eq!(outcome.state.retrieved_artifacts[0].id, fact.id);
        let json = serde_json::to_string(&outcome.state).unwrap();
        assert!(json.len() < 2000, "state must reference facts, not embed payloads");
    }

    #[tokio::test]
    async fn duplicate_entities_are_normalized_not_rejected() {
        let mut dup = CognitiveState::initial();
        dup.episodic_trace = "t".into();
        dup.semantic_gist = "g".into();
        dup.goal_orientation = "goal".into();
        dup.uncertainty_signal = "none".into();
        dup.focal_entities = vec!["Kyoto".into(), "Kyoto".into(), "hotel".into()];
        let model = MockModel::scripted([serde_json::to_string(&dup).unwrap()]);
        let outcome = run(model, &CognitiveState::initial(), &[], &StateBounds::default()).await;
        assert!(!outcome.fell_back);
        assert_eq!(outcome.state.focal_entities, vec!["Kyoto", "hotel"]);
    }
}
