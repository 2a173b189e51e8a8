//! Qualify stage: screen recalled candidates down to what the turn needs.
//!
//! Fails closed. If the screener call errors, times out, or returns
//! unparseable output, the turn proceeds with no qualified artifacts
//! rather than admitting the full unfiltered candidate set.

use std::sync::Arc;
use std::time::Duration;

use engram_core::artifact::Artifact;
use engram_core::model::{CompletionRequest, LanguageModel};
use engram_core::state::CognitiveState;
use serde::Deserialize;
use tracing::warn;

use crate::prompt;

#[derive(Debug, Deserialize)]
struct Selection {
    selected_ids: Vec<String>,
}

pub async fn qualify(
    model: &Arc<dyn LanguageModel>,
    model_name: &str,
    input: &str,
    prior: &CognitiveState,
    candidates: Vec<Artifact>,
    timeout: Duration,
) -> Vec<Artifact> {
    if candidates.is_empty() {
        return candidates;
    }

    let request = CompletionRequest::new(
        model_name,
        prompt::qualify_system(input, prior, &candidates),
        input,
    )
    .with_temperature(0.0)
    .with_schema(prompt::qualify_schema());

    let selection = match tokio::time::timeout(timeout, model.complete(request)).await {
        Ok(Ok(completion)) => match completion.parse_json::<Selection>() {
            Ok(sel) => sel,
            Err(err) => {
                warn!(error = %err, "qualify output unparseable, admitting no artifacts");
                return Vec::new();
            }
        },
        Ok(Err(err)) => {
            warn!(error = %err, "qualify call failed, admitting no artifacts");
            return Vec::new();
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "qualify timed out, admitting no artifacts");
            return Vec::new();
        }
    };

    // Ids the model invents are dropped silently.
    candidates
        .into_iter()
        .filter(|a| selection.selected_ids.iter().any(|id| id == &a.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockModel;
    use engram_core::error::LanguageModelError;

    fn candidate(id: &str, text: &str) -> Artifact {
        let mut a = Artifact::new(text);
        a.id = id.into();
        a
    }

    #[tokio::test]
    async fn keeps_only_selected_ids() {
        let model: Arc<dyn LanguageModel> = Arc::new(MockModel::scripted([
            r#"{"selected_ids": ["b"]}"#,
        ]));
        let candidates = vec![candidate("a", "weather"), candidate("b", "user name")];
        let got = qualify(
            &model,
            "m",
            "what is my name?",
            &CognitiveState::initial(),
            candidates,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "b");
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_model() {
        let model_impl = Arc::new(MockModel::failing());
        let model: Arc<dyn LanguageModel> = model_impl.clone();
        let got = qualify(
            &model,
            "m",
            "hi",
            &CognitiveState::initial(),
            Vec::new(),
            Duration::from_secs(1),
        )
        .await;
        assert!(got.is_empty());
        assert_eq!(model_impl.calls(), 0);
    }

    #[tokio::test]
    async fn fails_closed_on_model_error() {
        let model: Arc<dyn LanguageModel> = Arc::new(MockModel::failing());
        let got = qualify(
            &model,
            "m",
            "hi",
            &CognitiveState::initial(),
            vec![candidate("a", "fact")],
            Duration::from_secs(1),
        )
        .await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn fails_closed_on_unparseable_output() {
        let model: Arc<dyn LanguageModel> =
            Arc::new(MockModel::scripted(["definitely keep fact a"]));
        let got = qualify(
            &model,
            "m",
            "hi",
            &CognitiveState::initial(),
            vec![candidate("a", "fact")],
            Duration::from_secs(1),
        )
        .await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn invented_ids_are_dropped() {
        let model: Arc<dyn LanguageModel> = Arc::new(MockModel::scripted([
            r#"{"selected_ids": ["a", "ghost"]}"#,
        ]));
        let got = qualify(
            &model,
            "m",
            "hi",
            &CognitiveState::initial(),
            vec![candidate("a", "fact")],
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "a");
    }

    #[tokio::test]
    async fn rate_limit_also_fails_closed() {
        let model_impl = MockModel::failing();
        model_impl.push_err(LanguageModelError::RateLimited { retry_after_secs: 3 });
        let model: Arc<dyn LanguageModel> = Arc::new(model_impl);
        let got = qualify(
            &model,
            "m",
            "hi",
            &CognitiveState::initial(),
            vec![candidate("a", "fact")],
            Duration::from_secs(1),
        )
        .await;
        assert!(got.is_empty());
    }
}
