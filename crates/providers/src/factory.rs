//! Build the language-model backend from configuration.

use std::sync::Arc;
use engram_config::AppConfig;
use engram_core::model::LanguageModel;
use crate::openai_compat::OpenAiCompatModel;

/// Build the configured backend.
///
/// Any OpenAI-compatible endpoint works; the endpoint URL decides which
/// service is actually behind it.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn LanguageModel> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let mut model = OpenAiCompatModel::new("openai_compat", &config.api_url, api_key);

    if !config.embedding_model.is_empty() {
        model = model.with_embedding_model(&config.embedding_model);
    }

    Arc::new(model)
}
