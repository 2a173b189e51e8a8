pub mod chat;
pub mod gateway;
pub mod onboard;
pub mod status;

use std::sync::Arc;

use engram_config::AppConfig;
use engram_core::persona::Persona;
use engram_engine::Controller;
use engram_store::{ReflectiveLog, SemanticStore};

/// Wire the controller from configuration: backend, knowledge store,
/// reflective log, persona.
pub fn build_controller(config: AppConfig) -> Arc<Controller> {
    let model = engram_providers::build_from_config(&config);
    let knowledge = Arc::new(SemanticStore::new(model.clone()));
    let persona_dir = config.persona.dir();
    let reflect = Arc::new(ReflectiveLog::new(&persona_dir));
    let persona = Persona::load(&persona_dir);
    Arc::new(Controller::new(config, model, knowledge, reflect, persona))
}

/// Fail early with setup instructions when no API key is configured.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    ENGRAM_API_KEY = 'sk-...'");
    eprintln!("    OPENAI_API_KEY = 'sk-...'");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
