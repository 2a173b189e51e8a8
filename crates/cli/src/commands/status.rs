//! `engram status` — Show configuration status.

use engram_config::AppConfig;
use engram_core::persona::Persona;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Engram Status");
    println!("=============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  API URL:      {}", config.api_url);
    println!("  API key:      {}", if config.has_api_key() { "configured" } else { "missing" });
    println!("  Model:        {}", config.model);
    println!("  Compressor:   {}", config.compressor_model());
    println!("  Embeddings:   {}", config.embedding_model);
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Persona:      {} ({})", config.persona.name, config.persona.dir().display());
    println!("  Recall K:     {}", config.engine.recall_k);
    println!(
        "  Bounds:       {} chars, {} entities, {} constraints",
        config.engine.bounds.max_text_chars,
        config.engine.bounds.max_entities,
        config.engine.bounds.max_constraints,
    );
    println!("  Debug trace:  {}", if config.engine.debug_trace { "on" } else { "off" });

    let persona = Persona::load(&config.persona.dir());
    if persona.loaded_files.is_empty() {
        println!("\n  No persona files — run `engram onboard` to create them");
    } else {
        println!("\n  Persona files: {}", persona.loaded_files.join(", "));
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  Config file found");
    } else {
        println!("  No config file — run `engram onboard` first");
    }

    Ok(())
}
