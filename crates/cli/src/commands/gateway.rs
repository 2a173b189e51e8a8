//! `engram gateway` — Start the HTTP API server.

use engram_config::AppConfig;
use engram_gateway::GatewayState;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    super::require_api_key(&config)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Engram Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model);

    let gateway_config = config.gateway.clone();
    let state = GatewayState::new(super::build_controller(config));
    engram_gateway::serve(&gateway_config, state).await?;

    Ok(())
}
