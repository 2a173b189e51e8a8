//! `engram chat` — Interactive or single-message chat mode.

use std::io::Write;

use engram_config::AppConfig;
use engram_core::session::SessionId;
use engram_engine::{Controller, ReplyEvent, TurnHandle};

pub async fn run(
    message: Option<String>,
    session: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    super::require_api_key(&config)?;

    let model = config.model.clone();
    let compressor = config.compressor_model().to_string();
    let controller = super::build_controller(config);
    let session_id = SessionId::new(session);

    if let Some(msg) = message {
        let handle = controller.submit(session_id, msg).await?;
        print_reply(handle).await;
        return Ok(());
    }

    println!();
    println!("  Engram — Interactive Mode");
    println!();
    println!("  Model:      {model}");
    println!("  Compressor: {compressor}");
    println!("  Session:    {session_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit; '/state' shows the current state.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" {
            break;
        }
        if input == "/state" {
            print_state(&controller, &session_id).await;
            continue;
        }

        match controller.submit(session_id.clone(), input.to_string()).await {
            Ok(handle) => print_reply(handle).await,
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn print_reply(mut handle: TurnHandle) {
    println!();
    print!("  Agent > ");
    let _ = std::io::stdout().flush();
    while let Some(event) = handle.events.recv().await {
        match event {
            ReplyEvent::Chunk { content } => {
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            ReplyEvent::Done { .. } => {}
            ReplyEvent::Error { message } => {
                eprintln!();
                eprintln!("  [Error] {message}");
            }
        }
    }
    println!();
    println!();
}

async fn print_state(controller: &Controller, session_id: &SessionId) {
    match controller.read_session(session_id).await {
        Some(session) => {
            let json = serde_json::to_string_pretty(&session.state).unwrap_or_default();
            println!();
            println!("  Turn {}:", session.turn);
            for line in json.lines() {
                println!("  {line}");
            }
            println!();
        }
        None => println!("  (no committed state yet)"),
    }
}
