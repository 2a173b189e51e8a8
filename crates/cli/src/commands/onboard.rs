//! `engram onboard` — First-time setup.

use engram_config::AppConfig;
use engram_core::persona::{AGENTS_FILE, SOUL_FILE, USER_FILE};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Engram — First-Time Setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !config_path.exists() {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Created {}", config_path.display());
    } else {
        println!("  Config file exists: {}", config_path.display());
    }

    let config = AppConfig::load()?;
    let persona_dir = config.persona.dir();
    if !persona_dir.exists() {
        std::fs::create_dir_all(&persona_dir)?;
        println!("Created persona directory: {}", persona_dir.display());
    }

    let soul_path = persona_dir.join(SOUL_FILE);
    if !soul_path.exists() {
        std::fs::write(
            &soul_path,
            concat!(
                "# Personality & Tone\n\n",
                "- Be concise and direct\n",
                "- Ask for clarification when the request is ambiguous\n",
                "- Be honest about limitations and uncertainties\n",
            ),
        )?;
        println!("Created {SOUL_FILE}");
    }

    let user_path = persona_dir.join(USER_FILE);
    if !user_path.exists() {
        std::fs::write(
            &user_path,
            concat!(
                "# About the User\n\n",
                "Add facts about yourself here. They are included in every\n",
                "state compression, so keep them short.\n",
            ),
        )?;
        println!("Created {USER_FILE}");
    }

    let agents_path = persona_dir.join(AGENTS_FILE);
    if !agents_path.exists() {
        std::fs::write(
            &agents_path,
            concat!(
                "# Standing Rules\n\n",
                "- Never drop a constraint the user has stated\n",
                "- Prefer asking over assuming when a commitment is involved\n",
            ),
        )?;
        println!("Created {AGENTS_FILE}");
    }

    println!("\nSetup complete.");
    println!("Set an API key (ENGRAM_API_KEY or OPENAI_API_KEY), then try:");
    println!("  engram chat -m \"hello\"");

    Ok(())
}
