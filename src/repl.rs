use anyhow::Result;
use pd2_core::config::AppConfig;
use pd2_core::session::{is_exit_token, ChatSession};
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};

const BANNER: &str = r#"
  ╔═══════════════════════════════════════════╗
  ║              pd2-chat v0.1.0              ║
  ║   Project Diablo 2 wiki chat assistant    ║
  ╚═══════════════════════════════════════════╝

  Ask about items, skills, crafting recipes, or character builds.
  You can paste character or guide URLs — they'll be read for context.
  Commands:
    /clear     — Forget the conversation so far
    /config    — Show current config
    /help      — Show this help
    /exit      — Quit (or type exit, quit, bye)
"#;

/// Run the interactive REPL. One generation call in flight at a time; the
/// loop blocks on it and every per-turn failure is reported and survived.
pub async fn run(config: AppConfig, mut session: ChatSession) -> Result<()> {
    println!("{}", BANNER);
    println!(
        "  Model: {}  |  Endpoint: {}",
        config.provider.model, config.provider.api_base
    );
    println!();
    println!("\x1b[1;33massistant\x1b[0m: How can I help with your Project Diablo 2 character today?");

    // Set up rustyline.
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("\x1b[1;32m❯\x1b[0m ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                if is_exit_token(input) {
                    println!("Goodbye, and good luck in your adventures!");
                    break;
                }

                // Handle slash commands.
                if input.starts_with('/') {
                    let handled = handle_command(input, &mut session, &config)?;
                    if !handled {
                        break; // /exit
                    }
                    continue;
                }

                match session.send(input).await {
                    Ok(reply) => {
                        println!("\x1b[1;33massistant\x1b[0m: {}", reply.text);
                        if !reply.source_urls.is_empty() {
                            println!(
                                "  \x1b[2msources: {}\x1b[0m",
                                reply.source_urls.join(", ")
                            );
                        }
                    }
                    Err(e) => {
                        // Report and keep going; the failed turn was rolled back.
                        eprintln!("\x1b[0;31mError: {}\x1b[0m", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    // Save history.
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Handle a slash command. Returns `true` to continue the loop, `false` to exit.
fn handle_command(input: &str, session: &mut ChatSession, config: &AppConfig) -> Result<bool> {
    match input.split_whitespace().next().unwrap_or(input) {
        "/exit" | "/quit" | "/q" => {
            println!("Goodbye, and good luck in your adventures!");
            return Ok(false);
        }
        "/clear" => {
            session.clear();
            println!("Cleared conversation history.");
        }
        "/config" => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        "/help" | "/?" => {
            println!("  /clear     — Forget the conversation so far");
            println!("  /config    — Show current config");
            println!("  /help      — Show this help");
            println!("  /exit      — Quit (or type exit, quit, bye)");
        }
        cmd => {
            println!("Unknown command: {}. Type /help for available commands.", cmd);
        }
    }

    Ok(true)
}
