//! AI RPG - terminal front-end.
//!
//! Usage: `airpg [SAVE_FILE]`. Without an argument a new game is started from
//! the game config; with one, the saved game is resumed.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airpg_engine::infrastructure::config::{AppConfig, GameConfig};
use airpg_engine::App;

const QUIT_COMMAND: &str = "/quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Logs go to stderr; stdout is the game itself
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airpg_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let save_file = std::env::args().nth(1);

    let config = AppConfig::from_env()?;
    let game = GameConfig::load(&config.game_config_path)?;
    let app = App::new(config, game)?;

    let mut session = match save_file.as_deref() {
        Some(file) => {
            let session = app
                .resume_session(file)
                .await
                .with_context(|| format!("Failed to resume {}", file))?;
            if let Some(last) = session.history().last() {
                println!("{}", last.content);
            }
            session
        }
        None => {
            let mut session = app.new_session().await.context("Failed to start a new game")?;
            let greeting = session.starting_message().await?;
            println!("{}", greeting);
            session
        }
    };

    println!(
        "\n(Type your action. {} shows the inventory, {} saves the game, {} exits.)",
        app.game.commands.inventory, app.game.commands.save, QUIT_COMMAND
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == QUIT_COMMAND {
            break;
        }

        match session.handle_input(input).await {
            Ok(reply) => println!("\n{}", reply.text()),
            Err(e) => {
                tracing::warn!(error = %e, "Turn failed");
                println!("\n{}\nNothing happened, try again.", e);
            }
        }
    }

    tracing::info!(total_cost = session.total_cost(), "Game over");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
