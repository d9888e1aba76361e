use anyhow::Result;
use ollama_chat::speech::{CommandSpeaker, SilentSpeaker, Speaker};
use ollama_chat::ui::terminal::capture_config;
use ollama_chat::ui::TerminalUI;
use ollama_chat::{OllamaClient, ServerConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let defaults = ServerConfig::from_env();
    let config = match capture_config(&defaults)? {
        Some(config) => config,
        None => return Ok(()),
    };

    let client = OllamaClient::new(config.base_url());
    log::info!("using server {}", client.base_url());

    let speaker: Box<dyn Speaker> = match config.speech_command.as_deref().and_then(CommandSpeaker::new) {
        Some(speaker) => Box::new(speaker),
        None => Box::new(SilentSpeaker),
    };

    let mut ui = TerminalUI::new(Arc::new(client), speaker)?;
    if !ui.select_initial_model().await? {
        return Ok(());
    }
    ui.run().await?;

    Ok(())
}
