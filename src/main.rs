mod catalog;
mod coach;
mod config;
mod flow;
mod handlers;
mod session;

use std::sync::Arc;

use chatgpt::{client::ChatGPT, config::ChatGPTEngine};
use dotenv::dotenv;
use log::info;
use teloxide::{
    dispatching::dialogue::{serializer::Json, SqliteStorage, Storage},
    prelude::*,
};

use catalog::Catalog;
use coach::Coach;
use config::Config;
use handlers::{App, DialogueStorage};
use session::SessionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // The variables may just as well come from the real environment
    if dotenv().is_err() {
        println!("No .env file found, using the process environment");
    }

    pretty_env_logger::init();
    info!("Starting G3MS drops bot...");

    let config = Config::from_env()?;
    let bot = Bot::from_env();

    info!("Establishing connection to the database...");
    let storage: DialogueStorage =
        SqliteStorage::open(&config.db_path.to_string_lossy(), Json)
            .await?
            .erase();
    info!("Connection established");

    let catalog = match &config.catalog_path {
        Some(path) => {
            info!("Loading the drop catalog from {}", path.display());
            Catalog::load(path)?
        }
        None => Catalog::builtin(),
    };
    info!(
        "Catalog loaded: {} drops, {} rewards",
        catalog.drops.len(),
        catalog.rewards.len()
    );

    let chat_gpt = match &config.chatgpt_api_key {
        Some(key) => {
            let mut gpt = ChatGPT::new(key.clone())?;

            gpt.config.engine = ChatGPTEngine::Gpt35Turbo;
            gpt.config.timeout = std::time::Duration::from_secs(15);

            Some(gpt)
        }
        None => {
            info!("CHATGPT_API_KEY is not set, the coach will answer offline");
            None
        }
    };

    let app = Arc::new(App {
        catalog: Arc::new(catalog),
        coach: Coach::new(chat_gpt, config.personality),
        sessions: SessionRegistry::default(),
        delays: config.delays,
    });

    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![storage, app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
