pub mod cli;
pub mod history;
pub mod models;
pub mod server;
pub mod suggest;

use cli::Args;
use history::initialize_history_store;
use log::info;
use server::Server;
use std::error::Error;
use suggest::SmartReplyService;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Channel: {}", args.channel);
    info!("Generation Model: {}", suggest::gemini::GEMINI_MODEL);
    info!(
        "Smart Replies Enabled: {}",
        args.gemini_api_key.as_deref().map_or(false, |key| !key.is_empty())
    );
    info!("-------------------------");

    let service = SmartReplyService::from_args(&args);
    let store = initialize_history_store(&args.channel);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, service, store, args);
    server.run().await?;

    Ok(())
}
