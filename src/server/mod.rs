pub mod api;

use crate::cli::Args;
use crate::history::HistoryStore;
use crate::suggest::SmartReplyService;
use log::info;
use std::error::Error;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub struct Server {
    addr: String,
    state: api::AppState,
}

impl Server {
    pub fn new(
        addr: String,
        service: SmartReplyService,
        store: Arc<dyn HistoryStore>,
        args: Args
    ) -> Self {
        let state = api::AppState {
            service,
            store,
            channel: args.channel.clone(),
            device_verified: Arc::new(AtomicBool::new(false)),
        };
        Self { addr, state }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let app = api::router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("HTTP server listening on: http://{}", self.addr);
        axum::serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
