//! Per-room real-time collaboration server.
//!
//! Each room id in `/ws/{room_id}` gets its own coordinator that keeps
//! presence, chat history, pinned memory and artifacts, and shares one AI
//! participant between everyone in the room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin edgerooms-server
//! cargo run --bin edgerooms-server -- --host 0.0.0.0 --port 3000 --data-dir ./data
//! ```

use std::sync::Arc;

use clap::Parser;
use edgerooms_server::{
    config::Args,
    domain::{CompletionClient, RoomStore},
    infrastructure::{
        completion::{DisabledCompletionClient, OpenAiCompletionClient},
        repository::{FileRoomStore, InMemoryRoomStore},
    },
    runtime::RoomRegistry,
    ui::Server,
    usecase::RoomServices,
};
use edgerooms_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), args.log_level());

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize dependencies in order:
    // 1. Store
    // 2. Completion client
    // 3. Room registry
    // 4. Server

    // 1. Create the persistent store
    let store: Arc<dyn RoomStore> = match &config.data_dir {
        Some(dir) => {
            tracing::info!("Persisting rooms under {}", dir.display());
            Arc::new(FileRoomStore::new(dir.clone()))
        }
        None => {
            tracing::warn!("No data directory configured; room state is kept in memory only");
            Arc::new(InMemoryRoomStore::new())
        }
    };

    // 2. Create the AI completion client
    let completion: Arc<dyn CompletionClient> = match config.ai.clone() {
        Some(ai) => {
            tracing::info!("AI completions via {} (model: {})", ai.base_url, ai.model);
            Arc::new(OpenAiCompletionClient::new(ai))
        }
        None => {
            tracing::info!("AI completions disabled");
            Arc::new(DisabledCompletionClient)
        }
    };

    // 3. Create the room registry
    let registry = Arc::new(RoomRegistry::new(RoomServices {
        store,
        completion,
        clock: Arc::new(SystemClock),
        config: config.room.clone(),
    }));

    // 4. Create and run the server
    let server = Server::new(registry);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
