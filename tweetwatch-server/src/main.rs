use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tweetwatch_core::Error;
use tweetwatch_core::eventbus::EventBus;
use tweetwatch_core::eventbus::escalation_logger::spawn_escalation_logger;

mod context;
mod server;

use context::{Args, build_state};

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("tweetwatch=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenv::dotenv() {
        // A missing .env is normal; anything else is worth knowing about.
        if !e.not_found() {
            eprintln!("Could not load .env: {}", e);
        }
    }
    init_tracing();
    let args = Args::parse();
    info!(
        "TweetWatch starting. addr={}, storage={}, classifier={}",
        args.server_addr, args.storage, args.classifier
    );

    if let Err(e) = run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args) -> Result<(), Error> {
    let event_bus = Arc::new(EventBus::new());
    let logger_handle = spawn_escalation_logger(&event_bus).await;

    let state = build_state(&args, event_bus.clone()).await?;
    let served = server::serve(&args.server_addr, state).await;

    event_bus.shutdown();
    if let Err(e) = logger_handle.await {
        warn!("Escalation logger ended abnormally: {}", e);
    }
    served
}
