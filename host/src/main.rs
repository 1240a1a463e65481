//! Tabletop Host - runs a tabletop world over stdin/stdout.
//!
//! The host reads one JSON request per line from stdin, applies it to a
//! world owned by a single task, and writes one JSON response per line to
//! stdout. Logs go to stderr.

mod actor;
mod backend;
mod config;
mod error;
mod loader;
mod packs;
mod protocol;
mod session;

use crate::actor::WorldHandle;
use crate::config::Config;
use crate::packs::PackStore;
use crate::protocol::HostResponse;
use crate::session::Session;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabletop_host=debug,tabletop_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let world = match &config.world_file {
        Some(path) => loader::load_world_file(path).await?,
        None => loader::empty_world()?,
    };
    let (world, world_task) = WorldHandle::spawn(world);
    let packs = Arc::new(PackStore::new(config.packs_dir.clone()));

    let (responses, outgoing) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_responses(outgoing));
    let session = Session::new(world, packs, &config.user_id, responses);

    tracing::info!(user_id = %config.user_id, "Tabletop host ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        session.handle_line(&line).await;
    }

    // Writer and world task finish once in-flight imports drop their
    // session clones.
    drop(session);
    writer.await??;
    world_task.await?;

    tracing::info!("Tabletop host stopped");
    Ok(())
}

/// Write each response as one JSON line on stdout.
async fn write_responses(mut outgoing: mpsc::UnboundedReceiver<HostResponse>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(response) = outgoing.recv().await {
        let mut line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                continue;
            }
        };
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
