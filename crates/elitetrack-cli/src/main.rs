//! EliteTrack CLI Application
//!
//! Command-line client for following vehicle armoring projects: timelines,
//! project chat and quotes, on top of a local SQLite store.

mod args;
mod cli;
mod renderer;

use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Args, Commands, ListProjectsArgs};
use clap::Parser;
use cli::Cli;
use elitetrack_core::{
    models::Actor, FsBlobStore, ProjectStateController, SqliteCache, SqliteGateway,
};
use log::{info, warn};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        cache_file,
        blob_dir,
        offline,
        no_color,
        as_role,
        as_id,
        as_name,
        command,
    } = Args::parse();

    let renderer = TerminalRenderer::new(!no_color);
    let actor = Actor::new(as_id, as_name, as_role.into());

    let cache_path = match cache_file {
        Some(path) => path,
        None => SqliteCache::default_path()?,
    };
    let cache = SqliteCache::open(&cache_path)
        .await
        .with_context(|| format!("Failed to open cache at {}", cache_path.display()))?;
    let blob_root = match blob_dir {
        Some(path) => path,
        None => FsBlobStore::default_root()?,
    };

    let mut builder = ProjectStateController::builder()
        .with_actor(actor)
        .with_cache(Arc::new(cache))
        .with_blob_store(Arc::new(FsBlobStore::new(blob_root)));

    let store = if offline {
        None
    } else {
        let path = match database_file {
            Some(path) => path,
            None => SqliteGateway::default_path()?,
        };
        let store = SqliteGateway::open(&path)
            .await
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Some(Arc::new(store))
    };
    if let Some(store) = &store {
        builder = builder
            .with_gateway(store.clone())
            .with_directory(store.clone());
    }

    let controller = builder
        .build()
        .await
        .context("Failed to initialize tracker")?;
    if let Err(e) = controller.refresh().await {
        warn!("starting from cached state: {e}");
        renderer.warn("store unavailable, showing cached state");
    }

    info!("EliteTrack started as {}", controller.actor().id);

    let cli = Cli::new(controller, store, renderer);
    let result = match command {
        Some(Project { command }) => cli.handle_project_command(command).await,
        Some(Step { command }) => cli.handle_step_command(command).await,
        Some(Chat { command }) => cli.handle_chat_command(command).await,
        Some(Quote { command }) => cli.handle_quote_command(command).await,
        Some(Client { command }) => cli.handle_client_command(command).await,
        Some(Vehicle { command }) => cli.handle_vehicle_command(command).await,
        None => {
            cli.list_projects(&ListProjectsArgs {
                client: None,
                email: None,
            })
            .await
        }
    };
    cli.finish().await;
    result
}
