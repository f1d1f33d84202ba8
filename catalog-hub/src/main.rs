//! Catalog hub server.

use anyhow::Result;
use axum::serve;
use catalog_hub::api::{self, AppState};
use catalog_hub::config::Config;
use catalog_hub_core::hierarchy::MaterializeMode;
use catalog_hub_core::storage::FileStore;
use clap::Parser;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-hub")]
#[command(about = "Category, property and mapping catalog over a document store")]
struct Cli {
    /// Listen address
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// Directory holding one sub-directory per collection
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Longest ancestor chain a category may have
    #[arg(long)]
    max_depth: Option<usize>,

    /// How path materialization writes: two-phase or single-write
    #[arg(long)]
    materialize_mode: Option<MaterializeMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(max_depth) = cli.max_depth {
        config.hierarchy.max_depth = max_depth;
    }
    if let Some(mode) = cli.materialize_mode {
        config.hierarchy.mode = mode;
    }
    config.validate()?;

    let store = Arc::new(FileStore::open(&config.data_dir)?);
    let app = api::router(AppState::new(store, &config));

    let listener = TcpListener::bind(config.addr).await?;
    info!(
        addr = %config.addr,
        data_dir = %config.data_dir.display(),
        mode = ?config.hierarchy.mode,
        max_depth = config.hierarchy.max_depth,
        "catalog hub listening"
    );
    serve(listener, app.into_make_service()).into_future().await?;
    Ok(())
}
