use anyhow::Context;
use clap::Parser;
use toolmap::{AppState, HttpServer, PersistenceManager, RankingBoard, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Tool map server v{}", toolmap::version());

    let graph = PersistenceManager::open(&config.data_path, config.cascade)
        .with_context(|| format!("opening graph document {}", config.data_path.display()))?;
    let rankings = RankingBoard::open(&config.rankings_path).with_context(|| {
        format!("opening rankings document {}", config.rankings_path.display())
    })?;

    let state = AppState::new(graph, rankings);
    let server = HttpServer::new(state, config);
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}
