//! HTTP server exposing the tool map API

use super::handler::{
    add_connection, create_category, create_node, delete_category, delete_node, export_document,
    get_config, get_node, import_document, list_categories, list_nodes, list_rankings,
    remove_connection, status_handler, submit_ranking, update_config, update_node,
};
use crate::config::ServerConfig;
use crate::persistence::PersistenceManager;
use crate::rankings::RankingBoard;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<PersistenceManager>,
    pub rankings: Arc<RankingBoard>,
}

impl AppState {
    pub fn new(graph: PersistenceManager, rankings: RankingBoard) -> Self {
        Self {
            graph: Arc::new(graph),
            rankings: Arc::new(rankings),
        }
    }
}

/// All API routes under `/api`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route(
            "/api/nodes/:id",
            get(get_node).put(update_node).delete(delete_node),
        )
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/:id", delete(delete_category))
        .route(
            "/api/connections",
            post(add_connection).delete(remove_connection),
        )
        .route("/api/config", get(get_config).put(update_config))
        .route("/api/export", get(export_document))
        .route("/api/import", post(import_document))
        .route("/api/rankings", get(list_rankings).post(submit_ranking))
        .route("/api/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP server managing the tool map API
pub struct HttpServer {
    state: AppState,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(state: AppState, config: ServerConfig) -> Self {
        Self { state, config }
    }

    /// Serve until Ctrl+C, then close the graph document
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.state.clone());

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Tool map API available at http://{}/api", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        if let Ok(graph) = Arc::try_unwrap(self.state.graph) {
            graph.close();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: serve until the process is killed.
        std::future::pending::<()>().await;
    }
}
