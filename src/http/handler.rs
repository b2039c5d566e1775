//! HTTP handlers for the tool map API

use super::server::AppState;
use crate::graph::{
    CategorySummary, ConnectionRequest, ErrorKind, GraphDocument, GraphError, NewCategory,
    NewNode, Node, NodeId, NodePatch,
};
use crate::persistence::PersistenceError;
use crate::rankings::{NewRanking, RankingError, Submission};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::error;

/// Error body returned by every endpoint: `{"error": ..., "kind": ...}`
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Invalid,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::StorageFailure,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(e: GraphError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<RankingError> for ApiError {
    fn from(e: RankingError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::StorageFailure {
            error!("Request failed: {}", self.message);
        }
        let status = self.status();
        (status, Json(json!({ "error": self.message, "kind": self.kind }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a store call on the blocking pool
///
/// Every store operation takes the writer lock and touches the disk, so it
/// must not run on an async worker.
async fn blocking<T, F>(op: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::storage(format!("store task failed: {}", e)))?
}

/// GET /api/nodes
pub async fn list_nodes(State(state): State<AppState>) -> ApiResult<Json<GraphDocument>> {
    let graph = Arc::clone(&state.graph);
    let doc = blocking(move || Ok(graph.get_all()?)).await?;
    Ok(Json(doc))
}

/// GET /api/nodes/:id
pub async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Node>> {
    let graph = Arc::clone(&state.graph);
    let node = blocking(move || Ok(graph.get_node(&NodeId::new(id))?)).await?;
    Ok(Json(node))
}

/// POST /api/nodes
pub async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<NewNode>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    let Json(request) = payload?;
    let graph = Arc::clone(&state.graph);
    let node = blocking(move || Ok(graph.create_node(request)?)).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// PUT /api/nodes/:id
pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NodePatch>, JsonRejection>,
) -> ApiResult<Json<Node>> {
    let Json(patch) = payload?;
    let graph = Arc::clone(&state.graph);
    let node = blocking(move || Ok(graph.update_node(&NodeId::new(id), patch)?)).await?;
    Ok(Json(node))
}

/// DELETE /api/nodes/:id
pub async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let graph = Arc::clone(&state.graph);
    let removed = blocking(move || Ok(graph.delete_node(&NodeId::new(id))?)).await?;
    Ok(Json(json!({ "success": true, "deleted": removed.id })))
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategorySummary>>> {
    let graph = Arc::clone(&state.graph);
    let categories = blocking(move || Ok(graph.list_categories()?)).await?;
    Ok(Json(categories))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    let Json(request) = payload?;
    let graph = Arc::clone(&state.graph);
    let node = blocking(move || Ok(graph.create_category(request)?)).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// DELETE /api/categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let graph = Arc::clone(&state.graph);
    let removed = blocking(move || Ok(graph.delete_category(&NodeId::new(id))?)).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// POST /api/connections
pub async fn add_connection(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload?;
    let graph = Arc::clone(&state.graph);
    let created = blocking(move || Ok(graph.add_connection(request)?)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "created": created }))))
}

/// DELETE /api/connections
pub async fn remove_connection(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let graph = Arc::clone(&state.graph);
    let removed = blocking(move || Ok(graph.remove_connection(request)?)).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<Map<String, Value>>> {
    let graph = Arc::clone(&state.graph);
    let config = blocking(move || Ok(graph.get_config()?)).await?;
    Ok(Json(config))
}

/// PUT /api/config
pub async fn update_config(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<Map<String, Value>>> {
    let Json(patch) = payload?;
    let graph = Arc::clone(&state.graph);
    let config = blocking(move || Ok(graph.update_config(patch)?)).await?;
    Ok(Json(config))
}

/// GET /api/export
pub async fn export_document(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let graph = Arc::clone(&state.graph);
    let doc = blocking(move || Ok(graph.export_document()?)).await?;
    Ok((
        [(header::CONTENT_DISPOSITION, "attachment; filename=\"graph-data.json\"")],
        Json(doc),
    ))
}

/// POST /api/import
pub async fn import_document(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(raw) = payload?;
    let doc = GraphDocument::from_import(raw)?;
    let graph = Arc::clone(&state.graph);
    let total = blocking(move || Ok(graph.import_document(doc)?)).await?;
    Ok(Json(json!({ "success": true, "totalNodes": total })))
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<usize>,
}

/// GET /api/rankings
pub async fn list_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> ApiResult<Json<Value>> {
    let board = Arc::clone(&state.rankings);
    let rankings = blocking(move || Ok(board.list(query.limit)?)).await?;
    Ok(Json(json!({ "rankings": rankings })))
}

/// POST /api/rankings
pub async fn submit_ranking(
    State(state): State<AppState>,
    payload: Result<Json<NewRanking>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let Json(request) = payload?;
    let board = Arc::clone(&state.rankings);
    let submission = blocking(move || Ok(board.submit(request)?)).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/status
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let graph = Arc::clone(&state.graph);
    let nodes = blocking(move || Ok(graph.node_count()?)).await?;
    Ok(Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "storage": {
            "nodes": nodes,
            "cascade": state.graph.cascade(),
        }
    })))
}
