//! Persisted shape of the tool map
//!
//! `GraphDocument` is what lives on disk and what export/import exchange.
//! `categoryChildren` and `connections` are projections of node adjacency;
//! they are written for consumers but never trusted as the source of truth.

use super::edge::Edge;
use super::node::Node;
use super::store::{GraphError, GraphResult};
use super::types::NodeId;
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The full persisted aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    /// RFC 3339 timestamp of the last write or export
    #[serde(default)]
    pub export_date: Option<String>,

    #[serde(default)]
    pub total_nodes: usize,

    #[serde(default)]
    pub categories: Vec<NodeId>,

    #[serde(default)]
    pub category_children: IndexMap<NodeId, Vec<NodeId>>,

    /// Opaque renderer layout settings
    #[serde(default)]
    pub config: Map<String, Value>,

    #[serde(default)]
    pub nodes: IndexMap<NodeId, Node>,

    #[serde(default)]
    pub connections: Vec<Edge>,
}

impl GraphDocument {
    /// Parse an import payload; `nodes` must be present
    pub fn from_import(payload: Value) -> GraphResult<Self> {
        match payload.get("nodes") {
            Some(Value::Object(_)) => {}
            Some(_) => return Err(GraphError::Invalid("`nodes` must be an object".to_string())),
            None => return Err(GraphError::Invalid("`nodes` is required".to_string())),
        }
        serde_json::from_value(payload)
            .map_err(|e| GraphError::Invalid(format!("malformed document: {}", e)))
    }
}

/// Current UTC time in the format written to `exportDate`
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Row of the category listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: NodeId,
    pub label: String,
    pub child_count: usize,
}
