//! Flat edge view of the graph
//!
//! Edges are never stored: they are projected from node adjacency for the
//! exported `connections` list, and folded back into adjacency on load.

use super::store::{GraphError, GraphResult};
use super::types::{LinkType, NodeId};
use serde::{Deserialize, Serialize};

/// One `{id, source, target, type}` entry of the flat connection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Derived key, `<source>-<target>-<type>`
    #[serde(default)]
    pub id: String,

    /// Node that owns (or cross-links to) the target
    pub source: NodeId,

    pub target: NodeId,

    #[serde(rename = "type", default)]
    pub link_type: LinkType,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId, link_type: impl Into<LinkType>) -> Self {
        let link_type = link_type.into();
        Edge {
            id: Self::key(&source, &target, &link_type),
            source,
            target,
            link_type,
        }
    }

    pub fn key(source: &NodeId, target: &NodeId, link_type: &LinkType) -> String {
        format!("{}-{}-{}", source, target, link_type)
    }

    /// Check if this edge touches a node at either end
    pub fn mentions(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    pub fn is_secondary(&self) -> bool {
        self.link_type.is_secondary()
    }
}

/// Payload of an add/remove connection request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionRequest {
    pub source: Option<NodeId>,
    pub target: Option<NodeId>,
    /// Defaults to `secondary`
    #[serde(rename = "type")]
    pub link_type: Option<LinkType>,
}

impl ConnectionRequest {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        ConnectionRequest {
            source: Some(source.into()),
            target: Some(target.into()),
            link_type: None,
        }
    }

    pub fn with_type(mut self, link_type: impl Into<LinkType>) -> Self {
        self.link_type = Some(link_type.into());
        self
    }

    pub fn into_parts(self) -> GraphResult<(NodeId, NodeId, LinkType)> {
        let source = self
            .source
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GraphError::Invalid("connection source is required".to_string()))?;
        let target = self
            .target
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GraphError::Invalid("connection target is required".to_string()))?;
        Ok((source, target, self.link_type.unwrap_or_else(LinkType::secondary)))
    }
}
