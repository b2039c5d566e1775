//! In-memory tool map storage
//!
//! `GraphStore` holds the authoritative state (nodes with their adjacency,
//! the ordered category index and the layout config) and applies every
//! mutation so that no id is ever left dangling. The `categoryChildren`
//! map and the flat edge list are projections computed on demand.

use super::document::{timestamp_now, CategorySummary, GraphDocument};
use super::edge::{ConnectionRequest, Edge};
use super::node::{Link, NewCategory, NewNode, Node, NodePatch};
use super::types::{LinkType, NodeId, ROOT_ID};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Node {0} already exists")]
    NodeAlreadyExists(NodeId),

    #[error("Category {0} already exists")]
    CategoryAlreadyExists(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Caller-facing error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Invalid,
    NotFound,
    Conflict,
    StorageFailure,
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::Invalid(_) => ErrorKind::Invalid,
            GraphError::NodeNotFound(_) => ErrorKind::NotFound,
            GraphError::NodeAlreadyExists(_) | GraphError::CategoryAlreadyExists(_) => {
                ErrorKind::Conflict
            }
        }
    }
}

/// How far a category delete reaches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CascadeDepth {
    /// The category and its direct children only
    #[default]
    Direct,
    /// Also every descendant reachable through child categories
    Transitive,
}

impl std::fmt::Display for CascadeDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CascadeDepth::Direct => write!(f, "direct"),
            CascadeDepth::Transitive => write!(f, "transitive"),
        }
    }
}

/// In-memory tool map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStore {
    /// Node storage, insertion ordered
    nodes: IndexMap<NodeId, Node>,

    /// Ordered category index (never contains `root`)
    categories: Vec<NodeId>,

    /// Opaque renderer config
    config: Map<String, Value>,

    export_date: Option<String>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a persisted document
    ///
    /// Membership recorded only in `categoryChildren` or in the flat
    /// `connections` list is folded into node adjacency, then every
    /// reference to a missing id is dropped.
    pub fn from_document(doc: GraphDocument) -> Self {
        let GraphDocument {
            export_date,
            categories,
            category_children,
            config,
            nodes,
            connections,
            ..
        } = doc;

        let mut store = GraphStore {
            nodes: IndexMap::with_capacity(nodes.len()),
            categories: Vec::with_capacity(categories.len()),
            config,
            export_date,
        };

        for (key, mut node) in nodes {
            node.id = key.clone();
            node.fill_label();
            store.nodes.insert(key, node);
        }

        for (category, children) in category_children {
            for child in children {
                store.fold_membership(&category, &child);
            }
        }

        for edge in connections {
            store.fold_edge(edge);
        }

        let mut seen = HashSet::new();
        for id in categories {
            if !id.is_root() && store.nodes.contains_key(&id) && seen.insert(id.clone()) {
                store.categories.push(id);
            }
        }

        store.prune_dangling();
        store
    }

    /// Project the store into its persisted shape
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            export_date: self.export_date.clone(),
            total_nodes: self.nodes.len(),
            categories: self.categories.clone(),
            category_children: self.category_children(),
            config: self.config.clone(),
            nodes: self.nodes.clone(),
            connections: self.edges(),
        }
    }

    /// `category id -> child ids` for every listed category
    pub fn category_children(&self) -> IndexMap<NodeId, Vec<NodeId>> {
        self.categories
            .iter()
            .map(|id| (id.clone(), self.category_members(id)))
            .collect()
    }

    /// Flat edge list: structural children first, then cross-links, per node
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for node in self.nodes.values() {
            for link in &node.connections.children {
                edges.push(Edge::new(node.id.clone(), link.id.clone(), link.link_type.clone()));
            }
            for target in &node.connections.secondary {
                edges.push(Edge::new(node.id.clone(), target.clone(), LinkType::secondary()));
            }
        }
        edges
    }

    /// Refresh `exportDate`; called on every write
    pub fn touch(&mut self) {
        self.export_date = Some(timestamp_now());
    }

    pub fn export_date(&self) -> Option<&str> {
        self.export_date.as_deref()
    }

    pub fn get_node(&self, id: &NodeId) -> GraphResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn categories(&self) -> &[NodeId] {
        &self.categories
    }

    pub fn is_category(&self, id: &NodeId) -> bool {
        self.categories.contains(id)
    }

    /// Category listing with child counts, in category order
    pub fn list_categories(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .filter_map(|id| {
                self.nodes.get(id).map(|node| CategorySummary {
                    id: id.clone(),
                    label: node.label.clone(),
                    child_count: node
                        .connections
                        .children
                        .iter()
                        .filter(|link| link.link_type == LinkType::primary())
                        .count(),
                })
            })
            .collect()
    }

    /// Insert a new node
    ///
    /// Category nodes join the category index. A `parentCategory` naming a
    /// listed category links the node beneath it in both directions.
    pub fn create_node(&mut self, request: NewNode) -> GraphResult<Node> {
        let (mut node, parent_category) = request.into_node()?;

        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::NodeAlreadyExists(node.id));
        }

        node.connections.retain_known(|id| self.nodes.contains_key(id));

        let id = node.id.clone();
        let is_category = node.is_category();
        self.nodes.insert(id.clone(), node);

        if is_category && !id.is_root() && !self.categories.contains(&id) {
            self.categories.push(id.clone());
        }

        if let Some(parent) = parent_category {
            if self.categories.contains(&parent) {
                self.link_primary(&parent, &id);
            }
        }

        debug!("Created node {}", id);
        self.get_node(&id).cloned()
    }

    /// Shallow-merge a patch onto an existing node
    ///
    /// Adjacency supplied in the patch is kept only where it points at
    /// existing nodes.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> GraphResult<Node> {
        let replaces_connections = patch.connections.is_some();
        let known: HashSet<NodeId> = if replaces_connections {
            self.nodes.keys().cloned().collect()
        } else {
            HashSet::new()
        };

        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        node.apply_patch(patch);
        if replaces_connections {
            node.connections.retain_known(|other| other != id && known.contains(other));
        }

        debug!("Updated node {}", id);
        Ok(node.clone())
    }

    /// Remove a node and every reference to it
    pub fn delete_node(&mut self, id: &NodeId) -> GraphResult<Node> {
        let removed = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        self.categories.retain(|c| c != id);
        for node in self.nodes.values_mut() {
            node.connections.strip(id);
        }

        debug!("Deleted node {}", id);
        Ok(removed)
    }

    /// Create a category hanging off `root`
    ///
    /// A default `root` node is created when the document has none.
    pub fn create_category(&mut self, request: NewCategory) -> GraphResult<Node> {
        let node = request.into_node()?;
        let id = node.id.clone();

        if self.categories.contains(&id) {
            return Err(GraphError::CategoryAlreadyExists(id));
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::NodeAlreadyExists(id));
        }
        if id.is_root() {
            return Err(GraphError::Invalid("`root` cannot be a category".to_string()));
        }

        self.ensure_root();
        self.nodes.insert(id.clone(), node);
        self.categories.push(id.clone());
        if let Some(root) = self.nodes.get_mut(ROOT_ID) {
            root.connections.add_child(Link::primary(id.clone()));
        }

        debug!("Created category {}", id);
        self.get_node(&id).cloned()
    }

    /// Delete a category together with its children
    ///
    /// Returns the ids that were removed, children first. Deleting an
    /// unknown category is not an error; `root` cannot be deleted this way.
    pub fn delete_category(&mut self, id: &NodeId, depth: CascadeDepth) -> GraphResult<Vec<NodeId>> {
        if id.is_root() {
            return Err(GraphError::Invalid("`root` cannot be deleted as a category".to_string()));
        }

        let mut visited: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([id.clone()]);
        let mut victims = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.category_members(&current) {
                if child.is_root() || !visited.insert(child.clone()) {
                    continue;
                }
                if depth == CascadeDepth::Transitive && self.categories.contains(&child) {
                    queue.push_back(child.clone());
                }
                victims.push(child);
            }
        }

        let mut removed = Vec::with_capacity(victims.len() + 1);
        for victim in victims {
            if self.delete_node(&victim).is_ok() {
                removed.push(victim);
            }
        }

        if self.delete_node(id).is_ok() {
            removed.push(id.clone());
        } else {
            self.categories.retain(|c| c != id);
        }
        if let Some(root) = self.nodes.get_mut(ROOT_ID) {
            root.connections.remove_child(id);
        }

        debug!("Deleted category {} ({} nodes removed)", id, removed.len());
        Ok(removed)
    }

    /// Link `source` to `target`; returns false when the link already existed
    ///
    /// `secondary` links go to the source's cross-link set, every other type
    /// is appended to its children.
    pub fn add_connection(&mut self, request: ConnectionRequest) -> GraphResult<bool> {
        let (source, target, link_type) = request.into_parts()?;

        if !self.nodes.contains_key(&target) {
            return Err(GraphError::NodeNotFound(target));
        }
        let node = self
            .nodes
            .get_mut(&source)
            .ok_or_else(|| GraphError::NodeNotFound(source.clone()))?;

        let added = if link_type.is_secondary() {
            node.connections.add_secondary(target)
        } else {
            node.connections.add_child(Link::new(target, link_type))
        };
        Ok(added)
    }

    /// Remove a link; returns false when there was nothing to remove
    pub fn remove_connection(&mut self, request: ConnectionRequest) -> GraphResult<bool> {
        let (source, target, link_type) = request.into_parts()?;

        let Some(node) = self.nodes.get_mut(&source) else {
            return Ok(false);
        };
        let removed = if link_type.is_secondary() {
            node.connections.remove_secondary(&target)
        } else {
            node.connections.remove_child(&target)
        };
        Ok(removed)
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Shallow merge of `patch` into the layout config
    pub fn update_config(&mut self, patch: Map<String, Value>) -> &Map<String, Value> {
        for (key, value) in patch {
            self.config.insert(key, value);
        }
        &self.config
    }

    /// Primary child ids of a listed category; empty for anything else
    ///
    /// Other structural link types from a category are plain connections,
    /// not membership.
    fn category_members(&self, id: &NodeId) -> Vec<NodeId> {
        if !self.categories.contains(id) {
            return Vec::new();
        }
        self.nodes
            .get(id)
            .map(|node| {
                node.connections
                    .children
                    .iter()
                    .filter(|link| link.link_type == LinkType::primary())
                    .map(|link| link.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ensure_root(&mut self) {
        if !self.nodes.contains_key(ROOT_ID) {
            self.nodes
                .insert(NodeId::root(), Node::category(NodeId::root(), "root"));
        }
    }

    /// Primary link in both directions
    fn link_primary(&mut self, parent: &NodeId, child: &NodeId) {
        if parent == child {
            return;
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.connections.add_child(Link::primary(child.clone()));
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.connections.add_parent(Link::primary(parent.clone()));
        }
    }

    /// `categoryChildren` entry of a loaded document
    fn fold_membership(&mut self, category: &NodeId, child: &NodeId) {
        if category == child || !self.nodes.contains_key(child) {
            return;
        }
        let added = match self.nodes.get_mut(category) {
            Some(node) => node.connections.add_child(Link::primary(child.clone())),
            None => false,
        };
        if added {
            if let Some(node) = self.nodes.get_mut(child) {
                node.connections.add_parent(Link::primary(category.clone()));
            }
        }
    }

    /// Flat `connections` entry of a loaded document
    fn fold_edge(&mut self, edge: Edge) {
        if !self.nodes.contains_key(&edge.target) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&edge.source) {
            if edge.link_type.is_secondary() {
                node.connections.add_secondary(edge.target);
            } else {
                node.connections.add_child(Link::new(edge.target, edge.link_type));
            }
        }
    }

    fn prune_dangling(&mut self) {
        let known: HashSet<NodeId> = self.nodes.keys().cloned().collect();
        for node in self.nodes.values_mut() {
            node.connections.retain_known(|id| known.contains(id));
        }
        self.categories.retain(|id| known.contains(id));
    }
}
