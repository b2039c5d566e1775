//! Node implementation for the tool map graph
//!
//! A node carries its own adjacency (`connections`), which is the single
//! authoritative record of parent, child and cross-link relationships.

use super::types::{LinkType, NodeId, NodeKind};
use super::store::{GraphError, GraphResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One `{id, type}` entry of a node's `parent` or `children` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: NodeId,

    #[serde(rename = "type", default)]
    pub link_type: LinkType,
}

impl Link {
    pub fn new(id: impl Into<NodeId>, link_type: impl Into<LinkType>) -> Self {
        Link {
            id: id.into(),
            link_type: link_type.into(),
        }
    }

    pub fn primary(id: impl Into<NodeId>) -> Self {
        Link::new(id, LinkType::primary())
    }
}

/// Adjacency record of a node
///
/// - `parent`: nodes that own this node (ordered)
/// - `children`: nodes this node owns (ordered, unique by id)
/// - `secondary`: cross-links, set semantics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub parent: Vec<Link>,

    #[serde(default)]
    pub children: Vec<Link>,

    #[serde(default)]
    pub secondary: Vec<NodeId>,
}

impl Connections {
    pub fn has_parent(&self, id: &NodeId) -> bool {
        self.parent.iter().any(|link| &link.id == id)
    }

    pub fn has_child(&self, id: &NodeId) -> bool {
        self.children.iter().any(|link| &link.id == id)
    }

    pub fn has_secondary(&self, id: &NodeId) -> bool {
        self.secondary.contains(id)
    }

    /// Append a parent link unless one with the same id exists
    pub fn add_parent(&mut self, link: Link) -> bool {
        if self.has_parent(&link.id) {
            return false;
        }
        self.parent.push(link);
        true
    }

    /// Append a child link unless one with the same id exists
    pub fn add_child(&mut self, link: Link) -> bool {
        if self.has_child(&link.id) {
            return false;
        }
        self.children.push(link);
        true
    }

    pub fn add_secondary(&mut self, id: NodeId) -> bool {
        if self.has_secondary(&id) {
            return false;
        }
        self.secondary.push(id);
        true
    }

    pub fn remove_child(&mut self, id: &NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|link| &link.id != id);
        before != self.children.len()
    }

    pub fn remove_secondary(&mut self, id: &NodeId) -> bool {
        let before = self.secondary.len();
        self.secondary.retain(|s| s != id);
        before != self.secondary.len()
    }

    /// Remove every reference to `id` from all three roles
    pub fn strip(&mut self, id: &NodeId) {
        self.parent.retain(|link| &link.id != id);
        self.children.retain(|link| &link.id != id);
        self.secondary.retain(|s| s != id);
    }

    /// Keep only references accepted by `exists`, collapsing duplicates
    pub fn retain_known(&mut self, exists: impl Fn(&NodeId) -> bool) {
        let mut seen = std::collections::HashSet::new();
        self.parent.retain(|link| exists(&link.id) && seen.insert(link.id.clone()));
        seen.clear();
        self.children.retain(|link| exists(&link.id) && seen.insert(link.id.clone()));
        seen.clear();
        self.secondary.retain(|id| exists(id) && seen.insert(id.clone()));
    }

    /// Every id this record points at, in any role
    pub fn referenced_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.parent
            .iter()
            .map(|link| &link.id)
            .chain(self.children.iter().map(|link| &link.id))
            .chain(self.secondary.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty() && self.children.is_empty() && self.secondary.is_empty()
    }
}

/// A vertex in the tool map: a category or a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Always equal to the node's key in the document
    #[serde(default)]
    pub id: NodeId,

    /// Display string; filled from `id` when a stored node has none
    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", default)]
    pub kind: NodeKind,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    #[serde(rename = "infoHTML", default, skip_serializing_if = "Option::is_none")]
    pub info_html: Option<String>,

    /// Free-form category tag used by the renderer for styling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default)]
    pub connections: Connections,

    /// Fields written by older tooling that this crate does not model.
    /// Kept so that a load/save cycle never drops data.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        let mut label = label.into();
        if label.is_empty() {
            label = id.as_str().to_string();
        }
        Node {
            id,
            label,
            kind,
            url: None,
            info: None,
            info_html: None,
            category: None,
            image: None,
            connections: Connections::default(),
            extra: Map::new(),
        }
    }

    pub fn tool(id: impl Into<NodeId>) -> Self {
        let id = id.into();
        let label = id.as_str().to_string();
        Node::new(id, label, NodeKind::Tool)
    }

    pub fn category(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Node::new(id, label, NodeKind::Category)
    }

    pub fn is_category(&self) -> bool {
        self.kind.is_category()
    }

    /// Text shown for this node: `infoHTML` wins over `info`
    pub fn display_info(&self) -> Option<&str> {
        self.info_html.as_deref().or(self.info.as_deref())
    }

    /// Shallow merge of `patch` onto this node; the id never changes
    pub fn apply_patch(&mut self, patch: NodePatch) {
        if let Some(label) = patch.label {
            self.label = if label.is_empty() {
                self.id.as_str().to_string()
            } else {
                label
            };
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(info) = patch.info {
            self.info = info;
        }
        if let Some(info_html) = patch.info_html {
            self.info_html = info_html;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(connections) = patch.connections {
            self.connections = connections;
        }
    }

    pub(crate) fn fill_label(&mut self) {
        if self.label.is_empty() {
            self.label = self.id.as_str().to_string();
        }
    }
}

/// Payload of a create-node request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewNode {
    pub id: Option<NodeId>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<NodeKind>,
    pub url: Option<String>,
    pub info: Option<String>,
    #[serde(rename = "infoHTML")]
    pub info_html: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub connections: Option<Connections>,
    /// Category whose child list the new node joins
    pub parent_category: Option<NodeId>,
}

impl NewNode {
    pub fn new(id: impl Into<NodeId>) -> Self {
        NewNode {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_parent_category(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent_category = Some(parent.into());
        self
    }

    /// Validate the payload and split it into the node and its parent category
    pub fn into_node(self) -> GraphResult<(Node, Option<NodeId>)> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(GraphError::Invalid("node id is required".to_string())),
        };

        let mut node = Node::new(id, self.label.unwrap_or_default(), self.kind.unwrap_or_default());
        node.url = self.url;
        node.info = self.info;
        node.info_html = self.info_html;
        node.category = self.category;
        node.image = self.image;
        node.connections = self.connections.unwrap_or_default();

        Ok((node, self.parent_category))
    }
}

/// Payload of a create-category request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCategory {
    pub id: Option<NodeId>,
    pub label: Option<String>,
    pub info: Option<String>,
    #[serde(rename = "infoHTML")]
    pub info_html: Option<String>,
}

impl NewCategory {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        NewCategory {
            id: Some(id.into()),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Both `id` and `label` must be present and non-empty
    pub fn into_node(self) -> GraphResult<Node> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(GraphError::Invalid("category id is required".to_string())),
        };
        let label = match self.label {
            Some(label) if !label.trim().is_empty() => label,
            _ => return Err(GraphError::Invalid("category label is required".to_string())),
        };

        let mut node = Node::category(id, label);
        node.info = self.info;
        node.info_html = self.info_html;
        node.connections.add_parent(Link::primary(NodeId::root()));
        Ok(node)
    }
}

/// Payload of an update-node request
///
/// Nullable fields use `Option<Option<_>>`: absent leaves the value alone,
/// explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodePatch {
    /// Accepted for compatibility, always ignored
    pub id: Option<NodeId>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<NodeKind>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub info: Option<Option<String>>,
    #[serde(rename = "infoHTML", default, deserialize_with = "explicit_null")]
    pub info_html: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub image: Option<Option<String>>,
    pub connections: Option<Connections>,
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
