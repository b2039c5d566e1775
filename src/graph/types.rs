//! Core type definitions for the tool map graph

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Reserved id of the single entry-point node
pub const ROOT_ID: &str = "root";

/// Unique, immutable identifier of a node
///
/// Ids are caller-chosen strings (`"cursor"`, `"ides"`); there is no
/// surrogate key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// The reserved `root` id
    pub fn root() -> Self {
        NodeId(ROOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Node tag: a grouping category or a leaf tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Category,
    #[default]
    Tool,
}

impl NodeKind {
    pub fn is_category(&self) -> bool {
        matches!(self, NodeKind::Category)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Category => write!(f, "category"),
            NodeKind::Tool => write!(f, "tool"),
        }
    }
}

/// Connection type (e.g. "primary", "secondary")
///
/// `secondary` marks a non-hierarchical cross-link; every other value is
/// structural and lives in a node's `children` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LinkType(String);

impl LinkType {
    pub const PRIMARY: &'static str = "primary";
    pub const SECONDARY: &'static str = "secondary";

    pub fn new(link_type: impl Into<String>) -> Self {
        LinkType(link_type.into())
    }

    pub fn primary() -> Self {
        LinkType(Self::PRIMARY.to_string())
    }

    pub fn secondary() -> Self {
        LinkType(Self::SECONDARY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_secondary(&self) -> bool {
        self.0 == Self::SECONDARY
    }
}

impl Default for LinkType {
    fn default() -> Self {
        Self::primary()
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LinkType {
    fn from(s: String) -> Self {
        LinkType(s)
    }
}

impl From<&str> for LinkType {
    fn from(s: &str) -> Self {
        LinkType(s.to_string())
    }
}
