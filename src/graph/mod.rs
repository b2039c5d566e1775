//! Tool map graph model
//!
//! This module implements the node/category graph behind the map of tools:
//! - Nodes addressed by caller-chosen string ids, tagged `category` or `tool`
//! - Per-node adjacency (`parent`, `children`, `secondary`) as the only
//!   stored relationship data
//! - Category index plus `categoryChildren` and flat edge projections
//! - Referential integrity on every mutation, cascading category deletes

pub mod document;
pub mod edge;
pub mod node;
pub mod store;
pub mod types;

// Re-export main types
pub use document::{CategorySummary, GraphDocument};
pub use edge::{ConnectionRequest, Edge};
pub use node::{Connections, Link, NewCategory, NewNode, Node, NodePatch};
pub use store::{CascadeDepth, ErrorKind, GraphError, GraphResult, GraphStore};
pub use types::{LinkType, NodeId, NodeKind, ROOT_ID};
