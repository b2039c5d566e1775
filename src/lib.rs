//! Tool Map
//!
//! A persistent node/category graph behind an interactive map of AI tools,
//! served over a JSON REST API.
//!
//! # Architecture
//!
//! - [`graph`]: the in-memory model. Nodes keyed by string id, a per-node
//!   adjacency record as the single source of relationship truth, an ordered
//!   category index, and the derived `categoryChildren` and edge views.
//! - [`persistence`]: one JSON document on disk. Each operation reloads it,
//!   applies the change under a writer lock and writes it back atomically.
//! - [`rankings`]: the quiz leaderboard, an independent JSON document.
//! - [`http`]: axum routes under `/api`.
//! - [`config`]: flags and `TOOLMAP_*` environment variables.
//!
//! ## Example Usage
//!
//! ```rust
//! use toolmap::graph::{CascadeDepth, ConnectionRequest, GraphStore, NewCategory, NewNode, NodeId};
//!
//! let mut store = GraphStore::new();
//! store.create_category(NewCategory::new("ides", "IDEs")).unwrap();
//! store
//!     .create_node(NewNode::new("cursor").with_parent_category("ides"))
//!     .unwrap();
//! store.create_node(NewNode::new("copilot")).unwrap();
//! store
//!     .add_connection(ConnectionRequest::new("copilot", "cursor"))
//!     .unwrap();
//!
//! assert_eq!(store.category_children()["ides"], vec![NodeId::new("cursor")]);
//!
//! let removed = store
//!     .delete_category(&NodeId::new("ides"), CascadeDepth::Direct)
//!     .unwrap();
//! assert_eq!(removed.len(), 2);
//! assert!(store.get_node(&NodeId::new("copilot")).unwrap().connections.secondary.is_empty());
//! ```

pub mod config;
pub mod graph;
pub mod http;
pub mod persistence;
pub mod rankings;

pub use config::ServerConfig;
pub use graph::{
    CascadeDepth, ConnectionRequest, Edge, ErrorKind, GraphDocument, GraphError, GraphStore,
    NewCategory, NewNode, Node, NodeId, NodeKind, NodePatch,
};
pub use http::{AppState, HttpServer};
pub use persistence::{PersistenceError, PersistenceManager};
pub use rankings::{NewRanking, RankingBoard, RankingEntry};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, env!("CARGO_PKG_VERSION"));
    }
}
