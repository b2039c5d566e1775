//! Persistence layer for the tool map
//!
//! The whole graph lives in one JSON document. Every operation runs as a
//! single serialized unit: take the writer lock, reload the document from
//! storage, apply the change on a `GraphStore`, write the full document
//! back, release. Reads are always fresh, so edits made to the file by
//! other tools are picked up on the next call.

pub mod storage;

pub use storage::{FileStorage, JsonDocument, MemoryStorage, Storage, StorageError, StorageResult};

use crate::graph::{
    CascadeDepth, CategorySummary, ConnectionRequest, ErrorKind, GraphDocument, GraphError,
    GraphStore, NewCategory, NewNode, Node, NodeId, NodePatch,
};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Integrated persistence manager: document storage plus the write lock
pub struct PersistenceManager {
    /// Graph document codec over the storage backend
    document: JsonDocument<GraphDocument>,
    /// Reach of category deletes
    cascade: CascadeDepth,
    /// Serializes every read-modify-write cycle
    writer: Mutex<()>,
}

impl PersistenceManager {
    /// Open a manager backed by a JSON file
    pub fn open(path: impl AsRef<Path>, cascade: CascadeDepth) -> PersistenceResult<Self> {
        let storage = FileStorage::open(path)?;
        Ok(Self::with_storage(storage, cascade))
    }

    /// Create a manager over any storage backend
    pub fn with_storage(storage: impl Storage + 'static, cascade: CascadeDepth) -> Self {
        let document = JsonDocument::new(storage);
        info!(
            "Persistence manager ready at {} (cascade: {:?})",
            document.describe(),
            cascade
        );
        Self {
            document,
            cascade,
            writer: Mutex::new(()),
        }
    }

    /// Release the backend
    ///
    /// Every write is already flushed when its call returns; closing only
    /// makes the end of the manager's lifetime explicit.
    pub fn close(self) {
        info!("Closing persistence manager at {}", self.document.describe());
    }

    pub fn cascade(&self) -> CascadeDepth {
        self.cascade
    }

    /// Full current document
    pub fn get_all(&self) -> PersistenceResult<GraphDocument> {
        self.read(|store| Ok(store.to_document()))
    }

    pub fn get_node(&self, id: &NodeId) -> PersistenceResult<Node> {
        self.read(|store| Ok(store.get_node(id)?.clone()))
    }

    pub fn node_count(&self) -> PersistenceResult<usize> {
        self.read(|store| Ok(store.node_count()))
    }

    pub fn create_node(&self, request: NewNode) -> PersistenceResult<Node> {
        self.write(|store| store.create_node(request))
    }

    pub fn update_node(&self, id: &NodeId, patch: NodePatch) -> PersistenceResult<Node> {
        self.write(|store| store.update_node(id, patch))
    }

    pub fn delete_node(&self, id: &NodeId) -> PersistenceResult<Node> {
        self.write(|store| store.delete_node(id))
    }

    pub fn list_categories(&self) -> PersistenceResult<Vec<CategorySummary>> {
        self.read(|store| Ok(store.list_categories()))
    }

    pub fn create_category(&self, request: NewCategory) -> PersistenceResult<Node> {
        self.write(|store| store.create_category(request))
    }

    /// Delete a category and its children; returns the removed ids
    pub fn delete_category(&self, id: &NodeId) -> PersistenceResult<Vec<NodeId>> {
        let cascade = self.cascade;
        let removed = self.write(|store| store.delete_category(id, cascade))?;
        info!("Deleted category {} with {} node(s)", id, removed.len());
        Ok(removed)
    }

    pub fn add_connection(&self, request: ConnectionRequest) -> PersistenceResult<bool> {
        self.write(|store| store.add_connection(request))
    }

    pub fn remove_connection(&self, request: ConnectionRequest) -> PersistenceResult<bool> {
        self.write(|store| store.remove_connection(request))
    }

    /// Current document stamped with a fresh `exportDate`
    ///
    /// The stamp is not written back.
    pub fn export_document(&self) -> PersistenceResult<GraphDocument> {
        self.read(|store| {
            let mut store = store.clone();
            store.touch();
            Ok(store.to_document())
        })
    }

    /// Replace the whole document; returns the number of imported nodes
    pub fn import_document(&self, doc: GraphDocument) -> PersistenceResult<usize> {
        let count = self.write(|store| {
            *store = GraphStore::from_document(doc);
            Ok(store.node_count())
        })?;
        info!("Imported document with {} nodes", count);
        Ok(count)
    }

    pub fn get_config(&self) -> PersistenceResult<Map<String, Value>> {
        self.read(|store| Ok(store.config().clone()))
    }

    /// Shallow-merge into the layout config
    pub fn update_config(&self, patch: Map<String, Value>) -> PersistenceResult<Map<String, Value>> {
        self.write(|store| Ok(store.update_config(patch).clone()))
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Unavailable("writer lock poisoned".to_string()).into())
    }

    fn read<R>(
        &self,
        op: impl FnOnce(&GraphStore) -> Result<R, GraphError>,
    ) -> PersistenceResult<R> {
        let _guard = self.lock()?;
        let store = GraphStore::from_document(self.document.load());
        Ok(op(&store)?)
    }

    /// Load, mutate, and persist only when the mutation changed something
    fn write<R>(
        &self,
        op: impl FnOnce(&mut GraphStore) -> Result<R, GraphError>,
    ) -> PersistenceResult<R> {
        let _guard = self.lock()?;
        let mut store = GraphStore::from_document(self.document.load());
        let before = store.clone();

        let result = op(&mut store)?;

        if store != before {
            store.touch();
            self.document.save(&store.to_document())?;
            debug!("Persisted document with {} nodes", store.node_count());
        }
        Ok(result)
    }
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl PersistenceError {
    /// Stable class for callers; storage problems are never downgraded
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistenceError::Graph(e) => e.kind(),
            PersistenceError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
