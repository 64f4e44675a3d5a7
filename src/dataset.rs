//! Immutable base dataset shared by every session.

use std::sync::Arc;

use tracing::info;

use crate::annotation::AnnotationIndex;
use crate::error::SchemaError;
use crate::model::{EdgeTable, NodeTable};

/// Base node and edge tables with their annotation index.
///
/// Constructed once and shared read-only through `Arc`.
#[derive(Debug, Clone)]
pub struct Dataset {
    nodes: Arc<NodeTable>,
    edges: Arc<EdgeTable>,
    index: Arc<AnnotationIndex>,
}

impl Dataset {
    /// Validates edge endpoints and builds the base index.
    pub fn new(nodes: NodeTable, edges: EdgeTable) -> Result<Self, SchemaError> {
        edges.validate_endpoints(&nodes)?;
        let nodes = Arc::new(nodes);
        let index = AnnotationIndex::build(Arc::clone(&nodes))?;
        info!(
            rows = nodes.len(),
            genes = index.genes().len(),
            edges = edges.len(),
            fields = nodes.schema().fields().len(),
            "dataset loaded"
        );
        Ok(Self {
            nodes,
            edges: Arc::new(edges),
            index: Arc::new(index),
        })
    }

    /// Base node table.
    pub fn nodes(&self) -> &Arc<NodeTable> {
        &self.nodes
    }

    /// Full edge table.
    pub fn edges(&self) -> &Arc<EdgeTable> {
        &self.edges
    }

    /// Index of the base node table.
    pub fn index(&self) -> &Arc<AnnotationIndex> {
        &self.index
    }
}
