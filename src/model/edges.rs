use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::SchemaError;

use super::nodes::NodeTable;
use super::schema::GeneId;

/// Scored interaction between two genes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Source gene.
    pub source: GeneId,
    /// Target gene.
    pub target: GeneId,
    /// Confidence score in `[0, 1]`.
    pub score: f64,
    /// Study or database the interaction comes from.
    pub provenance: Option<String>,
}

impl Edge {
    /// Edge without provenance.
    pub fn new(source: GeneId, target: GeneId, score: f64) -> Self {
        Self {
            source,
            target,
            score,
            provenance: None,
        }
    }
}

/// Full edge table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeTable {
    edges: Vec<Edge>,
}

impl EdgeTable {
    /// Wraps edges in table order.
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    /// Edges in table order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the table has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Fails when any endpoint is missing from `nodes`.
    pub fn validate_endpoints(&self, nodes: &NodeTable) -> Result<(), SchemaError> {
        let known = nodes.gene_ids();
        let mut dangling = self
            .edges
            .iter()
            .filter(|e| !known.contains(&e.source) || !known.contains(&e.target));
        if let Some(first) = dangling.next() {
            return Err(SchemaError::DanglingEdges {
                count: 1 + dangling.count(),
                from: first.source,
                to: first.target,
            });
        }
        Ok(())
    }

    /// Drops edges with an endpoint outside `genes`; returns how many were removed.
    pub fn retain_known(&mut self, genes: &FxHashSet<GeneId>) -> usize {
        let before = self.edges.len();
        self.edges
            .retain(|e| genes.contains(&e.source) && genes.contains(&e.target));
        before - self.edges.len()
    }
}
