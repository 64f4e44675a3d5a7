//! Score-thresholded edges between selected nodes.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::model::{EdgeTable, GeneId};
use crate::selection::{Priority, SelectedNode};

/// Edge retained between two selected nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedEdge {
    /// Position in the full edge table.
    pub edge: usize,
    /// Source gene.
    pub source: GeneId,
    /// Target gene.
    pub target: GeneId,
    /// Confidence score.
    pub score: f64,
    /// Study or database of the interaction.
    pub provenance: Option<String>,
    /// Smaller total PPI count of the two endpoints.
    pub min_ppi_sum_total: u32,
    /// Smaller filtered PPI count of the two endpoints.
    pub min_ppi_sum_filtered: u32,
}

impl SelectedEdge {
    /// Endpoint minimum selected by `priority`.
    pub fn min_priority(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Total => self.min_ppi_sum_total,
            Priority::Filtered => self.min_ppi_sum_filtered,
        }
    }
}

/// Edges with both endpoints in `nodes` and `score >= threshold`, in table order.
///
/// A NaN threshold selects nothing.
pub fn select(edges: &EdgeTable, nodes: &[SelectedNode], threshold: f64) -> Vec<SelectedEdge> {
    if threshold.is_nan() {
        return Vec::new();
    }
    let by_gene: FxHashMap<GeneId, &SelectedNode> =
        nodes.iter().map(|node| (node.gene_id, node)).collect();

    edges
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, edge)| edge.score >= threshold)
        .filter_map(|(pos, edge)| {
            let source = by_gene.get(&edge.source)?;
            let target = by_gene.get(&edge.target)?;
            Some(SelectedEdge {
                edge: pos,
                source: edge.source,
                target: edge.target,
                score: edge.score,
                provenance: edge.provenance.clone(),
                min_ppi_sum_total: source.ppi_sum_total.min(target.ppi_sum_total),
                min_ppi_sum_filtered: source.ppi_sum_filtered.min(target.ppi_sum_filtered),
            })
        })
        .collect()
}
