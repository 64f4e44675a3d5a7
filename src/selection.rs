//! Per-node statistics over the queried rows.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationIndex;
use crate::filter::RowSet;
use crate::model::GeneId;

/// Statistic used to rank nodes and edges for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// PPI observations over the whole table.
    #[default]
    Total,
    /// PPI observations among the queried rows.
    Filtered,
}

impl Priority {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Total => "# PPI observations (all)",
            Priority::Filtered => "# PPI observations (filtered)",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "total" | "all" => Ok(Priority::Total),
            "filtered" => Ok(Priority::Filtered),
            other if other == Priority::Total.label() => Ok(Priority::Total),
            other if other == Priority::Filtered.label() => Ok(Priority::Filtered),
            other => Err(format!("unknown priority '{other}' (expected total or filtered)")),
        }
    }
}

/// One gene of the queried set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedNode {
    /// Gene identifier.
    pub gene_id: GeneId,
    /// Gene symbol.
    pub gene_symbol: String,
    /// Annotation string per field, aligned with the schema.
    pub annotations: Vec<String>,
    /// Distinct studies across the whole table.
    pub ppi_sum_total: u32,
    /// Distinct studies among the queried rows.
    pub ppi_sum_filtered: u32,
}

impl SelectedNode {
    /// Statistic selected by `priority`.
    pub fn priority(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Total => self.ppi_sum_total,
            Priority::Filtered => self.ppi_sum_filtered,
        }
    }
}

/// One entry per distinct gene of `queried`, in first-appearance order.
///
/// Genes whose total PPI count is below `ppi_cutoff` are dropped.
pub fn select(index: &AnnotationIndex, queried: &RowSet, ppi_cutoff: u32) -> Vec<SelectedNode> {
    let filtered = index.ppi_sums(queried.rows());
    let mut seen: FxHashSet<GeneId> = FxHashSet::default();
    let mut nodes = Vec::with_capacity(queried.gene_ids().len());
    for &row in queried.rows() {
        let gene_id = index.row_gene(row);
        if !seen.insert(gene_id) {
            continue;
        }
        let Some(gene) = index.gene(gene_id) else {
            continue;
        };
        if gene.ppi_sum < ppi_cutoff {
            continue;
        }
        nodes.push(SelectedNode {
            gene_id,
            gene_symbol: gene.gene_symbol.clone(),
            annotations: gene.annotations.clone(),
            ppi_sum_total: gene.ppi_sum,
            ppi_sum_filtered: filtered.get(&gene_id).copied().unwrap_or(0),
        });
    }
    nodes
}
