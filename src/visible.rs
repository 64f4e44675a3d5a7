//! Bounded subgraph handed to the renderer.
//!
//! The selected nodes are capped at `max_nodes`. With
//! [`UnconnectedMode::Hide`] nodes are admitted edge by edge, strongest
//! endpoint minimum first, so only connected nodes are shown and the edge
//! that crosses the cap is admitted whole (at most `max_nodes + 1` nodes).
//! With [`UnconnectedMode::Show`] the top `max_nodes` nodes by priority are
//! shown. Ties keep their selection order in both modes.

use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::edges::SelectedEdge;
use crate::model::GeneId;
use crate::selection::{Priority, SelectedNode};

/// Whether nodes without visible edges may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnconnectedMode {
    /// Only nodes reached through selected edges.
    Hide,
    /// Top nodes by priority, connected or not.
    #[default]
    Show,
}

impl FromStr for UnconnectedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hide" => Ok(UnconnectedMode::Hide),
            "show" => Ok(UnconnectedMode::Show),
            other => Err(format!("unknown unconnected mode '{other}' (expected hide or show)")),
        }
    }
}

/// Range edge widths are scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthRange {
    /// Width of the weakest visible edge.
    pub min: f64,
    /// Width of the strongest visible edge.
    pub max: f64,
}

impl Default for WidthRange {
    fn default() -> Self {
        Self { min: 0.5, max: 3.0 }
    }
}

impl WidthRange {
    /// Linear min-max scaling of `scores`.
    ///
    /// A single score, or scores that are all equal, map to `max`.
    pub fn scale(&self, scores: &[f64]) -> Vec<f64> {
        let (lo, hi) = scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        let span = hi - lo;
        scores
            .iter()
            .map(|&s| {
                if span > 0.0 {
                    self.min + (self.max - self.min) * (s - lo) / span
                } else {
                    self.max
                }
            })
            .collect()
    }
}

/// Parameters of [`build`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleOptions {
    /// Node cap.
    pub max_nodes: usize,
    /// Ranking statistic.
    pub priority: Priority,
    /// Unconnected-node policy.
    pub unconnected: UnconnectedMode,
    /// Edge width range.
    pub width: WidthRange,
}

impl Default for VisibleOptions {
    fn default() -> Self {
        Self {
            max_nodes: 50,
            priority: Priority::default(),
            unconnected: UnconnectedMode::default(),
            width: WidthRange::default(),
        }
    }
}

/// Visible node with its degree in the visible subgraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleNode {
    /// Selected node.
    #[serde(flatten)]
    pub node: SelectedNode,
    /// Visible edges touching the node (source count plus target count).
    pub connectivity: u32,
}

/// Visible edge with its display width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleEdge {
    /// Selected edge.
    #[serde(flatten)]
    pub edge: SelectedEdge,
    /// Scaled width.
    pub width: f64,
}

/// Nodes and edges handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisibleSubgraph {
    /// Visible nodes.
    pub nodes: Vec<VisibleNode>,
    /// Edges with both endpoints visible, in table order.
    pub edges: Vec<VisibleEdge>,
}

impl VisibleSubgraph {
    /// Visible nodes without a visible edge.
    pub fn unconnected(&self) -> usize {
        self.nodes.iter().filter(|n| n.connectivity == 0).count()
    }
}

#[derive(Debug, Default)]
struct Degrees {
    out_degree: FxHashMap<GeneId, u32>,
    in_degree: FxHashMap<GeneId, u32>,
}

impl Degrees {
    fn of<'a>(edges: impl IntoIterator<Item = &'a SelectedEdge>) -> Self {
        let mut degrees = Self::default();
        for edge in edges {
            *degrees.out_degree.entry(edge.source).or_insert(0) += 1;
            *degrees.in_degree.entry(edge.target).or_insert(0) += 1;
        }
        degrees
    }

    fn total(&self, gene: GeneId) -> u32 {
        self.out_degree.get(&gene).copied().unwrap_or(0)
            + self.in_degree.get(&gene).copied().unwrap_or(0)
    }
}

/// Caps `nodes` and keeps the edges between the visible ones.
pub fn build(
    nodes: &[SelectedNode],
    edges: &[SelectedEdge],
    options: &VisibleOptions,
) -> VisibleSubgraph {
    if options.max_nodes == 0 {
        return VisibleSubgraph::default();
    }
    let priority = options.priority;

    let shown: Vec<&SelectedNode> = match options.unconnected {
        UnconnectedMode::Hide => {
            let mut ranked: Vec<&SelectedEdge> = edges.iter().collect();
            ranked.sort_by(|a, b| b.min_priority(priority).cmp(&a.min_priority(priority)));
            let mut admitted: FxHashSet<GeneId> = FxHashSet::default();
            for edge in ranked {
                admitted.insert(edge.source);
                admitted.insert(edge.target);
                if admitted.len() >= options.max_nodes {
                    break;
                }
            }
            nodes
                .iter()
                .filter(|node| admitted.contains(&node.gene_id))
                .collect()
        }
        UnconnectedMode::Show => {
            let mut ranked: Vec<&SelectedNode> = nodes.iter().collect();
            ranked.sort_by(|a, b| b.priority(priority).cmp(&a.priority(priority)));
            ranked.truncate(options.max_nodes);
            ranked
        }
    };

    let visible: FxHashSet<GeneId> = shown.iter().map(|node| node.gene_id).collect();
    let kept: Vec<&SelectedEdge> = edges
        .iter()
        .filter(|edge| visible.contains(&edge.source) && visible.contains(&edge.target))
        .collect();
    let degrees = Degrees::of(kept.iter().copied());
    let scores: Vec<f64> = kept.iter().map(|edge| edge.score).collect();
    let widths = options.width.scale(&scores);

    VisibleSubgraph {
        nodes: shown
            .into_iter()
            .map(|node| VisibleNode {
                connectivity: degrees.total(node.gene_id),
                node: node.clone(),
            })
            .collect(),
        edges: kept
            .into_iter()
            .zip(widths)
            .map(|(edge, width)| VisibleEdge {
                edge: edge.clone(),
                width,
            })
            .collect(),
    }
}
