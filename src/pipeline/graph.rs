use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

const STAGE_COUNT: usize = 6;

/// Derivation stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Annotation index of the current node table.
    Annotations,
    /// Filtered node rows.
    Filter,
    /// Query-narrowed rows.
    Query,
    /// Per-node statistics and PPI cutoff.
    Selection,
    /// Score-thresholded edges.
    Edges,
    /// Bounded visible subgraph.
    Visible,
}

impl Stage {
    /// Stages in topological order.
    pub const ORDER: [Stage; STAGE_COUNT] = [
        Stage::Annotations,
        Stage::Filter,
        Stage::Query,
        Stage::Selection,
        Stage::Edges,
        Stage::Visible,
    ];

    /// Stages whose output this stage reads.
    pub fn upstream(self) -> &'static [Stage] {
        match self {
            Stage::Annotations => &[],
            Stage::Filter => &[Stage::Annotations],
            Stage::Query => &[Stage::Annotations, Stage::Filter],
            Stage::Selection => &[Stage::Annotations, Stage::Query],
            Stage::Edges => &[Stage::Selection],
            Stage::Visible => &[Stage::Selection, Stage::Edges],
        }
    }

    /// Short name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Annotations => "annotations",
            Stage::Filter => "filter",
            Stage::Query => "query",
            Stage::Selection => "selection",
            Stage::Edges => "edges",
            Stage::Visible => "visible",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// User- or data-controlled input of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Node table (base or merged).
    NodeTable,
    /// Categorical filter state.
    Filters,
    /// Filter composition mode.
    Composition,
    /// Free-text gene query.
    Query,
    /// Minimum total PPI count.
    PpiCutoff,
    /// Minimum edge score.
    ScoreThreshold,
    /// Visible node cap.
    MaxNodes,
    /// Ranking statistic.
    Priority,
    /// Unconnected-node policy.
    Unconnected,
    /// Edge width range.
    EdgeWidth,
}

impl Input {
    /// Stage that reads this input directly.
    pub fn consumer(self) -> Stage {
        match self {
            Input::NodeTable => Stage::Annotations,
            Input::Filters | Input::Composition => Stage::Filter,
            Input::Query => Stage::Query,
            Input::PpiCutoff => Stage::Selection,
            Input::ScoreThreshold => Stage::Edges,
            Input::MaxNodes | Input::Priority | Input::Unconnected | Input::EdgeWidth => {
                Stage::Visible
            }
        }
    }
}

/// Small set of stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSet(u8);

impl StageSet {
    /// Adds `stage`; returns whether it was absent.
    pub fn insert(&mut self, stage: Stage) -> bool {
        let bit = 1 << stage.slot();
        let absent = self.0 & bit == 0;
        self.0 |= bit;
        absent
    }

    /// Whether `stage` is in the set.
    pub fn contains(&self, stage: Stage) -> bool {
        self.0 & (1 << stage.slot()) != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in topological order.
    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ORDER.into_iter().filter(|stage| self.contains(*stage))
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        let mut set = StageSet::default();
        for stage in iter {
            set.insert(stage);
        }
        set
    }
}

/// Dependency graph of the stages.
#[derive(Debug, Clone)]
pub struct RecomputeGraph {
    downstream: [SmallVec<[Stage; 4]>; STAGE_COUNT],
}

impl Default for RecomputeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RecomputeGraph {
    /// Builds the downstream map from each stage's upstream declaration.
    pub fn new() -> Self {
        let mut downstream: [SmallVec<[Stage; 4]>; STAGE_COUNT] = Default::default();
        for stage in Stage::ORDER {
            for upstream in stage.upstream() {
                downstream[upstream.slot()].push(stage);
            }
        }
        Self { downstream }
    }

    /// Stages reading `stage` directly.
    pub fn downstream(&self, stage: Stage) -> &[Stage] {
        &self.downstream[stage.slot()]
    }

    /// `seeds` and every stage transitively downstream of them.
    pub fn dependents(&self, seeds: StageSet) -> StageSet {
        let mut reached = seeds;
        let mut queue: VecDeque<Stage> = seeds.iter().collect();
        while let Some(stage) = queue.pop_front() {
            for &next in self.downstream(stage) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_topological() {
        for (pos, stage) in Stage::ORDER.iter().enumerate() {
            assert_eq!(stage.slot(), pos);
            for upstream in stage.upstream() {
                assert!(upstream.slot() < pos, "{stage} reads later stage {upstream}");
            }
        }
    }

    #[test]
    fn dependents_follow_declared_edges() {
        let graph = RecomputeGraph::new();
        let from_query = graph.dependents([Stage::Query].into_iter().collect());
        assert_eq!(from_query.iter().collect::<Vec<_>>(), vec![
            Stage::Query,
            Stage::Selection,
            Stage::Edges,
            Stage::Visible,
        ]);
        let from_visible = graph.dependents([Stage::Visible].into_iter().collect());
        assert_eq!(from_visible.iter().collect::<Vec<_>>(), vec![Stage::Visible]);
        let from_root = graph.dependents([Stage::Annotations].into_iter().collect());
        assert_eq!(from_root.iter().count(), Stage::ORDER.len());
    }

    #[test]
    fn inputs_feed_one_stage() {
        assert_eq!(Input::Query.consumer(), Stage::Query);
        assert_eq!(Input::ScoreThreshold.consumer(), Stage::Edges);
        assert_eq!(Input::Priority.consumer(), Stage::Visible);
        assert_eq!(Input::NodeTable.consumer(), Stage::Annotations);
    }
}
