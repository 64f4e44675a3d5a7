use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::{AnnotationIndex, FilterOption};
use crate::dataset::Dataset;
use crate::edges::{self, SelectedEdge};
use crate::error::{DataQualityWarning, PipelineError, Result};
use crate::filter::{self, Composition, FieldFilter, FilterState, RowSet};
use crate::merge::{self, UploadTable};
use crate::model::{FieldId, NodeTable};
use crate::query::{self, QueryHits, QueryOutcome};
use crate::selection::{self, Priority, SelectedNode};
use crate::status::StatusSummary;
use crate::visible::{self, UnconnectedMode, VisibleOptions, VisibleSubgraph, WidthRange};

use super::graph::{Input, RecomputeGraph, Stage, StageSet};

/// Initial values of the scalar inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Minimum edge score, inclusive.
    pub score_threshold: f64,
    /// Visible node cap.
    pub max_nodes: usize,
    /// Ranking statistic.
    pub priority: Priority,
    /// Unconnected-node policy.
    pub unconnected: UnconnectedMode,
    /// Filter composition.
    pub composition: Composition,
    /// Minimum total PPI count; 0 keeps every gene.
    pub ppi_cutoff: u32,
    /// Edge width range.
    pub edge_width: WidthRange,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.4,
            max_nodes: 50,
            priority: Priority::Total,
            unconnected: UnconnectedMode::Show,
            composition: Composition::Progressive,
            ppi_cutoff: 0,
            edge_width: WidthRange::default(),
        }
    }
}

impl SessionOptions {
    /// Parameters of the visible stage.
    pub fn visible(&self) -> VisibleOptions {
        VisibleOptions {
            max_nodes: self.max_nodes,
            priority: self.priority,
            unconnected: self.unconnected,
            width: self.edge_width,
        }
    }
}

/// A single input mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace the filter of a field, named by column or alias.
    Filter {
        /// Field name or alias.
        field: String,
        /// New selection.
        filter: FieldFilter,
    },
    /// Deactivate every filter.
    ClearFilters,
    /// Switch filter composition.
    Composition(Composition),
    /// Replace the query text.
    Query(String),
    /// Set the PPI cutoff.
    PpiCutoff(u32),
    /// Set the edge score threshold.
    ScoreThreshold(f64),
    /// Set the visible node cap.
    MaxNodes(usize),
    /// Set the ranking statistic.
    Priority(Priority),
    /// Set the unconnected-node policy.
    Unconnected(UnconnectedMode),
    /// Set the edge width range.
    EdgeWidth(WidthRange),
}

impl Change {
    /// Input written by this change.
    pub fn input(&self) -> Input {
        match self {
            Change::Filter { .. } | Change::ClearFilters => Input::Filters,
            Change::Composition(_) => Input::Composition,
            Change::Query(_) => Input::Query,
            Change::PpiCutoff(_) => Input::PpiCutoff,
            Change::ScoreThreshold(_) => Input::ScoreThreshold,
            Change::MaxNodes(_) => Input::MaxNodes,
            Change::Priority(_) => Input::Priority,
            Change::Unconnected(_) => Input::Unconnected,
            Change::EdgeWidth(_) => Input::EdgeWidth,
        }
    }
}

/// What one recomputation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Stages reachable from the changed inputs.
    pub scheduled: Vec<Stage>,
    /// Stages that were recomputed, in order.
    pub ran: Vec<Stage>,
    /// Recomputed stages whose output differed from the previous pass.
    pub changed: Vec<Stage>,
}

impl PassReport {
    /// Whether nothing was recomputed.
    pub fn is_empty(&self) -> bool {
        self.ran.is_empty()
    }
}

/// Result of merging an upload into a session.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    /// Upload rows added to the node table.
    pub rows_added: usize,
    /// Rows dropped while validating the upload.
    pub warnings: Vec<DataQualityWarning>,
    /// The recomputation that followed.
    pub pass: PassReport,
}

/// Hooks invoked while a pass runs.
pub trait StageObserver {
    /// The loading flag flipped.
    fn loading_changed(&mut self, _loading: bool) {}

    /// `stage` is about to run.
    fn stage_started(&mut self, _stage: Stage) {}

    /// `stage` finished.
    fn stage_finished(&mut self, _stage: Stage, _changed: bool, _elapsed: Duration) {}

    /// The pass settled; every view is consistent again.
    fn settled(&mut self, _report: &PassReport) {}
}

/// Mutable per-user state over a shared [`Dataset`].
///
/// Every mutation returns only after the whole chain has settled, so no
/// partially recomputed view is ever observable.
pub struct Session {
    dataset: Arc<Dataset>,
    graph: RecomputeGraph,
    observers: Vec<Box<dyn StageObserver + Send>>,

    nodes: Arc<NodeTable>,
    index: Arc<AnnotationIndex>,
    pending_index: Option<Arc<AnnotationIndex>>,
    filters: FilterState,
    query: String,
    options: SessionOptions,

    filtered: Arc<RowSet>,
    queried: QueryOutcome,
    selected: Arc<Vec<SelectedNode>>,
    selected_edges: Arc<Vec<SelectedEdge>>,
    visible: Arc<VisibleSubgraph>,

    loading: bool,
    runs: Vec<u64>,
    last_report: PassReport,
}

impl Session {
    /// Opens a session and derives every view once.
    pub fn new(dataset: Arc<Dataset>, options: SessionOptions) -> Self {
        let index = Arc::clone(dataset.index());
        let empty = Arc::new(RowSet::default());
        let mut session = Self {
            graph: RecomputeGraph::new(),
            observers: Vec::new(),
            nodes: Arc::clone(dataset.nodes()),
            filters: FilterState::new(index.schema()),
            pending_index: Some(Arc::clone(&index)),
            index,
            query: String::new(),
            options,
            queried: QueryOutcome {
                rows: Arc::clone(&empty),
                hits: None,
            },
            filtered: empty,
            selected: Arc::default(),
            selected_edges: Arc::default(),
            visible: Arc::default(),
            loading: false,
            runs: vec![0; Stage::ORDER.len()],
            last_report: PassReport::default(),
            dataset,
        };
        session.run_pass([Input::NodeTable.consumer()].into_iter().collect());
        session
    }

    /// Registers an observer for subsequent passes.
    pub fn add_observer(&mut self, observer: impl StageObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Applies `changes` together and runs one pass.
    ///
    /// Every change is validated before any is applied; on error the session
    /// is untouched. Changes that leave an input at its current value schedule
    /// nothing.
    pub fn apply(&mut self, changes: impl IntoIterator<Item = Change>) -> Result<PassReport> {
        let mut resolved = Vec::new();
        for change in changes {
            let field = match &change {
                Change::Filter { field, .. } => Some(self.field_id(field)?),
                _ => None,
            };
            resolved.push((change, field));
        }
        Ok(self.apply_resolved(resolved))
    }

    /// Replaces the filter of `field`.
    pub fn set_filter(&mut self, field: &str, filter: FieldFilter) -> Result<PassReport> {
        self.apply([Change::Filter {
            field: field.to_string(),
            filter,
        }])
    }

    /// Deactivates every filter.
    pub fn clear_filters(&mut self) -> PassReport {
        self.apply_resolved(vec![(Change::ClearFilters, None)])
    }

    /// Switches filter composition.
    pub fn set_composition(&mut self, composition: Composition) -> PassReport {
        self.apply_resolved(vec![(Change::Composition(composition), None)])
    }

    /// Replaces the query text.
    pub fn set_query(&mut self, text: impl Into<String>) -> PassReport {
        self.apply_resolved(vec![(Change::Query(text.into()), None)])
    }

    /// Sets the minimum total PPI count.
    pub fn set_ppi_cutoff(&mut self, cutoff: u32) -> PassReport {
        self.apply_resolved(vec![(Change::PpiCutoff(cutoff), None)])
    }

    /// Sets the minimum edge score.
    pub fn set_score_threshold(&mut self, threshold: f64) -> PassReport {
        self.apply_resolved(vec![(Change::ScoreThreshold(threshold), None)])
    }

    /// Sets the visible node cap.
    pub fn set_max_nodes(&mut self, max_nodes: usize) -> PassReport {
        self.apply_resolved(vec![(Change::MaxNodes(max_nodes), None)])
    }

    /// Sets the ranking statistic.
    pub fn set_priority(&mut self, priority: Priority) -> PassReport {
        self.apply_resolved(vec![(Change::Priority(priority), None)])
    }

    /// Sets the unconnected-node policy.
    pub fn set_unconnected(&mut self, mode: UnconnectedMode) -> PassReport {
        self.apply_resolved(vec![(Change::Unconnected(mode), None)])
    }

    /// Sets the edge width range.
    pub fn set_edge_width(&mut self, width: WidthRange) -> PassReport {
        self.apply_resolved(vec![(Change::EdgeWidth(width), None)])
    }

    /// Merges `upload` into the base rows, replacing any earlier upload.
    ///
    /// The new index is built before anything is mutated, so a rejected
    /// upload leaves the session as it was. Filters are reset.
    pub fn merge_upload(&mut self, upload: &UploadTable) -> Result<UploadReport> {
        let outcome = merge::merge(self.dataset.nodes(), upload)?;
        let nodes = Arc::new(outcome.nodes);
        let index = AnnotationIndex::build(Arc::clone(&nodes))?;
        for warning in &outcome.warnings {
            warn!(%warning, "upload rows dropped");
        }
        info!(
            rows_added = outcome.rows_added,
            total_rows = nodes.len(),
            quantitative = nodes.schema().quantitative().len(),
            "upload merged"
        );
        self.nodes = nodes;
        self.pending_index = Some(Arc::new(index));
        let pass = self.run_pass([Input::NodeTable.consumer()].into_iter().collect());
        Ok(UploadReport {
            rows_added: outcome.rows_added,
            warnings: outcome.warnings,
            pass,
        })
    }

    /// Drops the active upload and resets filters. No-op without an upload.
    pub fn revert_upload(&mut self) -> PassReport {
        if !self.has_upload() {
            return PassReport::default();
        }
        info!(rows = self.dataset.nodes().len(), "upload reverted");
        self.nodes = Arc::clone(self.dataset.nodes());
        self.pending_index = Some(Arc::clone(self.dataset.index()));
        self.run_pass([Input::NodeTable.consumer()].into_iter().collect())
    }

    /// Whether an upload is merged.
    pub fn has_upload(&self) -> bool {
        !Arc::ptr_eq(&self.nodes, self.dataset.nodes())
    }

    /// Shared base dataset.
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Current node table (base or merged).
    pub fn nodes(&self) -> &Arc<NodeTable> {
        &self.nodes
    }

    /// Index of the current node table.
    pub fn index(&self) -> &Arc<AnnotationIndex> {
        &self.index
    }

    /// Current filter state.
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Current query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current scalar inputs.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Resolves a field by column name or alias.
    pub fn field_id(&self, name: &str) -> Result<FieldId> {
        self.index
            .schema()
            .field_id(name)
            .ok_or_else(|| PipelineError::UnknownField(name.to_string()))
    }

    /// Filter options of a field named by column or alias.
    pub fn filter_options(&self, name: &str) -> Result<Vec<FilterOption>> {
        Ok(self.index.options(self.field_id(name)?))
    }

    /// Filtered rows.
    pub fn filtered(&self) -> &Arc<RowSet> {
        &self.filtered
    }

    /// Query-narrowed rows.
    pub fn queried(&self) -> &Arc<RowSet> {
        &self.queried.rows
    }

    /// Query hit counts, when a query is active.
    pub fn query_hits(&self) -> Option<QueryHits> {
        self.queried.hits
    }

    /// Selected nodes.
    pub fn selected_nodes(&self) -> &Arc<Vec<SelectedNode>> {
        &self.selected
    }

    /// Selected edges.
    pub fn selected_edges(&self) -> &Arc<Vec<SelectedEdge>> {
        &self.selected_edges
    }

    /// Visible subgraph.
    pub fn visible(&self) -> &Arc<VisibleSubgraph> {
        &self.visible
    }

    /// Status line counts.
    pub fn status(&self) -> StatusSummary {
        StatusSummary {
            shown: self.visible.nodes.len(),
            selected: self.selected.len(),
            query: self.queried.hits,
            unconnected: self.visible.unconnected(),
        }
    }

    /// Whether a pass is running. Always false between calls.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Times `stage` has run since the session opened.
    pub fn stage_runs(&self, stage: Stage) -> u64 {
        self.runs[stage.slot()]
    }

    /// Report of the most recent pass that ran anything.
    pub fn last_report(&self) -> &PassReport {
        &self.last_report
    }

    fn apply_resolved(&mut self, changes: Vec<(Change, Option<FieldId>)>) -> PassReport {
        let mut dirty = StageSet::default();
        for (change, field) in changes {
            let consumer = change.input().consumer();
            if self.write(change, field) {
                dirty.insert(consumer);
            }
        }
        self.run_pass(dirty)
    }

    fn write(&mut self, change: Change, field: Option<FieldId>) -> bool {
        let options = &mut self.options;
        match change {
            Change::Filter { filter, .. } => match field {
                Some(field) => self.filters.set(field, filter),
                None => false,
            },
            Change::ClearFilters => self.filters.clear(),
            Change::Composition(value) => replace(&mut options.composition, value),
            Change::Query(text) => replace(&mut self.query, text),
            Change::PpiCutoff(value) => replace(&mut options.ppi_cutoff, value),
            Change::ScoreThreshold(value) => {
                if options.score_threshold.to_bits() == value.to_bits() {
                    return false;
                }
                options.score_threshold = value;
                true
            }
            Change::MaxNodes(value) => replace(&mut options.max_nodes, value),
            Change::Priority(value) => replace(&mut options.priority, value),
            Change::Unconnected(value) => replace(&mut options.unconnected, value),
            Change::EdgeWidth(value) => replace(&mut options.edge_width, value),
        }
    }

    fn run_pass(&mut self, dirty: StageSet) -> PassReport {
        let scheduled = self.graph.dependents(dirty);
        let mut report = PassReport {
            scheduled: scheduled.iter().collect(),
            ..PassReport::default()
        };
        if dirty.is_empty() {
            return report;
        }

        self.set_loading(true);
        let pass_started = Instant::now();
        let mut changed = StageSet::default();
        for stage in scheduled.iter() {
            let upstream_changed = stage.upstream().iter().any(|s| changed.contains(*s));
            if !dirty.contains(stage) && !upstream_changed {
                continue;
            }
            for observer in &mut self.observers {
                observer.stage_started(stage);
            }
            let started = Instant::now();
            let rebuilt = changed.contains(Stage::Annotations);
            let did_change = self.run_stage(stage, rebuilt);
            let elapsed = started.elapsed();
            self.runs[stage.slot()] += 1;
            debug!(
                stage = stage.name(),
                changed = did_change,
                elapsed_us = elapsed.as_micros() as u64,
                "stage recomputed"
            );
            for observer in &mut self.observers {
                observer.stage_finished(stage, did_change, elapsed);
            }
            report.ran.push(stage);
            if did_change {
                changed.insert(stage);
                report.changed.push(stage);
            }
        }
        debug!(
            stages = report.ran.len(),
            elapsed_us = pass_started.elapsed().as_micros() as u64,
            visible_nodes = self.visible.nodes.len(),
            visible_edges = self.visible.edges.len(),
            "pass settled"
        );
        self.set_loading(false);
        for observer in &mut self.observers {
            observer.settled(&report);
        }
        self.last_report = report.clone();
        report
    }

    /// Recomputes `stage`; returns whether its output changed.
    fn run_stage(&mut self, stage: Stage, rebuilt: bool) -> bool {
        match stage {
            Stage::Annotations => match self.pending_index.take() {
                Some(index) => {
                    self.filters = FilterState::new(index.schema());
                    self.index = index;
                    true
                }
                None => false,
            },
            Stage::Filter => {
                let rows = filter::apply(&self.index, &self.filters, self.options.composition);
                let changed = rebuilt || rows != *self.filtered;
                self.filtered = Arc::new(rows);
                changed
            }
            Stage::Query => {
                let outcome = query::apply(&self.index, &self.filtered, &self.query);
                let changed = rebuilt || outcome != self.queried;
                self.queried = outcome;
                changed
            }
            Stage::Selection => {
                let nodes = selection::select(&self.index, &self.queried.rows, self.options.ppi_cutoff);
                let changed = rebuilt || nodes != *self.selected;
                self.selected = Arc::new(nodes);
                changed
            }
            Stage::Edges => {
                let edges = edges::select(
                    self.dataset.edges(),
                    &self.selected,
                    self.options.score_threshold,
                );
                let changed = edges != *self.selected_edges;
                self.selected_edges = Arc::new(edges);
                changed
            }
            Stage::Visible => {
                let graph = visible::build(&self.selected, &self.selected_edges, &self.options.visible());
                let changed = graph != *self.visible;
                self.visible = Arc::new(graph);
                changed
            }
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        for observer in &mut self.observers {
            observer.loading_changed(loading);
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
