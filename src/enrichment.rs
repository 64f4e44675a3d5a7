//! Over-representation results for the current selection.
//!
//! The HTTP query itself is external. This module builds the request from the
//! selected nodes, discards responses to superseded requests, and derives the
//! table shown next to the network.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::GeneId;
use crate::selection::SelectedNode;

/// NCBI taxon of the default organism (human).
pub const DEFAULT_ORGANISM: u32 = 9606;

/// Annotation data sets offered by default, as (label, data-set id).
pub const DEFAULT_ANNOTATION_SETS: [(&str, &str); 8] = [
    ("GO biological process", "GO:0008150"),
    ("GO molecular function", "GO:0003674"),
    ("GO cellular component", "GO:0005575"),
    ("GO SLIM molecular function", "ANNOT_TYPE_ID_PANTHER_GO_SLIM_MF"),
    ("GO SLIM biological process", "ANNOT_TYPE_ID_PANTHER_GO_SLIM_BP"),
    ("GO SLIM cellular component", "ANNOT_TYPE_ID_PANTHER_GO_SLIM_CC"),
    ("Panther pathways", "ANNOT_TYPE_ID_PANTHER_PATHWAY"),
    ("Reactome pathways", "ANNOT_TYPE_ID_REACTOME_PATHWAY"),
];

/// Root terms that carry no information.
pub const DEFAULT_IGNORED_TERMS: [&str; 3] =
    ["biological_process", "cellular process", "cellular_component"];

/// Enrichment bookkeeping errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// The annotation set label is not configured.
    #[error("unknown annotation set '{0}'")]
    UnknownAnnotationSet(String),
}

/// Request for an over-representation test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentRequest {
    /// Monotonic request number; later requests supersede earlier ones.
    pub id: u64,
    /// Genes under test.
    pub genes: Vec<GeneId>,
    /// Reference genes, when not the whole genome.
    pub background: Option<Vec<GeneId>>,
    /// Annotation set label.
    pub annotation_set: String,
    /// Annotation data-set id sent to the service.
    pub dataset_id: String,
    /// NCBI taxon.
    pub organism: u32,
}

impl EnrichmentRequest {
    /// Comma-separated gene IDs.
    pub fn gene_list(&self) -> String {
        join_ids(&self.genes)
    }

    /// Comma-separated background gene IDs.
    pub fn background_list(&self) -> Option<String> {
        self.background.as_deref().map(join_ids)
    }
}

fn join_ids(ids: &[GeneId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// One enriched term, as returned by the service or a cached table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentTerm {
    /// Term accession.
    #[serde(default)]
    pub id: Option<String>,
    /// Term label.
    pub label: String,
    /// Selected genes annotated with the term.
    pub number_in_list: u32,
    /// Reference genes annotated with the term.
    #[serde(default)]
    pub number_in_reference: Option<u32>,
    /// Expected count under the null.
    #[serde(default)]
    pub expected: Option<f64>,
    /// Observed over expected.
    pub fold_enrichment: f64,
    /// False discovery rate.
    pub fdr: f64,
    /// Raw p-value.
    #[serde(default, rename = "pValue")]
    pub p_value: Option<f64>,
    /// `+` for over-, `-` for under-representation.
    pub plus_minus: String,
}

/// Display parameters of the results table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// Terms shown at most.
    pub show: usize,
    /// Maximum FDR of a significant term.
    pub max_fdr: f64,
    /// Minimum fold enrichment shown.
    pub min_fold: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            show: 10,
            max_fdr: 0.05,
            min_fold: 1.0,
        }
    }
}

/// Table shown next to the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentView {
    /// Panel title.
    pub title: String,
    /// Shown terms, ascending by fold enrichment.
    pub terms: Vec<EnrichmentTerm>,
    /// Significant terms before the fold and count limits.
    pub significant: usize,
}

/// Latest enrichment results of one session.
#[derive(Debug, Clone)]
pub struct EnrichmentStore {
    annotation_sets: Vec<(String, String)>,
    ignored: FxHashSet<String>,
    organism: u32,
    next_id: u64,
    pending: Option<(u64, String)>,
    annotation: String,
    results: Vec<EnrichmentTerm>,
}

impl Default for EnrichmentStore {
    fn default() -> Self {
        Self::new(
            DEFAULT_ANNOTATION_SETS
                .iter()
                .map(|(label, id)| (label.to_string(), id.to_string())),
            DEFAULT_IGNORED_TERMS.iter().map(|t| t.to_string()),
        )
    }
}

impl EnrichmentStore {
    /// Store offering `annotation_sets` and dropping `ignored` labels.
    pub fn new(
        annotation_sets: impl IntoIterator<Item = (String, String)>,
        ignored: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut annotation_sets: Vec<_> = annotation_sets.into_iter().collect();
        annotation_sets.sort();
        let annotation = annotation_sets
            .first()
            .map(|(label, _)| label.clone())
            .unwrap_or_default();
        Self {
            annotation_sets,
            ignored: ignored.into_iter().collect(),
            organism: DEFAULT_ORGANISM,
            next_id: 1,
            pending: None,
            annotation,
            results: Vec::new(),
        }
    }

    /// Overrides the organism of later requests.
    pub fn with_organism(mut self, organism: u32) -> Self {
        self.organism = organism;
        self
    }

    /// Annotation set labels, sorted.
    pub fn annotation_sets(&self) -> impl Iterator<Item = &str> {
        self.annotation_sets.iter().map(|(label, _)| label.as_str())
    }

    /// Seeds the store with precomputed results.
    pub fn load_cached(&mut self, annotation: impl Into<String>, terms: Vec<EnrichmentTerm>) {
        self.annotation = annotation.into();
        self.results = self.ingest(terms);
    }

    /// Starts a request for `nodes`, superseding any outstanding one.
    pub fn begin(
        &mut self,
        nodes: &[SelectedNode],
        background: Option<&[SelectedNode]>,
        annotation: &str,
    ) -> Result<EnrichmentRequest, EnrichmentError> {
        let dataset_id = self
            .annotation_sets
            .iter()
            .find(|(label, _)| label == annotation)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| EnrichmentError::UnknownAnnotationSet(annotation.to_string()))?;
        let id = self.next_id;
        self.next_id += 1;
        self.pending = Some((id, annotation.to_string()));
        Ok(EnrichmentRequest {
            id,
            genes: nodes.iter().map(|n| n.gene_id).collect(),
            background: background.map(|nodes| nodes.iter().map(|n| n.gene_id).collect()),
            annotation_set: annotation.to_string(),
            dataset_id,
            organism: self.organism,
        })
    }

    /// Whether a request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Stores the response to `request_id`; returns false when it is stale.
    pub fn complete(&mut self, request_id: u64, terms: Vec<EnrichmentTerm>) -> bool {
        match self.pending.take() {
            Some((id, annotation)) if id == request_id => {
                self.annotation = annotation;
                self.results = self.ingest(terms);
                true
            }
            other => {
                debug!(request_id, "discarding stale enrichment response");
                self.pending = other;
                false
            }
        }
    }

    /// Over-represented terms whose label is not ignored.
    pub fn ingest(&self, terms: Vec<EnrichmentTerm>) -> Vec<EnrichmentTerm> {
        terms
            .into_iter()
            .filter(|term| term.plus_minus == "+" && !self.ignored.contains(&term.label))
            .collect()
    }

    /// Current results, unfiltered.
    pub fn results(&self) -> &[EnrichmentTerm] {
        &self.results
    }

    /// Significant terms above `min_fold`, weakest first, at most `show`.
    pub fn view(&self, options: &ViewOptions) -> EnrichmentView {
        let significant = self
            .results
            .iter()
            .filter(|term| term.fdr <= options.max_fdr)
            .count();
        let mut terms: Vec<EnrichmentTerm> = self
            .results
            .iter()
            .filter(|term| term.fdr <= options.max_fdr && term.fold_enrichment >= options.min_fold)
            .cloned()
            .collect();
        terms.sort_by(|a, b| a.fold_enrichment.total_cmp(&b.fold_enrichment));
        let skip = terms.len().saturating_sub(options.show);
        terms.drain(..skip);

        let title = if significant > 0 {
            format!(
                "Showing {} of {} significantly enriched {} terms",
                terms.len(),
                significant,
                self.annotation
            )
        } else {
            "No enriched terms".to_string()
        };
        EnrichmentView {
            title,
            terms,
            significant,
        }
    }
}
