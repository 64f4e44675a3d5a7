//! Long-format omics measurements and per-selection profiles.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{FieldId, GeneId, NodeTable};

/// Measurement kinds of the allelic series; only these honour the
/// tissue and age selection.
pub const ALLELIC_SERIES_KINDS: [&str; 2] = ["PROTEIN", "RNA"];

/// Problems with an omics table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OmicsError {
    /// The same gene was measured twice under one condition.
    #[error("duplicate measurement for gene {gene_id} ({kind}, {tissue}, Q{q_length}, {age} months)")]
    Duplicate {
        /// Gene.
        gene_id: GeneId,
        /// Measurement kind.
        kind: String,
        /// Tissue or cell type.
        tissue: String,
        /// CAG repeat length.
        q_length: i64,
        /// Age in months.
        age: i64,
    },
}

/// One measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmicsRecord {
    /// Gene.
    pub gene_id: GeneId,
    /// Measurement kind (`PROTEIN`, `RNA`, `SCRNA`, ...).
    pub kind: String,
    /// Tissue or cell type.
    pub tissue: String,
    /// CAG repeat length.
    pub q_length: i64,
    /// Age in months.
    pub age: i64,
    /// Measured value.
    pub value: f64,
}

impl OmicsRecord {
    fn condition(&self) -> Condition {
        Condition {
            kind: self.kind.clone(),
            tissue: self.tissue.clone(),
            q_length: self.q_length,
            age: self.age,
        }
    }
}

/// Measurement condition, the key of a profile point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Condition {
    /// Measurement kind.
    pub kind: String,
    /// Tissue or cell type.
    pub tissue: String,
    /// CAG repeat length.
    pub q_length: i64,
    /// Age in months.
    pub age: i64,
}

/// Value of a profile under one condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePoint {
    /// Condition.
    #[serde(flatten)]
    pub condition: Condition,
    /// Value, or the mean over genes for aggregate profiles.
    pub value: f64,
}

/// Tissues and ages kept for allelic-series kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OmicsSelection {
    /// Selected tissues.
    pub tissues: BTreeSet<String>,
    /// Selected ages.
    pub ages: BTreeSet<i64>,
}

impl OmicsSelection {
    /// Whether `record` passes the selection.
    pub fn includes(&self, record: &OmicsRecord) -> bool {
        if !ALLELIC_SERIES_KINDS.contains(&record.kind.as_str()) {
            return true;
        }
        self.tissues.contains(&record.tissue) && self.ages.contains(&record.age)
    }
}

/// Validated omics table indexed by gene.
#[derive(Debug, Clone, Default)]
pub struct OmicsTable {
    records: Vec<OmicsRecord>,
    by_gene: FxHashMap<GeneId, Vec<usize>>,
}

impl OmicsTable {
    /// Rejects repeated (gene, condition) measurements.
    pub fn new(records: Vec<OmicsRecord>) -> Result<Self, OmicsError> {
        let mut seen: FxHashSet<(GeneId, Condition)> = FxHashSet::default();
        let mut by_gene: FxHashMap<GeneId, Vec<usize>> = FxHashMap::default();
        for (pos, record) in records.iter().enumerate() {
            if !seen.insert((record.gene_id, record.condition())) {
                return Err(OmicsError::Duplicate {
                    gene_id: record.gene_id,
                    kind: record.kind.clone(),
                    tissue: record.tissue.clone(),
                    q_length: record.q_length,
                    age: record.age,
                });
            }
            by_gene.entry(record.gene_id).or_default().push(pos);
        }
        Ok(Self { records, by_gene })
    }

    /// Number of measurements.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Selection covering every tissue and age of the allelic series.
    pub fn select_all(&self) -> OmicsSelection {
        let series = self
            .records
            .iter()
            .filter(|r| ALLELIC_SERIES_KINDS.contains(&r.kind.as_str()));
        let mut selection = OmicsSelection::default();
        for record in series {
            selection.tissues.insert(record.tissue.clone());
            selection.ages.insert(record.age);
        }
        selection
    }

    /// Measurements of `gene_id` passing `selection`, ordered by condition.
    pub fn gene_profile(&self, gene_id: GeneId, selection: &OmicsSelection) -> Vec<ProfilePoint> {
        let mut points: Vec<ProfilePoint> = self
            .by_gene
            .get(&gene_id)
            .into_iter()
            .flatten()
            .map(|&pos| &self.records[pos])
            .filter(|record| selection.includes(record))
            .map(|record| ProfilePoint {
                condition: record.condition(),
                value: record.value,
            })
            .collect();
        points.sort_by(|a, b| a.condition.cmp(&b.condition));
        points
    }

    /// Mean per condition over the genes that were measured under it.
    pub fn mean_profile(&self, genes: &[GeneId], selection: &OmicsSelection) -> Vec<ProfilePoint> {
        let mut sums: BTreeMap<Condition, (f64, u32)> = BTreeMap::new();
        let distinct: FxHashSet<GeneId> = genes.iter().copied().collect();
        for gene in distinct {
            for point in self.gene_profile(gene, selection) {
                let entry = sums.entry(point.condition).or_insert((0.0, 0));
                entry.0 += point.value;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(condition, (sum, count))| ProfilePoint {
                condition,
                value: sum / f64::from(count),
            })
            .collect()
    }
}

/// Distinct studies per gene per value of `field`.
pub fn observation_counts(
    nodes: &NodeTable,
    field: FieldId,
) -> BTreeMap<GeneId, BTreeMap<String, u32>> {
    let triples: FxHashSet<(GeneId, &str, &str)> = nodes
        .rows()
        .iter()
        .map(|row| {
            (
                row.gene_id,
                row.study.as_str(),
                row.values[field.index()].as_str(),
            )
        })
        .collect();
    let mut counts: BTreeMap<GeneId, BTreeMap<String, u32>> = BTreeMap::new();
    for (gene, _, value) in triples {
        *counts
            .entry(gene)
            .or_default()
            .entry(value.to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Sums per-gene observation counts over `genes`.
pub fn sum_observations(
    counts: &BTreeMap<GeneId, BTreeMap<String, u32>>,
    genes: &[GeneId],
) -> BTreeMap<String, u32> {
    let mut total: BTreeMap<String, u32> = BTreeMap::new();
    for gene in genes {
        for (value, count) in counts.get(gene).into_iter().flatten() {
            *total.entry(value.clone()).or_insert(0) += count;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, NodeRow, NodeSchema};
    use std::sync::Arc;

    fn record(gene: u64, kind: &str, tissue: &str, q: i64, age: i64, value: f64) -> OmicsRecord {
        OmicsRecord {
            gene_id: GeneId(gene),
            kind: kind.into(),
            tissue: tissue.into(),
            q_length: q,
            age,
            value,
        }
    }

    fn table() -> OmicsTable {
        OmicsTable::new(vec![
            record(1, "PROTEIN", "striatum", 80, 6, 1.0),
            record(1, "PROTEIN", "cortex", 80, 6, -1.0),
            record(2, "PROTEIN", "striatum", 80, 6, 3.0),
            record(2, "PROTEIN", "striatum", 80, 10, 5.0),
            record(1, "SCRNA", "neuron", 0, 0, 0.5),
        ])
        .expect("table")
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = OmicsTable::new(vec![
            record(1, "RNA", "striatum", 80, 6, 1.0),
            record(1, "RNA", "striatum", 80, 6, 2.0),
        ])
        .unwrap_err();
        assert!(matches!(err, OmicsError::Duplicate { gene_id: GeneId(1), .. }));
    }

    #[test]
    fn selection_only_narrows_allelic_series() {
        let table = table();
        let selection = OmicsSelection {
            tissues: ["striatum".to_string()].into_iter().collect(),
            ages: [6].into_iter().collect(),
        };
        let profile = table.gene_profile(GeneId(1), &selection);
        let kinds: Vec<_> = profile.iter().map(|p| p.condition.kind.as_str()).collect();
        assert_eq!(kinds, vec!["PROTEIN", "SCRNA"]);

        let mean = table.mean_profile(&[GeneId(1), GeneId(2), GeneId(1)], &selection);
        assert_eq!(mean[0].value, 2.0);
        assert_eq!(mean.len(), 2);
        assert_eq!(table.select_all().ages.len(), 2);
    }

    #[test]
    fn counts_distinct_studies_per_value() {
        let schema = Arc::new(
            NodeSchema::new("geneID", "geneSymbol", "studyID", vec![FieldSpec::annotation(
                "model",
            )])
            .expect("schema"),
        );
        let rows = [(1, "s1", "mouse"), (1, "s1", "mouse"), (1, "s2", "mouse"), (1, "s3", "human"), (2, "s1", "human")]
            .iter()
            .map(|&(gene, study, model)| {
                NodeRow::new(GeneId(gene), format!("G{gene}"), study, vec![
                    model.into(),
                    "HINT".into(),
                ])
            })
            .collect();
        let nodes = NodeTable::new(schema, rows).expect("nodes");
        let model = nodes.schema().field_id("model").expect("field");
        let counts = observation_counts(&nodes, model);
        assert_eq!(counts[&GeneId(1)]["mouse"], 2);
        assert_eq!(counts[&GeneId(1)]["human"], 1);

        let total = sum_observations(&counts, &[GeneId(1), GeneId(2)]);
        assert_eq!(total["human"], 2);
        assert_eq!(total["mouse"], 2);
    }
}
