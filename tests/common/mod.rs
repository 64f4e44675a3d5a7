#![allow(dead_code)]

use std::sync::Arc;

use interactome::model::{Edge, EdgeTable, FieldSpec, GeneId, NodeRow, NodeSchema, NodeTable};
use interactome::Dataset;

pub fn schema() -> Arc<NodeSchema> {
    Arc::new(
        NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
            FieldSpec::annotation("tissue").with_alias("Tissue"),
            FieldSpec::annotation("model"),
        ])
        .expect("schema"),
    )
}

pub fn row(gene: u64, symbol: &str, study: &str, tissue: &str, model: &str) -> NodeRow {
    NodeRow::new(GeneId(gene), symbol, study, vec![
        tissue.to_string(),
        model.to_string(),
        "HINT".to_string(),
    ])
}

pub fn dataset(rows: Vec<NodeRow>, edges: Vec<(u64, u64, f64)>) -> Arc<Dataset> {
    let nodes = NodeTable::new(schema(), rows).expect("nodes");
    let edges = EdgeTable::new(
        edges
            .into_iter()
            .map(|(a, b, score)| Edge::new(GeneId(a), GeneId(b), score))
            .collect(),
    );
    Arc::new(Dataset::new(nodes, edges).expect("dataset"))
}

/// Genes A (1), B (2) and C (3) observed in 10, 5 and 1 studies, with
/// edges A-B (0.9) and B-C (0.3).
pub fn abc() -> Arc<Dataset> {
    let mut rows = Vec::new();
    for (gene, symbol, studies) in [(1, "A", 10), (2, "B", 5), (3, "C", 1)] {
        for study in 1..=studies {
            rows.push(row(gene, symbol, &format!("s{study}"), "brain", "mouse"));
        }
    }
    dataset(rows, vec![(1, 2, 0.9), (2, 3, 0.3)])
}

/// Gene 1 seen in brain and liver, 2 in brain, 3 in liver, 4 in heart and
/// 5 without a tissue annotation.
pub fn tissues() -> Arc<Dataset> {
    dataset(
        vec![
            row(1, "HTT", "s1", "brain", "mouse"),
            row(1, "HTT", "s2", "liver", "human"),
            row(2, "HAP1", "s1", "brain", "mouse"),
            row(3, "SP1", "s3", "liver", "mouse"),
            row(4, "TP53", "s4", "heart", "human"),
            row(5, "CBP", "s5", "Not reported", "mouse"),
        ],
        vec![(1, 2, 0.9), (1, 3, 0.8), (3, 4, 0.5), (4, 5, 0.45)],
    )
}

pub fn ids<'a>(genes: impl IntoIterator<Item = &'a GeneId>) -> Vec<u64> {
    let mut ids: Vec<u64> = genes.into_iter().map(|g| g.0).collect();
    ids.sort_unstable();
    ids
}
