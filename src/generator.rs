//! Seeded synthetic interactomes for benchmarks, tests and demos.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;

use crate::model::{
    Edge, EdgeTable, FieldKind, GeneId, NodeRow, NodeSchema, NodeTable, BASE_SOURCE_TAG,
    NOT_REPORTED,
};

const TISSUES: [&str; 6] = [
    "striatum",
    "cortex",
    "cerebellum",
    "brain (whole)",
    "liver",
    "muscle",
];
const MODELS: [&str; 4] = ["Mouse", "Human", "Cell culture (Mouse)", "In vitro (Human)"];
const METHODS: [&str; 4] = [
    "two hybrid",
    "affinity chromatography technology (mass spectrometry)",
    "pull down",
    "cross-linking",
];

/// Size and density of a synthetic dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    /// Distinct genes.
    pub genes: usize,
    /// Distinct studies rows are attributed to.
    pub studies: usize,
    /// Mean node rows per gene.
    pub rows_per_gene: usize,
    /// Mean outgoing edges per gene.
    pub edges_per_gene: usize,
    /// Probability that an annotation cell is left unreported.
    pub unreported: f64,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            genes: 1_000,
            studies: 40,
            rows_per_gene: 3,
            edges_per_gene: 8,
            unreported: 0.1,
        }
    }
}

/// Deterministic generator; equal seeds yield equal tables.
pub struct DataGenerator {
    rng: ChaCha8Rng,
}

impl DataGenerator {
    /// Generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn pool(name: &str) -> Vec<String> {
        let fixed: &[&str] = match name {
            "tissue" => &TISSUES,
            "model_species" => &MODELS,
            "detection_method_annot" => &METHODS,
            _ => &[],
        };
        if fixed.is_empty() {
            (1..=5).map(|k| format!("{name} {k}")).collect()
        } else {
            fixed.iter().map(|s| s.to_string()).collect()
        }
    }

    /// Node table following `schema`, one gene symbol per gene ID.
    pub fn nodes(&mut self, schema: Arc<NodeSchema>, shape: &Shape) -> NodeTable {
        let pools: Vec<Vec<String>> = schema
            .fields()
            .iter()
            .map(|f| Self::pool(&f.name))
            .collect();
        let studies: Vec<String> = (1..=shape.studies.max(1))
            .map(|k| format!("Study{k} {}", 2000 + k % 23))
            .collect();
        let unreported = shape.unreported.clamp(0.0, 1.0);
        let mut rows = Vec::with_capacity(shape.genes * shape.rows_per_gene);
        for gene in 0..shape.genes {
            let gene_id = GeneId(1_000 + gene as u64);
            let count = self.rng.gen_range(1..=shape.rows_per_gene.max(1) * 2 - 1);
            for _ in 0..count {
                let study = studies
                    .choose(&mut self.rng)
                    .cloned()
                    .unwrap_or_default();
                let values = schema
                    .fields()
                    .iter()
                    .zip(&pools)
                    .map(|(field, pool)| match field.kind {
                        FieldKind::DataSource => BASE_SOURCE_TAG.to_string(),
                        FieldKind::Annotation if self.rng.gen_bool(unreported) => {
                            NOT_REPORTED.to_string()
                        }
                        FieldKind::Annotation => pool
                            .choose(&mut self.rng)
                            .cloned()
                            .unwrap_or_else(|| NOT_REPORTED.to_string()),
                    })
                    .collect();
                rows.push(NodeRow::new(gene_id, format!("G{}", gene_id.0), study, values));
            }
        }
        NodeTable::from_parts(schema, rows)
    }

    /// Undirected-style edges between generated genes, no self loops and no
    /// repeated pairs.
    pub fn edges(&mut self, shape: &Shape) -> EdgeTable {
        let mut seen: FxHashSet<(u64, u64)> = FxHashSet::default();
        let mut edges = Vec::new();
        if shape.genes < 2 {
            return EdgeTable::default();
        }
        for gene in 0..shape.genes {
            let fanout = self.rng.gen_range(0..=shape.edges_per_gene * 2);
            for _ in 0..fanout {
                let other = self.rng.gen_range(0..shape.genes);
                if other == gene {
                    continue;
                }
                let (a, b) = (1_000 + gene as u64, 1_000 + other as u64);
                if !seen.insert((a.min(b), a.max(b))) {
                    continue;
                }
                let score = (self.rng.gen_range(0.15..1.0_f64) * 1000.0).round() / 1000.0;
                edges.push(Edge::new(GeneId(a), GeneId(b), score));
            }
        }
        EdgeTable::new(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldSpec;

    fn schema() -> Arc<NodeSchema> {
        Arc::new(
            NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
                FieldSpec::annotation("tissue"),
                FieldSpec::annotation("htt_length"),
            ])
            .expect("schema"),
        )
    }

    #[test]
    fn equal_seeds_generate_equal_tables() {
        let shape = Shape {
            genes: 50,
            ..Shape::default()
        };
        let a = DataGenerator::new(7).nodes(schema(), &shape);
        let b = DataGenerator::new(7).nodes(schema(), &shape);
        assert_eq!(a, b);
        assert!(NodeTable::new(schema(), a.rows().to_vec()).is_ok());
        assert_eq!(a.gene_ids().len(), 50);
    }

    #[test]
    fn edges_stay_inside_the_gene_range() {
        let shape = Shape {
            genes: 30,
            ..Shape::default()
        };
        let mut generator = DataGenerator::new(3);
        let nodes = generator.nodes(schema(), &shape);
        let edges = generator.edges(&shape);
        assert!(edges.validate_endpoints(&nodes).is_ok());
        assert!(edges.edges().iter().all(|e| e.source != e.target));
    }
}
