//! Categorical filter evaluation.
//!
//! Two compositions are supported. [`Composition::Progressive`] walks the
//! active fields in schema order and narrows the surviving rows field by
//! field, grouping rows by gene and by the values of every other active
//! field. [`Composition::Independent`] resolves each field to a gene set on
//! its own and intersects the sets.

mod state;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::str::FromStr;

use crate::annotation::{AnnotationIndex, ValueId};
use crate::model::{FieldId, GeneId, RowId};

pub use state::{Combinator, FieldFilter, FilterState};

/// How filters on different fields compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// Fields narrow the surviving rows one after another.
    #[default]
    Progressive,
    /// Per-field gene sets are intersected.
    Independent,
}

impl FromStr for Composition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "progressive" => Ok(Composition::Progressive),
            "independent" => Ok(Composition::Independent),
            other => Err(format!("unknown composition '{other}'")),
        }
    }
}

/// Node rows surviving a stage, in table order, with their distinct genes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<RowId>,
    gene_ids: FxHashSet<GeneId>,
}

impl RowSet {
    /// Wraps `rows`; they are sorted and deduplicated.
    pub fn new(index: &AnnotationIndex, mut rows: Vec<RowId>) -> Self {
        rows.sort_unstable();
        rows.dedup();
        let gene_ids = rows.iter().map(|&row| index.row_gene(row)).collect();
        Self { rows, gene_ids }
    }

    /// Every row of the indexed table.
    pub fn all(index: &AnnotationIndex) -> Self {
        Self::new(index, index.nodes().row_ids().collect())
    }

    /// Rows, ascending.
    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    /// Distinct genes of the rows.
    pub fn gene_ids(&self) -> &FxHashSet<GeneId> {
        &self.gene_ids
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row survived.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Applies `state` to the indexed table.
pub fn apply(index: &AnnotationIndex, state: &FilterState, composition: Composition) -> RowSet {
    let active: SmallVec<[FieldId; 8]> = state.active().collect();
    if active.is_empty() {
        return RowSet::all(index);
    }
    let rows = match composition {
        Composition::Progressive => progressive(index, state, &active),
        Composition::Independent => independent(index, state, &active),
    };
    RowSet::new(index, rows)
}

type GroupKey = (GeneId, SmallVec<[ValueId; 8]>);

fn selected_ids(index: &AnnotationIndex, field: FieldId, filter: &FieldFilter) -> Vec<Option<ValueId>> {
    let values = index.field(field);
    filter.values.iter().map(|v| values.value_id(v)).collect()
}

fn genes_with_any(index: &AnnotationIndex, field: FieldId, selected: &[Option<ValueId>]) -> FxHashSet<GeneId> {
    let values = index.field(field);
    selected
        .iter()
        .flatten()
        .flat_map(|&id| values.genes_with(id).iter().copied())
        .collect()
}

fn progressive(index: &AnnotationIndex, state: &FilterState, active: &[FieldId]) -> Vec<RowId> {
    let mut surviving: Vec<RowId> = index.nodes().row_ids().collect();

    for &field in active {
        if surviving.is_empty() {
            break;
        }
        let filter = state.get(field);
        let selected = selected_ids(index, field, filter);

        if filter.combinator == Combinator::Not {
            let excluded = genes_with_any(index, field, &selected);
            surviving.retain(|&row| !excluded.contains(&index.row_gene(row)));
            continue;
        }

        if filter.combinator == Combinator::And && selected.iter().any(Option::is_none) {
            surviving.clear();
            break;
        }
        let wanted: SmallVec<[ValueId; 4]> = selected.into_iter().flatten().collect();
        let values = index.field(field);
        let group_of = |row: RowId| -> GroupKey {
            let others = active
                .iter()
                .filter(|&&other| other != field)
                .map(|&other| index.field(other).value_of(row))
                .collect();
            (index.row_gene(row), others)
        };

        let mut coverage: FxHashMap<GroupKey, SmallVec<[ValueId; 4]>> = FxHashMap::default();
        for &row in &surviving {
            let value = values.value_of(row);
            if !wanted.contains(&value) {
                continue;
            }
            let covered = coverage.entry(group_of(row)).or_default();
            if !covered.contains(&value) {
                covered.push(value);
            }
        }
        let required = match filter.combinator {
            Combinator::And => wanted.len(),
            _ => 1,
        };
        surviving.retain(|&row| {
            wanted.contains(&values.value_of(row))
                && coverage
                    .get(&group_of(row))
                    .is_some_and(|covered| covered.len() >= required)
        });
    }
    surviving
}

fn independent(index: &AnnotationIndex, state: &FilterState, active: &[FieldId]) -> Vec<RowId> {
    let mut allowed: Option<FxHashSet<GeneId>> = None;
    let mut excluded: FxHashSet<GeneId> = FxHashSet::default();
    let mut narrowing: SmallVec<[(FieldId, SmallVec<[ValueId; 4]>); 8]> = SmallVec::new();

    for &field in active {
        let filter = state.get(field);
        let selected = selected_ids(index, field, filter);
        let values = index.field(field);
        let genes: FxHashSet<GeneId> = match filter.combinator {
            Combinator::Not => {
                excluded.extend(genes_with_any(index, field, &selected));
                continue;
            }
            Combinator::Or => genes_with_any(index, field, &selected),
            Combinator::And => {
                let mut sets = selected.iter().map(|id| match id {
                    Some(id) => values.genes_with(*id).clone(),
                    None => FxHashSet::default(),
                });
                let first = sets.next().unwrap_or_default();
                sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
            }
        };
        narrowing.push((field, selected.into_iter().flatten().collect()));
        allowed = Some(match allowed {
            Some(prior) => prior.intersection(&genes).copied().collect(),
            None => genes,
        });
    }

    index
        .nodes()
        .row_ids()
        .filter(|&row| {
            let gene = index.row_gene(row);
            allowed.as_ref().map_or(true, |set| set.contains(&gene))
                && !excluded.contains(&gene)
                && narrowing
                    .iter()
                    .all(|(field, wanted)| wanted.contains(&index.field(*field).value_of(row)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, NodeRow, NodeSchema, NodeTable};
    use std::sync::Arc;

    // gene, study, tissue, model
    const ROWS: &[(u64, &str, &str, &str)] = &[
        (1, "s1", "brain", "mouse"),
        (1, "s2", "liver", "mouse"),
        (2, "s1", "brain", "human"),
        (3, "s3", "liver", "mouse"),
        (3, "s4", "Not reported", "human"),
    ];

    fn index() -> AnnotationIndex {
        let schema = Arc::new(
            NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
                FieldSpec::annotation("tissue"),
                FieldSpec::annotation("model"),
            ])
            .expect("schema"),
        );
        let rows = ROWS
            .iter()
            .map(|&(gene, study, tissue, model)| {
                NodeRow::new(GeneId(gene), format!("G{gene}"), study, vec![
                    tissue.into(),
                    model.into(),
                    "HINT".into(),
                ])
            })
            .collect();
        AnnotationIndex::build(Arc::new(NodeTable::new(schema, rows).expect("table"))).expect("index")
    }

    fn state(index: &AnnotationIndex, filters: &[(&str, &[&str], Combinator)]) -> FilterState {
        let mut state = FilterState::new(index.schema());
        for (name, values, combinator) in filters {
            let field = index.schema().field_id(name).expect("field");
            state.set(field, FieldFilter::new(values.iter().copied(), *combinator));
        }
        state
    }

    fn genes(rows: &RowSet) -> Vec<u64> {
        let mut genes: Vec<_> = rows.gene_ids().iter().map(|g| g.0).collect();
        genes.sort_unstable();
        genes
    }

    fn rows(set: &RowSet) -> Vec<u32> {
        set.rows().iter().map(|r| r.0).collect()
    }

    #[test]
    fn inactive_filters_keep_every_row() {
        let index = index();
        let result = apply(&index, &FilterState::new(index.schema()), Composition::Progressive);
        assert_eq!(result.len(), ROWS.len());
    }

    #[test]
    fn or_keeps_rows_with_selected_values() {
        let index = index();
        let state = state(&index, &[("tissue", &["brain", "liver"], Combinator::Or)]);
        let result = apply(&index, &state, Composition::Progressive);
        assert_eq!(rows(&result), vec![0, 1, 2, 3]);
        assert_eq!(genes(&result), vec![1, 2, 3]);
    }

    #[test]
    fn and_requires_every_value_per_gene() {
        let index = index();
        let state = state(&index, &[("tissue", &["brain", "liver"], Combinator::And)]);
        let result = apply(&index, &state, Composition::Progressive);
        assert_eq!(genes(&result), vec![1]);
        assert_eq!(rows(&result), vec![0, 1]);
    }

    #[test]
    fn and_with_unknown_value_is_empty() {
        let index = index();
        let state = state(&index, &[("tissue", &["brain", "kidney"], Combinator::And)]);
        assert!(apply(&index, &state, Composition::Progressive).is_empty());
    }

    #[test]
    fn not_excludes_genes_with_any_selected_value() {
        let index = index();
        let state = state(&index, &[("tissue", &["liver"], Combinator::Not)]);
        let result = apply(&index, &state, Composition::Progressive);
        assert_eq!(genes(&result), vec![2]);

        let state = self::state(&index, &[("tissue", &["Not reported"], Combinator::Not)]);
        assert_eq!(genes(&apply(&index, &state, Composition::Progressive)), vec![1, 2]);
    }

    #[test]
    fn progressive_groups_by_other_active_fields() {
        let index = index();
        // gene 1 covers brain and liver only together with "mouse".
        let state = state(&index, &[
            ("tissue", &["brain", "liver"], Combinator::And),
            ("model", &["mouse"], Combinator::Or),
        ]);
        let result = apply(&index, &state, Composition::Progressive);
        assert_eq!(rows(&result), vec![0, 1]);

        let state = self::state(&index, &[
            ("tissue", &["liver"], Combinator::Or),
            ("model", &["mouse", "human"], Combinator::And),
        ]);
        assert!(apply(&index, &state, Composition::Progressive).is_empty());
    }

    #[test]
    fn independent_intersects_gene_sets() {
        let index = index();
        let state = state(&index, &[
            ("tissue", &["liver"], Combinator::Or),
            ("model", &["mouse", "human"], Combinator::And),
        ]);
        let result = apply(&index, &state, Composition::Independent);
        assert_eq!(genes(&result), vec![3]);
        assert_eq!(rows(&result), vec![3]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let index = index();
        let state = state(&index, &[
            ("tissue", &["brain"], Combinator::Or),
            ("model", &["human"], Combinator::Not),
        ]);
        let first = apply(&index, &state, Composition::Progressive);
        let second = apply(&index, &state, Composition::Progressive);
        assert_eq!(first, second);
        assert_eq!(genes(&first), vec![1]);
    }
}
