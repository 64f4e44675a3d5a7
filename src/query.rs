//! Free-text gene lookup narrowing the filtered rows.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::annotation::AnnotationIndex;
use crate::filter::RowSet;
use crate::model::GeneId;

/// How many of the requested genes the filtered rows contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryHits {
    /// Distinct matched genes present in the filtered rows.
    pub found: usize,
    /// Distinct tokens submitted.
    pub requested: usize,
}

/// Result of applying a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Queried rows. Shares the filtered rows when the query is empty.
    pub rows: Arc<RowSet>,
    /// `None` when no query is active.
    pub hits: Option<QueryHits>,
}

/// Narrows `filtered` to the genes named in `text`, one per line.
///
/// Tokens made only of ASCII digits match gene IDs; any other token matches
/// gene symbols exactly.
pub fn apply(index: &AnnotationIndex, filtered: &Arc<RowSet>, text: &str) -> QueryOutcome {
    let tokens: FxHashSet<&str> = text
        .lines()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return QueryOutcome {
            rows: Arc::clone(filtered),
            hits: None,
        };
    }

    let mut wanted: FxHashSet<GeneId> = FxHashSet::default();
    for token in &tokens {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = token.parse() {
                wanted.insert(GeneId(id));
            }
        } else {
            wanted.extend(index.genes_for_symbol(token).iter().copied());
        }
    }

    let rows = filtered
        .rows()
        .iter()
        .copied()
        .filter(|&row| wanted.contains(&index.row_gene(row)))
        .collect();
    let rows = RowSet::new(index, rows);
    let hits = QueryHits {
        found: rows.gene_ids().len(),
        requested: tokens.len(),
    };
    QueryOutcome {
        rows: Arc::new(rows),
        hits: Some(hits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, NodeRow, NodeSchema, NodeTable};

    fn index() -> AnnotationIndex {
        let schema = Arc::new(
            NodeSchema::new("geneID", "geneSymbol", "studyID", vec![FieldSpec::annotation(
                "tissue",
            )])
            .expect("schema"),
        );
        let rows = [(3064, "HTT"), (3065, "HDAC1"), (3064, "HTT"), (42, "X")]
            .iter()
            .enumerate()
            .map(|(pos, &(gene, symbol))| {
                NodeRow::new(GeneId(gene), symbol, format!("s{pos}"), vec![
                    "brain".into(),
                    "HINT".into(),
                ])
            })
            .collect();
        AnnotationIndex::build(Arc::new(NodeTable::new(schema, rows).expect("table"))).expect("index")
    }

    #[test]
    fn blank_query_passes_rows_through() {
        let index = index();
        let all = Arc::new(RowSet::all(&index));
        let outcome = apply(&index, &all, "  \n\t\n");
        assert!(Arc::ptr_eq(&outcome.rows, &all));
        assert_eq!(outcome.hits, None);
    }

    #[test]
    fn matches_ids_and_symbols() {
        let index = index();
        let all = Arc::new(RowSet::all(&index));
        let outcome = apply(&index, &all, "HTT\n 42 \nhdac1\n\nHTT\n999");
        let mut genes: Vec<_> = outcome.rows.gene_ids().iter().map(|g| g.0).collect();
        genes.sort_unstable();
        assert_eq!(genes, vec![42, 3064]);
        assert_eq!(outcome.rows.len(), 3);
        assert_eq!(outcome.hits, Some(QueryHits {
            found: 2,
            requested: 4,
        }));
    }
}
