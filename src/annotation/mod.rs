//! Categorical encodings of the node table.
//!
//! [`AnnotationIndex`] is a pure function of a [`NodeTable`]: per-field
//! inverted indexes (value to rows, value to genes), the per-gene one-hot
//! matrix, display annotation strings, filter options and the aggregate PPI
//! count per gene. It is rebuilt whenever the node table changes.

mod one_hot;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;

use crate::error::SchemaError;
use crate::model::{FieldId, GeneId, NodeSchema, NodeTable, RowId, NOT_REPORTED};

pub use one_hot::{OneHotColumn, OneHotMatrix};

/// Interned value of one categorical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    /// Position in [`FieldIndex::values`].
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One selectable filter value with the number of distinct genes carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    /// Raw value.
    pub value: String,
    /// Distinct genes with at least one row carrying the value.
    pub gene_count: usize,
}

impl FilterOption {
    /// Display label, `"<value> (<n>)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.value, self.gene_count)
    }
}

/// Inverted index of one categorical field.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    values: Vec<String>,
    lookup: FxHashMap<String, ValueId>,
    row_values: Vec<ValueId>,
    rows_by_value: Vec<Vec<RowId>>,
    genes_by_value: Vec<FxHashSet<GeneId>>,
}

impl FieldIndex {
    fn build(nodes: &NodeTable, field: FieldId) -> Self {
        let mut values: Vec<String> = nodes
            .rows()
            .iter()
            .map(|row| row.values[field.index()].clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        values.sort_unstable();

        let lookup: FxHashMap<String, ValueId> = values
            .iter()
            .enumerate()
            .map(|(pos, value)| (value.clone(), ValueId(pos as u32)))
            .collect();

        let mut rows_by_value = vec![Vec::new(); values.len()];
        let mut genes_by_value = vec![FxHashSet::default(); values.len()];
        let mut row_values = Vec::with_capacity(nodes.len());
        for row in nodes.row_ids() {
            let node = nodes.row(row);
            let value = lookup[&node.values[field.index()]];
            row_values.push(value);
            rows_by_value[value.index()].push(row);
            genes_by_value[value.index()].insert(node.gene_id);
        }

        Self {
            values,
            lookup,
            row_values,
            rows_by_value,
            genes_by_value,
        }
    }

    /// Interned id of `value`, if observed.
    pub fn value_id(&self, value: &str) -> Option<ValueId> {
        self.lookup.get(value).copied()
    }

    /// Raw value behind `id`.
    pub fn value(&self, id: ValueId) -> &str {
        &self.values[id.index()]
    }

    /// Observed values, sorted. Includes `"Not reported"` when present.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Value carried by `row`.
    pub fn value_of(&self, row: RowId) -> ValueId {
        self.row_values[row.index()]
    }

    /// Rows carrying `id`, ascending.
    pub fn rows_with(&self, id: ValueId) -> &[RowId] {
        &self.rows_by_value[id.index()]
    }

    /// Genes with at least one row carrying `id`.
    pub fn genes_with(&self, id: ValueId) -> &FxHashSet<GeneId> {
        &self.genes_by_value[id.index()]
    }

    /// Every observed value with its gene count.
    pub fn options(&self) -> Vec<FilterOption> {
        self.values
            .iter()
            .zip(&self.genes_by_value)
            .map(|(value, genes)| FilterOption {
                value: value.clone(),
                gene_count: genes.len(),
            })
            .collect()
    }
}

/// Per-gene aggregate view.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneEntry {
    /// Gene identifier.
    pub gene_id: GeneId,
    /// Gene symbol.
    pub gene_symbol: String,
    /// Distinct studies the gene was observed in across the whole table.
    pub ppi_sum: u32,
    /// Annotation string per field, aligned with the schema.
    pub annotations: Vec<String>,
    /// Rows of this gene, ascending.
    pub rows: Vec<RowId>,
}

/// Index derived from a node table. See the module docs.
#[derive(Debug, Clone)]
pub struct AnnotationIndex {
    nodes: Arc<NodeTable>,
    fields: Vec<FieldIndex>,
    genes: Vec<GeneEntry>,
    gene_pos: FxHashMap<GeneId, usize>,
    row_gene: Vec<u32>,
    row_study: Vec<u32>,
    symbols: FxHashMap<String, SmallVec<[GeneId; 2]>>,
    one_hot: OneHotMatrix,
}

impl AnnotationIndex {
    /// Builds the index.
    ///
    /// Fails with [`SchemaError::AmbiguousSymbol`] when a gene ID maps to more
    /// than one symbol.
    pub fn build(nodes: Arc<NodeTable>) -> Result<Self, SchemaError> {
        let schema = Arc::clone(nodes.schema());

        let mut genes: Vec<GeneEntry> = Vec::new();
        let mut gene_pos: FxHashMap<GeneId, usize> = FxHashMap::default();
        let mut row_gene = Vec::with_capacity(nodes.len());
        let mut ambiguous: Vec<GeneId> = Vec::new();
        for row in nodes.row_ids() {
            let node = nodes.row(row);
            let pos = *gene_pos.entry(node.gene_id).or_insert_with(|| {
                genes.push(GeneEntry {
                    gene_id: node.gene_id,
                    gene_symbol: node.gene_symbol.clone(),
                    ppi_sum: 0,
                    annotations: Vec::new(),
                    rows: Vec::new(),
                });
                genes.len() - 1
            });
            if genes[pos].gene_symbol != node.gene_symbol && !ambiguous.contains(&node.gene_id) {
                ambiguous.push(node.gene_id);
            }
            genes[pos].rows.push(row);
            row_gene.push(pos as u32);
        }
        if !ambiguous.is_empty() {
            ambiguous.sort_unstable();
            return Err(SchemaError::AmbiguousSymbol { gene_ids: ambiguous });
        }

        let mut studies: FxHashMap<&str, u32> = FxHashMap::default();
        let row_study: Vec<u32> = nodes
            .rows()
            .iter()
            .map(|node| {
                let next = studies.len() as u32;
                *studies.entry(node.study.as_str()).or_insert(next)
            })
            .collect();
        for gene in &mut genes {
            let distinct: FxHashSet<u32> = gene.rows.iter().map(|r| row_study[r.index()]).collect();
            gene.ppi_sum = distinct.len() as u32;
        }

        let fields: Vec<FieldIndex> = schema
            .field_ids()
            .map(|field| FieldIndex::build(&nodes, field))
            .collect();

        let one_hot = encode_one_hot(&schema, &fields, &row_gene, genes.len());
        for (pos, gene) in genes.iter_mut().enumerate() {
            gene.annotations = annotation_strings(&schema, &fields, &one_hot, pos);
        }

        let mut symbols: FxHashMap<String, SmallVec<[GeneId; 2]>> = FxHashMap::default();
        for gene in &genes {
            symbols
                .entry(gene.gene_symbol.clone())
                .or_default()
                .push(gene.gene_id);
        }

        Ok(Self {
            nodes,
            fields,
            genes,
            gene_pos,
            row_gene,
            row_study,
            symbols,
            one_hot,
        })
    }

    /// Indexed node table.
    pub fn nodes(&self) -> &Arc<NodeTable> {
        &self.nodes
    }

    /// Schema of the indexed table.
    pub fn schema(&self) -> &NodeSchema {
        self.nodes.schema()
    }

    /// Genes in first-appearance order.
    pub fn genes(&self) -> &[GeneEntry] {
        &self.genes
    }

    /// Entry of `gene_id`.
    pub fn gene(&self, gene_id: GeneId) -> Option<&GeneEntry> {
        self.gene_pos.get(&gene_id).map(|&pos| &self.genes[pos])
    }

    /// Gene IDs carrying `symbol` (exact match).
    pub fn genes_for_symbol(&self, symbol: &str) -> &[GeneId] {
        self.symbols
            .get(symbol)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Inverted index of `field`.
    pub fn field(&self, field: FieldId) -> &FieldIndex {
        &self.fields[field.index()]
    }

    /// One-hot matrix over (field, value) pairs.
    pub fn one_hot(&self) -> &OneHotMatrix {
        &self.one_hot
    }

    /// Whether `gene_id` has any row carrying `value` in `field`.
    pub fn has_value(&self, gene_id: GeneId, field: FieldId, value: &str) -> bool {
        let index = self.field(field);
        match index.value_id(value) {
            Some(id) => index.genes_with(id).contains(&gene_id),
            None => false,
        }
    }

    /// Annotation string of `gene_id` for `field`.
    pub fn annotation(&self, gene_id: GeneId, field: FieldId) -> Option<&str> {
        self.gene(gene_id)
            .map(|gene| gene.annotations[field.index()].as_str())
    }

    /// Total PPI count of `gene_id`.
    pub fn ppi_sum(&self, gene_id: GeneId) -> Option<u32> {
        self.gene(gene_id).map(|gene| gene.ppi_sum)
    }

    /// Distinct (gene, study) pairs among `rows`, per gene.
    pub fn ppi_sums(&self, rows: &[RowId]) -> FxHashMap<GeneId, u32> {
        let pairs: FxHashSet<(u32, u32)> = rows
            .iter()
            .map(|row| (self.row_gene[row.index()], self.row_study[row.index()]))
            .collect();
        let mut sums: FxHashMap<GeneId, u32> = FxHashMap::default();
        for (gene, _) in pairs {
            *sums.entry(self.genes[gene as usize].gene_id).or_insert(0) += 1;
        }
        sums
    }

    /// Filter options of `field`.
    pub fn options(&self, field: FieldId) -> Vec<FilterOption> {
        self.field(field).options()
    }

    /// Gene owning `row`.
    pub fn row_gene(&self, row: RowId) -> GeneId {
        self.genes[self.row_gene[row.index()] as usize].gene_id
    }
}

fn encode_one_hot(
    schema: &NodeSchema,
    fields: &[FieldIndex],
    row_gene: &[u32],
    genes: usize,
) -> OneHotMatrix {
    let columns: Vec<OneHotColumn> = schema
        .field_ids()
        .flat_map(|field| {
            let index = &fields[field.index()];
            index
                .values()
                .iter()
                .enumerate()
                .filter(|(_, value)| value.as_str() != NOT_REPORTED)
                .map(move |(pos, _)| OneHotColumn {
                    field,
                    value: ValueId(pos as u32),
                })
        })
        .collect();
    let mut matrix = OneHotMatrix::new(columns, genes);
    for field in schema.field_ids() {
        let index = &fields[field.index()];
        for (row, &value) in index.row_values.iter().enumerate() {
            if let Some(column) = matrix.column_index(field, value) {
                matrix.set(row_gene[row] as usize, column);
            }
        }
    }
    matrix
}

fn annotation_strings(
    schema: &NodeSchema,
    fields: &[FieldIndex],
    one_hot: &OneHotMatrix,
    gene: usize,
) -> Vec<String> {
    let mut strings = vec![Vec::new(); schema.fields().len()];
    for column in one_hot.row(gene) {
        strings[column.field.index()].push(fields[column.field.index()].value(column.value));
    }
    strings.into_iter().map(|values| values.join(", ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, NodeRow};

    fn table(rows: &[(u64, &str, &str, &str)]) -> Arc<NodeTable> {
        let schema = NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
            FieldSpec::annotation("tissue"),
        ])
        .expect("schema");
        let rows = rows
            .iter()
            .map(|&(gene, symbol, study, tissue)| {
                NodeRow::new(GeneId(gene), symbol, study, vec![
                    tissue.to_string(),
                    "HINT".to_string(),
                ])
            })
            .collect();
        Arc::new(NodeTable::new(Arc::new(schema), rows).expect("table"))
    }

    #[test]
    fn ppi_sum_counts_distinct_studies() {
        let index = AnnotationIndex::build(table(&[
            (1, "A", "s1", "brain"),
            (1, "A", "s1", "liver"),
            (1, "A", "s2", "brain"),
            (2, "B", "s1", "brain"),
        ]))
        .expect("index");

        assert_eq!(index.ppi_sum(GeneId(1)), Some(2));
        assert_eq!(index.ppi_sum(GeneId(2)), Some(1));
        let filtered = index.ppi_sums(&[RowId(0), RowId(1)]);
        assert_eq!(filtered[&GeneId(1)], 1);
    }

    #[test]
    fn ambiguous_symbols_are_rejected() {
        let err = AnnotationIndex::build(table(&[
            (7, "X", "s1", "brain"),
            (3, "C", "s1", "brain"),
            (7, "Y", "s2", "brain"),
            (3, "D", "s2", "brain"),
        ]))
        .unwrap_err();
        assert_eq!(err, SchemaError::AmbiguousSymbol {
            gene_ids: vec![GeneId(3), GeneId(7)],
        });
    }

    #[test]
    fn annotation_strings_skip_not_reported() {
        let index = AnnotationIndex::build(table(&[
            (1, "A", "s1", "liver"),
            (1, "A", "s2", NOT_REPORTED),
            (1, "A", "s3", "brain"),
            (2, "B", "s1", NOT_REPORTED),
        ]))
        .expect("index");
        let tissue = index.schema().field_id("tissue").expect("field");

        assert_eq!(index.annotation(GeneId(1), tissue), Some("brain, liver"));
        assert_eq!(index.annotation(GeneId(2), tissue), Some(""));
        let brain = index.field(tissue).value_id("brain").expect("value");
        assert!(index.one_hot().column_index(tissue, brain).is_some());
        let not_reported = index.field(tissue).value_id(NOT_REPORTED).expect("value");
        assert_eq!(index.one_hot().column_index(tissue, not_reported), None);
        assert_eq!(index.field(tissue).rows_with(not_reported).len(), 2);
    }

    #[test]
    fn options_report_gene_counts() {
        let index = AnnotationIndex::build(table(&[
            (1, "A", "s1", "brain"),
            (1, "A", "s2", "brain"),
            (2, "B", "s1", "brain"),
            (2, "B", "s1", "liver"),
        ]))
        .expect("index");
        let tissue = index.schema().field_id("tissue").expect("field");
        let labels: Vec<_> = index.options(tissue).iter().map(|o| o.label()).collect();
        assert_eq!(labels, vec!["brain (2)", "liver (1)"]);
        assert_eq!(index.genes_for_symbol("B"), &[GeneId(2)]);
        assert!(index.genes_for_symbol("b").is_empty());
    }
}
