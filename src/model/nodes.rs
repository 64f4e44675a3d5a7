use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::SchemaError;

use super::schema::{FieldId, GeneId, NodeSchema};

/// Position of a row inside a [`NodeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u32);

impl RowId {
    /// Row position as an index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One PPI observation of a gene.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    /// Gene identifier.
    pub gene_id: GeneId,
    /// Gene symbol; a gene ID maps to exactly one symbol.
    pub gene_symbol: String,
    /// Study/provenance identifier.
    pub study: String,
    /// Categorical values aligned with [`NodeSchema::fields`].
    pub values: Vec<String>,
    /// Quantitative values aligned with [`NodeSchema::quantitative`].
    pub quantities: Vec<Option<f64>>,
}

impl NodeRow {
    /// Row without quantitative columns.
    pub fn new(
        gene_id: GeneId,
        gene_symbol: impl Into<String>,
        study: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            gene_id,
            gene_symbol: gene_symbol.into(),
            study: study.into(),
            values,
            quantities: Vec::new(),
        }
    }
}

/// Row-oriented node table bound to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTable {
    schema: Arc<NodeSchema>,
    rows: Vec<NodeRow>,
}

impl NodeTable {
    /// Checks every row against the schema arity.
    pub fn new(schema: Arc<NodeSchema>, rows: Vec<NodeRow>) -> Result<Self, SchemaError> {
        let expected = schema.fields().len();
        let quantitative = schema.quantitative().len();
        for (row, node) in rows.iter().enumerate() {
            if node.values.len() != expected {
                return Err(SchemaError::RowArity {
                    row,
                    expected,
                    found: node.values.len(),
                });
            }
            if node.quantities.len() != quantitative {
                return Err(SchemaError::RowArity {
                    row,
                    expected: quantitative,
                    found: node.quantities.len(),
                });
            }
        }
        if rows.len() > u32::MAX as usize {
            return Err(SchemaError::TooManyRows(rows.len()));
        }
        Ok(Self { schema, rows })
    }

    pub(crate) fn from_parts(schema: Arc<NodeSchema>, rows: Vec<NodeRow>) -> Self {
        debug_assert!(rows
            .iter()
            .all(|row| row.values.len() == schema.fields().len()
                && row.quantities.len() == schema.quantitative().len()));
        Self { schema, rows }
    }

    /// Table schema.
    pub fn schema(&self) -> &Arc<NodeSchema> {
        &self.schema
    }

    /// All rows in table order.
    pub fn rows(&self) -> &[NodeRow] {
        &self.rows
    }

    /// Row at `id`.
    pub fn row(&self, id: RowId) -> &NodeRow {
        &self.rows[id.index()]
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row handles in table order.
    pub fn row_ids(&self) -> impl Iterator<Item = RowId> {
        (0..self.rows.len() as u32).map(RowId)
    }

    /// Categorical value of `field` in `row`.
    pub fn value(&self, row: RowId, field: FieldId) -> &str {
        &self.rows[row.index()].values[field.index()]
    }

    /// Distinct gene IDs.
    pub fn gene_ids(&self) -> FxHashSet<GeneId> {
        self.rows.iter().map(|row| row.gene_id).collect()
    }
}
