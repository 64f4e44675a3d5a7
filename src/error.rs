//! Error and warning types shared across the pipeline stages.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::GeneId;

/// Result alias for session-level operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Structural problems with the input tables. Fatal at construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    /// A configured column is absent from a table header.
    #[error("column '{column}' not found in {table} table")]
    MissingColumn {
        /// Table being read.
        table: &'static str,
        /// Missing column.
        column: String,
    },
    /// A field name was declared twice.
    #[error("filter field '{0}' is declared more than once")]
    DuplicateField(String),
    /// More than one field claims the data-source role.
    #[error("only one data-source field may be declared (found '{first}' and '{second}')")]
    MultipleDataSources {
        /// First data-source field.
        first: String,
        /// Second data-source field.
        second: String,
    },
    /// Gene IDs mapping to more than one gene symbol.
    #[error("some gene IDs map to more than one gene symbol (offending gene IDs = {gene_ids:?})")]
    AmbiguousSymbol {
        /// Offending gene IDs, ascending.
        gene_ids: Vec<GeneId>,
    },
    /// A key or score cell does not have the column's type.
    #[error("{table} column '{column}' row {row}: '{value}' is not {expected}")]
    InvalidValue {
        /// Table being read.
        table: &'static str,
        /// Column name.
        column: String,
        /// Zero-based data row.
        row: usize,
        /// Offending cell.
        value: String,
        /// Expected type description.
        expected: &'static str,
    },
    /// Edges referencing genes absent from the node table.
    #[error("{count} edges reference unknown gene IDs (first: {from} -> {to})")]
    DanglingEdges {
        /// Number of dangling edges.
        count: usize,
        /// Source of the first dangling edge.
        from: GeneId,
        /// Target of the first dangling edge.
        to: GeneId,
    },
    /// A row does not match the schema arity.
    #[error("row {row} carries {found} values, schema declares {expected}")]
    RowArity {
        /// Row position.
        row: usize,
        /// Declared column count.
        expected: usize,
        /// Supplied column count.
        found: usize,
    },
    /// Row positions are 32-bit.
    #[error("node table has {0} rows, more than a row index can address")]
    TooManyRows(usize),
}

/// A rejected user upload. The session is left untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Required columns are absent from the upload header.
    #[error("upload is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// Nothing survived row validation.
    #[error("upload contains no usable rows")]
    EmptyUpload,
    /// The upload assigns a different symbol to a known gene.
    #[error("gene ID {gene_id} is '{existing}' but the upload calls it '{uploaded}'")]
    SymbolConflict {
        /// Gene ID.
        gene_id: GeneId,
        /// Symbol already on record.
        existing: String,
        /// Symbol supplied by the upload.
        uploaded: String,
    },
    /// The merged table is structurally invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Recoverable data problems; offending rows are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Rows without a gene ID, gene symbol or study ID.
    NullKeys {
        /// Rows dropped.
        dropped: usize,
    },
    /// Rows whose gene ID is not numeric.
    InvalidGeneIds {
        /// Rows dropped.
        dropped: usize,
        /// First offending value.
        sample: String,
    },
    /// Repeated (gene ID, study ID) rows; first occurrence kept.
    DuplicateRows {
        /// Rows dropped.
        dropped: usize,
    },
    /// Dropped duplicates disagreed with the kept row on quantitative values.
    AmbiguousQuantities {
        /// Genes affected, ascending.
        gene_ids: Vec<GeneId>,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::NullKeys { dropped } => {
                write!(f, "dropped {dropped} rows with an empty gene ID, gene symbol or study ID")
            }
            DataQualityWarning::InvalidGeneIds { dropped, sample } => write!(
                f,
                "dropped {dropped} rows with a non-numeric gene ID (e.g. '{sample}')"
            ),
            DataQualityWarning::DuplicateRows { dropped } => write!(
                f,
                "dropped {dropped} duplicate (gene ID, study ID) rows, keeping the first"
            ),
            DataQualityWarning::AmbiguousQuantities { gene_ids } => write!(
                f,
                "duplicate rows disagree on quantitative values for gene IDs {gene_ids:?}"
            ),
        }
    }
}

/// Errors surfaced by a session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Input tables are structurally invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// User upload rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A filter named a field that is not in the schema.
    #[error("unknown filter field '{0}'")]
    UnknownField(String),
}
