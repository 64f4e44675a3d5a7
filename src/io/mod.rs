//! CSV/TSV readers and writers for the input tables.
//!
//! Column lookups are case-insensitive. Empty categorical cells read as
//! `"Not reported"`; a node table without the data-source column is tagged
//! with the base source tag.

mod read;
mod write;

use csv::StringRecord;
use thiserror::Error;

use crate::error::SchemaError;
use crate::omics::OmicsError;

pub use read::{
    read_edges, read_edges_from, read_enrichment, read_enrichment_from, read_nodes,
    read_nodes_from, read_omics, read_omics_from, read_upload, read_upload_from,
};
pub use write::{write_edges, write_nodes};

/// Column names of an edge table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeColumns {
    /// Source gene ID column.
    pub source: String,
    /// Target gene ID column.
    pub target: String,
    /// Score column.
    pub score: String,
    /// Optional provenance column.
    pub provenance: Option<String>,
}

impl Default for EdgeColumns {
    fn default() -> Self {
        Self {
            source: "GENE_ID_A".to_string(),
            target: "GENE_ID_B".to_string(),
            score: "combined_score".to_string(),
            provenance: None,
        }
    }
}

/// Error raised while reading or writing tables.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing or writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Table does not match the configured schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Invalid omics table.
    #[error(transparent)]
    Omics(#[from] OmicsError),
}

impl From<&str> for LoadError {
    fn from(value: &str) -> Self {
        LoadError::Message(value.to_string())
    }
}

impl From<String> for LoadError {
    fn from(value: String) -> Self {
        LoadError::Message(value)
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn require_column(
    headers: &StringRecord,
    table: &'static str,
    name: &str,
) -> Result<usize, SchemaError> {
    find_column(headers, name).ok_or_else(|| SchemaError::MissingColumn {
        table,
        column: name.to_string(),
    })
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).map_or("", str::trim)
}
