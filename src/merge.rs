//! Merging user-supplied annotation rows into the base node table.
//!
//! Only one upload is active at a time: [`merge`] always starts from the base
//! rows, so merging a second upload replaces the first.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{DataQualityWarning, ValidationError};
use crate::model::{
    FieldKind, GeneId, NodeRow, NodeSchema, NodeTable, NOT_REPORTED, USER_SOURCE_PREFIX,
};

/// Uploaded table: a header row and raw string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadTable {
    /// Column names.
    pub headers: Vec<String>,
    /// Data rows, aligned with `headers`. Short rows read as empty cells.
    pub rows: Vec<Vec<String>>,
}

impl UploadTable {
    fn find_column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map_or("", |cell| cell.trim())
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Base rows followed by the validated upload rows.
    pub nodes: NodeTable,
    /// Recoverable problems; offending rows were dropped.
    pub warnings: Vec<DataQualityWarning>,
    /// Upload rows that made it into `nodes`.
    pub rows_added: usize,
}

/// Whether `row` came from an upload.
pub fn is_uploaded(schema: &NodeSchema, row: &NodeRow) -> bool {
    row.values[schema.data_source().index()].starts_with(USER_SOURCE_PREFIX)
}

/// Base rows of `table`, without uploaded rows or quantitative columns.
pub fn revert(table: &NodeTable) -> NodeTable {
    let schema = table.schema();
    let base_schema = Arc::new(schema.with_quantitative(Vec::new()));
    let rows = table
        .rows()
        .iter()
        .filter(|row| !is_uploaded(schema, row))
        .map(|row| NodeRow {
            quantities: Vec::new(),
            ..row.clone()
        })
        .collect();
    NodeTable::from_parts(base_schema, rows)
}

/// Validates `upload` and appends it to the base rows of `base`.
pub fn merge(base: &NodeTable, upload: &UploadTable) -> Result<MergeOutcome, ValidationError> {
    let base = revert(base);
    let schema = base.schema();

    let required = [
        schema.gene_id_column(),
        schema.gene_symbol_column(),
        schema.study_column(),
    ];
    let missing: Vec<String> = required
        .iter()
        .filter(|name| upload.find_column(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns(missing));
    }
    let [gene_col, symbol_col, study_col] = required.map(|name| upload.find_column(name).unwrap_or(0));

    let mut field_cols: Vec<Option<usize>> = vec![None; schema.fields().len()];
    let mut claimed: FxHashSet<usize> = [gene_col, symbol_col, study_col].into_iter().collect();
    for field in schema.field_ids() {
        let spec = schema.field(field);
        if spec.kind == FieldKind::DataSource {
            continue;
        }
        let column = upload
            .find_column(&spec.name)
            .or_else(|| upload.find_column(&spec.alias));
        if let Some(column) = column {
            if claimed.insert(column) {
                field_cols[field.index()] = Some(column);
            }
        }
    }
    let quant_cols: Vec<usize> = (0..upload.headers.len())
        .filter(|column| !claimed.contains(column) && is_numeric_column(upload, *column))
        .collect();

    let mut symbols: FxHashMap<GeneId, String> = base
        .rows()
        .iter()
        .map(|row| (row.gene_id, row.gene_symbol.clone()))
        .collect();

    let mut warnings = Vec::new();
    let mut null_keys = 0;
    let mut invalid: Option<(usize, String)> = None;
    let mut duplicates = 0;
    let mut ambiguous: Vec<GeneId> = Vec::new();
    let mut kept: FxHashMap<(GeneId, String), usize> = FxHashMap::default();
    let mut uploaded: Vec<NodeRow> = Vec::new();

    for row in 0..upload.rows.len() {
        let raw_gene = upload.cell(row, gene_col);
        let symbol = upload.cell(row, symbol_col);
        let study = upload.cell(row, study_col);
        if raw_gene.is_empty() || symbol.is_empty() || study.is_empty() {
            null_keys += 1;
            continue;
        }
        let Some(gene_id) = GeneId::parse(raw_gene) else {
            let entry = invalid.get_or_insert_with(|| (0, raw_gene.to_string()));
            entry.0 += 1;
            continue;
        };
        let quantities: Vec<Option<f64>> = quant_cols
            .iter()
            .map(|&column| upload.cell(row, column).parse().ok())
            .collect();

        if let Some(&first) = kept.get(&(gene_id, study.to_string())) {
            duplicates += 1;
            if uploaded[first].quantities != quantities && !ambiguous.contains(&gene_id) {
                ambiguous.push(gene_id);
            }
            continue;
        }

        match symbols.get(&gene_id) {
            Some(existing) if existing != symbol => {
                return Err(ValidationError::SymbolConflict {
                    gene_id,
                    existing: existing.clone(),
                    uploaded: symbol.to_string(),
                });
            }
            Some(_) => {}
            None => {
                symbols.insert(gene_id, symbol.to_string());
            }
        }

        let values = schema
            .field_ids()
            .map(|field| {
                if schema.field(field).kind == FieldKind::DataSource {
                    return format!("{USER_SOURCE_PREFIX}{study}");
                }
                match field_cols[field.index()].map(|column| upload.cell(row, column)) {
                    Some(value) if !value.is_empty() => value.to_string(),
                    _ => NOT_REPORTED.to_string(),
                }
            })
            .collect();
        kept.insert((gene_id, study.to_string()), uploaded.len());
        uploaded.push(NodeRow {
            quantities,
            ..NodeRow::new(gene_id, symbol, study, values)
        });
    }

    if null_keys > 0 {
        warnings.push(DataQualityWarning::NullKeys { dropped: null_keys });
    }
    if let Some((dropped, sample)) = invalid {
        warnings.push(DataQualityWarning::InvalidGeneIds { dropped, sample });
    }
    if duplicates > 0 {
        warnings.push(DataQualityWarning::DuplicateRows {
            dropped: duplicates,
        });
    }
    if !ambiguous.is_empty() {
        ambiguous.sort_unstable();
        warnings.push(DataQualityWarning::AmbiguousQuantities { gene_ids: ambiguous });
    }
    if uploaded.is_empty() {
        return Err(ValidationError::EmptyUpload);
    }

    let quant_names = quant_cols
        .iter()
        .map(|&column| upload.headers[column].trim().to_string())
        .collect::<Vec<_>>();
    let merged_schema = Arc::new(schema.with_quantitative(quant_names));
    let rows_added = uploaded.len();
    let mut rows: Vec<NodeRow> = base
        .rows()
        .iter()
        .map(|row| NodeRow {
            quantities: vec![None; quant_cols.len()],
            ..row.clone()
        })
        .collect();
    rows.extend(uploaded);

    Ok(MergeOutcome {
        nodes: NodeTable::new(merged_schema, rows)?,
        warnings,
        rows_added,
    })
}

fn is_numeric_column(upload: &UploadTable, column: usize) -> bool {
    let mut seen = false;
    for row in 0..upload.rows.len() {
        let cell = upload.cell(row, column);
        if cell.is_empty() {
            continue;
        }
        if cell.parse::<f64>().is_err() {
            return false;
        }
        seen = true;
    }
    seen
}
