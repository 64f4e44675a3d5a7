use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::enrichment::EnrichmentTerm;
use crate::error::SchemaError;
use crate::merge::UploadTable;
use crate::model::{
    Edge, EdgeTable, FieldKind, GeneId, NodeRow, NodeSchema, NodeTable, BASE_SOURCE_TAG,
    NOT_REPORTED,
};
use crate::omics::{OmicsRecord, OmicsTable};

use super::{cell, find_column, require_column, EdgeColumns, LoadError};

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
        _ => b',',
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|err| LoadError::Message(format!("{}: {err}", path.display())))
}

/// Reads a node table; `.tsv`/`.txt` files are tab-separated.
pub fn read_nodes(path: &Path, schema: NodeSchema) -> Result<NodeTable, LoadError> {
    let table = read_nodes_from(open(path)?, delimiter_for(path), schema)?;
    debug!(path = %path.display(), rows = table.len(), "read node table");
    Ok(table)
}

/// Reads a node table from `reader`.
pub fn read_nodes_from<R: Read>(
    reader: R,
    delimiter: u8,
    schema: NodeSchema,
) -> Result<NodeTable, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let gene_col = require_column(&headers, "node", schema.gene_id_column())?;
    let symbol_col = require_column(&headers, "node", schema.gene_symbol_column())?;
    let study_col = require_column(&headers, "node", schema.study_column())?;
    let field_cols = schema
        .fields()
        .iter()
        .map(|spec| match find_column(&headers, &spec.name) {
            Some(idx) => Ok(Some(idx)),
            None if spec.kind == FieldKind::DataSource => Ok(None),
            None => Err(SchemaError::MissingColumn {
                table: "node",
                column: spec.name.clone(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_gene = cell(&record, gene_col);
        let study = cell(&record, study_col);
        if raw_gene.is_empty() || study.is_empty() {
            skipped += 1;
            continue;
        }
        let gene_id = GeneId::parse(raw_gene).ok_or_else(|| SchemaError::InvalidValue {
            table: "node",
            column: schema.gene_id_column().to_string(),
            row: line,
            value: raw_gene.to_string(),
            expected: "a numeric gene ID",
        })?;
        let values = schema
            .fields()
            .iter()
            .zip(&field_cols)
            .map(|(spec, col)| {
                let value = col.map_or("", |idx| cell(&record, idx));
                match (value.is_empty(), spec.kind) {
                    (false, _) => value.to_string(),
                    (true, FieldKind::DataSource) => BASE_SOURCE_TAG.to_string(),
                    (true, FieldKind::Annotation) => NOT_REPORTED.to_string(),
                }
            })
            .collect();
        rows.push(NodeRow::new(
            gene_id,
            cell(&record, symbol_col),
            study,
            values,
        ));
    }
    if skipped > 0 {
        warn!(skipped, "skipped node rows without a gene ID or study ID");
    }
    Ok(NodeTable::new(Arc::new(schema), rows)?)
}

/// Reads an edge table; `.tsv`/`.txt` files are tab-separated.
pub fn read_edges(path: &Path, columns: &EdgeColumns) -> Result<EdgeTable, LoadError> {
    let table = read_edges_from(open(path)?, delimiter_for(path), columns)?;
    debug!(path = %path.display(), edges = table.len(), "read edge table");
    Ok(table)
}

/// Reads an edge table from `reader`.
pub fn read_edges_from<R: Read>(
    reader: R,
    delimiter: u8,
    columns: &EdgeColumns,
) -> Result<EdgeTable, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let source_col = require_column(&headers, "edge", &columns.source)?;
    let target_col = require_column(&headers, "edge", &columns.target)?;
    let score_col = require_column(&headers, "edge", &columns.score)?;
    let provenance_col = match &columns.provenance {
        Some(name) => Some(require_column(&headers, "edge", name)?),
        None => None,
    };

    let invalid = |column: &str, row: usize, value: &str, expected: &'static str| {
        SchemaError::InvalidValue {
            table: "edge",
            column: column.to_string(),
            row,
            value: value.to_string(),
            expected,
        }
    };

    let mut edges = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let source = cell(&record, source_col);
        let source = GeneId::parse(source)
            .ok_or_else(|| invalid(&columns.source, line, source, "a numeric gene ID"))?;
        let target = cell(&record, target_col);
        let target = GeneId::parse(target)
            .ok_or_else(|| invalid(&columns.target, line, target, "a numeric gene ID"))?;
        let raw_score = cell(&record, score_col);
        let score = raw_score
            .parse::<f64>()
            .ok()
            .filter(|score| (0.0..=1.0).contains(score))
            .ok_or_else(|| invalid(&columns.score, line, raw_score, "a number in [0, 1]"))?;
        let provenance = provenance_col
            .map(|idx| cell(&record, idx))
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        edges.push(Edge {
            source,
            target,
            score,
            provenance,
        });
    }
    Ok(EdgeTable::new(edges))
}

/// Reads a tab-separated upload.
pub fn read_upload(path: &Path) -> Result<UploadTable, LoadError> {
    read_upload_from(open(path)?)
}

/// Reads a tab-separated upload from `reader`.
pub fn read_upload_from<R: Read>(reader: R) -> Result<UploadTable, LoadError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("upload has no header row".into());
    }
    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    Ok(UploadTable { headers, rows })
}

/// Reads cached enrichment results.
pub fn read_enrichment(path: &Path) -> Result<Vec<EnrichmentTerm>, LoadError> {
    read_enrichment_from(open(path)?)
}

/// Reads cached enrichment results from a CSV `reader`.
pub fn read_enrichment_from<R: Read>(reader: R) -> Result<Vec<EnrichmentTerm>, LoadError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let terms = reader
        .deserialize()
        .collect::<Result<Vec<EnrichmentTerm>, _>>()?;
    Ok(terms)
}

#[derive(Debug, Deserialize)]
struct RawOmics {
    #[serde(rename = "geneID", alias = "gene_id")]
    gene_id: String,
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    tissue: String,
    #[serde(rename = "Q-length", alias = "q_length")]
    q_length: i64,
    age: i64,
    value: f64,
}

/// Reads a long-format omics table.
pub fn read_omics(path: &Path) -> Result<OmicsTable, LoadError> {
    read_omics_from(open(path)?)
}

/// Reads a long-format omics table from a CSV `reader`.
pub fn read_omics_from<R: Read>(reader: R) -> Result<OmicsTable, LoadError> {
    let mut reader = ReaderBuilder::new().from_reader(reader);
    let mut records = Vec::new();
    for (line, raw) in reader.deserialize::<RawOmics>().enumerate() {
        let raw = raw?;
        let gene_id = GeneId::parse(&raw.gene_id).ok_or_else(|| SchemaError::InvalidValue {
            table: "omics",
            column: "geneID".to_string(),
            row: line,
            value: raw.gene_id.clone(),
            expected: "a numeric gene ID",
        })?;
        records.push(OmicsRecord {
            gene_id,
            kind: raw.kind,
            tissue: raw.tissue,
            q_length: raw.q_length,
            age: raw.age,
            value: raw.value,
        });
    }
    Ok(OmicsTable::new(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldSpec;

    fn schema() -> NodeSchema {
        NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
            FieldSpec::annotation("tissue"),
        ])
        .expect("schema")
    }

    #[test]
    fn nodes_fill_missing_values() {
        let csv = "GeneID,geneSymbol,studyID,Tissue\n\
                   3064.0,HTT,s1,\n\
                   ,X,s2,brain\n\
                   3065,HDAC1,s1,brain\n";
        let table = read_nodes_from(csv.as_bytes(), b',', schema()).expect("nodes");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].gene_id, GeneId(3064));
        assert_eq!(table.rows()[0].values, vec![NOT_REPORTED, BASE_SOURCE_TAG]);
        assert_eq!(table.rows()[1].values[0], "brain");
    }

    #[test]
    fn nodes_require_configured_fields() {
        let csv = "geneID,geneSymbol,studyID\n1,A,s1\n";
        let err = read_nodes_from(csv.as_bytes(), b',', schema()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Schema(SchemaError::MissingColumn { table: "node", .. })
        ));
    }

    #[test]
    fn edges_reject_bad_scores() {
        let csv = "GENE_ID_A,GENE_ID_B,combined_score\n1,2,0.7\n2,3,high\n";
        let err = read_edges_from(csv.as_bytes(), b',', &EdgeColumns::default()).unwrap_err();
        match err {
            LoadError::Schema(SchemaError::InvalidValue { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn edges_reject_scores_outside_unit_range() {
        for bad in ["7.5", "-1", "NaN", "inf"] {
            let csv = format!("GENE_ID_A,GENE_ID_B,combined_score\n1,2,1\n2,3,{bad}\n");
            let err = read_edges_from(csv.as_bytes(), b',', &EdgeColumns::default()).unwrap_err();
            assert!(
                matches!(
                    &err,
                    LoadError::Schema(SchemaError::InvalidValue {
                        row: 1,
                        expected: "a number in [0, 1]",
                        ..
                    })
                ),
                "{bad}: {err}"
            );
        }
        let csv = "GENE_ID_A,GENE_ID_B,combined_score\n1,2,0\n2,3,1.0\n";
        let edges = read_edges_from(csv.as_bytes(), b',', &EdgeColumns::default()).expect("edges");
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn upload_reads_raw_cells() {
        let tsv = "geneID\tgeneSymbol\tstudyID\n1\tA\tu1\n2\tB\n";
        let upload = read_upload_from(tsv.as_bytes()).expect("upload");
        assert_eq!(upload.headers, vec!["geneID", "geneSymbol", "studyID"]);
        assert_eq!(upload.rows[1], vec!["2", "B"]);
    }

    #[test]
    fn enrichment_cache_ignores_extra_columns() {
        let csv = ",number_in_list,fold_enrichment,fdr,expected,number_in_reference,pValue,plus_minus,id,label\n\
                   0,12,4.5,0.001,2.6,400,0.0001,+,GO:0007268,chemical synaptic transmission\n";
        let terms = read_enrichment_from(csv.as_bytes()).expect("terms");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].number_in_list, 12);
        assert_eq!(terms[0].id.as_deref(), Some("GO:0007268"));
        assert_eq!(terms[0].p_value, Some(0.0001));
    }

    #[test]
    fn omics_reads_long_format() {
        let csv = "geneID,type,tissue,Q-length,age,value\n\
                   3064,PROTEIN,striatum,175,6,-1.25\n";
        let table = read_omics_from(csv.as_bytes()).expect("omics");
        assert_eq!(table.len(), 1);
    }
}
