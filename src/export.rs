//! Tab-separated exports of the current view.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::edges::SelectedEdge;
use crate::model::NodeSchema;
use crate::pipeline::Session;
use crate::selection::SelectedNode;
use crate::visible::{VisibleEdge, VisibleNode};

/// Failure writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Serialization failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Files written by [`export_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Visible nodes table.
    pub visible_nodes: PathBuf,
    /// Visible edges table.
    pub visible_edges: PathBuf,
    /// Selected nodes table.
    pub selected_nodes: PathBuf,
    /// Selected edges table.
    pub selected_edges: PathBuf,
}

fn tsv_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(b'\t').from_writer(out)
}

fn node_header(schema: &NodeSchema, extra: &[&str]) -> Vec<String> {
    let mut header = vec![
        schema.gene_id_column().to_string(),
        schema.gene_symbol_column().to_string(),
    ];
    header.extend(schema.fields().iter().map(|f| f.alias.clone()));
    header.push("PPI_SUM_TOTAL".to_string());
    header.push("PPI_SUM_FILT".to_string());
    header.extend(extra.iter().map(|s| s.to_string()));
    header
}

fn node_record(node: &SelectedNode) -> Vec<String> {
    let mut record = vec![node.gene_id.to_string(), node.gene_symbol.clone()];
    record.extend(node.annotations.iter().cloned());
    record.push(node.ppi_sum_total.to_string());
    record.push(node.ppi_sum_filtered.to_string());
    record
}

const EDGE_HEADER: [&str; 6] = [
    "source",
    "target",
    "score",
    "provenance",
    "min_PPI_SUM_TOTAL",
    "min_PPI_SUM_FILT",
];

fn edge_record(edge: &SelectedEdge) -> Vec<String> {
    vec![
        edge.source.to_string(),
        edge.target.to_string(),
        edge.score.to_string(),
        edge.provenance.clone().unwrap_or_default(),
        edge.min_ppi_sum_total.to_string(),
        edge.min_ppi_sum_filtered.to_string(),
    ]
}

/// Writes selected nodes.
pub fn write_selected_nodes<W: Write>(
    out: W,
    schema: &NodeSchema,
    nodes: &[SelectedNode],
) -> Result<(), csv::Error> {
    let mut writer = tsv_writer(out);
    writer.write_record(node_header(schema, &[]))?;
    for node in nodes {
        writer.write_record(node_record(node))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes visible nodes with their connectivity.
pub fn write_visible_nodes<W: Write>(
    out: W,
    schema: &NodeSchema,
    nodes: &[VisibleNode],
) -> Result<(), csv::Error> {
    let mut writer = tsv_writer(out);
    writer.write_record(node_header(schema, &["connectivity"]))?;
    for node in nodes {
        let mut record = node_record(&node.node);
        record.push(node.connectivity.to_string());
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes selected edges.
pub fn write_selected_edges<W: Write>(out: W, edges: &[SelectedEdge]) -> Result<(), csv::Error> {
    let mut writer = tsv_writer(out);
    writer.write_record(EDGE_HEADER)?;
    for edge in edges {
        writer.write_record(edge_record(edge))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes visible edges with their width.
pub fn write_visible_edges<W: Write>(out: W, edges: &[VisibleEdge]) -> Result<(), csv::Error> {
    let mut writer = tsv_writer(out);
    let mut header = EDGE_HEADER.to_vec();
    header.push("width");
    writer.write_record(header)?;
    for edge in edges {
        let mut record = edge_record(&edge.edge);
        record.push(format!("{:.3}", edge.width));
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn create(dir: &Path, name: &str) -> Result<(fs::File, PathBuf), ExportError> {
    let path = dir.join(name);
    let file = fs::File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok((file, path))
}

/// Writes the four tables of `session` into `dir`, creating it if needed.
pub fn export_all(session: &Session, dir: &Path) -> Result<ExportSummary, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let schema = session.nodes().schema();
    let visible = session.visible();

    let (file, visible_nodes) = create(dir, "visible_nodes.tsv")?;
    write_visible_nodes(file, schema, &visible.nodes)?;
    let (file, visible_edges) = create(dir, "visible_edges.tsv")?;
    write_visible_edges(file, &visible.edges)?;
    let (file, selected_nodes) = create(dir, "selected_nodes.tsv")?;
    write_selected_nodes(file, schema, session.selected_nodes())?;
    let (file, selected_edges) = create(dir, "selected_edges.tsv")?;
    write_selected_edges(file, session.selected_edges())?;

    info!(dir = %dir.display(), nodes = visible.nodes.len(), edges = visible.edges.len(), "exported view");
    Ok(ExportSummary {
        visible_nodes,
        visible_edges,
        selected_nodes,
        selected_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, GeneId};

    #[test]
    fn selected_nodes_use_field_aliases() {
        let schema = NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
            FieldSpec::annotation("tissue").with_alias("Tissue"),
        ])
        .expect("schema");
        let node = SelectedNode {
            gene_id: GeneId(3064),
            gene_symbol: "HTT".into(),
            annotations: vec!["brain, liver".into(), "HINT".into()],
            ppi_sum_total: 4,
            ppi_sum_filtered: 2,
        };
        let mut out = Vec::new();
        write_selected_nodes(&mut out, &schema, &[node]).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "geneID\tgeneSymbol\tTissue\tData source\tPPI_SUM_TOTAL\tPPI_SUM_FILT\n\
             3064\tHTT\tbrain, liver\tHINT\t4\t2\n"
        );
    }
}
