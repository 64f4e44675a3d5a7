use std::io::Write;

use csv::WriterBuilder;

use crate::model::{EdgeTable, NodeTable};

use super::{EdgeColumns, LoadError};

/// Writes `nodes` as CSV in the layout [`read_nodes_from`](super::read_nodes_from)
/// accepts, quantitative columns last.
pub fn write_nodes<W: Write>(out: W, nodes: &NodeTable) -> Result<(), LoadError> {
    let schema = nodes.schema();
    let mut writer = WriterBuilder::new().from_writer(out);
    let mut header = vec![
        schema.gene_id_column(),
        schema.gene_symbol_column(),
        schema.study_column(),
    ];
    header.extend(schema.fields().iter().map(|f| f.name.as_str()));
    header.extend(schema.quantitative().iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in nodes.rows() {
        let mut record = vec![
            row.gene_id.to_string(),
            row.gene_symbol.clone(),
            row.study.clone(),
        ];
        record.extend(row.values.iter().cloned());
        record.extend(
            row.quantities
                .iter()
                .map(|q| q.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `edges` as CSV using `columns` for the header.
pub fn write_edges<W: Write>(
    out: W,
    edges: &EdgeTable,
    columns: &EdgeColumns,
) -> Result<(), LoadError> {
    let mut writer = WriterBuilder::new().from_writer(out);
    let mut header = vec![
        columns.source.as_str(),
        columns.target.as_str(),
        columns.score.as_str(),
    ];
    if let Some(provenance) = &columns.provenance {
        header.push(provenance);
    }
    writer.write_record(&header)?;
    for edge in edges.edges() {
        let mut record = vec![
            edge.source.to_string(),
            edge.target.to_string(),
            edge.score.to_string(),
        ];
        if columns.provenance.is_some() {
            record.push(edge.provenance.clone().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
