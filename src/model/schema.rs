use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Placeholder carried by categorical cells that have no annotation.
pub const NOT_REPORTED: &str = "Not reported";

/// Data-source tag applied to rows of the base dataset.
pub const BASE_SOURCE_TAG: &str = "HINT";

/// Prefix of the data-source tag applied to uploaded rows (`"user - <study>"`).
pub const USER_SOURCE_PREFIX: &str = "user - ";

/// Numeric gene identifier shared by node and edge tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneId(pub u64);

impl GeneId {
    /// Parses a gene identifier cell.
    ///
    /// Integral float renderings (`"3064.0"`) are accepted because tabular
    /// exports frequently widen integer key columns.
    pub fn parse(raw: &str) -> Option<GeneId> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse().ok().map(GeneId);
        }
        let value: f64 = raw.parse().ok()?;
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
            Some(GeneId(value as u64))
        } else {
            None
        }
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a categorical field inside a [`NodeSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    /// Position of the field in schema order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Role of a categorical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain annotation column (tissue, model, method, ...).
    #[default]
    Annotation,
    /// Provenance tag distinguishing base rows from uploaded rows.
    DataSource,
}

/// Descriptor of one filterable categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Column name in the node table.
    pub name: String,
    /// Display name.
    pub alias: String,
    /// Field role.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Annotation field whose alias equals its name.
    pub fn annotation(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            kind: FieldKind::Annotation,
        }
    }

    /// Replaces the display alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Data-source field.
    pub fn data_source(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::DataSource,
            ..Self::annotation(name)
        }
    }
}

/// Column layout of a node table, fixed at configuration time.
///
/// Every schema carries exactly one [`FieldKind::DataSource`] field; one named
/// `data_source` is appended when the configuration does not declare it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSchema {
    gene_id: String,
    gene_symbol: String,
    study: String,
    fields: Vec<FieldSpec>,
    quantitative: Vec<String>,
}

impl NodeSchema {
    /// Validates field declarations and builds the schema.
    pub fn new(
        gene_id: impl Into<String>,
        gene_symbol: impl Into<String>,
        study: impl Into<String>,
        mut fields: Vec<FieldSpec>,
    ) -> Result<Self, SchemaError> {
        for (pos, field) in fields.iter().enumerate() {
            if fields[..pos]
                .iter()
                .any(|prior| prior.name.eq_ignore_ascii_case(&field.name))
            {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        let mut sources = fields.iter().filter(|f| f.kind == FieldKind::DataSource);
        match (sources.next(), sources.next()) {
            (Some(first), Some(second)) => {
                return Err(SchemaError::MultipleDataSources {
                    first: first.name.clone(),
                    second: second.name.clone(),
                })
            }
            (None, _) => {
                fields.push(FieldSpec::data_source("data_source").with_alias("Data source"));
            }
            _ => {}
        }
        Ok(Self {
            gene_id: gene_id.into(),
            gene_symbol: gene_symbol.into(),
            study: study.into(),
            fields,
            quantitative: Vec::new(),
        })
    }

    /// Gene ID column name.
    pub fn gene_id_column(&self) -> &str {
        &self.gene_id
    }

    /// Gene symbol column name.
    pub fn gene_symbol_column(&self) -> &str {
        &self.gene_symbol
    }

    /// Study/provenance column name used for PPI counting.
    pub fn study_column(&self) -> &str {
        &self.study
    }

    /// Categorical fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Descriptor of `id`.
    pub fn field(&self, id: FieldId) -> &FieldSpec {
        &self.fields[id.0]
    }

    /// Field handles in schema order.
    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len()).map(FieldId)
    }

    /// Resolves a field by column name or alias (case-insensitive).
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|f| f.alias.eq_ignore_ascii_case(name))
            })
            .map(FieldId)
    }

    /// The data-source field.
    pub fn data_source(&self) -> FieldId {
        let pos = self
            .fields
            .iter()
            .position(|f| f.kind == FieldKind::DataSource)
            .unwrap_or(self.fields.len() - 1);
        FieldId(pos)
    }

    /// User-supplied quantitative columns.
    pub fn quantitative(&self) -> &[String] {
        &self.quantitative
    }

    pub(crate) fn with_quantitative(&self, columns: Vec<String>) -> Self {
        Self {
            quantitative: columns,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gene_id_accepts_integral_floats() {
        assert_eq!(GeneId::parse("3064"), Some(GeneId(3064)));
        assert_eq!(GeneId::parse(" 3064.0 "), Some(GeneId(3064)));
        assert_eq!(GeneId::parse("3064.5"), None);
        assert_eq!(GeneId::parse("HTT"), None);
        assert_eq!(GeneId::parse(""), None);
    }

    #[test]
    fn schema_appends_data_source_field() {
        let schema = NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
            FieldSpec::annotation("tissue"),
        ])
        .expect("schema");
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(schema.data_source()).name, "data_source");
        assert_eq!(schema.field_id("Data source"), Some(schema.data_source()));
    }

    #[test]
    fn schema_rejects_duplicate_fields() {
        let err = NodeSchema::new("geneID", "geneSymbol", "studyID", vec![
            FieldSpec::annotation("tissue"),
            FieldSpec::annotation("Tissue"),
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("Tissue".into()));
    }
}
