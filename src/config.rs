//! TOML dataset configuration.
//!
//! Every section is optional; a missing file yields [`DatasetConfig::default`],
//! which describes the HINT interactome layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrichment::{
    EnrichmentStore, ViewOptions, DEFAULT_ANNOTATION_SETS, DEFAULT_IGNORED_TERMS,
    DEFAULT_ORGANISM,
};
use crate::error::SchemaError;
use crate::io::EdgeColumns;
use crate::model::{FieldSpec, NodeSchema};
use crate::pipeline::SessionOptions;

/// Categorical filters of the default layout, as (column, display alias).
const DEFAULT_FIELDS: [(&str, &str); 7] = [
    ("model_species", "Model (species)"),
    ("common_name", "Mouse model ID"),
    ("cell_culture_comment", "Cell culture subtype"),
    ("tissue", "Tissue"),
    ("htt_length", "HTT length"),
    ("detection_method_annot", "Method"),
    ("study_id", "Study (first author, year, journal)"),
];

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this layout.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Parser diagnostic.
        source: toml::de::Error,
    },
    /// Rendering the config back to TOML failed.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Serializer diagnostic.
        source: toml::ser::Error,
    },
    /// The `fields` section does not form a valid schema.
    #[error("invalid field layout: {0}")]
    Invalid(#[from] SchemaError),
}

/// Node table column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeColumns {
    /// Numeric gene identifier.
    pub gene_id: String,
    /// Display symbol.
    pub gene_symbol: String,
    /// Study identifier of the observation.
    pub study: String,
}

impl Default for NodeColumns {
    fn default() -> Self {
        Self {
            gene_id: "geneID".to_string(),
            gene_symbol: "geneSymbol".to_string(),
            study: "studyID".to_string(),
        }
    }
}

/// One categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Column name in the node table.
    pub name: String,
    /// Display name; filters may address the field by either name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Marks the provenance field; at most one may be set.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub data_source: bool,
}

impl FieldConfig {
    fn spec(&self) -> FieldSpec {
        let spec = if self.data_source {
            FieldSpec::data_source(&self.name)
        } else {
            FieldSpec::annotation(&self.name)
        };
        match &self.alias {
            Some(alias) => spec.with_alias(alias),
            None => spec,
        }
    }
}

fn default_fields() -> Vec<FieldConfig> {
    DEFAULT_FIELDS
        .iter()
        .map(|(name, alias)| FieldConfig {
            name: name.to_string(),
            alias: Some(alias.to_string()),
            data_source: false,
        })
        .chain(std::iter::once(FieldConfig {
            name: "data_source".to_string(),
            alias: Some("Data source".to_string()),
            data_source: true,
        }))
        .collect()
}

/// Edge table column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSection {
    /// First endpoint gene ID.
    pub source: String,
    /// Second endpoint gene ID.
    pub target: String,
    /// Confidence score in [0, 1].
    pub score: String,
    /// Optional free-text provenance column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl Default for EdgeSection {
    fn default() -> Self {
        let columns = EdgeColumns::default();
        Self {
            source: columns.source,
            target: columns.target,
            score: columns.score,
            provenance: columns.provenance,
        }
    }
}

/// Enrichment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// NCBI taxonomy ID of the organism.
    pub organism: u32,
    /// Label to data-set id.
    pub annotation_sets: BTreeMap<String, String>,
    /// Terms dropped from every result.
    pub ignored_terms: Vec<String>,
    /// Sorting and truncation of displayed results.
    pub display: ViewOptions,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            organism: DEFAULT_ORGANISM,
            annotation_sets: DEFAULT_ANNOTATION_SETS
                .iter()
                .map(|(label, id)| (label.to_string(), id.to_string()))
                .collect(),
            ignored_terms: DEFAULT_IGNORED_TERMS.iter().map(|s| s.to_string()).collect(),
            display: ViewOptions::default(),
        }
    }
}

/// Input files. Relative paths resolve against the config file's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Node table CSV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<PathBuf>,
    /// Edge table CSV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<PathBuf>,
    /// Gene-level omics table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omics: Option<PathBuf>,
    /// Cached enrichment results in JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_cache: Option<PathBuf>,
}

impl DataPaths {
    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.nodes,
            &mut self.edges,
            &mut self.omics,
            &mut self.enrichment_cache,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Complete dataset configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Input files.
    pub data: DataPaths,
    /// Fixed node columns.
    pub nodes: NodeColumns,
    /// Categorical filter fields, in display order.
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldConfig>,
    /// Edge columns.
    pub edges: EdgeSection,
    /// Initial session inputs.
    pub view: SessionOptions,
    /// Enrichment settings.
    pub enrichment: EnrichmentConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            nodes: NodeColumns::default(),
            fields: default_fields(),
            edges: EdgeSection::default(),
            view: SessionOptions::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl DatasetConfig {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: DatasetConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(base) = path.parent() {
            config.data.resolve(base);
        }
        Ok(config)
    }

    /// Loads `explicit`, else the default location if it exists, else defaults.
    pub fn load_or_default(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(&path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Pretty TOML rendering.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })
    }

    /// Node schema described by the `nodes` and `fields` sections.
    pub fn schema(&self) -> Result<NodeSchema, ConfigError> {
        Ok(NodeSchema::new(
            &self.nodes.gene_id,
            &self.nodes.gene_symbol,
            &self.nodes.study,
            self.fields.iter().map(FieldConfig::spec).collect(),
        )?)
    }

    /// Initial session inputs.
    pub fn session_options(&self) -> SessionOptions {
        self.view
    }

    /// Edge column names.
    pub fn edge_columns(&self) -> EdgeColumns {
        EdgeColumns {
            source: self.edges.source.clone(),
            target: self.edges.target.clone(),
            score: self.edges.score.clone(),
            provenance: self.edges.provenance.clone(),
        }
    }

    /// Empty enrichment store with the configured sets.
    pub fn enrichment_store(&self) -> EnrichmentStore {
        EnrichmentStore::new(
            self.enrichment.annotation_sets.clone(),
            self.enrichment.ignored_terms.clone(),
        )
        .with_organism(self.enrichment.organism)
    }
}

/// `<config dir>/interactome/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("interactome").join("config.toml"))
}
