//! Reactive filtering and subgraph extraction over a protein-protein
//! interaction network.
//!
//! A [`Dataset`] pairs a node table (one row per PPI observation of a gene,
//! carrying categorical annotations) with a scored edge table. A [`Session`]
//! holds one user's inputs and recomputes the derived views through an
//! explicit stage graph whenever an input changes:
//!
//! ```text
//! nodes -> annotation index -> filtered rows -> queried rows
//!       -> selected nodes -> selected edges -> visible subgraph
//! ```
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use interactome::config::DatasetConfig;
//! use interactome::filter::{Combinator, FieldFilter};
//! use interactome::{io, Dataset, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatasetConfig::default();
//! let nodes = io::read_nodes(Path::new("nodes.csv"), config.schema()?)?;
//! let edges = io::read_edges(Path::new("edges.csv"), &config.edge_columns())?;
//! let dataset = Arc::new(Dataset::new(nodes, edges)?);
//!
//! let mut session = Session::new(dataset, config.session_options());
//! session.set_filter("Tissue", FieldFilter::new(["striatum"], Combinator::Or))?;
//! println!("{}", session.status());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod edges;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod filter;
pub mod generator;
pub mod io;
pub mod logging;
pub mod merge;
pub mod model;
pub mod omics;
pub mod pipeline;
pub mod query;
pub mod selection;
pub mod status;
pub mod visible;

pub use annotation::AnnotationIndex;
pub use dataset::Dataset;
pub use error::{DataQualityWarning, PipelineError, Result, SchemaError, ValidationError};
pub use model::{Edge, EdgeTable, FieldSpec, GeneId, NodeRow, NodeSchema, NodeTable};
pub use pipeline::{Change, Session, SessionOptions};
pub use status::StatusSummary;
