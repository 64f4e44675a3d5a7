//! Typed node and edge tables.
//!
//! Node rows are PPI observations: a gene appears once per study/annotation
//! combination it was reported in. Edges are scored gene-gene interactions.

mod edges;
mod nodes;
mod schema;

pub use edges::{Edge, EdgeTable};
pub use nodes::{NodeRow, NodeTable, RowId};
pub use schema::{
    FieldId, FieldKind, FieldSpec, GeneId, NodeSchema, BASE_SOURCE_TAG, NOT_REPORTED,
    USER_SOURCE_PREFIX,
};
