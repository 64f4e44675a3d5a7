//! Explicit recomputation graph and per-user session state.
//!
//! Stages run in a fixed topological order:
//!
//! ```text
//! Annotations -> Filter -> Query -> Selection -> Edges -> Visible
//! ```
//!
//! An input change marks the stage that reads it dirty. One pass walks the
//! stages reachable from the dirty ones and recomputes a stage when it is
//! dirty itself or when an upstream stage produced a different output in the
//! same pass, so each affected stage runs exactly once per change.

mod graph;
mod session;

pub use graph::{Input, RecomputeGraph, Stage, StageSet};
pub use session::{
    Change, PassReport, Session, SessionOptions, StageObserver, UploadReport,
};
