//! One-line summary of the current view.

use std::fmt;

use serde::Serialize;

use crate::query::QueryHits;

/// Counts behind the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    /// Visible nodes.
    pub shown: usize,
    /// Selected nodes.
    pub selected: usize,
    /// Query hits, when a query is active.
    pub query: Option<QueryHits>,
    /// Visible nodes without a visible edge.
    pub unconnected: usize,
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} nodes shown", self.shown, self.selected)?;
        if let Some(hits) = self.query {
            write!(f, ", {} of {} queried nodes found", hits.found, hits.requested)?;
        }
        if self.unconnected > 0 {
            write!(f, ", {} unconnected", self.unconnected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_optional_parts() {
        let mut status = StatusSummary {
            shown: 50,
            selected: 812,
            query: None,
            unconnected: 0,
        };
        assert_eq!(status.to_string(), "50 of 812 nodes shown");

        status.query = Some(QueryHits {
            found: 3,
            requested: 4,
        });
        status.unconnected = 2;
        assert_eq!(
            status.to_string(),
            "50 of 812 nodes shown, 3 of 4 queried nodes found, 2 unconnected"
        );
    }
}
