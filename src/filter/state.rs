use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{FieldId, NodeSchema};

/// How the selected values of one field are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    /// Every selected value must be covered.
    And,
    /// At least one selected value must be covered.
    #[default]
    Or,
    /// Genes carrying any selected value are excluded.
    ///
    /// Matching uses the per-field inverted index over every row, so
    /// `"Not reported"` is a valid NOT value even though the one-hot
    /// encoding leaves it out.
    Not,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Not => "NOT",
        })
    }
}

impl FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            "NOT" => Ok(Combinator::Not),
            other => Err(format!("unknown combinator '{other}' (expected AND, OR or NOT)")),
        }
    }
}

/// Selection on one categorical field. Inactive while `values` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Selected raw values.
    pub values: BTreeSet<String>,
    /// Combinator applied to `values`.
    pub combinator: Combinator,
}

impl FieldFilter {
    /// Filter selecting `values` under `combinator`.
    pub fn new<I, S>(values: I, combinator: Combinator) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            combinator,
        }
    }

    /// Whether any value is selected.
    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }
}

/// Filter selection for every field of a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    fields: Vec<FieldFilter>,
}

impl FilterState {
    /// Inactive state sized to `schema`.
    pub fn new(schema: &NodeSchema) -> Self {
        Self {
            fields: vec![FieldFilter::default(); schema.fields().len()],
        }
    }

    /// Filter of `field`.
    pub fn get(&self, field: FieldId) -> &FieldFilter {
        &self.fields[field.index()]
    }

    /// Replaces the filter of `field`; returns whether anything changed.
    pub fn set(&mut self, field: FieldId, filter: FieldFilter) -> bool {
        let slot = &mut self.fields[field.index()];
        if *slot == filter {
            return false;
        }
        *slot = filter;
        true
    }

    /// Whether any field is active.
    pub fn is_active(&self) -> bool {
        self.fields.iter().any(FieldFilter::is_active)
    }

    /// Active fields in schema order.
    pub fn active(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, filter)| filter.is_active())
            .map(|(pos, _)| FieldId(pos))
    }

    /// Resets every field; returns whether anything changed.
    pub fn clear(&mut self) -> bool {
        let changed = self.fields.iter().any(|f| *f != FieldFilter::default());
        self.fields.fill(FieldFilter::default());
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinator_parses_case_insensitively() {
        assert_eq!("and".parse::<Combinator>(), Ok(Combinator::And));
        assert_eq!(" Not ".parse::<Combinator>(), Ok(Combinator::Not));
        assert!("XOR".parse::<Combinator>().is_err());
        assert_eq!(Combinator::default().to_string(), "OR");
    }

    #[test]
    fn set_reports_changes() {
        let mut state = FilterState {
            fields: vec![FieldFilter::default(); 2],
        };
        let brain = FieldFilter::new(["brain"], Combinator::Or);

        assert!(state.set(FieldId(1), brain.clone()));
        assert!(!state.set(FieldId(1), brain));
        assert_eq!(state.active().collect::<Vec<_>>(), vec![FieldId(1)]);
        assert!(state.clear());
        assert!(!state.clear());
        assert!(!state.is_active());
    }
}
