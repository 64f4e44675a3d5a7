use rustc_hash::FxHashMap;

use crate::model::FieldId;

use super::ValueId;

const WORD_BITS: usize = u64::BITS as usize;

/// Column of the one-hot matrix: one (field, value) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OneHotColumn {
    /// Categorical field.
    pub field: FieldId,
    /// Value within the field.
    pub value: ValueId,
}

/// Per-gene membership bits over every observed (field, value) pair.
///
/// Rows follow gene order in [`super::AnnotationIndex::genes`]; columns are
/// grouped by field in schema order and sorted by value inside a field.
/// `"Not reported"` never gets a column.
#[derive(Debug, Clone, Default)]
pub struct OneHotMatrix {
    columns: Vec<OneHotColumn>,
    column_index: FxHashMap<OneHotColumn, usize>,
    words_per_row: usize,
    bits: Vec<u64>,
    rows: usize,
}

impl OneHotMatrix {
    pub(crate) fn new(columns: Vec<OneHotColumn>, rows: usize) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(pos, column)| (*column, pos))
            .collect();
        let words_per_row = columns.len().div_ceil(WORD_BITS);
        Self {
            columns,
            column_index,
            words_per_row,
            bits: vec![0; words_per_row * rows],
            rows,
        }
    }

    pub(crate) fn set(&mut self, row: usize, column: usize) {
        let word = row * self.words_per_row + column / WORD_BITS;
        self.bits[word] |= 1 << (column % WORD_BITS);
    }

    /// Columns in matrix order.
    pub fn columns(&self) -> &[OneHotColumn] {
        &self.columns
    }

    /// Number of gene rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Position of a (field, value) column, if it was observed.
    pub fn column_index(&self, field: FieldId, value: ValueId) -> Option<usize> {
        self.column_index
            .get(&OneHotColumn { field, value })
            .copied()
    }

    /// Whether gene row `row` carries column `column`.
    pub fn get(&self, row: usize, column: usize) -> bool {
        if row >= self.rows || column >= self.columns.len() {
            return false;
        }
        let word = self.bits[row * self.words_per_row + column / WORD_BITS];
        word & (1 << (column % WORD_BITS)) != 0
    }

    /// Set columns of gene row `row`, ascending.
    pub fn row(&self, row: usize) -> impl Iterator<Item = OneHotColumn> + '_ {
        let words = if row < self.rows {
            &self.bits[row * self.words_per_row..(row + 1) * self.words_per_row]
        } else {
            &[][..]
        };
        words.iter().enumerate().flat_map(move |(w, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| self.columns[w * WORD_BITS + bit])
        })
    }
}
