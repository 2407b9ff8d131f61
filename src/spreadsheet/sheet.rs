use crate::spreadsheet::cell::ScalarValue;
use std::collections::HashMap;

static EMPTY: ScalarValue = ScalarValue::Empty;

/// An immutable grid of decoded cell values for one worksheet.
///
/// Row 0 is the first row of the worksheet and column 0 is column A, whatever the first
/// populated cell is. `row_count` and `col_count` reach the last row and last column that
/// hold a value; positions inside those bounds without a value read as [`ScalarValue::Empty`].
#[derive(Clone, Debug, Default)]
pub struct WorksheetData {
    /// Non-empty values in insertion order
    values: Vec<ScalarValue>,
    /// Index mapping from (row, column) to value vector position
    indexes: HashMap<(usize, usize), usize>,
    row_count: usize,
    col_count: usize,
}

impl WorksheetData {
    /// Creates an empty worksheet (zero rows, zero columns).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a worksheet from rows of values; row `i` of the input is worksheet row `i + 1`.
    ///
    /// Rows may have different lengths. Trailing blanks do not widen the grid.
    pub fn from_rows<R>(rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<ScalarValue>>,
    {
        let mut sheet = Self::new();
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                sheet.push(row, col, value);
            }
        }
        sheet
    }

    /// Stores a value at a 0-based position, growing the bounds.
    /// Blank values are not stored; a later value at the same position replaces the earlier one.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: ScalarValue) {
        if value.is_blank() {
            return;
        }
        self.row_count = self.row_count.max(row + 1);
        self.col_count = self.col_count.max(col + 1);
        match self.indexes.get(&(row, col)) {
            Some(index) => self.values[*index] = value,
            None => {
                self.indexes.insert((row, col), self.values.len());
                self.values.push(value);
            }
        }
    }

    /// Number of rows, up to the last row holding a value
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns, up to the last column holding a value in any row
    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Returns true if the sheet contains no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the value at a 0-based position.
    ///
    /// Returns `None` outside the worksheet bounds and `Some(&ScalarValue::Empty)` for a
    /// blank position inside them.
    pub fn get(&self, row: usize, col: usize) -> Option<&ScalarValue> {
        if row < self.row_count && col < self.col_count {
            let value = self
                .indexes
                .get(&(row, col))
                .and_then(|index| self.values.get(*index))
                .unwrap_or(&EMPTY);
            Some(value)
        } else {
            None
        }
    }
}
