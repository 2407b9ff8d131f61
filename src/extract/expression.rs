use crate::spreadsheet::reference::Coordinate;
use crate::spreadsheet::reference::CoordinateError;
use std::fmt::Display;

/// A single cell ("F4") or a rectangular range ("A15:K15").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoordinateExpression {
    Cell(Coordinate),
    /// Always normalized so that `start` is the top-left and `end` the bottom-right corner
    Range(Coordinate, Coordinate),
}

impl CoordinateExpression {
    /// Parses a cell or range expression.
    ///
    /// Both corners of a range may be given in any order: `C3:A1` is the same range as `A1:C3`.
    /// More than one `:` or an invalid corner fails with [`CoordinateError::InvalidCoordinate`].
    pub fn parse(expression: &str) -> Result<Self, CoordinateError> {
        let parts = expression.trim().split(':').collect::<Vec<_>>();
        match parts.as_slice() {
            [cell] => Ok(CoordinateExpression::Cell(Coordinate::parse(cell)?)),
            [start, end] => {
                let start = Coordinate::parse(start)?;
                let end = Coordinate::parse(end)?;
                Ok(CoordinateExpression::Range(
                    Coordinate { column: start.column.min(end.column), row: start.row.min(end.row) },
                    Coordinate { column: start.column.max(end.column), row: start.row.max(end.row) },
                ))
            }
            _ => Err(CoordinateError::InvalidCoordinate(expression.to_owned())),
        }
    }
}

impl TryFrom<&str> for CoordinateExpression {
    type Error = CoordinateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        CoordinateExpression::parse(value)
    }
}

impl Display for CoordinateExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateExpression::Cell(cell) => write!(f, "{}", cell),
            CoordinateExpression::Range(start, end) => write!(f, "{}:{}", start, end),
        }
    }
}
