//! A1-style cell references: column letters, row numbers and their 0-based indexes.

use regex::Regex;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Number of columns in a worksheet (A through XFD)
pub const MAX_COLUMNS: usize = 16_384;
/// Number of rows in a worksheet
pub const MAX_ROWS: usize = 1_048_576;

static COORDINATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("Hardcode regex pattern"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),
}

/// A single cell position with 1-based column and row numbers, as written by users ("F4").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Column number, A = 1
    pub column: usize,
    /// Row number, first row = 1
    pub row: usize,
}

impl Coordinate {
    /// Parses a token made of a letter run followed by a digit run.
    ///
    /// Surrounding whitespace is ignored and letters are case-insensitive. Row 0, a missing
    /// letter or digit part, or a column past `XFD` are rejected.
    pub fn parse(token: &str) -> Result<Self, CoordinateError> {
        let invalid = || CoordinateError::InvalidCoordinate(token.to_owned());
        let captures = COORDINATE.captures(token.trim()).ok_or_else(invalid)?;
        let column = captures
            .get(1)
            .and_then(|matcher| column_to_number(matcher.as_str()))
            .ok_or_else(invalid)?;
        let row = captures
            .get(2)
            .and_then(|matcher| matcher.as_str().parse::<usize>().ok())
            .filter(|row| *row > 0)
            .ok_or_else(invalid)?;
        Ok(Coordinate { column, row })
    }

    /// 0-based `(row, column)` position for indexing worksheet grids
    pub fn to_index(&self) -> (usize, usize) {
        (self.row - 1, self.column - 1)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coordinate::parse(s)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letters = number_to_column(self.column).unwrap_or_default();
        write!(f, "{}{}", letters, self.row)
    }
}

/// Converts column letters to a 1-based column number: A = 1, Z = 26, AA = 27.
/// Returns `None` for an empty string, non-letters, or a column past `XFD`.
pub fn column_to_number(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |number, letter| {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        let digit = (letter.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        Some(number * 26 + digit).filter(|number| *number <= MAX_COLUMNS)
    })
}

/// Converts a 1-based column number back to its letters. Inverse of [`column_to_number`].
pub fn number_to_column(number: usize) -> Option<String> {
    if number == 0 || number > MAX_COLUMNS {
        return None;
    }
    let mut column = number;
    let mut letters = String::new();
    while column > 0 {
        column -= 1;
        let digit = char::from(b'A' + (column % 26) as u8);
        column /= 26;
        letters.insert(0, digit);
    }
    Some(letters)
}

/// Converts a worksheet `r` attribute ("C7") to a 0-based `(row, column)` pair.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    Coordinate::parse(reference).ok().map(|coordinate| coordinate.to_index())
}

/// Converts a 0-based `(row, column)` pair to its A1 reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    Coordinate {
        column: col + 1,
        row: row + 1,
    }
    .to_string()
}
