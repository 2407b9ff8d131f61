use crate::error::RustyExtractError;
use crate::extract::expression::CoordinateExpression;
use crate::output::record::FieldValue;
use crate::sink::LogSink;
use crate::spreadsheet::cell::ScalarValue;
use crate::spreadsheet::reference::Coordinate;
use crate::spreadsheet::sheet::WorksheetData;

/// Resolves a coordinate expression against a worksheet.
///
/// * A cell inside the worksheet gives its value, `Empty` when blank.
/// * A cell outside it gives [`FieldValue::Missing`] and a warning.
/// * A range gives its values row by row. A range reaching past the last row gives an empty
///   sequence; one reaching past the last column is padded with `Missing` so that it always
///   holds `rows * columns` values. Both cases log a warning.
///
/// Only a malformed expression is an error.
pub fn resolve(
    sheet: &WorksheetData,
    expression: &str,
    sink: &mut dyn LogSink,
) -> Result<FieldValue, RustyExtractError> {
    let value = match CoordinateExpression::parse(expression)? {
        CoordinateExpression::Cell(cell) => resolve_cell(sheet, cell, sink),
        CoordinateExpression::Range(start, end) => FieldValue::Sequence(resolve_range(sheet, start, end, sink)),
    };
    Ok(value)
}

fn resolve_cell(sheet: &WorksheetData, cell: Coordinate, sink: &mut dyn LogSink) -> FieldValue {
    let (row, col) = cell.to_index();
    match sheet.get(row, col) {
        Some(value) => FieldValue::Scalar(value.to_owned()),
        None => {
            sink.warn(&format!(
                "Cell {} is outside the worksheet ({} rows, {} columns)",
                cell, sheet.row_count(), sheet.col_count()
            ));
            FieldValue::Missing
        }
    }
}

fn resolve_range(
    sheet: &WorksheetData,
    start: Coordinate,
    end: Coordinate,
    sink: &mut dyn LogSink,
) -> Vec<ScalarValue> {
    let (start_row, start_col) = start.to_index();
    let (end_row, end_col) = end.to_index();
    if end_row >= sheet.row_count() {
        sink.warn(&format!(
            "Range {}:{} exceeds the {} rows of the worksheet",
            start, end, sheet.row_count()
        ));
        return Vec::new();
    }

    let col_limit = (end_col + 1).min(sheet.col_count());
    let padding = (end_col + 1).saturating_sub(start_col.max(sheet.col_count()));
    if padding > 0 {
        sink.warn(&format!(
            "Range {}:{} exceeds the {} columns of the worksheet, {} column(s) filled as missing",
            start, end, sheet.col_count(), padding
        ));
    }

    let mut values = Vec::with_capacity((end_row - start_row + 1) * (end_col - start_col + 1));
    for row in start_row..=end_row {
        for col in start_col..col_limit {
            values.push(sheet.get(row, col).cloned().unwrap_or(ScalarValue::Missing));
        }
        values.extend(std::iter::repeat(ScalarValue::Missing).take(padding));
    }
    values
}
