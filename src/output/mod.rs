//! # Output Module
//!
//! Serializes an [`OutputTable`] to a single-sheet workbook and derives output file names.
pub mod record;

use crate::error::ResultMessage;
use crate::error::RustyExtractError;
use crate::output::record::FieldValue;
use crate::output::record::OutputTable;
use crate::sink::LogSink;
use crate::spreadsheet::cell::datetime_to_serial;
use crate::spreadsheet::cell::time_to_serial;
use crate::spreadsheet::cell::ScalarValue;
use chrono::Timelike;
use rust_xlsxwriter::Format;
use rust_xlsxwriter::Workbook;
use rust_xlsxwriter::Worksheet;
use crate::output::record::SHEET_FIELD;
use crate::output::record::SOURCE_FILE_FIELD;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// File name used when the caller does not choose one
pub const DEFAULT_OUTPUT_NAME: &str = "提取结果.xlsx";
const OUTPUT_EXTENSION: &str = "xlsx";
const OUTPUT_SHEET_NAME: &str = "Sheet1";
/// Longest string a worksheet cell accepts, in characters
pub const MAX_CELL_TEXT: usize = 32_767;

struct CellFormats {
    date: Format,
    datetime: Format,
    time: Format,
}

/// Writes the table to `path`: a bold header row with the table columns, then one row per
/// record. Missing directories are created. Text longer than [`MAX_CELL_TEXT`] is cut to
/// fit, with a warning naming the record and field.
pub fn write_table(table: &OutputTable, path: &Path, sink: &mut dyn LogSink) -> Result<(), RustyExtractError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(RustyExtractError::from)
            .with_prefix(&format!("Create output directory '{}'", parent.display()))?;
    }

    let header = Format::new().set_bold();
    let formats = CellFormats {
        date: Format::new().set_num_format("yyyy-mm-dd"),
        datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        time: Format::new().set_num_format("hh:mm:ss"),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet().set_name(OUTPUT_SHEET_NAME)?;
    let columns = table.columns();
    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (index, record) in table.records().iter().enumerate() {
        let row = (index + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            // absent and missing fields leave the cell blank
            let Some(value) = record.get(name).filter(|value| !value.is_missing()) else {
                continue;
            };
            if write_field(worksheet, row, col as u16, value, &formats)? {
                let label = |field: &str| record.get(field).map(|it| it.to_string()).unwrap_or_default();
                sink.warn(&format!(
                    "Field '{}' of '{}'!'{}' exceeds {} characters and was truncated",
                    name, label(SOURCE_FILE_FIELD), label(SHEET_FIELD), MAX_CELL_TEXT
                ));
            }
        }
    }

    workbook
        .save(path)
        .map_err(RustyExtractError::from)
        .with_prefix(&format!("Save '{}'", path.display()))?;
    log::debug!("wrote {} records to '{}'", table.len(), path.display());
    Ok(())
}

/// Writes one value; returns whether its text had to be cut to [`MAX_CELL_TEXT`] characters.
fn write_field(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &FieldValue,
    formats: &CellFormats,
) -> Result<bool, RustyExtractError> {
    match value {
        FieldValue::Scalar(ScalarValue::Bool(value)) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        FieldValue::Scalar(ScalarValue::Number(value)) => {
            worksheet.write_number(row, col, *value)?;
        }
        FieldValue::Scalar(ScalarValue::Text(value)) => {
            return write_text(worksheet, row, col, value);
        }
        FieldValue::Scalar(ScalarValue::DateTime(value)) => {
            let format = if value.time().num_seconds_from_midnight() == 0 && value.time().nanosecond() == 0 {
                &formats.date
            } else {
                &formats.datetime
            };
            worksheet.write_number_with_format(row, col, datetime_to_serial(value), format)?;
        }
        FieldValue::Scalar(ScalarValue::Time(value)) => {
            worksheet.write_number_with_format(row, col, time_to_serial(value), &formats.time)?;
        }
        FieldValue::Sequence(_) => {
            return write_text(worksheet, row, col, &value.to_string());
        }
        FieldValue::Missing | FieldValue::Scalar(ScalarValue::Empty) | FieldValue::Scalar(ScalarValue::Missing) => (),
    }
    Ok(false)
}

fn write_text(worksheet: &mut Worksheet, row: u32, col: u16, text: &str) -> Result<bool, RustyExtractError> {
    match text.char_indices().nth(MAX_CELL_TEXT) {
        Some((end, _)) => {
            worksheet.write_string(row, col, &text[..end])?;
            Ok(true)
        }
        None => {
            worksheet.write_string(row, col, text)?;
            Ok(false)
        }
    }
}

/// Ensures the output name carries the `.xlsx` extension; an empty name falls back to
/// [`DEFAULT_OUTPUT_NAME`].
pub fn normalize_output_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return DEFAULT_OUTPUT_NAME.to_owned();
    }
    let has_extension = Path::new(name)
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case(OUTPUT_EXTENSION))
        .unwrap_or(false);
    if has_extension {
        name.to_owned()
    } else {
        format!("{name}.{OUTPUT_EXTENSION}")
    }
}

/// Path of the merged output: `output_dir/output_name`.
pub fn merge_output_path(output_dir: &Path, output_name: &str) -> PathBuf {
    output_dir.join(normalize_output_name(output_name))
}

/// Path of one input's output in per-file mode: `output_dir/{base}_{input stem}{ext}`.
pub fn per_file_output_path(output_dir: &Path, output_name: &str, input: &Path) -> PathBuf {
    let name = normalize_output_name(output_name);
    let name = Path::new(&name);
    let base = name.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
    let extension = name.extension().map(|extension| extension.to_string_lossy()).unwrap_or_default();
    let input_stem = input.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
    output_dir.join(format!("{base}_{input_stem}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::record::OutputRecord;
    use crate::sink::MemorySink;
    use crate::spreadsheet::open_spreadsheet;
    use crate::spreadsheet::WorkbookSource;
    use chrono::NaiveDate;
    use chrono::NaiveTime;

    #[test]
    fn output_names() {
        assert_eq!(normalize_output_name(""), DEFAULT_OUTPUT_NAME);
        assert_eq!(normalize_output_name("summary"), "summary.xlsx");
        assert_eq!(normalize_output_name("summary.XLSX"), "summary.XLSX");
        assert_eq!(normalize_output_name("v1.2"), "v1.2.xlsx");

        let dir = Path::new("out");
        assert_eq!(merge_output_path(dir, "summary"), dir.join("summary.xlsx"));
        assert_eq!(
            per_file_output_path(dir, DEFAULT_OUTPUT_NAME, Path::new("/data/run 1.xlsx")),
            dir.join("提取结果_run 1.xlsx")
        );
        assert_eq!(
            per_file_output_path(dir, "report", Path::new("b.ods")),
            dir.join("report_b.xlsx")
        );
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.xlsx");

        let mut table = OutputTable::new(["名称", "峰", "时间", "日期", "缺失", "未用"]);
        let mut record = OutputRecord::new("报告", "a.xlsx");
        record.set("名称", FieldValue::Scalar(ScalarValue::Text("样品A".to_owned())));
        record.set(
            "峰",
            FieldValue::Sequence(vec![ScalarValue::Number(1.5), ScalarValue::Empty, ScalarValue::Missing]),
        );
        record.set("时间", FieldValue::Scalar(ScalarValue::Time(NaiveTime::from_hms_opt(6, 0, 0).unwrap())));
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
        record.set("日期", FieldValue::Scalar(ScalarValue::DateTime(date)));
        record.set("缺失", FieldValue::Missing);
        table.push(record);
        let mut record = OutputRecord::new("报告2", "b.xlsx");
        record.set("名称", FieldValue::Scalar(ScalarValue::Bool(true)));
        table.push(record);

        let mut sink = MemorySink::new();
        write_table(&table, &path, &mut sink).unwrap();
        assert!(sink.lines().is_empty());

        let mut spreadsheet = open_spreadsheet(&WorkbookSource::from(path.as_path())).unwrap();
        assert_eq!(spreadsheet.sheet_names(), vec!["Sheet1".to_owned()]);
        let sheet = spreadsheet.read_sheet("Sheet1").unwrap();
        let text = |value: &str| Some(ScalarValue::Text(value.to_owned()));

        // "未用" is held by no record and gets no column
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_count(), 7);
        assert_eq!(sheet.get(0, 0).cloned(), text("sheet"));
        assert_eq!(sheet.get(0, 1).cloned(), text("source_file"));
        assert_eq!(sheet.get(0, 6).cloned(), text("缺失"));
        assert_eq!(sheet.get(1, 0).cloned(), text("报告"));
        assert_eq!(sheet.get(1, 2).cloned(), text("样品A"));
        assert_eq!(sheet.get(1, 3).cloned(), text("[1.5, , ]"));
        assert_eq!(
            sheet.get(1, 4).cloned(),
            Some(ScalarValue::Time(NaiveTime::from_hms_opt(6, 0, 0).unwrap()))
        );
        assert_eq!(sheet.get(1, 5).cloned(), Some(ScalarValue::DateTime(date)));
        assert_eq!(sheet.get(1, 6).cloned(), Some(ScalarValue::Empty));
        assert_eq!(sheet.get(2, 2).cloned(), Some(ScalarValue::Bool(true)));
        assert_eq!(sheet.get(2, 3).cloned(), Some(ScalarValue::Empty));
    }

    #[test]
    fn oversized_text_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.xlsx");

        let mut table = OutputTable::new(["峰", "备注", "名称"]);
        let mut record = OutputRecord::new("峰表", "long.xlsx");
        record.set("峰", FieldValue::Sequence(vec![ScalarValue::Number(1234.5678); 13_200]));
        record.set("备注", FieldValue::Scalar(ScalarValue::Text("字".repeat(MAX_CELL_TEXT + 1))));
        record.set("名称", FieldValue::Scalar(ScalarValue::Text("样品".to_owned())));
        table.push(record);

        let mut sink = MemorySink::new();
        write_table(&table, &path, &mut sink).unwrap();

        let warnings = sink.messages(log::Level::Warn);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'峰'"));
        assert!(warnings[1].contains("'备注'"));

        let mut spreadsheet = open_spreadsheet(&WorkbookSource::from(path.as_path())).unwrap();
        let sheet = spreadsheet.read_sheet("Sheet1").unwrap();
        let length = |col: usize| match sheet.get(1, col) {
            Some(ScalarValue::Text(value)) => value.chars().count(),
            other => panic!("unexpected cell {:?}", other),
        };
        assert_eq!(length(2), MAX_CELL_TEXT);
        assert_eq!(length(3), MAX_CELL_TEXT);
        assert_eq!(sheet.get(1, 4).cloned(), Some(ScalarValue::Text("样品".to_owned())));
    }
}
