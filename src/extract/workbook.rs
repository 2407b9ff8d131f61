use crate::error::RustyExtractError;
use crate::extract::spec::ExtractionSpec;
use crate::extract::worksheet::extract_worksheet;
use crate::output::record::OutputRecord;
use crate::sink::LogSink;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::WorkbookSource;

/// Extracts one record per worksheet, in workbook order.
///
/// Worksheets that cannot be read are logged and skipped. Failing to open the workbook itself
/// is returned as [`SpreadsheetError::WorkbookOpenFailure`].
pub fn extract_workbook(
    source: &WorkbookSource,
    specs: &[ExtractionSpec],
    sink: &mut dyn LogSink,
) -> Result<Vec<OutputRecord>, RustyExtractError> {
    let file_name = source.file_name();
    let mut spreadsheet = open_spreadsheet(source).map_err(|error| SpreadsheetError::WorkbookOpenFailure {
        file: file_name.to_owned(),
        message: error.to_string(),
    })?;

    let mut records = Vec::new();
    for sheet_name in spreadsheet.sheet_names() {
        let sheet = match spreadsheet.read_sheet(&sheet_name) {
            Ok(sheet) => sheet,
            Err(error) => {
                let failure = SpreadsheetError::SheetReadFailure {
                    file: file_name.to_owned(),
                    sheet: sheet_name.to_owned(),
                    message: error.to_string(),
                };
                sink.warn(&failure.to_string());
                continue;
            }
        };
        records.push(extract_worksheet(&sheet, &sheet_name, &file_name, specs, sink));
        sink.info(&format!("Extracted sheet '{}' of '{}'", sheet_name, file_name));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::spec::parse_specs;
    use crate::output::record::FieldValue;
    use crate::sink::MemorySink;
    use crate::spreadsheet::cell::ScalarValue;
    use log::Level;
    use rust_xlsxwriter::Workbook;
    use std::path::Path;

    fn text(value: &str) -> FieldValue {
        FieldValue::Scalar(ScalarValue::Text(value.to_owned()))
    }

    fn write_report(path: &Path, sheets: &[&str]) {
        let mut workbook = Workbook::new();
        for (index, name) in sheets.iter().enumerate() {
            let worksheet = workbook.add_worksheet().set_name(*name).unwrap();
            worksheet.write_string(3, 5, format!("样品{}", index + 1)).unwrap();
            worksheet.write_number(14, 6, 100.0 * (index + 1) as f64).unwrap();
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn extract_every_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run1.xlsx");
        write_report(&path, &["一", "二", "三"]);

        let specs = parse_specs(["F4-样品名称", "G15-峰面积", "Z99-远处"]);
        let mut sink = MemorySink::new();
        let records = extract_workbook(&WorkbookSource::from(path.as_path()), &specs, &mut sink).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("sheet"), Some(&text("一")));
        assert_eq!(records[2].get("sheet"), Some(&text("三")));
        assert_eq!(records[1].get("source_file"), Some(&text("run1.xlsx")));
        assert_eq!(records[1].get("样品名称"), Some(&text("样品2")));
        assert_eq!(records[2].get("峰面积"), Some(&FieldValue::Scalar(ScalarValue::Number(300.0))));
        assert_eq!(records[0].get("远处"), Some(&FieldValue::Missing));

        assert_eq!(sink.messages(Level::Info).len(), 3);
        assert_eq!(sink.messages(Level::Warn).len(), 3);
    }

    #[test]
    fn extract_from_bytes() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "hello").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();
        let source = WorkbookSource::Bytes { name: "upload.xlsx".to_owned(), bytes };

        let mut sink = MemorySink::new();
        let records = extract_workbook(&source, &parse_specs(["A1-问候"]), &mut sink).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("source_file"), Some(&text("upload.xlsx")));
        assert_eq!(records[0].get("问候"), Some(&text("hello")));
    }

    #[test]
    fn open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("corrupt.xlsx");
        std::fs::write(&corrupt, b"definitely not a zip").unwrap();

        let mut sink = MemorySink::new();
        for path in [corrupt, dir.path().join("absent.xlsx"), dir.path().join("notes.txt")] {
            let result = extract_workbook(&WorkbookSource::from(path), &[], &mut sink);
            assert!(matches!(
                result,
                Err(RustyExtractError::SpreadsheetError(SpreadsheetError::WorkbookOpenFailure { .. }))
            ));
        }
    }
}
