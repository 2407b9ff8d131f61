use crate::error::RustyExtractError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::AttrLookup;
use crate::helpers::xml::TextAppend;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::MAX_COLUMNS;
use crate::spreadsheet::reference::MAX_ROWS;
use crate::spreadsheet::sheet::WorksheetData;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const CONTENT: &str = "content.xml";
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Cell hidden under a merged cell
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// Comments attached to a cell
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of spaces, `text:c` gives the count
const SPACES: QName = QName(b"text:s");
/// Most cells a table may fill through `number-rows-repeated`/`number-columns-repeated`
const MAX_REPEATED_CELLS: usize = 5_000_000;

#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,

    #[error("Table '{table}' repeats values into more than {limit} cells")]
    RepeatLimitExceeded { table: String, limit: usize },
}

/// An OpenDocument spreadsheet (.ods)
pub(crate) struct OdsSpreadsheet {
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Table names in document order
    sheets: Vec<String>,
}

impl OdsSpreadsheet {
    /// Opens the archive, validates it and collects the table names.
    pub(crate) fn open(name: &str, reader: UnifiedReader) -> Result<Self, RustyExtractError> {
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?;
        }
        let sheets = load_table_names(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.to_owned()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<WorksheetData, RustyExtractError> {
        if !self.sheets.iter().any(|name| name == sheet_name) {
            Err(SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?
        }
        let mut reader = self.zip
            .xml_reader(CONTENT)?
            .ok_or_else(|| SpreadsheetError::FileError(CONTENT.to_owned()))?;
        let mut sheet = WorksheetData::new();

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut repeated_cells = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // 上下文信息
        let mut table_context = false;
        let mut element_context = false; // 读取段落文本
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                table_context = event.attr("table:name")?
                    .map(|name| name == sheet_name)
                    .unwrap_or(false);
            }
            Event::End(event) if table_context && event.name() == TABLE => break,
            Event::Start(event) if table_context && event.name() == TABLE_ROW => {
                row_count = event.attr_as("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if table_context && event.name() == TABLE_ROW => {
                row = row.saturating_add(row_count);
            }
            Event::Start(event) if table_context && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                value.clear();
                col_count = event.attr_as::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                kind = match event.attr("office:value-type")?.as_deref() {
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") => {
                        let is_error = event.attr("calcext:value-type")?
                            .map(|cow| cow == "error")
                            .unwrap_or(false);
                        if is_error { CellType::Error } else { CellType::InlineString }
                    }
                    Some(_) => CellType::Number,
                    None => CellType::Empty,
                };
                match kind {
                    CellType::InlineString | CellType::Error => element_context = true,
                    CellType::Boolean => {
                        let truth = event.attr("office:boolean-value")?
                            .map(|cow| cow != "false" && cow != "0")
                            .unwrap_or(false);
                        value.push_str(if truth { "1" } else { "0" });
                    }
                    CellType::IsoDateTime => if let Some(data) = event.attr("office:date-value")? {
                        value.push_str(&data);
                    }
                    CellType::IsoDuration => if let Some(data) = event.attr("office:time-value")? {
                        value.push_str(&data);
                    }
                    CellType::Number => if let Some(data) = event.attr("office:value")? {
                        value.push_str(&data);
                    }
                    _ => (),
                }
            }
            Event::End(event) if table_context && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                if kind != CellType::Empty && !value.is_empty() {
                    // repeats never run past the last worksheet row or column
                    let rows = row_count.min(MAX_ROWS.saturating_sub(row));
                    let cols = col_count.min(MAX_COLUMNS.saturating_sub(col));
                    repeated_cells = repeated_cells.saturating_add(rows.saturating_mul(cols));
                    if repeated_cells > MAX_REPEATED_CELLS {
                        Err(OdsError::RepeatLimitExceeded {
                            table: sheet_name.to_owned(),
                            limit: MAX_REPEATED_CELLS,
                        })?
                    }
                    let cell = Cell { row, col, kind, value: std::mem::take(&mut value) };
                    let scalar = cell.to_scalar(&[])?;
                    for row_offset in 0..rows {
                        for col_offset in 0..cols {
                            sheet.push(row + row_offset, col + col_offset, scalar.to_owned());
                        }
                    }
                }
                col = col.saturating_add(col_count);
                element_context = false;
                comment_context = false;
            }
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == SPACES => {
                let count = event.attr_as("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    value.push(' ');
                }
            }
            Event::Text(event) if element_context && !comment_context => value.append_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.append_reference(&event)?,
        });
        log::debug!(
            "read '{}'!'{}': {} rows x {} columns",
            self.name, sheet_name, sheet.row_count(), sheet.col_count()
        );
        Ok(sheet)
    }
}

/// Rejects archives whose `mimetype` entry names another document type.
/// Archives without the entry are accepted.
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), RustyExtractError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// An encrypted entry in the manifest means the document needs a password.
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, RustyExtractError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}

fn load_table_names(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, RustyExtractError> {
    let mut reader = zip
        .xml_reader(CONTENT)?
        .ok_or_else(|| SpreadsheetError::FileError(CONTENT.to_owned()))?;
    let mut names = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            if let Some(name) = event.attr("table:name")? {
                names.push(name.to_string());
            }
        }
    });
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::ScalarValue;
    use chrono::NaiveDate;
    use chrono::NaiveTime;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0">
<office:body><office:spreadsheet>
<table:table table:name="第一页">
  <table:table-row>
    <table:table-cell office:value-type="string"><text:p>样品<text:s text:c="2"/>A</text:p><text:p>line 2</text:p></table:table-cell>
    <table:table-cell office:value-type="float" office:value="12.5"/>
    <table:table-cell table:number-columns-repeated="2"/>
    <table:table-cell office:value-type="boolean" office:boolean-value="true"/>
  </table:table-row>
  <table:table-row table:number-rows-repeated="2">
    <table:table-cell table:number-columns-repeated="3"/>
  </table:table-row>
  <table:table-row>
    <table:table-cell office:value-type="date" office:date-value="2024-01-05T10:30:00"/>
    <table:table-cell office:value-type="time" office:time-value="PT01H30M00S"/>
    <table:table-cell office:value-type="string"><office:annotation><text:p>note</text:p></office:annotation><text:p>x &amp; y</text:p></table:table-cell>
    <table:table-cell office:value-type="string" calcext:value-type="error"><text:p>#DIV/0!</text:p></table:table-cell>
  </table:table-row>
</table:table>
<table:table table:name="Second">
  <table:table-row table:number-rows-repeated="2">
    <table:table-cell office:value-type="float" office:value="7" table:number-columns-repeated="2"/>
  </table:table-row>
</table:table>
</office:spreadsheet></office:body></office:document-content>"#;

    fn document(mime: &str, manifest: Option<&str>, content: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("mimetype", SimpleFileOptions::default()).unwrap();
        writer.write_all(mime.as_bytes()).unwrap();
        if let Some(manifest) = manifest {
            writer.start_file("META-INF/manifest.xml", SimpleFileOptions::default()).unwrap();
            writer.write_all(manifest.as_bytes()).unwrap();
        }
        writer.start_file("content.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn open(bytes: Vec<u8>) -> Result<OdsSpreadsheet, RustyExtractError> {
        OdsSpreadsheet::open("test.ods", UnifiedReader::from_bytes(bytes))
    }

    #[test]
    fn read_tables() {
        let bytes = document("application/vnd.oasis.opendocument.spreadsheet", None, CONTENT_XML);
        let mut spreadsheet = open(bytes).unwrap();
        assert_eq!(spreadsheet.sheet_names(), vec!["第一页".to_owned(), "Second".to_owned()]);

        let sheet = spreadsheet.read_sheet("第一页").unwrap();
        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.col_count(), 5);
        assert_eq!(sheet.get(0, 0), Some(&ScalarValue::Text("样品  A\nline 2".to_owned())));
        assert_eq!(sheet.get(0, 1), Some(&ScalarValue::Number(12.5)));
        assert_eq!(sheet.get(0, 2), Some(&ScalarValue::Empty));
        assert_eq!(sheet.get(0, 4), Some(&ScalarValue::Bool(true)));
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(sheet.get(3, 0), Some(&ScalarValue::DateTime(date)));
        assert_eq!(sheet.get(3, 1), Some(&ScalarValue::Time(NaiveTime::from_hms_opt(1, 30, 0).unwrap())));
        assert_eq!(sheet.get(3, 2), Some(&ScalarValue::Text("x & y".to_owned())));
        assert_eq!(sheet.get(3, 3), Some(&ScalarValue::Text("#DIV/0!".to_owned())));

        let second = spreadsheet.read_sheet("Second").unwrap();
        assert_eq!(second.row_count(), 2);
        assert_eq!(second.col_count(), 2);
        assert_eq!(second.get(1, 1), Some(&ScalarValue::Number(7.0)));

        assert!(spreadsheet.read_sheet("Third").is_err());
    }

    #[test]
    fn wrong_mime_type() {
        let bytes = document("application/vnd.oasis.opendocument.text", None, CONTENT_XML);
        assert!(matches!(open(bytes), Err(RustyExtractError::OdsError(OdsError::MimeTypeError))));
    }

    #[test]
    fn encrypted_document() {
        let manifest = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
            <manifest:file-entry manifest:full-path="content.xml"><manifest:encryption-data/></manifest:file-entry>
        </manifest:manifest>"#;
        let bytes = document("application/vnd.oasis.opendocument.spreadsheet", Some(manifest), CONTENT_XML);
        assert!(matches!(
            open(bytes),
            Err(RustyExtractError::SpreadsheetError(SpreadsheetError::SpreadsheetPasswordProtectedError(_)))
        ));
    }

    fn single_table(rows: &str) -> Vec<u8> {
        let content = format!(
            r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
<office:body><office:spreadsheet><table:table table:name="大表">{rows}</table:table></office:spreadsheet></office:body></office:document-content>"#
        );
        document("application/vnd.oasis.opendocument.spreadsheet", None, &content)
    }

    #[test]
    fn repeats_stop_at_last_column() {
        let bytes = single_table(
            r#"<table:table-row>
                <table:table-cell office:value-type="float" office:value="1"/>
                <table:table-cell office:value-type="float" office:value="2" table:number-columns-repeated="20000"/>
                <table:table-cell office:value-type="float" office:value="3"/>
            </table:table-row>"#,
        );
        let mut spreadsheet = open(bytes).unwrap();
        let sheet = spreadsheet.read_sheet("大表").unwrap();
        assert_eq!(sheet.row_count(), 1);
        assert_eq!(sheet.col_count(), MAX_COLUMNS);
        assert_eq!(sheet.get(0, 0), Some(&ScalarValue::Number(1.0)));
        assert_eq!(sheet.get(0, MAX_COLUMNS - 1), Some(&ScalarValue::Number(2.0)));
    }

    #[test]
    fn oversized_repeats_fail_the_table() {
        let bytes = single_table(
            r#"<table:table-row>
                <table:table-cell office:value-type="string"><text:p>标题</text:p></table:table-cell>
            </table:table-row>
            <table:table-row table:number-rows-repeated="1048575">
                <table:table-cell office:value-type="float" office:value="0.5" table:number-columns-repeated="2000"/>
            </table:table-row>"#,
        );
        let mut spreadsheet = open(bytes).unwrap();
        assert!(matches!(
            spreadsheet.read_sheet("大表"),
            Err(RustyExtractError::OdsError(OdsError::RepeatLimitExceeded { limit: MAX_REPEATED_CELLS, .. }))
        ));
    }

    #[test]
    fn oversized_table_is_skipped_by_extraction() {
        use crate::extract::spec::parse_specs;
        use crate::extract::workbook::extract_workbook;
        use crate::sink::MemorySink;
        use crate::spreadsheet::WorkbookSource;

        let content = CONTENT_XML.replace(
            "</office:spreadsheet>",
            r#"<table:table table:name="大表"><table:table-row table:number-rows-repeated="1048575"><table:table-cell office:value-type="float" office:value="0.5" table:number-columns-repeated="2000"/></table:table-row></table:table></office:spreadsheet>"#,
        );
        let bytes = document("application/vnd.oasis.opendocument.spreadsheet", None, &content);
        let source = WorkbookSource::Bytes { name: "big.ods".to_owned(), bytes };
        let mut sink = MemorySink::new();
        let records = extract_workbook(&source, &parse_specs(["A1-名称"]), &mut sink).unwrap();

        assert_eq!(records.len(), 2);
        let warnings = sink.messages(log::Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("大表"));
        assert!(warnings[0].contains("big.ods"));
    }
}
