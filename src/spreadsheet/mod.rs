//! # Spreadsheet Reading Module
//!
//! Opens workbooks in Office Open XML (.xlsx, .xlsm, .xltx, .xltm) and OpenDocument (.ods)
//! formats and materializes their worksheets as [`WorksheetData`] grids of cached values.
//! Formulas are never evaluated; the value stored by the last application that saved the
//! file is what gets read.
pub mod cell;
pub mod ods;
pub mod reference;
pub mod sheet;
pub(crate) mod xlsx;

use crate::error::RustyExtractError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::WorksheetData;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in workbook archive")]
    FileError(String),

    #[error("Workbook '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Workbook '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Cannot detect workbook format of '{0}'")]
    UnsupportedFormatError(String),

    #[error("Worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Invalid cell value at '{0}': {1}")]
    CellValueError(String, String),

    #[error("Failed to open workbook '{file}': {message}")]
    WorkbookOpenFailure { file: String, message: String },

    #[error("Failed to read worksheet '{sheet}' of '{file}': {message}")]
    SheetReadFailure {
        file: String,
        sheet: String,
        message: String,
    },
}

/// An open workbook whose worksheets can be read one at a time.
pub trait Spreadsheet {
    /// Returns the file name of this workbook (without directories)
    fn name(&self) -> String;

    /// Worksheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads every cached value of one worksheet
    fn read_sheet(&mut self, sheet_name: &str) -> Result<WorksheetData, RustyExtractError>;
}

/// Where a workbook comes from: a file on disk or bytes already in memory.
#[derive(Clone, Debug)]
pub enum WorkbookSource {
    Path(PathBuf),
    /// `name` supplies the file name (and extension) used for format detection and provenance
    Bytes { name: String, bytes: Vec<u8> },
}

impl WorkbookSource {
    /// File name without directories, used as the `source_file` of extracted records.
    pub fn file_name(&self) -> String {
        let path = match self {
            WorkbookSource::Path(path) => path.as_path(),
            WorkbookSource::Bytes { name, .. } => Path::new(name),
        };
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string())
    }

    fn extension(&self) -> Option<String> {
        let path = match self {
            WorkbookSource::Path(path) => path.as_path(),
            WorkbookSource::Bytes { name, .. } => Path::new(name),
        };
        path.extension()
            .and_then(OsStr::to_str)
            .map(|extension| extension.to_ascii_lowercase())
    }
}

impl From<&Path> for WorkbookSource {
    fn from(path: &Path) -> Self {
        WorkbookSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for WorkbookSource {
    fn from(path: PathBuf) -> Self {
        WorkbookSource::Path(path)
    }
}

/// Opens a workbook, choosing the reader from the file extension.
///
/// Supported formats:
/// - `.xlsx`, `.xlsm`, `.xltx`, `.xltm` - Office Open XML
/// - `.ods` - OpenDocument spreadsheet
///
/// # Errors
///
/// Returns an error if the extension is not supported, the file cannot be read, the archive
/// is corrupt or encrypted, or the workbook lists no worksheets.
pub fn open_spreadsheet(source: &WorkbookSource) -> Result<Box<dyn Spreadsheet>, RustyExtractError> {
    let name = source.file_name();
    let extension = source.extension();
    let reader = match source {
        WorkbookSource::Path(path) => UnifiedReader::open(path)?,
        WorkbookSource::Bytes { bytes, .. } => UnifiedReader::from_bytes(bytes.to_owned()),
    };
    let spreadsheet: Box<dyn Spreadsheet> = match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xltx") | Some("xltm") => Box::new(XlsxSpreadsheet::open(&name, reader)?),
        Some("ods") => Box::new(OdsSpreadsheet::open(&name, reader)?),
        _ => Err(SpreadsheetError::UnsupportedFormatError(name))?,
    };
    log::debug!("opened '{}' with sheets {:?}", spreadsheet.name(), spreadsheet.sheet_names());
    Ok(spreadsheet)
}
