//! # Rusty Extract
//!
//! Pulls labelled cell values and ranges out of many structurally similar spreadsheets (for
//! example instrument reports) and collects them into summary workbooks, one row per worksheet.
//!
//! ## Features
//!
//! - **Spec lines**: `F4-样品名称` reads cell F4 into the column `样品名称`; `A15:K15-峰` reads a
//!   whole range as a row-major sequence
//! - **Bounds handling**: cells outside a worksheet become a missing marker, ranges are truncated
//!   or padded, and every such case is logged instead of aborting the run
//! - **Multi-format input**: Office Open XML (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`) and OpenDocument
//!   (`.ods`) workbooks, from disk or from memory
//! - **Typed values**: numbers, booleans, text, dates and times are kept typed from input to output
//! - **Output modes**: one merged workbook, or one workbook per input file
//!
//! ## Example
//!
//! ```no_run
//! use rusty_extract::{default_specs, run, FacadeSink, RunOptions, WorkbookSource};
//! use std::path::PathBuf;
//!
//! let inputs = vec![WorkbookSource::from(PathBuf::from("report.xlsx"))];
//! let options = RunOptions::new(inputs, default_specs());
//! let summary = run(&options, &mut FacadeSink)?;
//! println!("{} worksheets extracted", summary.record_count());
//! # Ok::<(), rusty_extract::RustyExtractError>(())
//! ```
pub mod config;
pub mod error;
pub mod extract;
mod helpers;
pub mod output;
pub mod run;
pub mod sink;
pub mod spreadsheet;

pub use crate::config::Config;
pub use crate::config::OutputMode;
pub use crate::error::RustyExtractError;
pub use crate::extract::spec::default_specs;
pub use crate::extract::spec::parse_spec;
pub use crate::extract::spec::parse_specs;
pub use crate::extract::spec::ExtractionSpec;
pub use crate::extract::workbook::extract_workbook;
pub use crate::output::record::FieldValue;
pub use crate::output::record::OutputRecord;
pub use crate::output::record::OutputTable;
pub use crate::run::run;
pub use crate::run::RunOptions;
pub use crate::run::RunSummary;
pub use crate::sink::FacadeSink;
pub use crate::sink::LogSink;
pub use crate::sink::MemorySink;
pub use crate::spreadsheet::WorkbookSource;
