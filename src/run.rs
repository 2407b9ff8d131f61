//! Whole-run orchestration: validate inputs, extract every workbook, write the output(s).

use crate::config::OutputMode;
use crate::error::RustyExtractError;
use crate::extract::spec::ExtractionSpec;
use crate::extract::workbook::extract_workbook;
use crate::output::merge_output_path;
use crate::output::per_file_output_path;
use crate::output::record::OutputTable;
use crate::output::write_table;
use crate::output::DEFAULT_OUTPUT_NAME;
use crate::sink::LogSink;
use crate::spreadsheet::WorkbookSource;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("No input files given")]
    EmptyFileList,

    #[error("No extraction specs given")]
    EmptySpecList,

    #[error("No data extracted")]
    NoDataExtracted,
}

/// Everything a run needs; built by the command line or an embedding caller.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub inputs: Vec<WorkbookSource>,
    pub specs: Vec<ExtractionSpec>,
    pub mode: OutputMode,
    pub output_dir: PathBuf,
    /// Output file name in merge mode, name prefix in per-file mode
    pub output_name: String,
}

impl RunOptions {
    pub fn new(inputs: Vec<WorkbookSource>, specs: Vec<ExtractionSpec>) -> Self {
        RunOptions {
            inputs,
            specs,
            mode: OutputMode::Merge,
            output_dir: PathBuf::from("."),
            output_name: DEFAULT_OUTPUT_NAME.to_owned(),
        }
    }
}

/// Result of one input in per-file mode
#[derive(Debug)]
pub struct FileOutcome {
    /// Input file name
    pub input: String,
    /// Written path and record count
    pub result: Result<(PathBuf, usize), RustyExtractError>,
}

#[derive(Debug)]
pub enum RunSummary {
    Merged { path: PathBuf, records: usize },
    PerFile(Vec<FileOutcome>),
}

impl RunSummary {
    /// Number of records written across all outputs
    pub fn record_count(&self) -> usize {
        match self {
            RunSummary::Merged { records, .. } => *records,
            RunSummary::PerFile(outcomes) => outcomes
                .iter()
                .filter_map(|outcome| outcome.result.as_ref().ok())
                .map(|(_, records)| records)
                .sum(),
        }
    }

    /// True when no output at all was written
    pub fn is_total_failure(&self) -> bool {
        match self {
            RunSummary::Merged { .. } => false,
            RunSummary::PerFile(outcomes) => outcomes.iter().all(|outcome| outcome.result.is_err()),
        }
    }
}

/// Expands glob patterns (`reports/*.xlsx`) and drops repeated paths, keeping first-seen order.
///
/// Arguments without glob characters are kept as given, so a missing file still reaches
/// extraction and is reported there. A pattern matching nothing is logged.
pub fn collect_inputs<S: AsRef<str>>(patterns: &[S], sink: &mut dyn LogSink) -> Result<Vec<PathBuf>, RustyExtractError> {
    let mut inputs: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matches = if pattern.contains(['*', '?', '[']) {
            let mut matches = Vec::new();
            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(path) => matches.push(path),
                    Err(error) => sink.warn(&format!("Cannot read '{}': {}", error.path().display(), error.error())),
                }
            }
            if matches.is_empty() {
                sink.warn(&format!("No file matches '{}'", pattern));
            }
            matches
        } else {
            vec![PathBuf::from(pattern)]
        };
        for path in matches {
            if inputs.contains(&path) {
                sink.warn(&format!("Ignored duplicate input '{}'", path.display()));
            } else {
                inputs.push(path);
            }
        }
    }
    Ok(inputs)
}

/// Runs the extraction in the configured mode.
///
/// Input validation happens before any workbook is opened. In merge mode, inputs that cannot
/// be opened are logged and skipped, and the run fails only if no record was produced. In
/// per-file mode every input gets its own outcome.
pub fn run(options: &RunOptions, sink: &mut dyn LogSink) -> Result<RunSummary, RustyExtractError> {
    if options.inputs.is_empty() {
        Err(RunError::EmptyFileList)?
    }
    if options.specs.is_empty() {
        Err(RunError::EmptySpecList)?
    }
    match options.mode {
        OutputMode::Merge => run_merge(options, sink),
        OutputMode::PerFile => Ok(run_per_file(options, sink)),
    }
}

fn new_table(specs: &[ExtractionSpec]) -> OutputTable {
    OutputTable::new(specs.iter().map(|spec| spec.field_name.as_str()))
}

fn run_merge(options: &RunOptions, sink: &mut dyn LogSink) -> Result<RunSummary, RustyExtractError> {
    let mut table = new_table(&options.specs);
    for source in &options.inputs {
        sink.info(&format!("Processing '{}'", source.file_name()));
        match extract_workbook(source, &options.specs, sink) {
            Ok(records) => table.extend(records),
            Err(error) => sink.error(&error.to_string()),
        }
    }
    if table.is_empty() {
        sink.error(&RunError::NoDataExtracted.to_string());
        Err(RunError::NoDataExtracted)?
    }

    let path = merge_output_path(&options.output_dir, &options.output_name);
    write_table(&table, &path, sink)?;
    sink.info(&format!("Saved to '{}'", path.display()));
    sink.info(&format!("Total {} worksheets", table.len()));
    Ok(RunSummary::Merged { path, records: table.len() })
}

fn run_per_file(options: &RunOptions, sink: &mut dyn LogSink) -> RunSummary {
    let mut outcomes = Vec::with_capacity(options.inputs.len());
    let mut written = HashSet::new();
    for source in &options.inputs {
        let input = source.file_name();
        sink.info(&format!("Processing '{}'", input));
        let result = extract_single(source, &input, options, &written, sink);
        match &result {
            Ok((path, records)) => {
                sink.info(&format!("Saved {} worksheets to '{}'", records, path.display()));
                written.insert(path.to_owned());
            }
            Err(error) => sink.error(&format!("Skipped '{}': {}", input, error)),
        }
        outcomes.push(FileOutcome { input, result });
    }
    sink.info(&format!("Wrote {} of {} files", written.len(), outcomes.len()));
    RunSummary::PerFile(outcomes)
}

fn extract_single(
    source: &WorkbookSource,
    input: &str,
    options: &RunOptions,
    written: &HashSet<PathBuf>,
    sink: &mut dyn LogSink,
) -> Result<(PathBuf, usize), RustyExtractError> {
    let mut table = new_table(&options.specs);
    table.extend(extract_workbook(source, &options.specs, sink)?);
    if table.is_empty() {
        Err(RunError::NoDataExtracted)?
    }
    let path = per_file_output_path(&options.output_dir, &options.output_name, Path::new(input));
    let path = if written.contains(&path) {
        let renamed = next_free_path(&path, written);
        sink.warn(&format!(
            "'{}' was already written by an earlier input, saving '{}' to '{}'",
            path.display(), input, renamed.display()
        ));
        renamed
    } else {
        path
    };
    write_table(&table, &path, sink)?;
    Ok((path, table.len()))
}

/// `name_2.xlsx`, `name_3.xlsx`, ... beside `path`, the first one not in `taken`.
fn next_free_path(path: &Path, taken: &HashSet<PathBuf>) -> PathBuf {
    let stem = path.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
    let extension = path.extension().map(|extension| extension.to_string_lossy()).unwrap_or_default();
    let mut index = 2usize;
    loop {
        let candidate = path.with_file_name(format!("{stem}_{index}.{extension}"));
        if !taken.contains(&candidate) {
            return candidate;
        }
        index += 1;
    }
}
