//! Command line front end.
//!
//! ```sh
//! rusty-extract reports/*.xlsx -s "F4-样品名称" -s "A15:K15-保留时间" -o out
//! rusty-extract run1.xlsx run2.ods --default-specs --mode per-file
//! ```

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rusty_extract::config::Config;
use rusty_extract::config::OutputMode;
use rusty_extract::extract::spec::load_spec_file;
use rusty_extract::extract::spec::DEFAULT_SPECS;
use rusty_extract::output::DEFAULT_OUTPUT_NAME;
use rusty_extract::run::collect_inputs;
use rusty_extract::run::RunSummary;
use rusty_extract::ExtractionSpec;
use rusty_extract::FacadeSink;
use rusty_extract::RunOptions;
use rusty_extract::WorkbookSource;
use std::path::PathBuf;
use std::process::ExitCode;

/// Extract labelled cells and ranges from spreadsheets into a summary workbook
#[derive(Parser, Debug)]
#[command(name = "rusty-extract", version)]
struct Args {
    /// Input workbooks (.xlsx, .xlsm, .xltx, .xltm, .ods) or glob patterns
    #[arg(value_name = "INPUT", required_unless_present = "list_default_specs")]
    inputs: Vec<String>,

    /// Extraction spec such as "F4-样品名称" or "A15:K15-峰"; repeatable
    #[arg(short, long = "spec", value_name = "SPEC")]
    specs: Vec<String>,

    /// File with one spec per line; lines starting with '#' are comments
    #[arg(short = 'f', long, value_name = "FILE")]
    spec_file: Option<PathBuf>,

    /// Append the built-in report specs
    #[arg(long)]
    default_specs: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output grouping [default: merge]
    #[arg(short, long, value_enum)]
    mode: Option<OutputMode>,

    /// Directory for output workbooks [default: .]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output file name (prefix in per-file mode) [default: 提取结果.xlsx]
    #[arg(short = 'n', long, value_name = "NAME")]
    output_name: Option<String>,

    /// Print the built-in specs and exit
    #[arg(long)]
    list_default_specs: bool,
}

/// Specs from the command line win over the configuration file. Nothing anywhere yields an
/// empty list, which the run rejects.
fn resolve_specs(args: &Args, config: &Config) -> Result<Vec<ExtractionSpec>> {
    let mut specs = rusty_extract::parse_specs(&args.specs);
    if let Some(path) = &args.spec_file {
        specs.extend(load_spec_file(path)?);
    }
    if args.default_specs {
        specs.extend(rusty_extract::default_specs());
    }
    if specs.is_empty() {
        if let Some(lines) = &config.specs {
            specs.extend(rusty_extract::parse_specs(lines));
        }
        if let Some(path) = &config.spec_file {
            specs.extend(load_spec_file(path)?);
        }
    }
    Ok(specs)
}

fn report(summary: &RunSummary) {
    match summary {
        RunSummary::Merged { path, records } => {
            println!("{}\t{}", path.display(), records);
        }
        RunSummary::PerFile(outcomes) => {
            for outcome in outcomes {
                match &outcome.result {
                    Ok((path, records)) => println!("{}\t{}\t{}", outcome.input, path.display(), records),
                    Err(error) => println!("{}\terror\t{}", outcome.input, error),
                }
            }
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if args.list_default_specs {
        for spec in DEFAULT_SPECS {
            println!("{spec}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let specs = resolve_specs(&args, &config).context("Failed to read extraction specs")?;

    let mut sink = FacadeSink;
    let inputs = collect_inputs(&args.inputs, &mut sink).context("Failed to expand input patterns")?;
    let options = RunOptions {
        inputs: inputs.into_iter().map(WorkbookSource::from).collect(),
        specs,
        mode: args.mode.or(config.mode).unwrap_or_default(),
        output_dir: args.output_dir.or(config.output_dir).unwrap_or_else(|| PathBuf::from(".")),
        output_name: args.output_name.or(config.output_name).unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_owned()),
    };

    match rusty_extract::run(&options, &mut sink) {
        Ok(summary) => {
            report(&summary);
            if summary.is_total_failure() {
                log::error!("No output was written");
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(error) => {
            log::error!("{}", error);
            Ok(ExitCode::FAILURE)
        }
    }
}
