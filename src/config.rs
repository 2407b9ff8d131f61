//! Optional TOML run configuration.
//!
//! ```toml
//! mode = "per-file"
//! output_dir = "reports/out"
//! output_name = "summary.xlsx"
//! specs = ["F4-样品名称", "A15:K15-保留时间"]
//! spec_file = "fields.txt"
//! ```
//!
//! Every key is optional. A relative `spec_file` is resolved against the directory of the
//! configuration file.

use crate::error::ResultMessage;
use crate::error::RustyExtractError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// How records are grouped into output workbooks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// One workbook holding the records of every input
    #[default]
    Merge,
    /// One workbook per input file
    PerFile,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mode: Option<OutputMode>,
    pub output_dir: Option<PathBuf>,
    pub output_name: Option<String>,
    pub specs: Option<Vec<String>>,
    pub spec_file: Option<PathBuf>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Config, RustyExtractError> {
        Ok(toml::from_str::<Config>(text)?)
    }

    pub fn load(path: &Path) -> Result<Config, RustyExtractError> {
        let prefix = format!("Load config '{}'", path.display());
        let text = fs::read_to_string(path)
            .map_err(RustyExtractError::from)
            .with_prefix(&prefix)?;
        let mut config = Config::parse(&text).with_prefix(&prefix)?;
        if let Some(spec_file) = config.spec_file.as_mut() {
            if spec_file.is_relative() {
                if let Some(parent) = path.parent() {
                    *spec_file = parent.join(&*spec_file);
                }
            }
        }
        log::debug!("loaded config {:?}", config);
        Ok(config)
    }
}
