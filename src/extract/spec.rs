//! Extraction specs: `coordinate-field name` lines such as `F4-样品名称` or `A15:K15-峰`.

use crate::error::RustyExtractError;
use crate::error::ResultMessage;
use std::fs;
use std::path::Path;

/// Specs used when the caller supplies none, matching the standard chromatography report layout.
pub const DEFAULT_SPECS: [&str; 12] = [
    "F4-样品名称",
    "N7-类型",
    "F6-进样体积",
    "A15-保留时间",
    "N8-样品含量",
    "N6-位置",
    "E15-峰宽[min]",
    "G15-峰面积",
    "H15-峰高",
    "K15-峰面积%",
    "C15-类型",
    "G16-总和",
];

/// One coordinate expression paired with the output column it fills.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionSpec {
    /// Raw coordinate expression, parsed when resolved
    pub expression: String,
    pub field_name: String,
}

impl ExtractionSpec {
    pub fn new(expression: &str, field_name: &str) -> Self {
        ExtractionSpec {
            expression: expression.to_owned(),
            field_name: field_name.to_owned(),
        }
    }
}

/// Splits a raw spec on the dash that separates the coordinate from the field name.
///
/// Candidates are tried from the rightmost dash leftwards; the first whose left side holds both
/// a digit and a letter wins. Without such a split the whole line is both expression and field
/// name, so `NoDashHere` and `样品-名称` come back unchanged.
pub fn parse_spec(raw: &str) -> ExtractionSpec {
    let line = raw.trim();
    let parts = line.split('-').collect::<Vec<_>>();
    for i in (1..parts.len()).rev() {
        let left = parts[..i].join("-");
        if is_coordinate_like(&left) {
            let right = parts[i..].join("-");
            return ExtractionSpec::new(left.trim(), right.trim());
        }
    }
    ExtractionSpec::new(line, line)
}

fn is_coordinate_like(text: &str) -> bool {
    text.chars().any(|c| c.is_numeric()) && text.chars().any(|c| c.is_alphabetic())
}

/// Parses spec lines in order, skipping blank ones.
pub fn parse_specs<I, S>(lines: I) -> Vec<ExtractionSpec>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter(|line| !line.as_ref().trim().is_empty())
        .map(|line| parse_spec(line.as_ref()))
        .collect()
}

/// Parses the text of a spec file: one spec per line, `#` starts a comment line.
pub fn parse_spec_text(text: &str) -> Vec<ExtractionSpec> {
    parse_specs(text.lines().filter(|line| !line.trim_start().starts_with('#')))
}

/// Reads and parses a UTF-8 spec file.
pub fn load_spec_file(path: &Path) -> Result<Vec<ExtractionSpec>, RustyExtractError> {
    let text = fs::read_to_string(path)
        .map_err(RustyExtractError::from)
        .with_prefix(&format!("Read spec file '{}'", path.display()))?;
    Ok(parse_spec_text(&text))
}

pub fn default_specs() -> Vec<ExtractionSpec> {
    parse_specs(DEFAULT_SPECS)
}
