use crate::spreadsheet::cell::ScalarValue;
use std::fmt::Display;

/// Reserved field holding the worksheet name
pub const SHEET_FIELD: &str = "sheet";
/// Reserved field holding the workbook file name
pub const SOURCE_FILE_FIELD: &str = "source_file";

/// What one spec produced for one worksheet.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    /// Range values in row-major order
    Sequence(Vec<ScalarValue>),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// `[v1, v2]`: elements joined by `", "`, blank and missing elements render empty.
impl Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Scalar(value) => write!(f, "{}", value),
            FieldValue::Sequence(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            FieldValue::Missing => Ok(()),
        }
    }
}

/// One output row: ordered `field name -> value` pairs, `sheet` and `source_file` first.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRecord {
    fields: Vec<(String, FieldValue)>,
}

impl OutputRecord {
    pub fn new(sheet_name: &str, source_file: &str) -> Self {
        OutputRecord {
            fields: vec![
                (SHEET_FIELD.to_owned(), FieldValue::Scalar(ScalarValue::Text(sheet_name.to_owned()))),
                (SOURCE_FILE_FIELD.to_owned(), FieldValue::Scalar(ScalarValue::Text(source_file.to_owned()))),
            ],
        }
    }

    /// Sets a field; an existing field keeps its position and gets the new value.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Records sharing one column order: `sheet`, `source_file`, then fields in spec order.
#[derive(Clone, Debug, Default)]
pub struct OutputTable {
    columns: Vec<String>,
    records: Vec<OutputRecord>,
}

impl OutputTable {
    /// Creates a table whose columns follow `field_names`; duplicates keep their first position.
    pub fn new<I, S>(field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = vec![SHEET_FIELD.to_owned(), SOURCE_FILE_FIELD.to_owned()];
        for name in field_names {
            let name = name.as_ref();
            if !columns.iter().any(|column| column == name) {
                columns.push(name.to_owned());
            }
        }
        OutputTable { columns, records: Vec::new() }
    }

    pub fn push(&mut self, record: OutputRecord) {
        self.records.push(record);
    }

    pub fn extend<I: IntoIterator<Item = OutputRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns to write: the reserved pair plus every declared field that some record holds.
    pub fn columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| {
                column.as_str() == SHEET_FIELD
                    || column.as_str() == SOURCE_FILE_FIELD
                    || self.records.iter().any(|record| record.get(column).is_some())
            })
            .map(|column| column.as_str())
            .collect()
    }
}
