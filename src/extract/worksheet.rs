use crate::extract::resolver::resolve;
use crate::extract::spec::ExtractionSpec;
use crate::output::record::FieldValue;
use crate::output::record::OutputRecord;
use crate::sink::LogSink;
use crate::spreadsheet::sheet::WorksheetData;

/// Applies every spec to one worksheet and returns its record.
///
/// A spec that cannot be resolved is logged and stored as [`FieldValue::Missing`]; the record
/// is produced regardless.
pub fn extract_worksheet(
    sheet: &WorksheetData,
    sheet_name: &str,
    source_file: &str,
    specs: &[ExtractionSpec],
    sink: &mut dyn LogSink,
) -> OutputRecord {
    let mut record = OutputRecord::new(sheet_name, source_file);
    for spec in specs {
        let value = match resolve(sheet, &spec.expression, sink) {
            Ok(value) => value,
            Err(error) => {
                sink.error(&format!(
                    "Failed to extract '{}' for field '{}' in sheet '{}': {}",
                    spec.expression, spec.field_name, sheet_name, error
                ));
                FieldValue::Missing
            }
        };
        record.set(&spec.field_name, value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::spec::parse_specs;
    use crate::sink::MemorySink;
    use crate::spreadsheet::cell::ScalarValue;
    use log::Level;

    fn text(value: &str) -> ScalarValue {
        ScalarValue::Text(value.to_owned())
    }

    fn sheet() -> WorksheetData {
        WorksheetData::from_rows(vec![
            vec![text("名称"), text("样品A")],
            vec![text("含量"), ScalarValue::Number(0.25)],
        ])
    }

    #[test]
    fn extract_in_spec_order() {
        let specs = parse_specs(["B1-样品名称", "A1:B2-全部", "C9-缺失", "NoDashHere", "B2-样品含量"]);
        let mut sink = MemorySink::new();
        let record = extract_worksheet(&sheet(), "报告", "a.xlsx", &specs, &mut sink);

        assert_eq!(
            record.field_names().collect::<Vec<_>>(),
            vec!["sheet", "source_file", "样品名称", "全部", "缺失", "NoDashHere", "样品含量"]
        );
        assert_eq!(record.get("sheet"), Some(&FieldValue::Scalar(text("报告"))));
        assert_eq!(record.get("source_file"), Some(&FieldValue::Scalar(text("a.xlsx"))));
        assert_eq!(record.get("样品名称"), Some(&FieldValue::Scalar(text("样品A"))));
        assert_eq!(
            record.get("全部"),
            Some(&FieldValue::Sequence(vec![text("名称"), text("样品A"), text("含量"), ScalarValue::Number(0.25)]))
        );
        assert_eq!(record.get("缺失"), Some(&FieldValue::Missing));
        assert_eq!(record.get("NoDashHere"), Some(&FieldValue::Missing));
        assert_eq!(record.get("样品含量"), Some(&FieldValue::Scalar(ScalarValue::Number(0.25))));

        assert_eq!(sink.messages(Level::Warn).len(), 1);
        assert_eq!(sink.messages(Level::Error).len(), 1);
        assert!(sink.messages(Level::Error)[0].contains("NoDashHere"));
    }

    #[test]
    fn extract_without_specs() {
        let mut sink = MemorySink::new();
        let record = extract_worksheet(&sheet(), "报告", "a.xlsx", &[], &mut sink);

        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["sheet", "source_file"]);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn later_spec_replaces_field() {
        let specs = parse_specs(["A1-值", "B1-值"]);
        let mut sink = MemorySink::new();
        let record = extract_worksheet(&sheet(), "S", "a.xlsx", &specs, &mut sink);

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("值"), Some(&FieldValue::Scalar(text("样品A"))));
    }
}
