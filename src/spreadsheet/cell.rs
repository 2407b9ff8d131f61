use crate::error::RustyExtractError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Timelike;
use iso8601_duration::Duration as IsoDuration;
use std::fmt::Display;

const MICROS_PER_DAY: f64 = 86_400_000_000f64;

/// Storage type of a raw cell as found in the workbook XML.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    NumberDate1900,
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    NumberDate1904,
    NumberTime1904,
    /// ISO 8601 date/time strings (ods)
    IsoDateTime,
    /// ISO 8601 duration strings (ods time cells)
    IsoDuration,
    InlineString,
    /// Index into the shared string table
    SharedString,
    /// Cached error result such as `#DIV/0!`
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Classifies a custom number format code by looking for date and time
    /// placeholders outside quoted literals, escapes and `[...]` sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    fn is_1904(&self) -> bool {
        matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904)
    }
}

/// A cell value after decoding, as seen by extraction.
///
/// `Empty` is a blank cell inside the worksheet; `Missing` marks a position that could not
/// be read (outside the worksheet, or a failed extraction).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ScalarValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Missing,
}

impl ScalarValue {
    /// True for both blank cells and the missing marker
    pub fn is_blank(&self) -> bool {
        matches!(self, ScalarValue::Empty | ScalarValue::Missing)
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Empty | ScalarValue::Missing => Ok(()),
            ScalarValue::Bool(value) => write!(f, "{}", value),
            ScalarValue::Number(value) => write!(f, "{}", value),
            ScalarValue::Text(value) => f.write_str(value),
            ScalarValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            ScalarValue::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
        }
    }
}

/// A raw cell collected by a workbook reader.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Cell value as written in the XML
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Decodes the raw value into a [`ScalarValue`].
    ///
    /// Numbers carrying a date or time format become `DateTime`/`Time`; cached
    /// error results are kept as their text (`#N/A`).
    pub(crate) fn to_scalar(&self, shared_strings: &[String]) -> Result<ScalarValue, RustyExtractError> {
        let scalar = match self.kind {
            CellType::Empty => ScalarValue::Empty,
            CellType::Boolean => ScalarValue::Bool(self.value == "1" || self.value.eq_ignore_ascii_case("true")),
            CellType::Number => self
                .value
                .trim()
                .parse::<f64>()
                .map(ScalarValue::Number)
                .unwrap_or_else(|_| ScalarValue::Text(self.value.to_owned())),
            CellType::NumberDateTime1900 | CellType::NumberDate1900 |
            CellType::NumberDateTime1904 | CellType::NumberDate1904 => {
                let serial = self.to_double()?;
                serial_to_datetime(serial, self.kind.is_1904())
                    .map(ScalarValue::DateTime)
                    .unwrap_or(ScalarValue::Number(serial))
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                let serial = self.to_double()?;
                if (0.0..1.0).contains(&serial) {
                    serial_to_time(serial).map(ScalarValue::Time).unwrap_or(ScalarValue::Number(serial))
                } else {
                    serial_to_datetime(serial, self.kind.is_1904())
                        .map(ScalarValue::DateTime)
                        .unwrap_or(ScalarValue::Number(serial))
                }
            }
            CellType::IsoDateTime => parse_iso_datetime(&self.value)
                .map(ScalarValue::DateTime)
                .unwrap_or_else(|| ScalarValue::Text(self.value.to_owned())),
            CellType::IsoDuration => self
                .value
                .parse::<IsoDuration>()
                .ok()
                .and_then(|duration| {
                    let seconds = duration.hour * 3600.0 + duration.minute * 60.0 + duration.second;
                    serial_to_time(seconds as f64 / 86_400f64)
                })
                .map(ScalarValue::Time)
                .unwrap_or_else(|| ScalarValue::Text(self.value.to_owned())),
            CellType::InlineString | CellType::Error => ScalarValue::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.trim().parse::<usize>()?;
                let text = shared_strings.get(index).ok_or_else(|| SpreadsheetError::CellValueError(
                    self.reference(),
                    format!("shared string {index} out of range"),
                ))?;
                ScalarValue::Text(text.to_owned())
            }
        };
        Ok(scalar)
    }

    fn to_double(&self) -> Result<f64, RustyExtractError> {
        self.value.trim().parse::<f64>().map_err(|_| {
            SpreadsheetError::CellValueError(self.reference(), format!("parse '{}' to number failed", self.value)).into()
        })
    }
}

/// First day of each date system; 1900 serials are counted from 1899-12-30.
fn epoch(is_1904: bool) -> NaiveDateTime {
    let date = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    };
    date.unwrap_or_default().and_time(NaiveTime::MIN)
}

/// Converts an Excel serial number to a date-time.
/// Serials below 60 in the 1900 system are shifted by one day (Lotus 1-2-3 leap year bug).
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let shift = if !is_1904 && days < 60 { 1 } else { 0 };
    let micros = (serial.fract() * MICROS_PER_DAY).round() as i64;
    epoch(is_1904)
        .checked_add_signed(Duration::days(days + shift))?
        .checked_add_signed(Duration::microseconds(micros))
}

/// Converts the fractional part of a day to a time of day.
pub(crate) fn serial_to_time(fraction: f64) -> Option<NaiveTime> {
    if !(0.0..1.0).contains(&fraction) {
        return None;
    }
    let micros = (fraction * MICROS_PER_DAY).round() as i64;
    let seconds = (micros / 1_000_000) as u32;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    // rounding can reach exactly 24:00:00
    NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), nanos)
}

/// Converts a date-time to a 1900-system serial number, inverse of [`serial_to_datetime`].
pub(crate) fn datetime_to_serial(datetime: &NaiveDateTime) -> f64 {
    let elapsed = *datetime - epoch(false);
    let days = elapsed.num_days();
    let shift = if days < 61 { 1 } else { 0 };
    let micros = (elapsed - Duration::days(days)).num_microseconds().unwrap_or(0);
    (days - shift) as f64 + micros as f64 / MICROS_PER_DAY
}

/// Converts a time of day to the fraction of a day.
pub(crate) fn time_to_serial(time: &NaiveTime) -> f64 {
    let micros = time.num_seconds_from_midnight() as f64 * 1_000_000f64 + (time.nanosecond() / 1_000) as f64;
    micros / MICROS_PER_DAY
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell { row: 0, col: 0, kind, value: value.to_owned() }
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn custom_number_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", true), CellType::NumberDateTime1904);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", false), CellType::NumberTime1900);
        assert_eq!(CellType::parse_custom_number_format("0.00\"days\"", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("2", false), None);
    }

    #[test]
    fn scalar_conversion() {
        let shared = vec!["样品A".to_owned()];
        assert_eq!(cell(CellType::Number, "12.5").to_scalar(&shared).unwrap(), ScalarValue::Number(12.5));
        assert_eq!(cell(CellType::Boolean, "1").to_scalar(&shared).unwrap(), ScalarValue::Bool(true));
        assert_eq!(cell(CellType::SharedString, "0").to_scalar(&shared).unwrap(), ScalarValue::Text("样品A".to_owned()));
        assert!(cell(CellType::SharedString, "3").to_scalar(&shared).is_err());
        assert_eq!(cell(CellType::Error, "#DIV/0!").to_scalar(&shared).unwrap(), ScalarValue::Text("#DIV/0!".to_owned()));
        assert_eq!(
            cell(CellType::NumberDate1900, "45296").to_scalar(&shared).unwrap(),
            ScalarValue::DateTime(datetime(2024, 1, 5, 0, 0, 0))
        );
        assert_eq!(
            cell(CellType::NumberTime1900, "0.5").to_scalar(&shared).unwrap(),
            ScalarValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
        );
        assert_eq!(
            cell(CellType::IsoDateTime, "2024-01-05T10:30:00").to_scalar(&shared).unwrap(),
            ScalarValue::DateTime(datetime(2024, 1, 5, 10, 30, 0))
        );
        assert_eq!(
            cell(CellType::IsoDuration, "PT01H30M00S").to_scalar(&shared).unwrap(),
            ScalarValue::Time(NaiveTime::from_hms_opt(1, 30, 0).unwrap())
        );
    }

    #[test]
    fn serial_numbers() {
        assert_eq!(serial_to_datetime(1.0, false), Some(datetime(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(61.0, false), Some(datetime(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(0.0, true), Some(datetime(1904, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(-1.0, false), None);

        let moment = datetime(2024, 1, 5, 6, 0, 0);
        assert_eq!(datetime_to_serial(&moment), 45296.25);
        assert_eq!(time_to_serial(&NaiveTime::from_hms_opt(18, 0, 0).unwrap()), 0.75);
    }

    #[test]
    fn display() {
        assert_eq!(ScalarValue::Number(12.0).to_string(), "12");
        assert_eq!(ScalarValue::Missing.to_string(), "");
        assert_eq!(ScalarValue::DateTime(datetime(2024, 1, 5, 0, 0, 0)).to_string(), "2024-01-05 00:00:00");
    }
}
