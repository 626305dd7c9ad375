//! CSV output of indicator records.

use crate::domain::raw_row::RawValue;
use crate::domain::record::IndicatorRecord;
use std::io::Write;

fn cell(value: Option<&RawValue>) -> String {
    match value {
        None | Some(RawValue::Null) => String::new(),
        Some(RawValue::Bool(b)) => b.to_string(),
        Some(RawValue::Integer(i)) => i.to_string(),
        Some(RawValue::Float(f)) if f.is_finite() => f.to_string(),
        Some(RawValue::Float(_)) => String::new(),
        Some(RawValue::Text(s)) => s.clone(),
        Some(RawValue::Date(d)) => d.format("%Y-%m-%d").to_string(),
        Some(object @ RawValue::Object(_)) => object.to_json().to_string(),
    }
}

/// Writes one header row of [`IndicatorRecord::COLUMNS`] followed by one row
/// per record. Unset fields are empty cells; breakdowns are JSON objects.
pub fn write_records<W: Write>(records: &[IndicatorRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(IndicatorRecord::COLUMNS)?;

    for record in records {
        let row = record.to_row();
        wtr.write_record(IndicatorRecord::COLUMNS.iter().map(|c| cell(row.get(*c))))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes a single-column CSV, used for ticker lists and dates.
pub fn write_column<W: Write, S: AsRef<str>>(
    header: &str,
    values: &[S],
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([header])?;
    for value in values {
        wtr.write_record([value.as_ref()])?;
    }
    wtr.flush()?;
    Ok(())
}
