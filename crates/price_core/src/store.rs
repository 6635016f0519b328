//! CSV record store
//!
//! Listings are read as text cells; the NA spellings pandas recognizes by
//! default become [`Value::Null`]. Numeric coercion is left to the cleaner.

use crate::errors::StoreError;
use crate::records::{RecordSet, Value};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Cell spellings read as missing
pub const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn parse_cell(raw: &str) -> Value {
    if NA_TOKENS.contains(&raw) {
        Value::Null
    } else {
        Value::text(raw)
    }
}

/// Read a headed CSV file into a record set
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RecordSet, StoreError> {
    let path = path.as_ref();
    let records = read_csv_from(File::open(path)?)?;
    debug!(
        "Read {} rows x {} columns from {}",
        records.len(),
        records.columns().len(),
        path.display()
    );
    Ok(records)
}

pub fn read_csv_from<R: Read>(reader: R) -> Result<RecordSet, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut records = RecordSet::new(reader.headers()?.iter())?;
    for row in reader.records() {
        let row = row?;
        records.push(row.iter().map(parse_cell).collect())?;
    }
    Ok(records)
}

/// Write a record set as a headed CSV file
pub fn write_csv<P: AsRef<Path>>(path: P, records: &RecordSet) -> Result<(), StoreError> {
    let path = path.as_ref();
    write_csv_to(File::create(path)?, records)?;
    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

pub fn write_csv_to<W: Write>(writer: W, records: &RecordSet) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(records.columns())?;
    for row in records.rows() {
        writer.write_record(row.iter().map(|cell| match cell {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_na_tokens_read_as_null() {
        let data = "price,manufacturer,condition\n9500,honda,NaN\n,ford,good\nN/A,,None\n";
        let records = read_csv_from(data.as_bytes()).unwrap();

        assert_eq!(records.columns(), ["price", "manufacturer", "condition"]);
        assert_eq!(records.len(), 3);
        assert_eq!(records.get(0, "price"), Some(&Value::text("9500")));
        assert_eq!(records.get(0, "condition"), Some(&Value::Null));
        assert_eq!(records.get(1, "price"), Some(&Value::Null));
        assert_eq!(records.get(2, "manufacturer"), Some(&Value::Null));
        assert_eq!(records.get(2, "condition"), Some(&Value::Null));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let data = "a,b\n1,2\n3\n";
        assert!(matches!(
            read_csv_from(data.as_bytes()),
            Err(StoreError::Csv(_))
        ));
    }

    #[test]
    fn test_duplicate_header_is_rejected() {
        let data = "year,year\n2010,2011\n";
        assert!(matches!(
            read_csv_from(data.as_bytes()),
            Err(StoreError::Record(_))
        ));
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions_output.csv");

        let mut records = RecordSet::new(["manufacturer", "predicted_price"]).unwrap();
        records
            .push(vec!["toyota".into(), Value::Number(14_250.5)])
            .unwrap();
        records.push(vec!["ford, inc".into(), Value::Null]).unwrap();
        write_csv(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "manufacturer,predicted_price\ntoyota,14250.5\n\"ford, inc\",\n"
        );

        let restored = read_csv(&path).unwrap();
        assert_eq!(restored.get(0, "predicted_price"), Some(&Value::text("14250.5")));
        assert_eq!(restored.get(1, "manufacturer"), Some(&Value::text("ford, inc")));
        assert_eq!(restored.get(1, "predicted_price"), Some(&Value::Null));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_csv("/nonexistent/vehicles.csv"),
            Err(StoreError::Io(_))
        ));
    }
}
