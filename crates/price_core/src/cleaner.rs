//! Deterministic cleaning of raw listing records
//!
//! The policy is fixed: identifying columns are dropped, incomplete rows are
//! discarded, `price`/`year`/`odometer` are coerced to numbers and rows outside
//! the admissible ranges are filtered out. Nothing here is configurable.

use crate::records::{RecordSet, Value};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Target column.
pub const PRICE: &str = "price";
/// Model year column.
pub const YEAR: &str = "year";
/// Odometer reading column.
pub const ODOMETER: &str = "odometer";

/// Columns coerced to numbers during cleaning.
pub const NUMERIC_COLUMNS: [&str; 3] = [PRICE, YEAR, ODOMETER];

/// Non-predictive or identifying columns, dropped when present.
pub const DROPPED_COLUMNS: [&str; 14] = [
    "id",
    "url",
    "region",
    "region_url",
    "VIN",
    "image_url",
    "description",
    "county",
    "state",
    "latitude",
    "longitude",
    "lat",
    "long",
    "posting_date",
];

/// Exclusive price bounds.
pub const PRICE_RANGE: (f64, f64) = (500.0, 100_000.0);
/// Inclusive year bounds.
pub const YEAR_RANGE: (f64, f64) = (1990.0, 2025.0);
/// Inclusive odometer bounds.
pub const ODOMETER_RANGE: (f64, f64) = (0.0, 500_000.0);

/// Row and column counts removed at each cleaning stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub dropped_columns: Vec<String>,
    pub rows_in: usize,
    pub rows_missing: usize,
    pub rows_unparseable: usize,
    pub rows_out_of_range: usize,
    pub rows_out: usize,
}

/// Clean a raw record set, discarding the report.
pub fn clean(raw: &RecordSet) -> RecordSet {
    clean_with_report(raw).0
}

/// Clean a raw record set and report what was removed.
pub fn clean_with_report(raw: &RecordSet) -> (RecordSet, CleaningReport) {
    let mut records = raw.clone();
    let mut report = CleaningReport {
        rows_in: records.len(),
        ..Default::default()
    };

    report.dropped_columns = raw
        .columns()
        .iter()
        .filter(|c| DROPPED_COLUMNS.contains(&c.as_str()))
        .cloned()
        .collect();
    records.retain_columns(|c| !DROPPED_COLUMNS.contains(&c));
    info!("Dropped {} columns", report.dropped_columns.len());

    let before = records.len();
    records.retain_rows(|row| row.iter().all(|v| !v.is_missing()));
    report.rows_missing = before - records.len();
    info!("Dropped {} rows with missing values", report.rows_missing);

    let numeric_idx: Option<Vec<usize>> = NUMERIC_COLUMNS
        .iter()
        .map(|c| records.column_index(c))
        .collect();
    let Some(numeric_idx) = numeric_idx else {
        warn!(
            "Record set lacks one of {:?}; no row can be kept",
            NUMERIC_COLUMNS
        );
        report.rows_unparseable = records.len();
        records.retain_rows(|_| false);
        return (records, report);
    };

    let before = records.len();
    for row in records.rows_mut() {
        for &idx in &numeric_idx {
            if let Some(n) = row[idx].as_number() {
                row[idx] = Value::Number(n);
            }
        }
    }
    records.retain_rows(|row| {
        numeric_idx
            .iter()
            .all(|&idx| matches!(row[idx], Value::Number(n) if n.is_finite()))
    });
    report.rows_unparseable = before - records.len();
    info!("Dropped {} rows with non-numeric values", report.rows_unparseable);

    let before = records.len();
    let [price_idx, year_idx, odometer_idx] = [numeric_idx[0], numeric_idx[1], numeric_idx[2]];
    records.retain_rows(|row| in_range(&row[price_idx], &row[year_idx], &row[odometer_idx]));
    report.rows_out_of_range = before - records.len();
    report.rows_out = records.len();

    info!(
        "Cleaning complete: {} of {} rows kept ({} out of range)",
        report.rows_out, report.rows_in, report.rows_out_of_range
    );

    (records, report)
}

fn in_range(price: &Value, year: &Value, odometer: &Value) -> bool {
    let (Value::Number(price), Value::Number(year), Value::Number(odometer)) =
        (price, year, odometer)
    else {
        return false;
    };
    *price > PRICE_RANGE.0
        && *price < PRICE_RANGE.1
        && (YEAR_RANGE.0..=YEAR_RANGE.1).contains(year)
        && (ODOMETER_RANGE.0..=ODOMETER_RANGE.1).contains(odometer)
}
