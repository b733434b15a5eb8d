//! Normalization of raw warehouse rows into [`RestaurantRecord`]s.
//!
//! Optional fields never fail: values that cannot be coerced become
//! `None`. Only a row without a usable name or borough is rejected, and
//! [`normalize_rows`] drops such rows instead of failing the batch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use restaurant_finder_query_models::{Borough, Grade, RestaurantRecord};

use crate::warehouse::{RawValue, WarehouseRow};

/// Errors produced while normalizing a single row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The row is missing a required field or has an unusable one.
    #[error("Malformed row: {reason}")]
    MalformedRow {
        /// Description of what is wrong with the row.
        reason: String,
    },
}

/// Normalizes one warehouse row.
///
/// # Errors
///
/// Returns [`NormalizeError::MalformedRow`] if `dba` is missing or blank,
/// or `boro` is not a recognized borough.
pub fn normalize(row: &WarehouseRow) -> Result<RestaurantRecord, NormalizeError> {
    let name = text(row.get("dba"))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| NormalizeError::MalformedRow {
            reason: "missing restaurant name (dba)".to_string(),
        })?;

    let borough = match text(row.get("boro")) {
        Some(boro) => boro
            .trim()
            .parse::<Borough>()
            .map_err(|_| NormalizeError::MalformedRow {
                reason: format!("unrecognized borough {boro:?} for {name:?}"),
            })?,
        None => {
            return Err(NormalizeError::MalformedRow {
                reason: format!("missing borough for {name:?}"),
            });
        }
    };

    Ok(RestaurantRecord {
        building: text(row.get("building")),
        street: text(row.get("street")),
        zipcode: text(row.get("zipcode")),
        phone: text(row.get("phone")),
        cuisine: text(row.get("cuisine_description")),
        inspection_date: date(row, "inspection_date"),
        action: text(row.get("action")),
        violation_code: text(row.get("violation_code")),
        violation_description: text(row.get("violation_description")),
        critical_flag: text(row.get("critical_flag")),
        score: score(row.get("score")),
        grade: grade(row.get("grade"), &name),
        grade_date: date(row, "grade_date"),
        record_date: date(row, "record_date"),
        inspection_type: text(row.get("inspection_type")),
        latitude: coordinate(row.get("latitude")),
        longitude: coordinate(row.get("longitude")),
        ..RestaurantRecord::new(name, borough)
    })
}

/// Normalizes every row, skipping (and logging) malformed ones.
#[must_use]
pub fn normalize_rows(rows: &[WarehouseRow]) -> Vec<RestaurantRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| match normalize(row) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping warehouse row {idx}: {e}");
                None
            }
        })
        .collect()
}

/// Reads `column` from every row as text. Nulls are skipped.
#[must_use]
pub fn column_values(rows: &[WarehouseRow], column: &str) -> Vec<String> {
    rows.iter().filter_map(|row| text(row.get(column))).collect()
}

fn text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        RawValue::String(s) => Some(s.clone()),
        RawValue::Int(i) => Some(i.to_string()),
        RawValue::Float(f) => Some(f.to_string()),
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Date(d) => Some(format_date(*d)),
        RawValue::DateTime(dt) => Some(format_datetime(*dt)),
    }
}

fn date(row: &WarehouseRow, column: &str) -> Option<String> {
    match row.get(column) {
        RawValue::Null => None,
        RawValue::Date(d) => Some(format_date(*d)),
        RawValue::DateTime(dt) => Some(format_datetime(*dt)),
        RawValue::String(s) if s.trim().is_empty() => None,
        RawValue::String(s) => {
            let parsed = parse_date_text(s.trim());
            if parsed.is_none() {
                log::warn!("Ignoring unparseable {column} value {s:?}");
            }
            parsed
        }
        other => {
            log::warn!("Ignoring non-date {column} value {other:?}");
            None
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Midnight timestamps carry no time-of-day information and are emitted as
/// plain dates.
fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        format_date(dt.date())
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

fn parse_date_text(s: &str) -> Option<String> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(format_date(d));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(format_datetime(dt));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(format_datetime(dt.naive_utc()));
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok().map(format_date)
}

/// Coordinates of exactly zero mark missing locations in the dataset.
#[allow(clippy::cast_precision_loss)]
fn coordinate(value: &RawValue) -> Option<f64> {
    let v = match value {
        RawValue::Float(f) => *f,
        RawValue::Int(i) => *i as f64,
        RawValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (v.is_finite() && v != 0.0).then_some(v)
}

#[allow(clippy::cast_possible_truncation)]
fn score(value: &RawValue) -> Option<i64> {
    let integral = |f: f64| (f.is_finite() && f.fract() == 0.0).then(|| f as i64);

    match value {
        RawValue::Int(i) => Some(*i),
        RawValue::Float(f) => integral(*f),
        RawValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn grade(value: &RawValue, name: &str) -> Option<Grade> {
    let raw = match value {
        RawValue::Null => return None,
        RawValue::String(s) => s.trim(),
        other => {
            log::warn!("Ignoring non-text grade {other:?} for {name:?}");
            return None;
        }
    };
    if raw.is_empty() {
        return None;
    }
    raw.parse::<Grade>()
        .inspect_err(|_| log::warn!("Ignoring unrecognized grade {raw:?} for {name:?}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_row() -> WarehouseRow {
        WarehouseRow::new()
            .with("dba", "Joe's Pizza")
            .with("boro", "Manhattan")
    }

    #[test]
    fn normalizes_a_complete_row() {
        let row = base_row()
            .with("building", "123")
            .with("street", "Broadway")
            .with("zipcode", 10001_i64)
            .with("phone", "2125551234")
            .with("cuisine_description", "Pizza")
            .with(
                "inspection_date",
                NaiveDate::from_ymd_opt(2023, 10, 15).unwrap(),
            )
            .with("critical_flag", "Not Critical")
            .with("score", 12_i64)
            .with("grade", "A")
            .with(
                "grade_date",
                NaiveDate::from_ymd_opt(2023, 10, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            )
            .with(
                "record_date",
                NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(6, 30, 15)
                    .unwrap(),
            )
            .with("latitude", 40.7589)
            .with("longitude", "-73.9851");

        let record = normalize(&row).unwrap();
        assert_eq!(record.name, "Joe's Pizza");
        assert_eq!(record.borough, Borough::Manhattan);
        assert_eq!(record.zipcode.as_deref(), Some("10001"));
        assert_eq!(record.cuisine.as_deref(), Some("Pizza"));
        assert_eq!(record.inspection_date.as_deref(), Some("2023-10-15"));
        assert_eq!(record.grade_date.as_deref(), Some("2023-10-15"));
        assert_eq!(record.record_date.as_deref(), Some("2024-01-02T06:30:15"));
        assert_eq!(record.score, Some(12));
        assert_eq!(record.grade, Some(Grade::A));
        assert_eq!(record.latitude, Some(40.7589));
        assert_eq!(record.longitude, Some(-73.9851));
        assert!(record.action.is_none());
        assert!(record.violation_code.is_none());
    }

    #[test]
    fn nulls_stay_absent() {
        let record = normalize(&base_row()).unwrap();
        assert!(record.building.is_none());
        assert!(record.inspection_date.is_none());
        assert!(record.score.is_none());
        assert!(record.grade.is_none());
        assert!(record.latitude.is_none());
    }

    #[test]
    fn strings_pass_through_untouched() {
        let row = base_row().with("action", "").with("street", " W 4th St ");
        let record = normalize(&row).unwrap();
        assert_eq!(record.action.as_deref(), Some(""));
        assert_eq!(record.street.as_deref(), Some(" W 4th St "));
    }

    #[test]
    fn non_numeric_latitude_is_absent() {
        let row = base_row().with("latitude", "not-a-number");
        assert!(normalize(&row).unwrap().latitude.is_none());
    }

    #[test]
    fn zero_and_non_finite_coordinates_are_absent() {
        let row = base_row()
            .with("latitude", 0.0)
            .with("longitude", f64::NAN);
        let record = normalize(&row).unwrap();
        assert!(record.latitude.is_none());
        assert!(record.longitude.is_none());

        let row = base_row().with("latitude", 41_i64);
        assert_eq!(normalize(&row).unwrap().latitude, Some(41.0));
    }

    #[test]
    fn textual_dates_are_reformatted() {
        let row = base_row()
            .with("inspection_date", "2023-10-15T00:00:00.000")
            .with("grade_date", "10/14/2023")
            .with("record_date", "2024-02-01T09:15:00Z");
        let record = normalize(&row).unwrap();
        assert_eq!(record.inspection_date.as_deref(), Some("2023-10-15"));
        assert_eq!(record.grade_date.as_deref(), Some("2023-10-14"));
        assert_eq!(record.record_date.as_deref(), Some("2024-02-01T09:15:00"));
    }

    #[test]
    fn unparseable_dates_are_absent() {
        let row = base_row().with("inspection_date", "sometime in October");
        assert!(normalize(&row).unwrap().inspection_date.is_none());
    }

    #[test]
    fn score_coercion() {
        assert_eq!(score(&RawValue::Int(7)), Some(7));
        assert_eq!(score(&RawValue::Float(14.0)), Some(14));
        assert_eq!(score(&RawValue::Float(14.5)), None);
        assert_eq!(score(&RawValue::from("21")), Some(21));
        assert_eq!(score(&RawValue::from("n/a")), None);
        assert_eq!(score(&RawValue::Null), None);
    }

    #[test]
    fn unrecognized_grade_is_absent_not_an_error() {
        let row = base_row().with("grade", "N");
        let record = normalize(&row).unwrap();
        assert!(record.grade.is_none());

        let row = base_row().with("grade", " b ");
        assert_eq!(normalize(&row).unwrap().grade, Some(Grade::B));
    }

    #[test]
    fn rows_without_name_or_borough_are_malformed() {
        let no_name = WarehouseRow::new().with("boro", "QUEENS");
        assert!(matches!(
            normalize(&no_name),
            Err(NormalizeError::MalformedRow { .. })
        ));

        let blank_name = WarehouseRow::new().with("dba", "  ").with("boro", "QUEENS");
        assert!(normalize(&blank_name).is_err());

        let bad_borough = WarehouseRow::new().with("dba", "Somewhere").with("boro", "0");
        assert!(normalize(&bad_borough).is_err());

        let no_borough = WarehouseRow::new().with("dba", "Somewhere");
        assert!(normalize(&no_borough).is_err());
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let rows = vec![
            base_row(),
            WarehouseRow::new().with("boro", "BRONX"),
            WarehouseRow::new()
                .with("dba", "Staten Island Bagels")
                .with("boro", "STATEN ISLAND"),
        ];
        let records = normalize_rows(&rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Joe's Pizza");
        assert_eq!(records[1].borough, Borough::StatenIsland);
    }

    #[test]
    fn column_values_skip_nulls() {
        let rows = vec![
            WarehouseRow::new().with("cuisine_description", "Pizza"),
            WarehouseRow::new(),
            WarehouseRow::new().with("cuisine_description", 7_i64),
        ];
        assert_eq!(column_values(&rows, "cuisine_description"), ["Pizza", "7"]);
    }
}
