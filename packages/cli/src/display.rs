//! Plain-text rendering of query responses.

use std::fmt::Write as _;

use restaurant_finder_query::HealthStatus;
use restaurant_finder_query_models::{
    DetailsResponse, DistinctValues, ResponseEnvelope, RestaurantRecord,
};

/// Printed to stderr whenever a response came from the built-in dataset.
pub const MOCK_WARNING: &str =
    "Warning: live data is unavailable; showing built-in sample data instead.";

const NAME_WIDTH: usize = 28;
const BOROUGH_WIDTH: usize = 13;
const CUISINE_WIDTH: usize = 18;

/// Renders search results as a table, one row per record.
///
/// Concerning restaurants (grade C or P, or a high score) are marked with
/// `!` in the first column.
pub fn search_table(envelope: &ResponseEnvelope) -> String {
    let mut out = String::new();

    if envelope.records().is_empty() {
        out.push_str("No restaurants found.\n");
        return out;
    }

    writeln!(
        out,
        "  {:<NAME_WIDTH$} {:<BOROUGH_WIDTH$} {:<CUISINE_WIDTH$} {:<5} {:>5} {:<10} ADDRESS",
        "NAME", "BOROUGH", "CUISINE", "GRADE", "SCORE", "INSPECTED"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(110)).unwrap();

    for record in envelope.records() {
        writeln!(
            out,
            "{} {:<NAME_WIDTH$} {:<BOROUGH_WIDTH$} {:<CUISINE_WIDTH$} {:<5} {:>5} {:<10} {}",
            if record.is_concerning() { '!' } else { ' ' },
            fit(&record.name, NAME_WIDTH),
            record.borough.warehouse_name(),
            fit(record.cuisine.as_deref().unwrap_or("-"), CUISINE_WIDTH),
            grade(record),
            score(record),
            date(record.inspection_date.as_deref()),
            record.address().unwrap_or_default(),
        )
        .unwrap();
    }

    writeln!(out, "\n{} restaurants", envelope.total_count()).unwrap();
    out
}

/// Renders every inspection of a details lookup, newest first.
pub fn details_table(details: &DetailsResponse) -> String {
    let mut out = String::new();

    if details.inspections.is_empty() {
        writeln!(out, "No inspections found for {:?}.", details.restaurant_name).unwrap();
        return out;
    }

    writeln!(
        out,
        "{:<NAME_WIDTH$} {:<10} {:<5} {:>5} {:<6} VIOLATION",
        "NAME", "INSPECTED", "GRADE", "SCORE", "CODE"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(110)).unwrap();

    for record in &details.inspections {
        writeln!(
            out,
            "{:<NAME_WIDTH$} {:<10} {:<5} {:>5} {:<6} {}",
            fit(&record.name, NAME_WIDTH),
            date(record.inspection_date.as_deref()),
            grade(record),
            score(record),
            record.violation_code.as_deref().unwrap_or("-"),
            record.violation_description.as_deref().unwrap_or(""),
        )
        .unwrap();
    }

    writeln!(out, "\n{} inspections", details.inspection_count).unwrap();
    out
}

/// Renders a distinct-value listing, one value per line.
pub fn value_list(values: &DistinctValues) -> String {
    let mut out = String::new();
    for value in &values.values {
        writeln!(out, "  {value}").unwrap();
    }
    writeln!(out, "\n{} values", values.total_count).unwrap();
    out
}

/// Describes where query results will come from.
pub fn health_report(status: &HealthStatus) -> String {
    let mut out = String::new();

    match (&status.live_source, status.live_available) {
        (None, _) => {
            writeln!(out, "Live source: none configured").unwrap();
            writeln!(out, "Data:        built-in sample data").unwrap();
        }
        (Some(name), true) => {
            writeln!(out, "Live source: {name} (reachable)").unwrap();
            writeln!(out, "Data:        live").unwrap();
        }
        (Some(name), false) => {
            writeln!(out, "Live source: {name} (unreachable)").unwrap();
            writeln!(out, "Data:        built-in sample data (fallback)").unwrap();
        }
    }

    out
}

/// Truncates `s` to at most `width` characters, marking the cut with `~`.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn grade(record: &RestaurantRecord) -> String {
    record
        .grade
        .map_or_else(|| "-".to_string(), |g| g.to_string())
}

fn score(record: &RestaurantRecord) -> String {
    record
        .score
        .map_or_else(|| "-".to_string(), |s| s.to_string())
}

/// Date part of an ISO 8601 value.
fn date(value: Option<&str>) -> &str {
    value.map_or("-", |v| v.get(..10).unwrap_or(v))
}
