#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for restaurant inspection queries.
//!
//! [`Filter`] is the validated query input; [`RestaurantRecord`] and
//! [`ResponseEnvelope`] are the normalized output. Records serialize with
//! the column names of the inspection dataset (`dba`, `boro`,
//! `cuisine_description`, ...) so the JSON wire format matches what
//! existing clients of the query endpoint expect.

pub mod filter;

pub use filter::{
    DEFAULT_LIMIT, DetailsQuery, Filter, FilterError, LimitBounds, MAX_LIMIT, RawFilter,
};
pub use restaurant_finder_inspection_models::{Borough, Grade};

use serde::{Deserialize, Serialize};

/// Inspection score above which a restaurant is flagged as concerning.
pub const CONCERNING_SCORE: i64 = 25;

/// One inspection row for one restaurant, normalized from the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    /// Restaurant name ("doing business as").
    #[serde(rename = "dba")]
    pub name: String,
    /// Borough the restaurant is located in.
    #[serde(rename = "boro")]
    pub borough: Borough,
    /// Building number.
    #[serde(default)]
    pub building: Option<String>,
    /// Street name.
    #[serde(default)]
    pub street: Option<String>,
    /// ZIP code.
    #[serde(default)]
    pub zipcode: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Cuisine description (e.g. `"Pizza"`).
    #[serde(rename = "cuisine_description", default)]
    pub cuisine: Option<String>,
    /// Inspection date, ISO 8601.
    #[serde(default)]
    pub inspection_date: Option<String>,
    /// Action taken at the inspection.
    #[serde(default)]
    pub action: Option<String>,
    /// Violation code.
    #[serde(default)]
    pub violation_code: Option<String>,
    /// Violation description.
    #[serde(default)]
    pub violation_description: Option<String>,
    /// Whether the violation was critical.
    #[serde(default)]
    pub critical_flag: Option<String>,
    /// Inspection score. Lower is better.
    #[serde(default)]
    pub score: Option<i64>,
    /// Letter grade.
    #[serde(default)]
    pub grade: Option<Grade>,
    /// Date the grade was issued, ISO 8601.
    #[serde(default)]
    pub grade_date: Option<String>,
    /// Date the record was extracted, ISO 8601.
    #[serde(default)]
    pub record_date: Option<String>,
    /// Inspection type.
    #[serde(default)]
    pub inspection_type: Option<String>,
    /// Latitude (WGS84).
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl RestaurantRecord {
    /// Creates a record with only the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, borough: Borough) -> Self {
        Self {
            name: name.into(),
            borough,
            building: None,
            street: None,
            zipcode: None,
            phone: None,
            cuisine: None,
            inspection_date: None,
            action: None,
            violation_code: None,
            violation_description: None,
            critical_flag: None,
            score: None,
            grade: None,
            grade_date: None,
            record_date: None,
            inspection_type: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Whether the record has a poor grade (`C`, `P`) or a score above
    /// [`CONCERNING_SCORE`].
    #[must_use]
    pub fn is_concerning(&self) -> bool {
        matches!(self.grade, Some(Grade::C | Grade::P))
            || self.score.is_some_and(|s| s > CONCERNING_SCORE)
    }

    /// Formats the street address as `"<building> <street>, <zipcode>"`,
    /// omitting missing parts.
    #[must_use]
    pub fn address(&self) -> Option<String> {
        let street = [self.building.as_deref(), self.street.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        match (street.is_empty(), self.zipcode.as_deref()) {
            (true, None) => None,
            (true, Some(zip)) => Some(zip.to_string()),
            (false, None) => Some(street),
            (false, Some(zip)) => Some(format!("{street}, {zip}")),
        }
    }
}

/// Metadata describing how a response was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    filters_applied: Filter,
    mock_data: bool,
    #[serde(rename = "table", default, skip_serializing_if = "Option::is_none")]
    source_table: Option<String>,
}

impl QueryInfo {
    /// Metadata for a response served by the live warehouse.
    #[must_use]
    pub fn live(filters_applied: Filter, source_table: impl Into<String>) -> Self {
        Self {
            filters_applied,
            mock_data: false,
            source_table: Some(source_table.into()),
        }
    }

    /// Metadata for a response served from the built-in dataset.
    #[must_use]
    pub const fn mock(filters_applied: Filter) -> Self {
        Self {
            filters_applied,
            mock_data: true,
            source_table: None,
        }
    }

    /// The filter that produced the response.
    #[must_use]
    pub const fn filters_applied(&self) -> &Filter {
        &self.filters_applied
    }

    /// Whether the response came from the built-in mock dataset.
    #[must_use]
    pub const fn mock_data(&self) -> bool {
        self.mock_data
    }

    /// Warehouse table the records were read from, for live responses.
    #[must_use]
    pub fn source_table(&self) -> Option<&str> {
        self.source_table.as_deref()
    }
}

/// The uniform response to a restaurant query.
///
/// `total_count` always equals the number of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "restaurants")]
    records: Vec<RestaurantRecord>,
    total_count: usize,
    query_info: QueryInfo,
}

impl ResponseEnvelope {
    /// Wraps `records` with their query metadata.
    #[must_use]
    pub fn new(records: Vec<RestaurantRecord>, query_info: QueryInfo) -> Self {
        let total_count = records.len();
        Self {
            records,
            total_count,
            query_info,
        }
    }

    /// The returned records, in response order.
    #[must_use]
    pub fn records(&self) -> &[RestaurantRecord] {
        &self.records
    }

    /// Number of records returned.
    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.total_count
    }

    /// How the response was produced.
    #[must_use]
    pub const fn query_info(&self) -> &QueryInfo {
        &self.query_info
    }

    /// Whether the response came from the built-in mock dataset.
    #[must_use]
    pub const fn is_mock(&self) -> bool {
        self.query_info.mock_data
    }

    /// Splits the envelope into its records and metadata.
    #[must_use]
    pub fn into_parts(self) -> (Vec<RestaurantRecord>, QueryInfo) {
        (self.records, self.query_info)
    }
}

/// Every inspection found for one restaurant name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsResponse {
    /// The name that was looked up.
    pub restaurant_name: String,
    /// Matching inspections, newest first.
    pub inspections: Vec<RestaurantRecord>,
    /// Number of inspections returned.
    pub inspection_count: usize,
    /// Whether the inspections came from the built-in mock dataset.
    pub mock_data: bool,
}

impl DetailsResponse {
    /// Builds a details response for `query`.
    #[must_use]
    pub fn new(query: &DetailsQuery, inspections: Vec<RestaurantRecord>, mock_data: bool) -> Self {
        Self {
            restaurant_name: query.name().to_string(),
            inspection_count: inspections.len(),
            inspections,
            mock_data,
        }
    }
}

/// A dataset column whose distinct values can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistinctColumn {
    /// The `boro` column.
    Borough,
    /// The `cuisine_description` column.
    Cuisine,
}

impl DistinctColumn {
    /// Name of the column in the inspection dataset.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Borough => "boro",
            Self::Cuisine => "cuisine_description",
        }
    }
}

/// Distinct values of one column, sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinctValues {
    /// The values, trimmed, without blanks or duplicates.
    #[serde(default)]
    pub values: Vec<String>,
    /// Number of values.
    #[serde(default)]
    pub total_count: usize,
    /// Whether the values came from the built-in mock dataset.
    #[serde(default)]
    pub mock_data: bool,
}

impl DistinctValues {
    /// Trims, de-duplicates and sorts `values`, dropping blank ones.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = String>, mock_data: bool) -> Self {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            total_count: values.len(),
            values,
            mock_data,
        }
    }
}
