//! The warehouse collaborator: raw rows and the trait that executes
//! built queries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::builder::WarehouseQuery;

/// Columns selected from the inspection table, in select order.
pub const COLUMNS: &[&str] = &[
    "dba",
    "boro",
    "building",
    "street",
    "zipcode",
    "phone",
    "cuisine_description",
    "inspection_date",
    "action",
    "violation_code",
    "violation_description",
    "critical_flag",
    "score",
    "grade",
    "grade_date",
    "record_date",
    "inspection_type",
    "latitude",
    "longitude",
];

/// Errors that make the live path unavailable.
///
/// The query service never surfaces these to its caller. Any of them
/// causes the response to be served from the mock dataset instead.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// HTTP request failed (connection refused, DNS, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Warehouse returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The query did not finish within the configured timeout.
    #[error("Warehouse query timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// The warehouse accepted the query but the job failed.
    #[error("Warehouse job failed: {message}")]
    Job {
        /// Error reported by the warehouse.
        message: String,
    },

    /// The response could not be decoded.
    #[error("Failed to decode warehouse response: {message}")]
    Decode {
        /// Description of what went wrong.
        message: String,
    },
}

/// A single value as returned by the warehouse, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL `NULL` or a missing column.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time of day, in UTC.
    DateTime(NaiveDateTime),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

static NULL: RawValue = RawValue::Null;

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarehouseRow {
    values: BTreeMap<String, RawValue>,
}

impl WarehouseRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row with `column` set to `value`.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets `column` to `value`.
    pub fn insert(&mut self, column: &str, value: impl Into<RawValue>) {
        self.values.insert(column.to_string(), value.into());
    }

    /// Returns the value of `column`, or [`RawValue::Null`] if the row does
    /// not have it.
    #[must_use]
    pub fn get(&self, column: &str) -> &RawValue {
        self.values.get(column).unwrap_or(&NULL)
    }
}

impl FromIterator<(String, RawValue)> for WarehouseRow {
    fn from_iter<T: IntoIterator<Item = (String, RawValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A data warehouse that can execute a [`WarehouseQuery`].
///
/// Implementations must bind the query's parameters rather than splice
/// them into the query text.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Executes `query` and returns every result row.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] on any transport or execution failure.
    async fn run(&self, query: &WarehouseQuery) -> Result<Vec<WarehouseRow>, WarehouseError>;

    /// Checks that the warehouse is reachable and the credentials work.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] if the warehouse cannot be reached.
    async fn ping(&self) -> Result<(), WarehouseError>;
}
