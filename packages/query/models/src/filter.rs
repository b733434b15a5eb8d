//! Query filters and their construction from untyped input.
//!
//! A [`Filter`] is validated once, when it is built from a [`RawFilter`].
//! Downstream code (the query builder, the mock responder) trusts it.

use restaurant_finder_inspection_models::{Borough, Grade};
use serde::{Deserialize, Serialize};

/// Result limit used when the caller does not supply a usable one.
pub const DEFAULT_LIMIT: u32 = 100;

/// Upper bound applied to every requested limit unless configured
/// otherwise.
pub const MAX_LIMIT: u32 = 500;

/// Errors raised while building a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A borough, grade or name value was not recognized.
    #[error("Invalid value {value:?} for filter '{field}'")]
    InvalidFilterValue {
        /// Name of the offending field (e.g. `"borough"`).
        field: &'static str,
        /// The value as supplied by the caller.
        value: String,
    },
}

/// Default and maximum result limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitBounds {
    /// Limit used when none (or a non-numeric one) is supplied.
    pub default: u32,
    /// Largest limit a filter may carry.
    pub max: u32,
}

impl Default for LimitBounds {
    fn default() -> Self {
        Self {
            default: DEFAULT_LIMIT,
            max: MAX_LIMIT,
        }
    }
}

impl LimitBounds {
    /// Clamps a requested limit into `[1, max]`, substituting the default
    /// when nothing was requested.
    #[must_use]
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        let max = self.max.max(1);
        let value = requested.unwrap_or_else(|| i64::from(self.default));
        u32::try_from(value.clamp(1, i64::from(max))).unwrap_or(max)
    }
}

/// Filter values exactly as received from a command line or JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFilter {
    /// Borough name, any case.
    #[serde(default)]
    pub borough: Option<String>,
    /// Cuisine substring.
    #[serde(default)]
    pub cuisine: Option<String>,
    /// Minimum grade letter, any case.
    #[serde(default)]
    pub min_grade: Option<String>,
    /// Requested limit. Integers, floats and numeric strings are accepted.
    #[serde(default)]
    pub limit: Option<serde_json::Value>,
}

/// A validated restaurant query filter.
///
/// The limit is always in `[1, ceiling]` and the minimum grade, if any, is
/// one of `A`, `B` or `C`. Deserializing goes through [`Filter::from_raw`]
/// with the default [`LimitBounds`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter")]
pub struct Filter {
    borough: Option<Borough>,
    cuisine: Option<String>,
    min_grade: Option<Grade>,
    limit: u32,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            borough: None,
            cuisine: None,
            min_grade: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TryFrom<RawFilter> for Filter {
    type Error = FilterError;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        Self::from_raw(&raw, LimitBounds::default())
    }
}

impl Filter {
    /// Builds a filter from untyped input.
    ///
    /// Blank strings count as "no filter". The limit never causes an
    /// error: missing or non-numeric input takes the default and numeric
    /// input is clamped into range.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidFilterValue`] if the borough or minimum
    /// grade is not recognized, or the minimum grade is `P` or `Z`.
    pub fn from_raw(raw: &RawFilter, bounds: LimitBounds) -> Result<Self, FilterError> {
        let borough = non_blank(raw.borough.as_deref())
            .map(parse_borough)
            .transpose()?;

        let min_grade = non_blank(raw.min_grade.as_deref())
            .map(parse_min_grade)
            .transpose()?;

        let cuisine = non_blank(raw.cuisine.as_deref()).map(str::to_string);

        let limit = bounds.clamp(raw.limit.as_ref().and_then(coerce_limit));

        Ok(Self {
            borough,
            cuisine,
            min_grade,
            limit,
        })
    }

    /// Restricts results to one borough.
    #[must_use]
    pub const fn with_borough(mut self, borough: Borough) -> Self {
        self.borough = Some(borough);
        self
    }

    /// Restricts results to cuisines containing `cuisine` (case-insensitive).
    ///
    /// A blank value clears the cuisine filter.
    #[must_use]
    pub fn with_cuisine(mut self, cuisine: &str) -> Self {
        self.cuisine = non_blank(Some(cuisine)).map(str::to_string);
        self
    }

    /// Restricts results to grades at or above `grade`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidFilterValue`] for `P` and `Z`.
    pub fn with_min_grade(mut self, grade: Grade) -> Result<Self, FilterError> {
        if !grade.is_valid_minimum() {
            return Err(FilterError::InvalidFilterValue {
                field: "min_grade",
                value: grade.to_string(),
            });
        }
        self.min_grade = Some(grade);
        Ok(self)
    }

    /// Sets the result limit, clamped into `bounds`.
    #[must_use]
    pub fn with_limit(mut self, limit: i64, bounds: LimitBounds) -> Self {
        self.limit = bounds.clamp(Some(limit));
        self
    }

    /// Borough filter, if any.
    #[must_use]
    pub const fn borough(&self) -> Option<Borough> {
        self.borough
    }

    /// Cuisine substring, if any.
    #[must_use]
    pub fn cuisine(&self) -> Option<&str> {
        self.cuisine.as_deref()
    }

    /// Minimum grade, if any.
    #[must_use]
    pub const fn min_grade(&self) -> Option<Grade> {
        self.min_grade
    }

    /// Maximum number of records to return.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

/// A lookup of every inspection for one restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailsQuery {
    name: String,
    borough: Option<Borough>,
}

impl DetailsQuery {
    /// Builds a details lookup from untyped input.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidFilterValue`] if the name is blank or
    /// the borough is not recognized.
    pub fn from_raw(name: &str, borough: Option<&str>) -> Result<Self, FilterError> {
        let name = non_blank(Some(name)).ok_or_else(|| FilterError::InvalidFilterValue {
            field: "restaurant_name",
            value: name.to_string(),
        })?;
        let borough = non_blank(borough).map(parse_borough).transpose()?;

        Ok(Self {
            name: name.to_string(),
            borough,
        })
    }

    /// Restaurant name substring.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borough filter, if any.
    #[must_use]
    pub const fn borough(&self) -> Option<Borough> {
        self.borough
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_borough(value: &str) -> Result<Borough, FilterError> {
    value
        .parse()
        .map_err(|_| FilterError::InvalidFilterValue {
            field: "borough",
            value: value.to_string(),
        })
}

fn parse_min_grade(value: &str) -> Result<Grade, FilterError> {
    let invalid = || FilterError::InvalidFilterValue {
        field: "min_grade",
        value: value.to_string(),
    };
    let grade: Grade = value.parse().map_err(|_| invalid())?;
    if grade.is_valid_minimum() {
        Ok(grade)
    } else {
        Err(invalid())
    }
}

/// Converts a JSON limit value to an integer, truncating fractional
/// values. Returns `None` for anything that is not numeric.
#[allow(clippy::cast_possible_truncation)]
fn coerce_limit(value: &serde_json::Value) -> Option<i64> {
    let from_float = |f: f64| f.is_finite().then(|| f.trunc() as i64);

    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().and_then(from_float)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}
