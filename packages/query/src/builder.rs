//! Translates filters into parameterized warehouse queries.
//!
//! The generated SQL uses positional `?` placeholders (`BigQuery` standard
//! SQL). Filter values only ever travel as [`QueryParam`]s; the only
//! identifier spliced into the text is the [`TableName`], which is
//! validated when it is created.

use std::fmt::Write as _;

use restaurant_finder_query_models::{DetailsQuery, DistinctColumn, Filter};

use crate::warehouse::COLUMNS;

/// Most distinct values a listing query returns.
pub const DISTINCT_LIMIT: u32 = 1000;

/// Error returned when a table identifier contains characters that are
/// not allowed in a `project.dataset.table` reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid table name {0:?}: expected project.dataset.table")]
pub struct InvalidTableName(pub String);

/// A validated, fully-qualified warehouse table reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Validates `name`.
    ///
    /// Accepts ASCII letters, digits, `_`, `-` and `.` separators, with no
    /// empty segments.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTableName`] if `name` is empty or contains anything
    /// else.
    pub fn new(name: &str) -> Result<Self, InvalidTableName> {
        let valid = !name.is_empty()
            && name.split('.').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            });

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(InvalidTableName(name.to_string()))
        }
    }

    /// Returns the table reference as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One condition of the `WHERE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// `1=1`, always present so every other predicate is an `AND` clause.
    Always,
    /// `UPPER(boro) = ?`
    BoroughEquals,
    /// `UPPER(cuisine_description) LIKE ?`
    CuisineContains,
    /// `grade IN UNNEST(?)`
    GradeIn,
    /// `UPPER(dba) LIKE ?`
    NameContains,
    /// `<column> IS NOT NULL`
    Present(DistinctColumn),
}

impl Predicate {
    /// SQL text of this predicate.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Always => "1=1",
            Self::BoroughEquals => "UPPER(boro) = ?",
            Self::CuisineContains => "UPPER(cuisine_description) LIKE ?",
            Self::GradeIn => "grade IN UNNEST(?)",
            Self::NameContains => "UPPER(dba) LIKE ?",
            Self::Present(DistinctColumn::Borough) => "boro IS NOT NULL",
            Self::Present(DistinctColumn::Cuisine) => "cuisine_description IS NOT NULL",
        }
    }

    /// Whether this predicate consumes one bound parameter.
    #[must_use]
    pub const fn takes_param(self) -> bool {
        !matches!(self, Self::Always | Self::Present(_))
    }
}

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// `STRING`
    String(String),
    /// `ARRAY<STRING>`
    StringArray(Vec<String>),
    /// `INT64`
    Int64(i64),
}

/// A query ready to send to a warehouse.
///
/// Parameters are in placeholder order: one per predicate that
/// [takes a param](Predicate::takes_param), then the limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseQuery {
    predicates: Vec<Predicate>,
    params: Vec<QueryParam>,
    limit: u32,
    sql: String,
}

impl WarehouseQuery {
    /// The `WHERE` predicates, in order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Every bound parameter, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    /// Pairs each parameterized predicate with its bound value.
    pub fn predicate_params(&self) -> impl Iterator<Item = (Predicate, &QueryParam)> {
        self.predicates
            .iter()
            .copied()
            .filter(|p| p.takes_param())
            .zip(self.params.iter())
    }

    /// Maximum number of rows requested.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Complete SQL text with `?` placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Builds the search query for `filter` against `table`.
///
/// Results are always ordered by inspection date, newest first.
#[must_use]
pub fn build(filter: &Filter, table: &TableName) -> WarehouseQuery {
    let mut conditions = Conditions::default();

    if let Some(borough) = filter.borough() {
        conditions.push(
            Predicate::BoroughEquals,
            QueryParam::String(borough.warehouse_name().to_uppercase()),
        );
    }

    if let Some(cuisine) = filter.cuisine() {
        conditions.push(Predicate::CuisineContains, contains_pattern(cuisine));
    }

    if let Some(ladder) = filter.min_grade().and_then(|g| g.ladder()) {
        conditions.push(
            Predicate::GradeIn,
            QueryParam::StringArray(ladder.iter().map(ToString::to_string).collect()),
        );
    }

    conditions.finish(table, filter.limit())
}

/// Builds the lookup query for every inspection of one restaurant.
#[must_use]
pub fn build_details(query: &DetailsQuery, limit: u32, table: &TableName) -> WarehouseQuery {
    let mut conditions = Conditions::default();

    conditions.push(Predicate::NameContains, contains_pattern(query.name()));

    if let Some(borough) = query.borough() {
        conditions.push(
            Predicate::BoroughEquals,
            QueryParam::String(borough.warehouse_name().to_uppercase()),
        );
    }

    conditions.finish(table, limit)
}

/// Builds the query listing every distinct non-null value of `column`,
/// in ascending order.
#[must_use]
pub fn build_distinct(column: DistinctColumn, table: &TableName) -> WarehouseQuery {
    let mut conditions = Conditions::default();
    conditions.require(Predicate::Present(column));

    let name = column.column();
    conditions.render(&format!("DISTINCT {name}"), name, table, DISTINCT_LIMIT)
}

/// Upper-cases `needle` and wraps it in `%` wildcards, escaping any `LIKE`
/// metacharacters so it matches literally.
fn contains_pattern(needle: &str) -> QueryParam {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_uppercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    QueryParam::String(pattern)
}

struct Conditions {
    predicates: Vec<Predicate>,
    params: Vec<QueryParam>,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            predicates: vec![Predicate::Always],
            params: Vec::new(),
        }
    }
}

impl Conditions {
    fn push(&mut self, predicate: Predicate, param: QueryParam) {
        self.predicates.push(predicate);
        self.params.push(param);
    }

    fn require(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    fn finish(self, table: &TableName, limit: u32) -> WarehouseQuery {
        self.render(&COLUMNS.join(", "), "inspection_date DESC", table, limit)
    }

    fn render(
        mut self,
        select: &str,
        order_by: &str,
        table: &TableName,
        limit: u32,
    ) -> WarehouseQuery {
        let mut sql = format!(
            "SELECT {select} FROM `{}` WHERE {}",
            table.as_str(),
            Predicate::Always.sql()
        );

        for predicate in self.predicates.iter().filter(|p| **p != Predicate::Always) {
            write!(sql, " AND {}", predicate.sql()).unwrap();
        }

        write!(sql, " ORDER BY {order_by} LIMIT ?").unwrap();
        self.params.push(QueryParam::Int64(i64::from(limit)));

        WarehouseQuery {
            predicates: self.predicates,
            params: self.params,
            limit,
            sql,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restaurant_finder_query_models::{Borough, Grade, LimitBounds};

    fn table() -> TableName {
        TableName::new("bigquery-public-data.new_york_city.restaurant_grades").unwrap()
    }

    fn placeholder_count(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn empty_filter_has_only_base_predicate_and_limit() {
        let query = build(&Filter::default(), &table());
        assert_eq!(query.predicates(), &[Predicate::Always]);
        assert_eq!(query.params(), &[QueryParam::Int64(100)]);
        assert!(query.sql().contains("WHERE 1=1 ORDER BY inspection_date DESC LIMIT ?"));
        assert!(
            query
                .sql()
                .contains("FROM `bigquery-public-data.new_york_city.restaurant_grades`")
        );
    }

    #[test]
    fn every_filter_becomes_a_bound_parameter() {
        let filter = Filter::default()
            .with_borough(Borough::StatenIsland)
            .with_cuisine("pizza")
            .with_min_grade(Grade::B)
            .unwrap()
            .with_limit(5, LimitBounds::default());
        let query = build(&filter, &table());

        assert_eq!(
            query.predicates(),
            &[
                Predicate::Always,
                Predicate::BoroughEquals,
                Predicate::CuisineContains,
                Predicate::GradeIn,
            ]
        );
        assert_eq!(
            query.params(),
            &[
                QueryParam::String("STATEN ISLAND".to_string()),
                QueryParam::String("%PIZZA%".to_string()),
                QueryParam::StringArray(vec!["A".to_string(), "B".to_string()]),
                QueryParam::Int64(5),
            ]
        );
        assert_eq!(placeholder_count(query.sql()), query.params().len());
        assert!(query.sql().ends_with(
            "WHERE 1=1 AND UPPER(boro) = ? AND UPPER(cuisine_description) LIKE ? \
             AND grade IN UNNEST(?) ORDER BY inspection_date DESC LIMIT ?"
        ));
    }

    #[test]
    fn filter_values_never_appear_in_sql_text() {
        let filter = Filter::default().with_cuisine("'; DROP TABLE grades; --");
        let query = build(&filter, &table());
        assert!(!query.sql().contains("DROP"));
        assert_eq!(
            query.params()[0],
            QueryParam::String("%'; DROP TABLE GRADES; --%".to_string())
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let filter = Filter::default().with_cuisine("100%_real\\");
        let query = build(&filter, &table());
        assert_eq!(
            query.params()[0],
            QueryParam::String("%100\\%\\_REAL\\\\%".to_string())
        );
    }

    #[test]
    fn same_filter_builds_same_query() {
        let filter = Filter::default()
            .with_borough(Borough::Queens)
            .with_min_grade(Grade::C)
            .unwrap();
        assert_eq!(build(&filter, &table()), build(&filter, &table()));
    }

    #[test]
    fn predicate_params_pair_in_order() {
        let filter = Filter::default()
            .with_borough(Borough::Bronx)
            .with_min_grade(Grade::A)
            .unwrap();
        let query = build(&filter, &table());
        let pairs: Vec<_> = query.predicate_params().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, Predicate::BoroughEquals);
        assert_eq!(pairs[1].1, &QueryParam::StringArray(vec!["A".to_string()]));
    }

    #[test]
    fn details_query_matches_name_and_borough() {
        let details = DetailsQuery::from_raw("joe's", Some("manhattan")).unwrap();
        let query = build_details(&details, 500, &table());
        assert_eq!(
            query.predicates(),
            &[
                Predicate::Always,
                Predicate::NameContains,
                Predicate::BoroughEquals
            ]
        );
        assert_eq!(
            query.params(),
            &[
                QueryParam::String("%JOE'S%".to_string()),
                QueryParam::String("MANHATTAN".to_string()),
                QueryParam::Int64(500),
            ]
        );
        assert_eq!(placeholder_count(query.sql()), 3);
    }

    #[test]
    fn distinct_query_lists_one_column() {
        let query = build_distinct(DistinctColumn::Cuisine, &table());
        assert_eq!(
            query.predicates(),
            &[
                Predicate::Always,
                Predicate::Present(DistinctColumn::Cuisine)
            ]
        );
        assert_eq!(
            query.params(),
            &[QueryParam::Int64(i64::from(DISTINCT_LIMIT))]
        );
        assert_eq!(
            query.sql(),
            "SELECT DISTINCT cuisine_description \
             FROM `bigquery-public-data.new_york_city.restaurant_grades` \
             WHERE 1=1 AND cuisine_description IS NOT NULL \
             ORDER BY cuisine_description LIMIT ?"
        );
        assert_eq!(query.predicate_params().count(), 0);

        let boroughs = build_distinct(DistinctColumn::Borough, &table());
        assert!(boroughs.sql().starts_with("SELECT DISTINCT boro FROM"));
        assert!(boroughs.sql().contains("AND boro IS NOT NULL ORDER BY boro"));
    }

    #[test]
    fn table_names_are_validated() {
        assert!(TableName::new("project.dataset.table").is_ok());
        assert!(TableName::new("my-project.nyc_data.grades_2024").is_ok());
        assert!(TableName::new("").is_err());
        assert!(TableName::new("a..b").is_err());
        assert!(TableName::new("grades` WHERE 1=1; --").is_err());
        assert!(TableName::new("grades table").is_err());
    }
}
