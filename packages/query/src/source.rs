//! Live query sources.
//!
//! A [`QuerySource`] answers searches and details lookups from real data.
//! Failures are reported as [`QueryError`]; the query service turns any of
//! them into a mock-backed response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use restaurant_finder_query_models::{
    DetailsQuery, DetailsResponse, DistinctColumn, DistinctValues, Filter, QueryInfo,
    ResponseEnvelope, RestaurantRecord,
};

use crate::builder::{self, TableName, WarehouseQuery};
use crate::normalize::{column_values, normalize_rows};
use crate::warehouse::{Warehouse, WarehouseError, WarehouseRow};

/// Errors from a live query source.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The warehouse failed.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// The remote query backend could not be reached or sent an
    /// unreadable response.
    #[error("Remote query backend request failed: {0}")]
    Agent(#[from] reqwest::Error),

    /// The remote query backend answered with a non-success status.
    #[error("Remote query backend returned HTTP {status}: {body}")]
    AgentStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The live query did not finish in time.
    #[error("Live query timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },
}

/// A source of live restaurant inspection data.
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Short description for logs and health output (e.g. the table name).
    fn name(&self) -> &str;

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the source is unavailable or fails.
    async fn search(&self, filter: &Filter) -> Result<ResponseEnvelope, QueryError>;

    /// Looks up every inspection of the restaurants matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the source is unavailable or fails.
    async fn details(&self, query: &DetailsQuery, limit: u32)
    -> Result<DetailsResponse, QueryError>;

    /// Lists the distinct values of `column`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the source is unavailable or fails.
    async fn distinct(&self, column: DistinctColumn) -> Result<DistinctValues, QueryError>;

    /// Checks that the source is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if it is not.
    async fn ping(&self) -> Result<(), QueryError>;
}

/// Queries a [`Warehouse`] directly.
pub struct WarehouseSource {
    warehouse: Arc<dyn Warehouse>,
    table: TableName,
    timeout: Duration,
}

impl WarehouseSource {
    /// Creates a source reading `table` through `warehouse`, bounding every
    /// query by `timeout`.
    #[must_use]
    pub fn new(warehouse: Arc<dyn Warehouse>, table: TableName, timeout: Duration) -> Self {
        Self {
            warehouse,
            table,
            timeout,
        }
    }

    async fn fetch(&self, query: &WarehouseQuery) -> Result<Vec<WarehouseRow>, QueryError> {
        log::debug!("Warehouse query: {}", query.sql());
        log::debug!("Warehouse params: {:?}", query.params());

        Ok(tokio::time::timeout(self.timeout, self.warehouse.run(query))
            .await
            .map_err(|_| QueryError::Timeout {
                seconds: self.timeout.as_secs(),
            })??)
    }

    async fn run(&self, query: &WarehouseQuery) -> Result<Vec<RestaurantRecord>, QueryError> {
        Ok(normalize_rows(&self.fetch(query).await?))
    }
}

#[async_trait]
impl QuerySource for WarehouseSource {
    fn name(&self) -> &str {
        self.table.as_str()
    }

    async fn search(&self, filter: &Filter) -> Result<ResponseEnvelope, QueryError> {
        let query = builder::build(filter, &self.table);
        let records = self.run(&query).await?;
        Ok(ResponseEnvelope::new(
            records,
            QueryInfo::live(filter.clone(), self.table.as_str()),
        ))
    }

    async fn details(
        &self,
        query: &DetailsQuery,
        limit: u32,
    ) -> Result<DetailsResponse, QueryError> {
        let built = builder::build_details(query, limit, &self.table);
        let records = self.run(&built).await?;
        Ok(DetailsResponse::new(query, records, false))
    }

    async fn distinct(&self, column: DistinctColumn) -> Result<DistinctValues, QueryError> {
        let rows = self
            .fetch(&builder::build_distinct(column, &self.table))
            .await?;
        Ok(DistinctValues::new(
            column_values(&rows, column.column()),
            false,
        ))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        tokio::time::timeout(self.timeout, self.warehouse.ping())
            .await
            .map_err(|_| QueryError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use restaurant_finder_query_models::{Borough, Grade, LimitBounds};

    /// In-memory warehouse that records the queries it receives.
    pub struct FakeWarehouse {
        pub rows: Vec<WarehouseRow>,
        pub delay: Option<Duration>,
        pub fail: bool,
        pub seen: Mutex<Vec<WarehouseQuery>>,
    }

    impl FakeWarehouse {
        pub fn with_rows(rows: Vec<WarehouseRow>) -> Self {
            Self {
                rows,
                delay: None,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::with_rows(Vec::new())
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::with_rows(Vec::new())
            }
        }
    }

    #[async_trait]
    impl Warehouse for FakeWarehouse {
        async fn run(&self, query: &WarehouseQuery) -> Result<Vec<WarehouseRow>, WarehouseError> {
            self.seen.lock().unwrap().push(query.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(WarehouseError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(self.rows.clone())
        }

        async fn ping(&self) -> Result<(), WarehouseError> {
            if self.fail {
                Err(WarehouseError::Job {
                    message: "unreachable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    pub fn pizza_row(name: &str, date: &str) -> WarehouseRow {
        WarehouseRow::new()
            .with("dba", name)
            .with("boro", "Manhattan")
            .with("cuisine_description", "Pizza")
            .with("grade", "A")
            .with("score", 10_i64)
            .with("inspection_date", date)
    }

    fn source(warehouse: FakeWarehouse) -> (Arc<FakeWarehouse>, WarehouseSource) {
        let warehouse = Arc::new(warehouse);
        let source = WarehouseSource::new(
            warehouse.clone(),
            TableName::new("p.d.grades").unwrap(),
            Duration::from_secs(5),
        );
        (warehouse, source)
    }

    #[tokio::test]
    async fn search_normalizes_rows_and_marks_live() {
        let (_, source) = source(FakeWarehouse::with_rows(vec![
            pizza_row("Joe's Pizza", "2023-10-15"),
            WarehouseRow::new().with("boro", "Manhattan"),
        ]));

        let envelope = source.search(&Filter::default()).await.unwrap();
        assert_eq!(envelope.total_count(), 1);
        assert!(!envelope.is_mock());
        assert_eq!(envelope.query_info().source_table(), Some("p.d.grades"));
        assert_eq!(envelope.records()[0].name, "Joe's Pizza");
    }

    #[tokio::test]
    async fn search_sends_the_built_query() {
        let (warehouse, source) = source(FakeWarehouse::with_rows(Vec::new()));
        let filter = Filter::default()
            .with_borough(Borough::Queens)
            .with_min_grade(Grade::A)
            .unwrap()
            .with_limit(7, LimitBounds::default());

        source.search(&filter).await.unwrap();

        let seen = warehouse.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            builder::build(&filter, &TableName::new("p.d.grades").unwrap())
        );
    }

    #[tokio::test]
    async fn details_are_live() {
        let (_, source) = source(FakeWarehouse::with_rows(vec![pizza_row(
            "Joe's Pizza",
            "2023-10-15",
        )]));
        let query = DetailsQuery::from_raw("joe", None).unwrap();

        let details = source.details(&query, 50).await.unwrap();
        assert!(!details.mock_data);
        assert_eq!(details.inspection_count, 1);
    }

    #[tokio::test]
    async fn distinct_values_come_from_the_warehouse() {
        let (warehouse, source) = source(FakeWarehouse::with_rows(vec![
            WarehouseRow::new().with("cuisine_description", "Pizza"),
            WarehouseRow::new().with("cuisine_description", "Chinese"),
            WarehouseRow::new().with("cuisine_description", " "),
        ]));

        let values = source.distinct(DistinctColumn::Cuisine).await.unwrap();
        assert_eq!(values.values, ["Chinese", "Pizza"]);
        assert!(!values.mock_data);

        let seen = warehouse.seen.lock().unwrap();
        assert!(seen[0].sql().starts_with("SELECT DISTINCT cuisine_description"));
    }

    #[tokio::test]
    async fn warehouse_errors_propagate() {
        let (_, source) = source(FakeWarehouse::failing());
        assert!(matches!(
            source.search(&Filter::default()).await,
            Err(QueryError::Warehouse(WarehouseError::Status { status: 503, .. }))
        ));
        assert!(source.ping().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_queries_time_out() {
        let (_, source) = source(FakeWarehouse::slow(Duration::from_secs(60)));
        assert!(matches!(
            source.search(&Filter::default()).await,
            Err(QueryError::Timeout { seconds: 5 })
        ));
    }
}
