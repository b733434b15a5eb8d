//! The query service: live source first, built-in dataset on failure.

use std::sync::Arc;

use restaurant_finder_query_models::{
    DetailsQuery, DetailsResponse, DistinctColumn, DistinctValues, Filter, FilterError,
    LimitBounds, RawFilter, ResponseEnvelope,
};
use serde::Serialize;

use crate::agent::AgentSource;
use crate::bigquery::BigQueryWarehouse;
use crate::builder::TableName;
use crate::config::{ConfigError, QueryConfig};
use crate::mock::MockSource;
use crate::source::{QuerySource, WarehouseSource};

/// Reachability of the live source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Name of the configured live source, if any.
    pub live_source: Option<String>,
    /// Whether the live source answered a ping.
    pub live_available: bool,
}

/// Answers restaurant queries.
///
/// Every call tries the live source (if one is configured) exactly once.
/// Any failure of that attempt, including a timeout, is logged and the
/// whole response is served by [`MockSource`] instead, so no live/mock
/// mixing ever happens and callers only see caller-input errors.
pub struct QueryService {
    live: Option<Arc<dyn QuerySource>>,
    mock: MockSource,
    bounds: LimitBounds,
}

impl QueryService {
    /// Creates a service backed by `live`.
    #[must_use]
    pub fn new(live: Arc<dyn QuerySource>, bounds: LimitBounds) -> Self {
        Self {
            live: Some(live),
            mock: MockSource,
            bounds,
        }
    }

    /// Creates a service that always serves the built-in dataset.
    #[must_use]
    pub const fn mock_only(bounds: LimitBounds) -> Self {
        Self {
            live: None,
            mock: MockSource,
            bounds,
        }
    }

    /// Builds the live source described by `config`.
    ///
    /// A remote backend URL takes precedence over direct warehouse access.
    /// With neither configured the service is mock-only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the table name is invalid or an HTTP
    /// client cannot be built.
    pub fn from_config(config: &QueryConfig) -> Result<Self, ConfigError> {
        let bounds = config.bounds();

        if let Some(url) = config.agent_url.as_deref() {
            log::info!("Using remote query backend at {url}");
            let source = AgentSource::new(url, config.timeout())?;
            return Ok(Self::new(Arc::new(source), bounds));
        }

        if let Some(warehouse) = &config.warehouse {
            let table = TableName::new(&warehouse.table)?;
            log::info!(
                "Using BigQuery table {table} (project {})",
                warehouse.project_id
            );
            let client = BigQueryWarehouse::new(
                &warehouse.api_url,
                &warehouse.project_id,
                warehouse.access_token.clone(),
                warehouse.location.clone(),
                config.timeout(),
            )?;
            let source = WarehouseSource::new(Arc::new(client), table, config.timeout());
            return Ok(Self::new(Arc::new(source), bounds));
        }

        log::info!("No warehouse configured; serving built-in data only");
        Ok(Self::mock_only(bounds))
    }

    /// Limit bounds applied to filters built by this service.
    #[must_use]
    pub const fn bounds(&self) -> LimitBounds {
        self.bounds
    }

    /// Whether no live source is configured.
    #[must_use]
    pub const fn is_mock_only(&self) -> bool {
        self.live.is_none()
    }

    /// Runs `filter`, falling back to the built-in dataset if the live
    /// source fails. Never fails.
    pub async fn execute(&self, filter: &Filter) -> ResponseEnvelope {
        let filter = self.bounded(filter);

        if let Some(live) = &self.live {
            match live.search(&filter).await {
                Ok(envelope) => {
                    log::info!(
                        "Live query via {} returned {} records",
                        live.name(),
                        envelope.total_count()
                    );
                    return truncate(envelope, filter.limit());
                }
                Err(e) => {
                    log::warn!("Live query via {} failed, serving mock data: {e}", live.name());
                }
            }
        }

        self.mock.respond(&filter)
    }

    /// Builds a filter from untyped input and runs it.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if the input names an unknown borough or an
    /// invalid minimum grade.
    pub async fn execute_raw(&self, raw: &RawFilter) -> Result<ResponseEnvelope, FilterError> {
        let filter = Filter::from_raw(raw, self.bounds)?;
        Ok(self.execute(&filter).await)
    }

    /// Looks up every inspection of the restaurants whose name contains
    /// the queried name, capped at the limit ceiling. Falls back to the
    /// built-in dataset like [`Self::execute`].
    pub async fn details(&self, query: &DetailsQuery) -> DetailsResponse {
        let limit = self.bounds.max.max(1);

        if let Some(live) = &self.live {
            match live.details(query, limit).await {
                Ok(mut details) => {
                    details.inspections.truncate(limit_len(limit));
                    details.inspection_count = details.inspections.len();
                    return details;
                }
                Err(e) => {
                    log::warn!(
                        "Live details lookup via {} failed, serving mock data: {e}",
                        live.name()
                    );
                }
            }
        }

        self.mock.lookup(query, limit)
    }

    /// Lists every borough present in the data.
    pub async fn distinct_boroughs(&self) -> DistinctValues {
        self.distinct(DistinctColumn::Borough).await
    }

    /// Lists every cuisine present in the data.
    pub async fn distinct_cuisines(&self) -> DistinctValues {
        self.distinct(DistinctColumn::Cuisine).await
    }

    async fn distinct(&self, column: DistinctColumn) -> DistinctValues {
        if let Some(live) = &self.live {
            match live.distinct(column).await {
                Ok(values) => return values,
                Err(e) => {
                    log::warn!(
                        "Listing {} via {} failed, serving mock data: {e}",
                        column.column(),
                        live.name()
                    );
                }
            }
        }

        self.mock.list(column)
    }

    /// Pings the live source.
    pub async fn health(&self) -> HealthStatus {
        let Some(live) = &self.live else {
            return HealthStatus {
                live_source: None,
                live_available: false,
            };
        };

        let live_available = match live.ping().await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Live source {} is unavailable: {e}", live.name());
                false
            }
        };

        HealthStatus {
            live_source: Some(live.name().to_string()),
            live_available,
        }
    }

    /// Re-clamps the filter's limit into `[1, ceiling]` for this service.
    fn bounded(&self, filter: &Filter) -> Filter {
        filter
            .clone()
            .with_limit(i64::from(filter.limit()), self.bounds)
    }
}

fn truncate(envelope: ResponseEnvelope, limit: u32) -> ResponseEnvelope {
    if envelope.total_count() <= limit_len(limit) {
        return envelope;
    }
    let (mut records, info) = envelope.into_parts();
    records.truncate(limit_len(limit));
    ResponseEnvelope::new(records, info)
}

fn limit_len(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}
