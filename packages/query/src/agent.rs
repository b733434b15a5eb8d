//! Remote query backend client.
//!
//! Forwards filters to another deployment of the query endpoint
//! (`POST {base}/query`, `POST {base}/details`, `GET {base}/boroughs`,
//! `GET {base}/cuisines`, `GET {base}/health`) and
//! runs the returned restaurants back through the normalizer, so a remote
//! backend is held to the same record shape as the local warehouse.

use std::time::Duration;

use async_trait::async_trait;
use restaurant_finder_query_models::{
    DetailsQuery, DetailsResponse, DistinctColumn, DistinctValues, Filter, QueryInfo,
    ResponseEnvelope,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::normalize::normalize_rows;
use crate::source::{QueryError, QuerySource};
use crate::warehouse::{RawValue, WarehouseRow};

/// A remote query backend used as the live source.
pub struct AgentSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct AgentSearchResponse {
    #[serde(default)]
    restaurants: Vec<Map<String, Value>>,
    #[serde(default)]
    query_info: Option<AgentQueryInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentQueryInfo {
    #[serde(default)]
    mock_data: bool,
    #[serde(default)]
    table: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AgentDetailsResponse {
    #[serde(default)]
    inspections: Vec<Map<String, Value>>,
    #[serde(default)]
    mock_data: bool,
}

impl AgentSource {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Agent`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, QueryError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("POST {url}");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        check_status(resp).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, QueryError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        check_status(resp).await
    }

    fn transport_error(&self, error: reqwest::Error) -> QueryError {
        if error.is_timeout() {
            QueryError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            QueryError::Agent(error)
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, QueryError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(QueryError::AgentStatus {
            status: status.as_u16(),
            body: resp.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl QuerySource for AgentSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, filter: &Filter) -> Result<ResponseEnvelope, QueryError> {
        let resp = self.post("/query", &search_body(filter)).await?;
        let body: AgentSearchResponse = resp.json().await?;
        Ok(search_envelope(body, filter, &self.base_url))
    }

    async fn details(
        &self,
        query: &DetailsQuery,
        limit: u32,
    ) -> Result<DetailsResponse, QueryError> {
        let body = json!({
            "restaurant_name": query.name(),
            "borough": query.borough().map(|b| b.to_string()),
            "limit": limit,
        });
        let resp = self.post("/details", &body).await?;
        let body: AgentDetailsResponse = resp.json().await?;

        let rows: Vec<WarehouseRow> = body.inspections.into_iter().map(row_from_json).collect();
        Ok(DetailsResponse::new(
            query,
            normalize_rows(&rows),
            body.mock_data,
        ))
    }

    async fn distinct(&self, column: DistinctColumn) -> Result<DistinctValues, QueryError> {
        let resp = self.get(distinct_path(column)).await?;
        let body: DistinctValues = resp.json().await?;
        Ok(DistinctValues::new(body.values, body.mock_data))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        self.get("/health").await?;
        Ok(())
    }
}

const fn distinct_path(column: DistinctColumn) -> &'static str {
    match column {
        DistinctColumn::Borough => "/boroughs",
        DistinctColumn::Cuisine => "/cuisines",
    }
}

/// JSON body accepted by the remote `/query` endpoint.
fn search_body(filter: &Filter) -> Value {
    json!({
        "borough": filter.borough().map(|b| b.to_string()),
        "cuisine": filter.cuisine(),
        "min_grade": filter.min_grade().map(|g| g.to_string()),
        "limit": filter.limit(),
    })
}

fn search_envelope(body: AgentSearchResponse, filter: &Filter, base_url: &str) -> ResponseEnvelope {
    let info = body.query_info.unwrap_or_default();
    let rows: Vec<WarehouseRow> = body.restaurants.into_iter().map(row_from_json).collect();
    let records = normalize_rows(&rows);

    let query_info = if info.mock_data {
        QueryInfo::mock(filter.clone())
    } else {
        QueryInfo::live(filter.clone(), info.table.as_deref().unwrap_or(base_url))
    };
    ResponseEnvelope::new(records, query_info)
}

/// Converts one JSON restaurant object into a raw row. Nested values are
/// kept as their JSON text.
fn row_from_json(object: Map<String, Value>) -> WarehouseRow {
    object
        .into_iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::Null => RawValue::Null,
                Value::Bool(b) => RawValue::Bool(b),
                Value::Number(n) => n
                    .as_i64()
                    .map(RawValue::Int)
                    .or_else(|| n.as_f64().map(RawValue::Float))
                    .unwrap_or(RawValue::Null),
                Value::String(s) => RawValue::String(s),
                other @ (Value::Array(_) | Value::Object(_)) => RawValue::String(other.to_string()),
            };
            (key, raw)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use restaurant_finder_query_models::{Borough, Grade, LimitBounds};

    #[test]
    fn search_body_uses_wire_names() {
        let filter = Filter::default()
            .with_borough(Borough::StatenIsland)
            .with_cuisine("Pizza")
            .with_min_grade(Grade::B)
            .unwrap()
            .with_limit(10, LimitBounds::default());

        assert_eq!(
            search_body(&filter),
            json!({
                "borough": "STATEN ISLAND",
                "cuisine": "Pizza",
                "min_grade": "B",
                "limit": 10,
            })
        );
    }

    #[test]
    fn empty_filter_sends_nulls() {
        assert_eq!(
            search_body(&Filter::default()),
            json!({ "borough": null, "cuisine": null, "min_grade": null, "limit": 100 })
        );
    }

    #[test]
    fn remote_restaurants_are_normalized() {
        let body: AgentSearchResponse = serde_json::from_value(json!({
            "restaurants": [
                {
                    "dba": "Joe's Pizza",
                    "boro": "MANHATTAN",
                    "cuisine_description": "Pizza",
                    "grade": "A",
                    "score": 12,
                    "inspection_date": "2023-10-15T00:00:00",
                    "latitude": 40.7589,
                    "longitude": 0
                },
                { "boro": "QUEENS" }
            ],
            "total_count": 2,
            "query_info": { "mock_data": false, "table": "nyc.grades" }
        }))
        .unwrap();

        let envelope = search_envelope(body, &Filter::default(), "http://agent");
        assert_eq!(envelope.total_count(), 1);
        assert!(!envelope.is_mock());
        assert_eq!(envelope.query_info().source_table(), Some("nyc.grades"));

        let record = &envelope.records()[0];
        assert_eq!(record.borough, Borough::Manhattan);
        assert_eq!(record.inspection_date.as_deref(), Some("2023-10-15"));
        assert_eq!(record.score, Some(12));
        assert_eq!(record.longitude, None);
    }

    #[test]
    fn remote_mock_flag_is_preserved() {
        let body: AgentSearchResponse = serde_json::from_value(json!({
            "restaurants": [],
            "query_info": { "mock_data": true }
        }))
        .unwrap();

        let envelope = search_envelope(body, &Filter::default(), "http://agent");
        assert!(envelope.is_mock());
        assert_eq!(envelope.query_info().source_table(), None);
    }

    #[test]
    fn missing_query_info_defaults_to_live_at_base_url() {
        let body: AgentSearchResponse =
            serde_json::from_value(json!({ "restaurants": [] })).unwrap();
        let envelope = search_envelope(body, &Filter::default(), "http://agent");
        assert_eq!(envelope.query_info().source_table(), Some("http://agent"));
    }

    #[test]
    fn distinct_paths_match_the_listing_endpoints() {
        assert_eq!(distinct_path(DistinctColumn::Borough), "/boroughs");
        assert_eq!(distinct_path(DistinctColumn::Cuisine), "/cuisines");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let source = AgentSource::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(source.search(&Filter::default()).await.is_err());
        assert!(source.distinct(DistinctColumn::Cuisine).await.is_err());
        assert!(source.ping().await.is_err());
    }
}
