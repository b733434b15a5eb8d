//! `BigQuery` REST client implementing [`Warehouse`].
//!
//! Queries go through the synchronous `jobs.query` endpoint with
//! `parameterMode: POSITIONAL`, so every filter value travels as a typed
//! query parameter.
//!
//! See <https://cloud.google.com/bigquery/docs/reference/rest/v2/jobs/query>

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

use crate::builder::{QueryParam, WarehouseQuery};
use crate::warehouse::{RawValue, Warehouse, WarehouseError, WarehouseRow};

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// A `BigQuery` project reached over the REST API.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
    access_token: Option<String>,
    location: Option<String>,
    timeout: Duration,
}

impl BigQueryWarehouse {
    /// Creates a client for `project_id`.
    ///
    /// `timeout` bounds both the HTTP request and the server-side wait for
    /// the job to complete.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        project_id: &str,
        access_token: Option<String>,
        location: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WarehouseError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            access_token,
            location,
            timeout,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> WarehouseError {
        if error.is_timeout() {
            WarehouseError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            WarehouseError::Http(error)
        }
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn run(&self, query: &WarehouseQuery) -> Result<Vec<WarehouseRow>, WarehouseError> {
        let url = format!("{}/projects/{}/queries", self.api_url, self.project_id);
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let body = request_body(query, timeout_ms, self.location.as_deref());

        let resp = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WarehouseError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await.map_err(|e| self.transport_error(e))?;
        let rows = parse_response(&body)?;
        log::debug!("BigQuery returned {} rows", rows.len());
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        let url = format!("{}/projects/{}/datasets", self.api_url, self.project_id);
        let resp = self
            .authorize(self.client.get(&url))
            .query(&[("maxResults", "1")])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WarehouseError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            })
        }
    }
}

/// Builds the `jobs.query` request body.
fn request_body(query: &WarehouseQuery, timeout_ms: u64, location: Option<&str>) -> Value {
    let params: Vec<Value> = query.params().iter().map(query_parameter).collect();

    let mut body = json!({
        "query": query.sql(),
        "useLegacySql": false,
        "parameterMode": "POSITIONAL",
        "queryParameters": params,
        "timeoutMs": timeout_ms,
    });
    if let Some(location) = location {
        body["location"] = json!(location);
    }
    body
}

fn query_parameter(param: &QueryParam) -> Value {
    match param {
        QueryParam::String(s) => json!({
            "parameterType": { "type": "STRING" },
            "parameterValue": { "value": s },
        }),
        QueryParam::StringArray(values) => json!({
            "parameterType": { "type": "ARRAY", "arrayType": { "type": "STRING" } },
            "parameterValue": {
                "arrayValues": values.iter().map(|v| json!({ "value": v })).collect::<Vec<_>>(),
            },
        }),
        QueryParam::Int64(n) => json!({
            "parameterType": { "type": "INT64" },
            "parameterValue": { "value": n.to_string() },
        }),
    }
}

/// Decodes a `jobs.query` response into rows keyed by column name.
fn parse_response(body: &Value) -> Result<Vec<WarehouseRow>, WarehouseError> {
    if let Some(message) = body["status"]["errorResult"]["message"].as_str() {
        return Err(WarehouseError::Job {
            message: message.to_string(),
        });
    }

    if body["jobComplete"].as_bool() != Some(true) {
        return Err(WarehouseError::Job {
            message: "query did not complete within the request timeout".to_string(),
        });
    }

    let fields = body["schema"]["fields"]
        .as_array()
        .ok_or_else(|| WarehouseError::Decode {
            message: "response has no schema".to_string(),
        })?;

    let columns: Vec<(&str, &str)> = fields
        .iter()
        .map(|f| {
            (
                f["name"].as_str().unwrap_or_default(),
                f["type"].as_str().unwrap_or("STRING"),
            )
        })
        .collect();

    let Some(rows) = body["rows"].as_array() else {
        return Ok(Vec::new());
    };

    rows.iter()
        .map(|row| {
            let cells = row["f"].as_array().ok_or_else(|| WarehouseError::Decode {
                message: "row has no cells".to_string(),
            })?;
            Ok(columns
                .iter()
                .zip(cells)
                .map(|((name, ty), cell)| ((*name).to_string(), decode_cell(ty, &cell["v"])))
                .collect())
        })
        .collect()
}

/// Converts one cell according to its schema type. Values that do not
/// decode as their declared type are kept as text for the normalizer.
fn decode_cell(ty: &str, value: &Value) -> RawValue {
    let Some(text) = value.as_str() else {
        return match value {
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(RawValue::Int)
                .or_else(|| n.as_f64().map(RawValue::Float))
                .unwrap_or(RawValue::Null),
            _ => RawValue::Null,
        };
    };

    let decoded = match ty {
        "INTEGER" | "INT64" => text.parse().ok().map(RawValue::Int),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => text.parse().ok().map(RawValue::Float),
        "BOOLEAN" | "BOOL" => text.parse().ok().map(RawValue::Bool),
        "DATE" => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(RawValue::Date),
        "DATETIME" => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(RawValue::DateTime),
        "TIMESTAMP" => parse_epoch_seconds(text).map(RawValue::DateTime),
        _ => None,
    };

    decoded.unwrap_or_else(|| RawValue::String(text.to_string()))
}

/// `TIMESTAMP` cells are encoded as floating-point seconds since the Unix
/// epoch (e.g. `"1.6973568E9"`).
#[allow(clippy::cast_possible_truncation)]
fn parse_epoch_seconds(text: &str) -> Option<NaiveDateTime> {
    let seconds: f64 = text.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}
