//! Runtime configuration for the query service.
//!
//! Settings come from an optional TOML file (path in
//! `RESTAURANT_FINDER_CONFIG`), then individual environment variables
//! override whatever the file set. With neither present the service runs
//! in mock-only mode.
//!
//! ```toml
//! agent_url = "https://nyc-restaurants.example.run.app"
//! timeout_secs = 30
//! default_limit = 100
//! max_limit = 500
//!
//! [warehouse]
//! project_id = "my-project"
//! table = "bigquery-public-data.new_york_city.restaurant_grades"
//! location = "US"
//! ```

use std::path::Path;
use std::time::Duration;

use restaurant_finder_query_models::LimitBounds;
use serde::Deserialize;

use crate::bigquery::DEFAULT_API_URL;
use crate::builder::InvalidTableName;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_VAR: &str = "RESTAURANT_FINDER_CONFIG";

/// Public NYC restaurant grades table.
pub const DEFAULT_TABLE: &str = "bigquery-public-data.new_york_city.restaurant_grades";

/// Errors raised while loading configuration or building the live source.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`QueryConfig`].
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value {value:?} for {var}")]
    InvalidOverride {
        /// Variable name.
        var: &'static str,
        /// The value as set.
        value: String,
    },

    /// The configured table is not a valid table reference.
    #[error(transparent)]
    InvalidTable(#[from] InvalidTableName),

    /// The warehouse HTTP client could not be built.
    #[error("Failed to build warehouse client: {0}")]
    Warehouse(#[from] crate::warehouse::WarehouseError),

    /// The remote backend HTTP client could not be built.
    #[error("Failed to build remote backend client: {0}")]
    Agent(#[from] crate::source::QueryError),
}

/// Connection settings for the `BigQuery` warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WarehouseConfig {
    /// Project the query jobs are billed to.
    pub project_id: String,
    /// Fully-qualified inspection table.
    #[serde(default = "default_table")]
    pub table: String,
    /// `OAuth2` bearer token. Requests are sent unauthenticated when unset.
    #[serde(default)]
    pub access_token: Option<String>,
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Processing location (e.g. `"US"`).
    #[serde(default)]
    pub location: Option<String>,
}

impl WarehouseConfig {
    /// Creates a configuration for `project_id` with every other setting
    /// at its default.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            table: default_table(),
            access_token: None,
            api_url: default_api_url(),
            location: None,
        }
    }
}

/// Query service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Direct warehouse access. Ignored when `agent_url` is set.
    pub warehouse: Option<WarehouseConfig>,
    /// Base URL of a remote query backend exposing `POST /query`.
    pub agent_url: Option<String>,
    /// Upper bound on a single live query.
    pub timeout_secs: u64,
    /// Limit applied when the caller supplies none.
    pub default_limit: u32,
    /// Largest limit a caller may request.
    pub max_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            warehouse: None,
            agent_url: None,
            timeout_secs: 30,
            default_limit: restaurant_finder_query_models::DEFAULT_LIMIT,
            max_limit: restaurant_finder_query_models::MAX_LIMIT,
        }
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl QueryConfig {
    /// Loads the file named by `RESTAURANT_FINDER_CONFIG` (if set) and
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override has an invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Reads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not valid.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies overrides read through `lookup`. Empty values are ignored.
    ///
    /// | Variable | Setting |
    /// |---|---|
    /// | `BIGQUERY_PROJECT` | `warehouse.project_id` (enables the warehouse) |
    /// | `BIGQUERY_TABLE` | `warehouse.table` |
    /// | `BIGQUERY_ACCESS_TOKEN` | `warehouse.access_token` |
    /// | `BIGQUERY_API_URL` | `warehouse.api_url` |
    /// | `BIGQUERY_LOCATION` | `warehouse.location` |
    /// | `NYC_RESTAURANTS_AGENT_URL` | `agent_url` |
    /// | `WAREHOUSE_TIMEOUT_SECS` | `timeout_secs` |
    /// | `QUERY_DEFAULT_LIMIT` | `default_limit` |
    /// | `QUERY_MAX_LIMIT` | `max_limit` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if a numeric variable does
    /// not parse, or `WAREHOUSE_TIMEOUT_SECS` is zero.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(project) = get("BIGQUERY_PROJECT") {
            match &mut self.warehouse {
                Some(warehouse) => warehouse.project_id = project,
                None => self.warehouse = Some(WarehouseConfig::new(project)),
            }
        }

        if let Some(warehouse) = &mut self.warehouse {
            if let Some(table) = get("BIGQUERY_TABLE") {
                warehouse.table = table;
            }
            if let Some(token) = get("BIGQUERY_ACCESS_TOKEN") {
                warehouse.access_token = Some(token);
            }
            if let Some(url) = get("BIGQUERY_API_URL") {
                warehouse.api_url = url;
            }
            if let Some(location) = get("BIGQUERY_LOCATION") {
                warehouse.location = Some(location);
            }
        }

        if let Some(url) = get("NYC_RESTAURANTS_AGENT_URL") {
            self.agent_url = Some(url);
        }

        if let Some(value) = get("WAREHOUSE_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("WAREHOUSE_TIMEOUT_SECS", &value)?;
            if self.timeout_secs == 0 {
                return Err(ConfigError::InvalidOverride {
                    var: "WAREHOUSE_TIMEOUT_SECS",
                    value,
                });
            }
        }
        if let Some(value) = get("QUERY_DEFAULT_LIMIT") {
            self.default_limit = parse_number("QUERY_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = get("QUERY_MAX_LIMIT") {
            self.max_limit = parse_number("QUERY_MAX_LIMIT", &value)?;
        }

        Ok(())
    }

    /// Limit bounds for filters built under this configuration.
    #[must_use]
    pub fn bounds(&self) -> LimitBounds {
        let max = self.max_limit.max(1);
        LimitBounds {
            default: self.default_limit.clamp(1, max),
            max,
        }
    }

    /// Live query timeout, never shorter than one second.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            var,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_are_mock_only() {
        let config = QueryConfig::default();
        assert!(config.warehouse.is_none());
        assert!(config.agent_url.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.bounds(), LimitBounds::default());
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config = QueryConfig::from_toml(
            r#"
            max_limit = 200

            [warehouse]
            project_id = "inspections"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_limit, 200);
        assert_eq!(config.default_limit, 100);
        let warehouse = config.warehouse.unwrap();
        assert_eq!(warehouse.project_id, "inspections");
        assert_eq!(warehouse.table, DEFAULT_TABLE);
        assert_eq!(warehouse.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            QueryConfig::from_toml("timeout_secs = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn project_override_enables_warehouse() {
        let mut config = QueryConfig::default();
        config
            .apply_overrides(env(&[
                ("BIGQUERY_PROJECT", "inspections"),
                ("BIGQUERY_TABLE", "inspections.nyc.grades"),
                ("WAREHOUSE_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();

        let warehouse = config.warehouse.as_ref().unwrap();
        assert_eq!(warehouse.project_id, "inspections");
        assert_eq!(warehouse.table, "inspections.nyc.grades");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn table_override_without_project_is_ignored() {
        let mut config = QueryConfig::default();
        config
            .apply_overrides(env(&[("BIGQUERY_TABLE", "a.b.c")]))
            .unwrap();
        assert!(config.warehouse.is_none());
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut config = QueryConfig::default();
        config
            .apply_overrides(env(&[("NYC_RESTAURANTS_AGENT_URL", "  ")]))
            .unwrap();
        assert!(config.agent_url.is_none());
    }

    #[test]
    fn invalid_numeric_override_is_an_error() {
        let mut config = QueryConfig::default();
        let err = config
            .apply_overrides(env(&[("QUERY_MAX_LIMIT", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                var: "QUERY_MAX_LIMIT",
                ..
            }
        ));
    }

    #[test]
    fn bounds_keep_default_within_max() {
        let config = QueryConfig {
            default_limit: 1000,
            max_limit: 50,
            ..QueryConfig::default()
        };
        assert_eq!(
            config.bounds(),
            LimitBounds {
                default: 50,
                max: 50
            }
        );

        let zero = QueryConfig {
            default_limit: 0,
            max_limit: 0,
            ..QueryConfig::default()
        };
        assert_eq!(zero.bounds(), LimitBounds { default: 1, max: 1 });
    }

    #[test]
    fn zero_timeout_override_is_rejected() {
        let mut config = QueryConfig::default();
        let err = config
            .apply_overrides(env(&[("WAREHOUSE_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                var: "WAREHOUSE_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn zero_timeout_from_file_waits_one_second() {
        let config = QueryConfig::from_toml("timeout_secs = 0").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
