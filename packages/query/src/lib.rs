#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Restaurant inspection query layer.
//!
//! A validated [`Filter`](restaurant_finder_query_models::Filter) flows one
//! way through the [`builder`], a live [`source::QuerySource`] and the
//! [`normalize`]r into a
//! [`ResponseEnvelope`](restaurant_finder_query_models::ResponseEnvelope).
//! When the live path fails for any reason the [`service::QueryService`]
//! answers from the built-in [`mock`] dataset instead.

pub mod agent;
pub mod bigquery;
pub mod builder;
pub mod config;
pub mod mock;
pub mod normalize;
pub mod service;
pub mod source;
pub mod warehouse;

pub use config::{ConfigError, QueryConfig, WarehouseConfig};
pub use service::{HealthStatus, QueryService};
pub use source::{QueryError, QuerySource, WarehouseSource};
