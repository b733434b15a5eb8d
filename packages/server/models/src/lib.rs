#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the restaurant finder server.
//!
//! The query endpoint itself speaks the query layer's own
//! `RawFilter`/`ResponseEnvelope` types; the types here cover health,
//! details lookups and error bodies.

use serde::{Deserialize, Serialize};

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `"healthy"` while the server is answering.
    pub status: String,
    /// Whether the live warehouse (or remote backend) answered a ping.
    pub warehouse_available: bool,
    /// Name of the configured live source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_source: Option<String>,
    /// Server version.
    pub version: String,
}

/// `POST /details` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsRequest {
    /// Restaurant name, or part of it.
    #[serde(default)]
    pub restaurant_name: String,
    /// Optional borough to narrow the lookup.
    #[serde(default)]
    pub borough: Option<String>,
}

/// Error body returned with every non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Request field the error refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    /// Creates an error with no associated field.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
        }
    }

    /// Attaches the offending request field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}
