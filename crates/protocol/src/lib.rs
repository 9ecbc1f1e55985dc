//! Wire types shared by the session controller and the HTTP backend.
//!
//! Field names follow the development server's JSON (`uastmaps`, `uast`, `results`), so the
//! types can be posted and decoded as-is.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const CATALOG_PATH: &str = "/api/mappings";
pub const PARSE_PATH: &str = "/api/parse";
pub const QUERY_PATH: &str = "/api/query";

#[must_use]
pub fn baseline_path(language: &str) -> String {
    format!("{CATALOG_PATH}/{language}")
}

/// Network-level failure of a service call. Always retryable by re-triggering the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One entry of the mapping catalog. The list endpoint may only report a size; extensions are
/// filled in once the baseline itself has been fetched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct CatalogEntry {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

pub type CatalogPayload = BTreeMap<String, CatalogEntry>;

/// Baseline mapping as returned by the per-language endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct BaselinePayload {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(rename = "uast", default)]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct MappingOverride {
    pub extensions: Vec<String>,
    #[serde(rename = "uast")]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ParseRequest {
    pub code: String,
    pub language: String,
    #[serde(
        rename = "uastmaps",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub mapping_overrides: BTreeMap<String, MappingOverride>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct ParseResponse {
    #[serde(rename = "uast", default)]
    pub tree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResponse {
    #[must_use]
    pub fn reply(&self) -> ServiceReply<'_> {
        ServiceReply::classify(&self.tree, self.error.as_deref())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct QueryRequest {
    #[serde(rename = "uast")]
    pub tree: String,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct QueryResponse {
    #[serde(rename = "results", default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    #[must_use]
    pub fn reply(&self) -> ServiceReply<'_> {
        ServiceReply::classify(&self.result, self.error.as_deref())
    }
}

/// What a service response carries once the transport succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceReply<'a> {
    /// JSON-encoded payload, not yet decoded.
    Payload(&'a str),
    /// Structured error reported by the backend.
    Error(&'a str),
    /// Neither a payload nor an error.
    Empty,
}

impl<'a> ServiceReply<'a> {
    // A non-empty error wins: the server sends an empty payload next to it.
    fn classify(payload: &'a str, error: Option<&'a str>) -> Self {
        if let Some(error) = error.filter(|e| !e.trim().is_empty()) {
            return Self::Error(error);
        }
        if payload.trim().is_empty() {
            Self::Empty
        } else {
            Self::Payload(payload)
        }
    }
}

/// JSON Schemas of every request and response body, keyed by type name.
#[must_use]
pub fn wire_schemas() -> serde_json::Value {
    serde_json::json!({
        "CatalogPayload": schemars::schema_for!(CatalogPayload),
        "BaselinePayload": schemars::schema_for!(BaselinePayload),
        "ParseRequest": schemars::schema_for!(ParseRequest),
        "ParseResponse": schemars::schema_for!(ParseResponse),
        "QueryRequest": schemars::schema_for!(QueryRequest),
        "QueryResponse": schemars::schema_for!(QueryResponse),
    })
}

/// Two-space indented JSON, matching what the server emits.
pub fn pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
