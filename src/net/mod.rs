//! Wire types and the transport seam for the two options endpoints.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::HttpTransport;

/// Body of `POST <options-endpoint>`. Selections exclude the search facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsRequest {
    pub start_date: String,
    pub end_date: String,
    pub selections: BTreeMap<String, Vec<String>>,
    pub facets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    #[serde(default)]
    pub min: String,
    #[serde(default)]
    pub max: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsResponse {
    #[serde(default)]
    pub options: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub dates: Option<DateBounds>,
    #[serde(default)]
    pub rows: Option<u64>,
}

/// Body of `POST <search-options-endpoint>`. Selections exclude the search
/// facet; the response is a bare array of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    pub limit: usize,
    pub start_date: String,
    pub end_date: String,
    pub selections: BTreeMap<String, Vec<String>>,
}

#[async_trait]
pub trait OptionsTransport: Send + Sync {
    async fn fetch_options(&self, endpoint: &str, req: &OptionsRequest) -> Result<OptionsResponse>;
    async fn search_options(&self, endpoint: &str, req: &SearchRequest) -> Result<Vec<String>>;
}
