//! Thin HTTP client for the search backend: document search, aggregations and
//! the tabular `_query` endpoint.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub mod config;

pub use config::{load_settings, Settings};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to build search client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} failed: {status} {reason}")]
    Status {
        operation: &'static str,
        status: u16,
        reason: String,
    },
    #[error("invalid {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl SearchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    pub hits: Hits<T>,
    #[serde(default)]
    pub aggregations: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hits<T> {
    #[serde(default)]
    pub total: Option<TotalHits>,
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TotalHits {
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub columns: Vec<QueryColumn>,
    pub values: Vec<Vec<Value>>,
}

impl QueryResponse {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

#[derive(Clone)]
pub struct SearchClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(
        base_url: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SearchError::Client)?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// `None` when the settings describe mock mode.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(base_url) = settings.backend_url()? else {
            return Ok(None);
        };
        let client = Self::new(
            base_url,
            settings.es_api_key.clone(),
            Duration::from_secs(settings.request_timeout_seconds),
        )?;
        Ok(Some(client))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn search<T: DeserializeOwned>(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<SearchResponse<T>, SearchError> {
        self.post_json("search", &format!("{index}/_search"), body)
            .await
    }

    /// Runs `body` as a hits-free search (`size: 0` unless the body sets one).
    pub async fn aggregate(&self, index: &str, body: &Value) -> Result<Value, SearchError> {
        let body = with_default_size(body);
        self.post_json("aggregation", &format!("{index}/_search"), &body)
            .await
    }

    pub async fn query(
        &self,
        query: &str,
        params: Option<&Value>,
    ) -> Result<QueryResponse, SearchError> {
        let request = QueryRequest { query, params };
        self.post_json("query", "_query", &request).await
    }

    async fn post_json<B, R>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<R, SearchError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'));
        debug!(operation, %url, "search backend request");

        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("ApiKey {key}"));
        }

        let res = request
            .send()
            .await
            .map_err(|source| SearchError::Transport { operation, source })?;

        let status = res.status();
        if !status.is_success() {
            warn!(operation, %url, status = status.as_u16(), "search backend returned an error status");
            return Err(SearchError::Status {
                operation,
                status: status.as_u16(),
                reason: reason_phrase(status),
            });
        }

        res.json::<R>()
            .await
            .map_err(|source| SearchError::Decode { operation, source })
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

fn with_default_size(body: &Value) -> Value {
    let mut merged = Map::new();
    merged.insert("size".into(), Value::from(0));
    if let Value::Object(fields) = body {
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
