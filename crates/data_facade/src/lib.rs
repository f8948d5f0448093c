//! Mock-vs-live data access for the dashboard resources.
//!
//! Each logical resource implements [`Resource`]; a [`DataFeed`] wraps it with
//! the fallback policy: a fetch always resolves, and on any backend failure the
//! feed keeps the last-known rows (initially the static fixture) and records a
//! notice for the host to show.

use std::time::Duration;

use async_trait::async_trait;
use search_client::{SearchClient, SearchError, Settings};
use shared::{
    domain::RunbookCategory,
    error::{DataError, DataNotice, ErrorCode},
};
use thiserror::Error;
use tracing::warn;

pub mod feed;
mod json;
pub mod resources;

pub use feed::{DataFeed, PollHandle, Snapshot};
pub use resources::{
    AlertRules, BlastRadius, ErrorTrends, InfraHosts, Runbooks, ServiceHealthResource,
    SignificantTerms,
};

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Data(#[from] DataError),
}

impl FacadeError {
    pub fn notice(&self) -> DataNotice {
        let code = match self {
            Self::Search(err) if err.is_unauthorized() => ErrorCode::Unauthorized,
            Self::Search(SearchError::Status { .. }) => ErrorCode::BadStatus,
            Self::Search(SearchError::Decode { .. }) => ErrorCode::Malformed,
            Self::Search(SearchError::Transport { .. }) => ErrorCode::Unreachable,
            Self::Search(SearchError::Client(_)) => ErrorCode::Internal,
            Self::Data(err) => err.code,
        };
        DataNotice::new(code, self.to_string())
    }
}

#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Static dataset of the same shape as the live result.
    fn fallback(&self) -> Self::Data;

    fn refresh_interval(&self) -> Option<Duration> {
        None
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError>;
}

/// Entry point for hosts: hands out one feed per resource, all sharing the
/// same backend client (or none in mock mode).
#[derive(Clone)]
pub struct DataFacade {
    client: Option<SearchClient>,
}

impl DataFacade {
    pub fn new(client: Option<SearchClient>) -> Self {
        Self { client }
    }

    pub fn mock() -> Self {
        Self { client: None }
    }

    /// Live when the settings name a usable backend. An invalid URL or a
    /// client that cannot be built is logged and the facade serves fixtures.
    pub fn from_settings(settings: &Settings) -> Self {
        match SearchClient::from_settings(settings) {
            Ok(client) => Self::new(client),
            Err(err) => {
                warn!(error = %err, "backend settings unusable, serving static data");
                Self::mock()
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    pub fn feed<R: Resource>(&self, resource: R) -> DataFeed<R> {
        DataFeed::new(resource, self.client.clone())
    }

    pub fn services(&self) -> DataFeed<ServiceHealthResource> {
        self.feed(ServiceHealthResource)
    }

    pub fn alert_rules(&self) -> DataFeed<AlertRules> {
        self.feed(AlertRules)
    }

    pub fn error_trends(&self, service: impl Into<String>) -> DataFeed<ErrorTrends> {
        self.feed(ErrorTrends::new(service))
    }

    pub fn significant_terms(&self, service: impl Into<String>) -> DataFeed<SignificantTerms> {
        self.feed(SignificantTerms::new(service))
    }

    pub fn infra_hosts(&self) -> DataFeed<InfraHosts> {
        self.feed(InfraHosts)
    }

    pub fn blast_radius(&self) -> DataFeed<BlastRadius> {
        self.feed(BlastRadius)
    }

    pub fn runbooks(&self, category: Option<RunbookCategory>) -> DataFeed<Runbooks> {
        self.feed(Runbooks::new(category))
    }
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod feed_tests;

#[cfg(test)]
#[path = "tests/live_tests.rs"]
mod live_tests;
