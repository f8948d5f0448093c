use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use search_client::SearchClient;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{ErrorTrendPoint, Significance, SignificantTerm},
    error::DataError,
    fixtures,
};

use crate::{
    json::{aggregation, round_tenth, Buckets, DocCount},
    FacadeError, Resource,
};

const LOGS_INDEX: &str = "logs-opsagent-*";
const TREND_BASELINE: u64 = 5;

/// Service the incident views look at when none is given.
pub const DEFAULT_SERVICE: &str = "order-service";

#[derive(Debug, Clone)]
pub struct ErrorTrends {
    service: String,
}

impl ErrorTrends {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn request_body(&self) -> Value {
        json!({
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "service.name": self.service } },
                        { "range": { "@timestamp": { "gte": "now-1h" } } }
                    ]
                }
            },
            "aggs": {
                "over_time": {
                    "date_histogram": { "field": "@timestamp", "fixed_interval": "5m" },
                    "aggs": {
                        "error_count": {
                            "filter": { "terms": { "log.level": ["ERROR", "FATAL"] } }
                        }
                    }
                }
            }
        })
    }
}

impl Default for ErrorTrends {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

#[derive(Debug, Deserialize)]
struct TrendBucket {
    /// Bucket start, epoch milliseconds.
    key: i64,
    error_count: DocCount,
}

fn map_trends(response: &Value) -> Result<Vec<ErrorTrendPoint>, DataError> {
    let over_time: Buckets<TrendBucket> = aggregation(response, "over_time")?;
    over_time
        .buckets
        .into_iter()
        .map(|bucket| {
            let start = DateTime::from_timestamp_millis(bucket.key).ok_or_else(|| {
                DataError::malformed(format!("bucket key {} is out of range", bucket.key))
            })?;
            Ok(ErrorTrendPoint {
                time: start.format("%H:%M").to_string(),
                errors: bucket.error_count.doc_count,
                baseline: TREND_BASELINE,
            })
        })
        .collect()
}

#[async_trait]
impl Resource for ErrorTrends {
    type Data = Vec<ErrorTrendPoint>;

    fn name(&self) -> &'static str {
        "error-trends"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::error_trend()
    }

    fn refresh_interval(&self) -> Option<Duration> {
        Some(Duration::from_secs(15))
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let response = client.aggregate(LOGS_INDEX, &self.request_body()).await?;
        Ok(map_trends(&response)?)
    }
}

#[derive(Debug, Clone)]
pub struct SignificantTerms {
    service: String,
}

impl SignificantTerms {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn request_body(&self) -> Value {
        json!({
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "service.name": self.service } },
                        { "terms": { "log.level": ["ERROR", "FATAL"] } },
                        { "range": { "@timestamp": { "gte": "now-1h" } } }
                    ]
                }
            },
            "aggs": {
                "unusual_errors": {
                    "significant_terms": { "field": "error.type", "size": 10 }
                }
            }
        })
    }
}

impl Default for SignificantTerms {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

#[derive(Debug, Deserialize)]
struct TermBucket {
    key: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    bg_count: Option<u64>,
    #[serde(default)]
    doc_count: Option<u64>,
}

fn map_terms(response: &Value) -> Result<Vec<SignificantTerm>, DataError> {
    let unusual: Buckets<TermBucket> = aggregation(response, "unusual_errors")?;
    Ok(unusual
        .buckets
        .into_iter()
        .map(|bucket| {
            let score = round_tenth(bucket.score.unwrap_or(0.0));
            SignificantTerm {
                term: bucket.key,
                score,
                bg_count: bucket.bg_count.unwrap_or(0),
                doc_count: bucket.doc_count.unwrap_or(0),
                significance: Significance::from_score(score),
            }
        })
        .collect())
}

#[async_trait]
impl Resource for SignificantTerms {
    type Data = Vec<SignificantTerm>;

    fn name(&self) -> &'static str {
        "significant-terms"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::significant_terms()
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let response = client.aggregate(LOGS_INDEX, &self.request_body()).await?;
        Ok(map_terms(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_buckets_become_clock_labels() {
        // 2026-01-15T03:00:00Z and 03:05
        let response = json!({"aggregations": {"over_time": {"buckets": [
            {"key": 1_768_446_000_000_i64, "key_as_string": "2026-01-15T03:00:00.000Z", "doc_count": 40, "error_count": {"doc_count": 3}},
            {"key": 1_768_446_300_000_i64, "key_as_string": "2026-01-15T03:05:00.000Z", "doc_count": 90, "error_count": {"doc_count": 61}}
        ]}}});

        let points = map_trends(&response).expect("map");

        assert_eq!(
            points,
            vec![
                ErrorTrendPoint { time: "03:00".into(), errors: 3, baseline: 5 },
                ErrorTrendPoint { time: "03:05".into(), errors: 61, baseline: 5 },
            ]
        );
    }

    #[test]
    fn trend_body_filters_on_service() {
        let body = ErrorTrends::new("payment-service").request_body();
        assert_eq!(
            body["query"]["bool"]["filter"][0]["term"]["service.name"],
            "payment-service"
        );
        assert_eq!(
            body["aggs"]["over_time"]["date_histogram"]["fixed_interval"],
            "5m"
        );
    }

    #[test]
    fn terms_are_scored_and_classified() {
        let response = json!({"aggregations": {"unusual_errors": {"doc_count": 500, "buckets": [
            {"key": "ConnectionPoolExhausted", "score": 97.06, "bg_count": 12, "doc_count": 340},
            {"key": "TimeoutException", "score": 62.44, "bg_count": 40, "doc_count": 120},
            {"key": "NullPointerException", "doc_count": 4}
        ]}}});

        let terms = map_terms(&response).expect("map");

        assert_eq!(terms[0].score, 97.1);
        assert_eq!(terms[0].significance, Significance::Critical);
        assert_eq!(terms[1].score, 62.4);
        assert_eq!(terms[1].significance, Significance::High);
        assert_eq!(terms[2].score, 0.0);
        assert_eq!(terms[2].bg_count, 0);
        assert_eq!(terms[2].significance, Significance::Medium);
    }

    #[test]
    fn trends_poll_and_terms_do_not() {
        assert_eq!(
            ErrorTrends::default().refresh_interval(),
            Some(Duration::from_secs(15))
        );
        assert_eq!(SignificantTerms::default().refresh_interval(), None);
        assert_eq!(SignificantTerms::default().service(), DEFAULT_SERVICE);
    }
}
