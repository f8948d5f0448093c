use std::time::Duration;

use async_trait::async_trait;
use search_client::SearchClient;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{ServiceHealth, ServiceStatus},
    error::DataError,
    fixtures,
};

use super::SERVICE_HEALTH_INDEX;
use crate::{
    json::{aggregation, round_tenth, Buckets, TopHits},
    FacadeError, Resource,
};

const TREND_POINTS: usize = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceHealthResource;

#[derive(Debug, Deserialize)]
struct ServiceBucket {
    key: String,
    latest: TopHits<HealthSample>,
}

#[derive(Debug, Default, Deserialize)]
struct HealthSample {
    error_rate: Option<f64>,
    avg_duration_ms: Option<f64>,
    total_requests: Option<u64>,
}

fn request_body() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "by_service": {
                "terms": { "field": "service.name", "size": 20 },
                "aggs": {
                    "latest": {
                        "top_hits": {
                            "size": TREND_POINTS,
                            "sort": [{ "time_bucket": { "order": "desc" } }],
                            "_source": ["service.name", "error_rate", "avg_duration_ms", "total_requests"]
                        }
                    }
                }
            }
        }
    })
}

fn map_response(response: &Value) -> Result<Vec<ServiceHealth>, DataError> {
    let by_service: Buckets<ServiceBucket> = aggregation(response, "by_service")?;
    Ok(by_service.buckets.into_iter().map(map_bucket).collect())
}

fn map_bucket(bucket: ServiceBucket) -> ServiceHealth {
    // newest sample first
    let samples = bucket.latest.hits.hits;
    let trend: Vec<f64> = samples
        .iter()
        .rev()
        .map(|hit| hit.source.error_rate.unwrap_or(0.0))
        .collect();
    let latest = samples
        .into_iter()
        .next()
        .map(|hit| hit.source)
        .unwrap_or_default();

    let error_rate = latest.error_rate.unwrap_or(0.0);
    ServiceHealth {
        name: bucket.key,
        status: ServiceStatus::from_error_rate(error_rate),
        latency_ms: latest.avg_duration_ms.unwrap_or(0.0).round().max(0.0) as u64,
        error_rate: round_tenth(error_rate),
        requests: latest.total_requests.unwrap_or(0),
        trend,
    }
}

#[async_trait]
impl Resource for ServiceHealthResource {
    type Data = Vec<ServiceHealth>;

    fn name(&self) -> &'static str {
        "services"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::services()
    }

    fn refresh_interval(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let response = client.aggregate(SERVICE_HEALTH_INDEX, &request_body()).await?;
        Ok(map_response(&response)?)
    }
}
