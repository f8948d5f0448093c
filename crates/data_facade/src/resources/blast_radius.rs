use std::{collections::HashMap, f64::consts::PI, time::Duration};

use async_trait::async_trait;
use search_client::{SearchClient, SearchResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{
        BlastRadiusEdge, BlastRadiusGraph, BlastRadiusNode, NodeId, NodeKind, ServiceStatus,
    },
    error::DataError,
    fixtures,
};

use super::SERVICE_HEALTH_INDEX;
use crate::{
    json::{aggregation, Buckets, TopHits},
    FacadeError, Resource,
};

const OWNERS_INDEX: &str = "service-owners";
const LAYOUT_CENTER: (f64, f64) = (400.0, 260.0);
const LAYOUT_RADIUS: f64 = 200.0;
const DEPENDENCY_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default)]
pub struct BlastRadius;

#[derive(Debug, Deserialize)]
struct OwnerSource {
    service_name: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HealthBucket {
    key: String,
    latest: TopHits<LatestHealth>,
}

#[derive(Debug, Deserialize)]
struct LatestHealth {
    error_rate: Option<f64>,
    avg_duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Health {
    error_rate: f64,
    latency_ms: u64,
}

/// Evenly spaced points on the layout circle, the first one at 12 o'clock.
pub fn circle_layout(count: usize) -> Vec<(i32, i32)> {
    let (cx, cy) = LAYOUT_CENTER;
    (0..count)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / count as f64 - PI / 2.0;
            (
                (cx + LAYOUT_RADIUS * angle.cos()).round() as i32,
                (cy + LAYOUT_RADIUS * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn owners_body() -> Value {
    json!({ "size": 50 })
}

fn health_body() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "by_service": {
                "terms": { "field": "service.name", "size": 20 },
                "aggs": {
                    "latest": {
                        "top_hits": {
                            "size": 1,
                            "sort": [{ "time_bucket": { "order": "desc" } }],
                            "_source": ["error_rate", "avg_duration_ms"]
                        }
                    }
                }
            }
        }
    })
}

fn health_by_service(response: &Value) -> Result<HashMap<String, Health>, DataError> {
    let by_service: Buckets<HealthBucket> = aggregation(response, "by_service")?;
    Ok(by_service
        .buckets
        .into_iter()
        .filter_map(|bucket| {
            let latest = bucket.latest.hits.hits.into_iter().next()?.source;
            let health = Health {
                error_rate: latest.error_rate.unwrap_or(0.0),
                latency_ms: latest.avg_duration_ms.unwrap_or(0.0).round().max(0.0) as u64,
            };
            Some((bucket.key, health))
        })
        .collect())
}

fn build_graph(owners: Vec<OwnerSource>, health: &HashMap<String, Health>) -> BlastRadiusGraph {
    let positions = circle_layout(owners.len());

    let nodes = owners
        .iter()
        .zip(positions)
        .map(|(owner, (x, y))| {
            let error_rate = health
                .get(&owner.service_name)
                .map_or(0.0, |h| h.error_rate);
            BlastRadiusNode {
                id: NodeId::new(owner.service_name.as_str()),
                name: owner.service_name.clone(),
                kind: NodeKind::Service,
                status: ServiceStatus::from_error_rate(error_rate),
                x,
                y,
            }
        })
        .collect();

    let edges = owners
        .iter()
        .flat_map(|owner| {
            owner.dependencies.iter().map(move |dep| BlastRadiusEdge {
                source: NodeId::new(owner.service_name.as_str()),
                target: NodeId::new(dep.as_str()),
                weight: DEPENDENCY_WEIGHT,
                latency_ms: health.get(dep).map_or(0, |h| h.latency_ms),
            })
        })
        .collect();

    BlastRadiusGraph { nodes, edges }
}

fn map_responses(
    owners: SearchResponse<OwnerSource>,
    health: &Value,
) -> Result<BlastRadiusGraph, DataError> {
    let health = health_by_service(health)?;
    let owners = owners.hits.hits.into_iter().map(|hit| hit.source).collect();
    Ok(build_graph(owners, &health))
}

#[async_trait]
impl Resource for BlastRadius {
    type Data = BlastRadiusGraph;

    fn name(&self) -> &'static str {
        "blast-radius"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::blast_radius()
    }

    fn refresh_interval(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let owners_body = owners_body();
        let health_body = health_body();
        let (owners, health) = futures::try_join!(
            client.search::<OwnerSource>(OWNERS_INDEX, &owners_body),
            client.aggregate(SERVICE_HEALTH_INDEX, &health_body),
        )?;
        Ok(map_responses(owners, &health)?)
    }
}
