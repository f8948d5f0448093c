//! Typed views over the loosely shaped parts of backend responses.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use shared::error::DataError;

#[derive(Debug, Deserialize)]
pub(crate) struct Buckets<B> {
    pub buckets: Vec<B>,
}

/// `top_hits` sub-aggregation: `{"hits": {"hits": [{"_source": ..}]}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct TopHits<T> {
    pub hits: TopHitList<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopHitList<T> {
    pub hits: Vec<TopHit<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopHit<T> {
    #[serde(rename = "_source")]
    pub source: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocCount {
    pub doc_count: u64,
}

/// Decodes `aggregations.<name>`; a missing section counts as malformed.
pub(crate) fn aggregation<T: DeserializeOwned>(response: &Value, name: &str) -> Result<T, DataError> {
    let section = response
        .get("aggregations")
        .and_then(|aggs| aggs.get(name))
        .ok_or_else(|| DataError::malformed(format!("response has no '{name}' aggregation")))?;
    T::deserialize(section)
        .map_err(|err| DataError::malformed(format!("unexpected '{name}' aggregation: {err}")))
}

pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Backend fractions (0.71) become whole percentages (71).
pub(crate) fn percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().max(0.0) as u32
}
