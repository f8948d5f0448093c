use async_trait::async_trait;
use search_client::{Hit, SearchClient, SearchResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{Runbook, RunbookCategory, RunbookSeverity},
    fixtures,
};
use tracing::warn;

use crate::{FacadeError, Resource};

const INDEX: &str = "runbooks";

#[derive(Debug, Clone, Copy, Default)]
pub struct Runbooks {
    category: Option<RunbookCategory>,
}

impl Runbooks {
    pub fn new(category: Option<RunbookCategory>) -> Self {
        Self { category }
    }

    pub fn category(&self) -> Option<RunbookCategory> {
        self.category
    }

    fn request_body(&self) -> Value {
        let query = match self.category {
            Some(category) => json!({ "bool": { "filter": [{ "term": { "category": category.as_str() } }] } }),
            None => json!({ "match_all": {} }),
        };
        json!({
            "size": 50,
            "query": query,
            "sort": [{ "severity": "asc" }]
        })
    }
}

#[derive(Debug, Deserialize)]
struct RunbookSource {
    title: String,
    category: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    symptoms: String,
    #[serde(default)]
    root_cause: String,
    #[serde(default)]
    remediation_steps: String,
    #[serde(default)]
    prevention: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn map_hit(hit: Hit<RunbookSource>) -> Option<Runbook> {
    let source = hit.source;
    let Some(category) = RunbookCategory::parse(&source.category) else {
        warn!(id = %hit.id, category = %source.category, "skipping runbook with unknown category");
        return None;
    };
    Some(Runbook {
        title: source.title,
        category,
        severity: RunbookSeverity::parse_lossy(&source.severity),
        symptoms: source.symptoms,
        root_cause: source.root_cause,
        remediation_steps: source.remediation_steps,
        prevention: source.prevention,
        tags: source.tags,
    })
}

fn map_response(response: SearchResponse<RunbookSource>) -> Vec<Runbook> {
    response.hits.hits.into_iter().filter_map(map_hit).collect()
}

#[async_trait]
impl Resource for Runbooks {
    type Data = Vec<Runbook>;

    fn name(&self) -> &'static str {
        "runbooks"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::runbooks_in(self.category)
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let response = client
            .search::<RunbookSource>(INDEX, &self.request_body())
            .await?;
        Ok(map_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_shapes_query_and_fallback() {
        let all = Runbooks::default();
        assert_eq!(all.request_body()["query"], json!({"match_all": {}}));

        let db = Runbooks::new(Some(RunbookCategory::Database));
        assert_eq!(
            db.request_body()["query"]["bool"]["filter"][0]["term"]["category"],
            "database"
        );
        assert!(db
            .fallback()
            .iter()
            .all(|r| r.category == RunbookCategory::Database));
        assert!(all.fallback().len() > db.fallback().len());
    }

    #[test]
    fn maps_documents_and_skips_unknown_categories() {
        let response: SearchResponse<RunbookSource> = serde_json::from_value(json!({"hits": {"hits": [
            {"_id": "rb-1", "_source": {
                "title": "Database Connection Pool Exhaustion",
                "category": "database",
                "severity": "P1",
                "symptoms": "Timeouts acquiring connections",
                "root_cause": "Pool sized for normal load",
                "remediation_steps": "1. Check pg_stat_activity. 2. Raise max pool size.",
                "prevention": "Alert at 80% pool usage",
                "tags": ["postgresql", "connection-pool"]
            }},
            {"_id": "rb-2", "_source": {"title": "Mystery", "category": "folklore"}}
        ]}}))
        .expect("response");

        let runbooks = map_response(response);

        assert_eq!(runbooks.len(), 1);
        assert_eq!(runbooks[0].severity, RunbookSeverity::P1);
        assert_eq!(
            runbooks[0].steps(),
            vec!["Check pg_stat_activity", "Raise max pool size"]
        );
    }
}
