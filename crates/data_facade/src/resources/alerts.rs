use async_trait::async_trait;
use search_client::{Hit, SearchClient, SearchResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{AlertRule, RuleId, Severity},
    fixtures,
};

use crate::{FacadeError, Resource};

const INDEX: &str = "alert-rules";
const CONDITION_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertRules;

#[derive(Debug, Deserialize)]
struct RuleSource {
    rule_name: String,
    #[serde(default)]
    rule_description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    last_triggered: Option<String>,
    #[serde(default)]
    created_by: Option<String>,
    #[serde(default)]
    notification_channel: Option<String>,
    #[serde(default)]
    query: Value,
}

fn request_body() -> Value {
    json!({
        "size": 50,
        "sort": [{ "severity": "asc" }, { "last_triggered": "desc" }]
    })
}

fn condition_preview(query: &Value) -> String {
    let compact = query.to_string();
    let preview: String = compact.chars().take(CONDITION_PREVIEW_CHARS).collect();
    format!("{preview}...")
}

fn map_hit(hit: Hit<RuleSource>) -> AlertRule {
    let source = hit.source;
    AlertRule {
        id: RuleId::new(hit.id),
        name: source.rule_name,
        description: source.rule_description.unwrap_or_default(),
        condition: condition_preview(&source.query),
        severity: Severity::parse_lossy(source.severity.as_deref().unwrap_or_default()),
        active: source.enabled,
        // percolator hit counts are not part of the rule document
        match_count: 0,
        last_triggered: source.last_triggered.unwrap_or_default(),
        created_by: source.created_by.unwrap_or_default(),
        percolate_query: serde_json::to_string_pretty(&source.query)
            .unwrap_or_else(|_| source.query.to_string()),
        workflow_action: source
            .notification_channel
            .filter(|channel| !channel.is_empty())
            .map(|channel| format!("{channel} notification")),
    }
}

fn map_response(response: SearchResponse<RuleSource>) -> Vec<AlertRule> {
    response.hits.hits.into_iter().map(map_hit).collect()
}

#[async_trait]
impl Resource for AlertRules {
    type Data = Vec<AlertRule>;

    fn name(&self) -> &'static str {
        "alert-rules"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::alert_rules()
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let response = client.search::<RuleSource>(INDEX, &request_body()).await?;
        Ok(map_response(response))
    }
}
