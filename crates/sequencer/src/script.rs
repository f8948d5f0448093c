//! Canned agent conversations, picked by keywords in the operator's message.

use chrono::Utc;
use shared::domain::{AgentName, ChatMessage, ChatRole, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Investigation,
    HealthReport,
    Correlation,
    Runbooks,
    IncidentRecord,
    Capabilities,
}

impl Route {
    pub fn for_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |needle: &str| lower.contains(needle);
        if has("investigate")
            || has("error")
            || has("complaint")
            || has("500")
            || has("incident analysis")
        {
            Self::Investigation
        } else if has("health") || has("metrics") || has("cpu") {
            Self::HealthReport
        } else if has("correlate") {
            Self::Correlation
        } else if has("runbook") || has("remediation") {
            Self::Runbooks
        } else if has("incident record") || has("create") || has("document") {
            Self::IncidentRecord
        } else {
            Self::Capabilities
        }
    }
}

/// Whether a finished conversation about `text` should raise the incident to
/// critical.
pub fn escalates(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("investigate") || lower.contains("incident") || lower.contains("500")
}

fn message(
    role: ChatRole,
    agent: AgentName,
    content: &str,
    tool: Option<(&str, &str)>,
) -> ChatMessage {
    ChatMessage {
        id: MessageId::random(),
        role,
        content: content.to_string(),
        timestamp: Utc::now(),
        agent: Some(agent),
        tool_name: tool.map(|(name, _)| name.to_string()),
        tool_query: tool.map(|(_, query)| query.to_string()),
    }
}

fn tool(agent: AgentName, tool_name: &str, content: &str, query: &str) -> ChatMessage {
    message(ChatRole::Tool, agent, content, Some((tool_name, query)))
}

fn say(agent: AgentName, content: &str) -> ChatMessage {
    message(ChatRole::Assistant, agent, content, None)
}

pub fn welcome() -> ChatMessage {
    say(
        AgentName::TriageAgent,
        "**OpsAgent Online**: multi-agent incident response.\n\n\
         Triage Agent runs hybrid search over past incidents, Investigation Agent \
         finds the statistically unusual error and the blast radius, PostMortem \
         Agent writes the report and files the ticket.\n\n\
         Describe your incident below.",
    )
}

pub fn replies(route: Route) -> Vec<ChatMessage> {
    use AgentName::*;
    match route {
        Route::Investigation => vec![
            tool(
                TriageAgent,
                "hybrid_rag_search",
                "Searching incident knowledge base with hybrid RAG...",
                "FROM incident-knowledge METADATA _score\n\
                 | FORK\n  (WHERE MATCH(title, \"orders 500 connection pool\") | SORT _score DESC | LIMIT 30)\n  \
                 (WHERE MATCH(content, \"orders 500 connection pool\") | SORT _score DESC | LIMIT 30)\n\
                 | FUSE RRF\n| LIMIT 5",
            ),
            say(
                TriageAgent,
                "## Triage complete: 3 similar past incidents\n\n\
                 Top match: **INC-3847 order-service connection pool exhaustion** (relevance 0.94).\n\n\
                 **Severity:** CRITICAL. Error rate 34.7% against a 5% threshold, \
                 5 services affected, about $12k/minute revenue impact.\n\n\
                 Handing off to Investigation Agent.",
            ),
            tool(
                InvestigationAgent,
                "anomaly_detector",
                "Running significant_terms aggregation on error logs...",
                "FROM logs-*\n| WHERE @timestamp > NOW() - 30 MINUTES\n  AND service.name == \"order-service\"\n  \
                 AND log.level == \"ERROR\"\n| STATS count = COUNT(*) BY error.type\n| SORT count DESC\n| LIMIT 10",
            ),
            tool(
                InvestigationAgent,
                "error_trend_analysis",
                "Analyzing error rate acceleration with pipeline aggregations...",
                "FROM logs-*\n| WHERE @timestamp > NOW() - 30 MINUTES\n  AND service.name == \"order-service\"\n  \
                 AND log.level == \"ERROR\"\n| EVAL bucket = DATE_TRUNC(5 MINUTES, @timestamp)\n\
                 | STATS error_count = COUNT(*) BY bucket\n| SORT bucket ASC",
            ),
            say(
                InvestigationAgent,
                "## Root cause: connection_pool_exhausted\n\n\
                 significant_terms score 97.1 (bg_count 8, doc_count 1,247). Not the most common \
                 error, the most surprising one. PostgreSQL pool capped at 20 connections.\n\n\
                 Error velocity +22%/min, SLA breach in about 12 minutes.\n\n\
                 Blast radius: payment-service, cart-service, notification-service, \
                 inventory-service, api-gateway.\n\n\
                 Handing off to PostMortem Agent.",
            ),
            tool(
                PostmortemAgent,
                "elasticsearch.index",
                "Generating blameless post-mortem and creating Jira ticket...",
                "FROM incident-audit\n| WHERE incident_id == \"INC-4091\"\n\
                 | KEEP timestamp, agent, action, finding\n| SORT timestamp ASC",
            ),
            say(
                PostmortemAgent,
                "## Post-mortem generated\n\n\
                 **INC-4091: order-service connection pool exhaustion**\n\n\
                 Slack alert sent to #incidents-critical. Jira OPS-2847 created. \
                 Runbook attached: Database Connection Pool Exhaustion.\n\n\
                 1. Check active connections with `pg_stat_activity`\n\
                 2. Kill long-running transactions holding connections\n\
                 3. Increase pool max size from 20 to 50\n\
                 4. Restart affected application pods\n\
                 5. Watch pool metrics until recovery",
            ),
        ],
        Route::HealthReport => vec![
            tool(
                TriageAgent,
                "error_trend_analysis",
                "Querying infrastructure metrics...",
                "FROM metrics-*\n| WHERE @timestamp > NOW() - 1 HOUR\n\
                 | STATS max_cpu = MAX(system.cpu.total.norm.pct), max_mem = MAX(system.memory.actual.used.pct) BY host.name\n\
                 | SORT max_cpu DESC",
            ),
            say(
                TriageAgent,
                "## System health\n\n\
                 **db-primary-01**: CRITICAL, CPU 94.2%, memory 91.8%, disk I/O 89%\n\
                 **app-01**: WARNING, CPU 62.4%, memory 71.3%\n\
                 **app-02**: WARNING, CPU 58.7%, memory 68.9%\n\
                 **web-01, web-02**: HEALTHY\n\n\
                 db-primary-01 is the bottleneck; its CPU climbed about 5 minutes before the application errors.",
            ),
        ],
        Route::Correlation => vec![
            tool(
                InvestigationAgent,
                "error_trend_analysis",
                "Correlating logs with infrastructure metrics...",
                "FROM logs-*, metrics-*\n| WHERE @timestamp > NOW() - 1 HOUR\n  \
                 AND (service.name == \"order-service\" OR host.name == \"db-primary-01\")\n\
                 | EVAL bucket = DATE_TRUNC(5 MINUTES, @timestamp)\n\
                 | STATS avg_cpu = AVG(system.cpu.total.norm.pct) BY bucket\n| SORT bucket ASC",
            ),
            say(
                InvestigationAgent,
                "## Log-metric correlation\n\n\
                 `02:02` db-primary-01 CPU starts climbing\n\
                 `02:12` first ConnectionTimeoutException in payment-service\n\
                 `02:19` circuit breaker opens in order-service\n\
                 `02:37` db-primary-01 CPU at 94%, customer error rate above 50%\n\n\
                 Database stress preceded application errors by about 7 minutes: \
                 the database is the root cause, not a symptom.",
            ),
        ],
        Route::Runbooks => vec![
            tool(
                TriageAgent,
                "hybrid_rag_search",
                "Searching runbooks index...",
                "FROM runbooks METADATA _score\n| WHERE MATCH(content, \"connection pool database\")\n\
                 | SORT _score DESC\n| LIMIT 5",
            ),
            say(
                TriageAgent,
                "## Matching runbooks\n\n\
                 1. **Database Connection Pool Exhaustion** (P1)\n\
                 2. **High CPU Usage on Database Server** (P2)\n\
                 3. **Cascading Service Failure** (P1)",
            ),
        ],
        Route::IncidentRecord => vec![
            tool(
                PostmortemAgent,
                "elasticsearch.index",
                "Creating incident record in audit index...",
                "POST incident-audit/_doc\n{\n  \"incident_id\": \"INC-4091\",\n  \
                 \"severity\": \"P1\",\n  \"root_cause\": \"connection_pool_exhausted\"\n}",
            ),
            say(
                PostmortemAgent,
                "## Incident record created\n\n\
                 **ID:** INC-4091\n**Severity:** P1\n**Status:** Open\n\n\
                 Findings from all three agents are linked to the record.",
            ),
        ],
        Route::Capabilities => vec![say(
            TriageAgent,
            "I can help with that. Try:\n\n\
             - **Investigate errors** across past incidents\n\
             - **Health check** of infrastructure metrics\n\
             - **Correlate** logs with metrics\n\
             - **Search runbooks** for remediation\n\
             - **Create incident** record with an audit trail",
        )],
    }
}

pub fn replies_for(text: &str) -> Vec<ChatMessage> {
    replies(Route::for_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_route_to_their_conversation() {
        assert_eq!(Route::for_text("Investigate the 500s"), Route::Investigation);
        assert_eq!(Route::for_text("customer complaint"), Route::Investigation);
        assert_eq!(Route::for_text("show CPU"), Route::HealthReport);
        assert_eq!(Route::for_text("correlate please"), Route::Correlation);
        assert_eq!(Route::for_text("any runbook?"), Route::Runbooks);
        assert_eq!(Route::for_text("create a ticket"), Route::IncidentRecord);
        assert_eq!(Route::for_text("hello"), Route::Capabilities);
    }

    #[test]
    fn earlier_routes_win_on_overlap() {
        // "error" outranks "metrics"
        assert_eq!(Route::for_text("error metrics"), Route::Investigation);
        assert_eq!(Route::for_text("document the remediation"), Route::Runbooks);
    }

    #[test]
    fn investigation_walks_through_all_three_agents() {
        let agents: Vec<_> = replies(Route::Investigation)
            .iter()
            .filter_map(|m| m.agent)
            .collect();
        assert_eq!(agents.first(), Some(&AgentName::TriageAgent));
        assert!(agents.contains(&AgentName::InvestigationAgent));
        assert_eq!(agents.last(), Some(&AgentName::PostmortemAgent));
    }

    #[test]
    fn tool_messages_carry_their_query() {
        for route in [Route::Investigation, Route::HealthReport, Route::Runbooks] {
            for reply in replies(route) {
                assert_eq!(reply.role == ChatRole::Tool, reply.tool_query.is_some());
            }
        }
    }

    #[test]
    fn escalation_keywords() {
        assert!(escalates("please INVESTIGATE"));
        assert!(escalates("incident record"));
        assert!(!escalates("cpu health"));
    }
}
