use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(NodeId);
id_newtype!(RuleId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Error-rate percentage above which a service counts as down.
pub const DOWN_ERROR_RATE: f64 = 25.0;
/// Error-rate percentage above which a service counts as degraded.
pub const DEGRADED_ERROR_RATE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Healthy,
    Degraded,
    Down,
}

impl ServiceStatus {
    pub fn from_error_rate(error_rate: f64) -> Self {
        if error_rate > DOWN_ERROR_RATE {
            Self::Down
        } else if error_rate > DEGRADED_ERROR_RATE {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    pub fn is_affected(self) -> bool {
        self != Self::Healthy
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Unrecognised labels fall back to `Medium`.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Critical,
    High,
    Medium,
}

impl Significance {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            Self::Critical
        } else if score > 50.0 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Service,
    Database,
    Queue,
    Cache,
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunbookCategory {
    Database,
    Microservices,
    Application,
    Infrastructure,
    Security,
}

impl RunbookCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Microservices => "microservices",
            Self::Application => "application",
            Self::Infrastructure => "infrastructure",
            Self::Security => "security",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "database" => Some(Self::Database),
            "microservices" => Some(Self::Microservices),
            "application" => Some(Self::Application),
            "infrastructure" => Some(Self::Infrastructure),
            "security" => Some(Self::Security),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunbookSeverity {
    P1,
    P2,
    P3,
}

impl RunbookSeverity {
    /// Unrecognised priorities are treated as the lowest, `P3`.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "P1" => Self::P1,
            "P2" => Self::P2,
            _ => Self::P3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricLevel {
    Normal,
    Elevated,
    Critical,
}

impl MetricLevel {
    pub fn from_percent(value: u32) -> Self {
        if value >= 80 {
            Self::Critical
        } else if value >= 60 {
            Self::Elevated
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: ServiceStatus,
    pub latency_ms: u64,
    pub error_rate: f64,
    pub requests: u64,
    pub trend: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: RuleId,
    pub name: String,
    pub description: String,
    pub condition: String,
    pub severity: Severity,
    pub active: bool,
    pub match_count: u64,
    pub last_triggered: String,
    pub created_by: String,
    pub percolate_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorTrendPoint {
    pub time: String,
    pub errors: u64,
    pub baseline: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantTerm {
    pub term: String,
    pub score: f64,
    pub bg_count: u64,
    pub doc_count: u64,
    pub significance: Significance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraHost {
    pub host_name: String,
    pub service_name: String,
    pub avg_cpu: u32,
    pub max_cpu: u32,
    pub avg_mem: u32,
    pub max_mem: u32,
    pub avg_disk: u32,
}

impl InfraHost {
    pub fn cpu_level(&self) -> MetricLevel {
        MetricLevel::from_percent(self.max_cpu)
    }

    pub fn memory_level(&self) -> MetricLevel {
        MetricLevel::from_percent(self.max_mem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraTimelinePoint {
    pub time: String,
    pub cpu: u32,
    pub memory: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastRadiusNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub status: ServiceStatus,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastRadiusEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlastRadiusGraph {
    pub nodes: Vec<BlastRadiusNode>,
    pub edges: Vec<BlastRadiusEdge>,
}

impl BlastRadiusGraph {
    pub fn node(&self, id: &NodeId) -> Option<&BlastRadiusNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// An edge is drawn as affected when its target is not healthy.
    pub fn edge_is_affected(&self, edge: &BlastRadiusEdge) -> bool {
        self.node(&edge.target)
            .is_some_and(|node| node.status.is_affected())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runbook {
    pub title: String,
    pub category: RunbookCategory,
    pub severity: RunbookSeverity,
    pub symptoms: String,
    pub root_cause: String,
    pub remediation_steps: String,
    pub prevention: String,
    pub tags: Vec<String>,
}

impl Runbook {
    /// Splits "1. Do this. 2. Do that." into `["Do this", "Do that"]`.
    pub fn steps(&self) -> Vec<String> {
        split_numbered_steps(&self.remediation_steps)
    }
}

fn split_numbered_steps(raw: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch.is_ascii_digit() {
            let rest = &raw[idx..];
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            let after = &rest[digits..];
            if after.starts_with('.')
                && after[1..].starts_with(char::is_whitespace)
            {
                push_step(&mut steps, &current);
                current.clear();
                // skip the remaining digits and the dot
                for _ in 0..digits {
                    chars.next();
                }
                while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
                    chars.next();
                }
                continue;
            }
        }
        current.push(ch);
    }
    push_step(&mut steps, &current);
    steps
}

fn push_step(steps: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if !trimmed.is_empty() {
        steps.push(trimmed.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentName {
    TriageAgent,
    InvestigationAgent,
    PostmortemAgent,
}

impl AgentName {
    pub fn label(self) -> &'static str {
        match self {
            Self::TriageAgent => "Triage Agent",
            Self::InvestigationAgent => "Investigation Agent",
            Self::PostmortemAgent => "PostMortem Agent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_query: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::random(),
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            agent: None,
            tool_name: None,
            tool_query: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Monitoring,
    Investigating,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_status_thresholds_are_exclusive() {
        assert_eq!(ServiceStatus::from_error_rate(25.0), ServiceStatus::Degraded);
        assert_eq!(ServiceStatus::from_error_rate(25.1), ServiceStatus::Down);
        assert_eq!(ServiceStatus::from_error_rate(5.0), ServiceStatus::Healthy);
        assert_eq!(ServiceStatus::from_error_rate(5.1), ServiceStatus::Degraded);
    }

    #[test]
    fn significance_follows_score_bands() {
        assert_eq!(Significance::from_score(97.1), Significance::Critical);
        assert_eq!(Significance::from_score(80.0), Significance::High);
        assert_eq!(Significance::from_score(50.0), Significance::Medium);
    }

    #[test]
    fn remediation_steps_split_on_numbered_markers() {
        let runbook = Runbook {
            title: "t".into(),
            category: RunbookCategory::Database,
            severity: RunbookSeverity::P1,
            symptoms: String::new(),
            root_cause: String::new(),
            remediation_steps:
                "1. Check pg_stat_activity. 2. Increase the pool size. 3. Restart pods.".into(),
            prevention: String::new(),
            tags: Vec::new(),
        };

        assert_eq!(
            runbook.steps(),
            vec![
                "Check pg_stat_activity",
                "Increase the pool size",
                "Restart pods",
            ]
        );
    }

    #[test]
    fn unknown_labels_degrade_gracefully() {
        assert_eq!(Severity::parse_lossy("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse_lossy("sev-9"), Severity::Medium);
        assert_eq!(RunbookSeverity::parse_lossy("p2"), RunbookSeverity::P2);
        assert_eq!(RunbookCategory::parse("nope"), None);
    }

    #[test]
    fn metric_levels_use_inclusive_bounds() {
        assert_eq!(MetricLevel::from_percent(80), MetricLevel::Critical);
        assert_eq!(MetricLevel::from_percent(60), MetricLevel::Elevated);
        assert_eq!(MetricLevel::from_percent(59), MetricLevel::Normal);
    }
}
