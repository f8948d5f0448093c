//! Static fallback datasets: the 3 AM order-service incident.
//!
//! Every live resource has a fixture of the same shape here so a host without
//! a configured backend still renders the whole story.

use crate::domain::{
    AlertRule, BlastRadiusEdge, BlastRadiusGraph, BlastRadiusNode, ErrorTrendPoint, InfraHost,
    InfraTimelinePoint, NodeId, NodeKind, RuleId, Runbook, RunbookCategory, RunbookSeverity,
    ServiceHealth, ServiceStatus, Severity, Significance, SignificantTerm,
};

fn service(
    name: &str,
    status: ServiceStatus,
    latency_ms: u64,
    error_rate: f64,
    requests: u64,
    trend: [f64; 7],
) -> ServiceHealth {
    ServiceHealth {
        name: name.to_string(),
        status,
        latency_ms,
        error_rate,
        requests,
        trend: trend.to_vec(),
    }
}

pub fn services() -> Vec<ServiceHealth> {
    use ServiceStatus::*;
    vec![
        service("api-gateway", Degraded, 1200, 8.3, 15420, [12.0, 14.0, 13.0, 15.0, 22.0, 34.0, 45.0]),
        service("order-service", Down, 9800, 34.7, 890, [5.0, 6.0, 8.0, 18.0, 42.0, 68.0, 89.0]),
        service("payment-service", Degraded, 4500, 18.2, 1200, [3.0, 3.0, 4.0, 8.0, 15.0, 28.0, 35.0]),
        service("cart-service", Degraded, 780, 4.1, 3400, [4.0, 5.0, 4.0, 5.0, 7.0, 9.0, 12.0]),
        service("user-service", Healthy, 45, 0.2, 6700, [4.0, 5.0, 4.0, 5.0, 4.0, 5.0, 4.0]),
        service("inventory-service", Healthy, 120, 0.8, 4100, [3.0, 3.0, 3.0, 4.0, 3.0, 4.0, 3.0]),
        service("notification-service", Healthy, 78, 0.1, 11200, [6.0, 7.0, 6.0, 7.0, 6.0, 7.0, 6.0]),
        service("search-service", Healthy, 230, 0.5, 9800, [8.0, 9.0, 8.0, 9.0, 8.0, 9.0, 8.0]),
    ]
}

#[allow(clippy::too_many_arguments)]
fn rule(
    id: &str,
    name: &str,
    description: &str,
    condition: &str,
    severity: Severity,
    match_count: u64,
    last_triggered: &str,
    created_by: &str,
    percolate_query: &str,
    workflow_action: &str,
) -> AlertRule {
    AlertRule {
        id: RuleId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        condition: condition.to_string(),
        severity,
        active: true,
        match_count,
        last_triggered: last_triggered.to_string(),
        created_by: created_by.to_string(),
        percolate_query: percolate_query.to_string(),
        workflow_action: Some(workflow_action.to_string()),
    }
}

pub fn alert_rules() -> Vec<AlertRule> {
    vec![
        rule(
            "1",
            "Orders Critical 500s",
            "Triggers when order-service returns high volume of 500 errors",
            r#"service.name:"order-service" AND http.response.status_code:500"#,
            Severity::Critical,
            47,
            "2026-02-15T03:07:00Z",
            "SRE Team",
            r#"{"bool":{"must":[{"match":{"service.name":"order-service"}},{"match":{"http.response.status_code":"500"}}]}}"#,
            "Slack #incidents-critical + Page on-call",
        ),
        rule(
            "2",
            "Cascading Failure Detector",
            "Detects when multiple services report errors with the same root cause",
            r#"log.level:"ERROR" AND error.type:"connection_pool_exhausted""#,
            Severity::Critical,
            12,
            "2026-02-15T03:09:00Z",
            "AI-Generated",
            r#"{"bool":{"must":[{"match":{"log.level":"ERROR"}},{"match":{"error.type":"connection_pool_exhausted"}}]}}"#,
            "Slack + Jira P1 ticket",
        ),
        rule(
            "3",
            "High Error Rate",
            "Alert when service error messages contain critical patterns",
            r#"log.level:"ERROR" AND message:"connection" AND message:"exhausted""#,
            Severity::Critical,
            5,
            "2026-02-15T03:07:30Z",
            "SRE Team",
            r#"{"bool":{"must":[{"match":{"log.level":"ERROR"}},{"match":{"message":"connection pool exhausted"}}]}}"#,
            "Slack #revenue-alerts + VP Engineering page",
        ),
        rule(
            "4",
            "Database Connection Errors",
            "Detects database connection-related error patterns in logs",
            r#"error.type:"connection_pool_exhausted" AND service.name:"order-service""#,
            Severity::High,
            89,
            "2026-02-15T03:08:00Z",
            "DBA Team",
            r#"{"bool":{"must":[{"match":{"error.type":"connection_pool_exhausted"}},{"match":{"service.name":"order-service"}}]}}"#,
            "Slack #dba + investigation ticket",
        ),
        rule(
            "5",
            "Unusual Error Pattern",
            "Detects statistically unusual error patterns via significant_terms",
            r#"log.level:"ERROR" AND error.type EXISTS"#,
            Severity::Medium,
            3,
            "2026-02-15T03:08:00Z",
            "OpsAgent AI",
            r#"{"bool":{"must":[{"match":{"log.level":"ERROR"}},{"exists":{"field":"error.type"}}]}}"#,
            "Jira investigation ticket",
        ),
    ]
}

fn node(id: &str, name: &str, kind: NodeKind, status: ServiceStatus, x: i32, y: i32) -> BlastRadiusNode {
    BlastRadiusNode {
        id: NodeId::new(id),
        name: name.to_string(),
        kind,
        status,
        x,
        y,
    }
}

fn edge(source: &str, target: &str, weight: f64, latency_ms: u64) -> BlastRadiusEdge {
    BlastRadiusEdge {
        source: NodeId::new(source),
        target: NodeId::new(target),
        weight,
        latency_ms,
    }
}

pub fn blast_radius() -> BlastRadiusGraph {
    use NodeKind::*;
    use ServiceStatus::*;
    BlastRadiusGraph {
        nodes: vec![
            node("api-gw", "API Gateway", Gateway, Degraded, 400, 50),
            node("orders", "Order Service", Service, Down, 250, 180),
            node("payment", "Payment Service", Service, Degraded, 550, 180),
            node("cart", "Cart Service", Service, Degraded, 150, 310),
            node("user", "User Service", Service, Healthy, 650, 310),
            node("inventory", "Inventory", Service, Healthy, 350, 310),
            node("notify", "Notifications", Service, Healthy, 550, 310),
            node("pg-main", "PostgreSQL", Database, Degraded, 250, 440),
            node("redis", "Redis", Cache, Healthy, 450, 440),
            node("kafka", "Kafka", Queue, Healthy, 650, 440),
        ],
        edges: vec![
            edge("api-gw", "orders", 0.95, 9800),
            edge("api-gw", "payment", 0.8, 4500),
            edge("api-gw", "user", 0.2, 45),
            edge("orders", "pg-main", 0.95, 8200),
            edge("orders", "cart", 0.7, 780),
            edge("orders", "inventory", 0.5, 120),
            edge("payment", "orders", 0.9, 4500),
            edge("payment", "redis", 0.4, 35),
            edge("cart", "redis", 0.3, 20),
            edge("notify", "kafka", 0.3, 15),
            edge("orders", "notify", 0.4, 78),
        ],
    }
}

pub fn error_trend() -> Vec<ErrorTrendPoint> {
    [
        ("02:30", 3),
        ("02:35", 4),
        ("02:40", 5),
        ("02:45", 7),
        ("02:50", 12),
        ("02:55", 22),
        ("03:00", 48),
        ("03:05", 89),
    ]
    .into_iter()
    .map(|(time, errors)| ErrorTrendPoint {
        time: time.to_string(),
        errors,
        baseline: 5,
    })
    .collect()
}

pub fn significant_terms() -> Vec<SignificantTerm> {
    [
        ("connection_pool_exhausted", 97.1, 8, 1247),
        ("pg_conn_timeout_30s", 82.4, 23, 891),
        ("max_pool_size_reached", 71.8, 45, 634),
        ("transaction_rollback", 58.2, 112, 423),
        ("checkout_failed_500", 44.6, 189, 287),
    ]
    .into_iter()
    .map(|(term, score, bg_count, doc_count)| SignificantTerm {
        term: term.to_string(),
        score,
        bg_count,
        doc_count,
        significance: Significance::from_score(score),
    })
    .collect()
}

pub fn infra_hosts() -> Vec<InfraHost> {
    [
        ("db-primary-01", "postgresql", 71, 94, 78, 92, 89),
        ("app-01", "payment-service", 48, 62, 64, 71, 41),
        ("app-02", "order-service", 45, 59, 61, 69, 40),
        ("db-replica-01", "postgresql", 38, 52, 55, 63, 72),
        ("web-02", "api-gateway", 24, 28, 45, 48, 33),
        ("web-01", "api-gateway", 22, 25, 44, 45, 31),
    ]
    .into_iter()
    .map(
        |(host_name, service_name, avg_cpu, max_cpu, avg_mem, max_mem, avg_disk)| InfraHost {
            host_name: host_name.to_string(),
            service_name: service_name.to_string(),
            avg_cpu,
            max_cpu,
            avg_mem,
            max_mem,
            avg_disk,
        },
    )
    .collect()
}

/// Per-host CPU/memory series; empty for hosts without a recorded timeline.
pub fn infra_timeline(host_name: &str) -> Vec<InfraTimelinePoint> {
    let series: &[(&str, u32, u32)] = match host_name {
        "db-primary-01" => &[
            ("02:00", 25, 52),
            ("02:15", 40, 61),
            ("02:30", 70, 78),
            ("02:45", 86, 87),
            ("03:00", 94, 92),
        ],
        "app-01" => &[
            ("02:00", 30, 55),
            ("02:15", 34, 58),
            ("02:30", 51, 66),
            ("02:45", 60, 70),
            ("03:00", 62, 71),
        ],
        "app-02" => &[
            ("02:00", 29, 54),
            ("02:15", 33, 57),
            ("02:30", 48, 63),
            ("02:45", 57, 68),
            ("03:00", 59, 69),
        ],
        _ => &[],
    };
    series
        .iter()
        .map(|&(time, cpu, memory)| InfraTimelinePoint {
            time: time.to_string(),
            cpu,
            memory,
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn runbook(
    title: &str,
    category: RunbookCategory,
    severity: RunbookSeverity,
    symptoms: &str,
    root_cause: &str,
    remediation_steps: &str,
    prevention: &str,
    tags: &[&str],
) -> Runbook {
    Runbook {
        title: title.to_string(),
        category,
        severity,
        symptoms: symptoms.to_string(),
        root_cause: root_cause.to_string(),
        remediation_steps: remediation_steps.to_string(),
        prevention: prevention.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

pub fn runbooks() -> Vec<Runbook> {
    use RunbookCategory::*;
    use RunbookSeverity::*;
    vec![
        runbook(
            "Database Connection Pool Exhaustion",
            Database,
            P1,
            "Connection timeout errors, response latency above 5 seconds, HTTP 503 from dependent services, pool at 100% utilization",
            "Pool maximum reached due to slow queries holding connections, connection leaks, or a traffic spike exceeding capacity",
            "1. Check active connections with pg_stat_activity. 2. Kill long-running transactions holding connections. 3. Increase the pool max size in application config. 4. Restart affected pods to release leaked connections. 5. Monitor pool metrics to verify recovery.",
            "Idle timeout of 30s, circuit breakers on database calls, utilization alerts at 80%",
            &["database", "connection-pool", "timeout", "postgresql"],
        ),
        runbook(
            "High CPU Usage on Database Server",
            Database,
            P2,
            "CPU consistently above 85%, slow queries exceeding SLA, increased IO wait, growing replication lag",
            "Full table scans from unoptimized queries, missing indexes, excessive concurrent connections",
            "1. Check the processlist for expensive queries. 2. Review recent deployments for new queries. 3. Run EXPLAIN ANALYZE on slow queries. 4. Add missing indexes. 5. Scale read traffic to replicas.",
            "Slow query log review, query plan analysis in staging, CPU alert at 80%",
            &["database", "cpu", "performance", "indexing"],
        ),
        runbook(
            "Cascading Service Failures",
            Microservices,
            P1,
            "Multiple services returning 5xx simultaneously, circuit breakers tripped, error rates climbing service by service",
            "A critical dependency failure propagating through synchronous call chains without circuit breakers",
            "1. Identify the root failing service from the earliest error timestamps. 2. Check the dependency graph for the propagation path. 3. Isolate the failing service. 4. Restart or scale the root cause service. 5. Reset circuit breakers once the root cause is resolved.",
            "Bulkheads per failure domain, downstream timeouts shorter than upstream timeouts, circuit breakers on every call",
            &["microservices", "cascade", "circuit-breaker", "dependency"],
        ),
        runbook(
            "Memory Pressure and GC Pauses",
            Application,
            P2,
            "GC pauses above 5 seconds, OOMKilled pods, steadily increasing memory usage",
            "Memory leaks retaining references, undersized heap, caches without eviction",
            "1. Capture a heap dump from an affected instance. 2. Analyze retention chains. 3. Restart affected pods. 4. Tune heap and GC flags. 5. Fix the leak and bound caches.",
            "Container memory limits with headroom, GC logging, memory alerts at 80% of limit",
            &["memory", "gc", "jvm", "oomkilled"],
        ),
        runbook(
            "Disk Space Exhaustion",
            Infrastructure,
            P1,
            "Disk usage above 95%, failing writes, database unable to write WAL",
            "Unrotated logs, WAL accumulation, large imports filling the disk",
            "1. Find the largest directories. 2. Remove old logs and temporary files. 3. Run a checkpoint to reclaim WAL space. 4. Fix log rotation. 5. Add disk usage alerts at 80% and 90%.",
            "Log rotation limits, separate data and log volumes, capacity planning",
            &["disk", "storage", "logs", "wal"],
        ),
        runbook(
            "SSL/TLS Certificate Expiration",
            Security,
            P1,
            "HTTPS failures with certificate errors, mTLS authentication failures between services",
            "Certificate expired after a silent auto-renewal failure",
            "1. Identify the expired certificate. 2. Check the renewal status. 3. Issue or renew the certificate. 4. Deploy it to all endpoints. 5. Verify the chain is complete.",
            "Automated renewal, expiry alerts 30 days ahead, certificate inventory",
            &["ssl", "tls", "certificate", "security"],
        ),
        runbook(
            "API Rate Limiting / Throttling",
            Application,
            P3,
            "HTTP 429 responses, request queuing, third-party calls failing with rate limit errors",
            "Traffic spikes, retry amplification, bursty batch jobs",
            "1. Identify the limited endpoint. 2. Check whether the spike is legitimate. 3. Add exponential backoff to retries. 4. Queue and throttle batch operations.",
            "Client-side rate limiting, alerts on 429 rates",
            &["rate-limit", "throttling", "429", "api"],
        ),
    ]
}

/// Fallback runbooks narrowed the same way a live category filter would.
pub fn runbooks_in(category: Option<RunbookCategory>) -> Vec<Runbook> {
    let all = runbooks();
    match category {
        Some(category) => all.into_iter().filter(|r| r.category == category).collect(),
        None => all,
    }
}
