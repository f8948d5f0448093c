use std::time::Duration;

use async_trait::async_trait;
use search_client::{QueryResponse, SearchClient};
use serde_json::Value;
use shared::{
    domain::{InfraHost, InfraTimelinePoint},
    error::DataError,
    fixtures,
};

use crate::{json::percent, FacadeError, Resource};

const HOST_STATS_QUERY: &str = "FROM infra-metrics
  | WHERE @timestamp > NOW() - 3 HOURS
  | STATS
      avg_cpu = AVG(system.cpu.total.pct),
      max_cpu = MAX(system.cpu.total.pct),
      avg_mem = AVG(system.memory.used.pct),
      max_mem = MAX(system.memory.used.pct),
      avg_disk = AVG(system.disk.used.pct)
    BY host.name, service.name
  | SORT avg_cpu DESC";

#[derive(Debug, Clone, Copy, Default)]
pub struct InfraHosts;

impl InfraHosts {
    /// Per-host CPU/memory series. Served from the static dataset in both
    /// modes; unknown hosts have no timeline.
    pub fn host_timeline(&self, host_name: &str) -> Vec<InfraTimelinePoint> {
        fixtures::infra_timeline(host_name)
    }
}

struct Columns {
    host_name: usize,
    service_name: usize,
    avg_cpu: usize,
    max_cpu: usize,
    avg_mem: usize,
    max_mem: usize,
    avg_disk: usize,
}

impl Columns {
    fn locate(response: &QueryResponse) -> Result<Self, DataError> {
        let find = |name: &str| {
            response
                .column_index(name)
                .ok_or_else(|| DataError::malformed(format!("query result has no '{name}' column")))
        };
        Ok(Self {
            host_name: find("host.name")?,
            service_name: find("service.name")?,
            avg_cpu: find("avg_cpu")?,
            max_cpu: find("max_cpu")?,
            avg_mem: find("avg_mem")?,
            max_mem: find("max_mem")?,
            avg_disk: find("avg_disk")?,
        })
    }
}

fn text(row: &[Value], idx: usize, column: &str) -> Result<String, DataError> {
    row.get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DataError::malformed(format!("'{column}' is not a string")))
}

// null stats (no samples in the window) read as zero
fn pct(row: &[Value], idx: usize) -> u32 {
    percent(row.get(idx).and_then(Value::as_f64).unwrap_or(0.0))
}

fn map_response(response: &QueryResponse) -> Result<Vec<InfraHost>, DataError> {
    let cols = Columns::locate(response)?;
    response
        .values
        .iter()
        .map(|row| {
            Ok(InfraHost {
                host_name: text(row, cols.host_name, "host.name")?,
                service_name: text(row, cols.service_name, "service.name")?,
                avg_cpu: pct(row, cols.avg_cpu),
                max_cpu: pct(row, cols.max_cpu),
                avg_mem: pct(row, cols.avg_mem),
                max_mem: pct(row, cols.max_mem),
                avg_disk: pct(row, cols.avg_disk),
            })
        })
        .collect()
}

#[async_trait]
impl Resource for InfraHosts {
    type Data = Vec<InfraHost>;

    fn name(&self) -> &'static str {
        "infra-hosts"
    }

    fn fallback(&self) -> Self::Data {
        fixtures::infra_hosts()
    }

    fn refresh_interval(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    async fn fetch_live(&self, client: &SearchClient) -> Result<Self::Data, FacadeError> {
        let response = client.query(HOST_STATS_QUERY, None).await?;
        Ok(map_response(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::domain::MetricLevel;

    use super::*;

    fn response(value: Value) -> QueryResponse {
        serde_json::from_value(value).expect("response")
    }

    #[test]
    fn maps_columns_by_name_in_any_order() {
        let res = response(json!({
            "columns": [
                {"name": "avg_cpu", "type": "double"},
                {"name": "max_cpu", "type": "double"},
                {"name": "avg_mem", "type": "double"},
                {"name": "max_mem", "type": "double"},
                {"name": "avg_disk", "type": "double"},
                {"name": "host.name", "type": "keyword"},
                {"name": "service.name", "type": "keyword"}
            ],
            "values": [
                [0.712, 0.94, 0.78, 0.921, 0.89, "db-primary-01", "postgresql"],
                [0.2, null, 0.41, 0.5, 0.33, "app-03", "user-service"]
            ]
        }));

        let hosts = map_response(&res).expect("map");

        assert_eq!(
            hosts[0],
            InfraHost {
                host_name: "db-primary-01".into(),
                service_name: "postgresql".into(),
                avg_cpu: 71,
                max_cpu: 94,
                avg_mem: 78,
                max_mem: 92,
                avg_disk: 89,
            }
        );
        assert_eq!(hosts[0].cpu_level(), MetricLevel::Critical);
        assert_eq!(hosts[1].max_cpu, 0);
    }

    #[test]
    fn missing_column_is_malformed() {
        let res = response(json!({
            "columns": [{"name": "host.name", "type": "keyword"}],
            "values": [["app-01"]]
        }));

        let err = map_response(&res).expect_err("missing columns");
        assert!(err.message.contains("service.name"));
    }

    #[test]
    fn timelines_come_from_the_static_dataset() {
        assert_eq!(InfraHosts.host_timeline("db-primary-01").len(), 5);
        assert!(InfraHosts.host_timeline("no-such-host").is_empty());
    }
}
