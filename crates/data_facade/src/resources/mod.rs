mod alerts;
mod blast_radius;
mod error_trends;
mod infra;
mod runbooks;
mod services;

pub use alerts::AlertRules;
pub use blast_radius::{circle_layout, BlastRadius};
pub use error_trends::{ErrorTrends, SignificantTerms, DEFAULT_SERVICE};
pub use infra::InfraHosts;
pub use runbooks::Runbooks;
pub use services::ServiceHealthResource;

/// Index fed by the health rollup job, one document per service and bucket.
pub const SERVICE_HEALTH_INDEX: &str = "service-health-realtime";
