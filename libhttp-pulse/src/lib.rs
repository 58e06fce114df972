mod config;
mod domain;
mod http;
mod monitor;
mod prober;
mod stats;
mod types;

pub use config::{load_endpoints, ConfigError};
pub use domain::extract_domain;
pub use monitor::{CycleReport, Monitor};
pub use prober::Prober;
pub use stats::{CumulativeStats, Tally};
pub use types::{EndpointSpec, MonitorConfig, ProbeResult};

pub async fn probe(spec: &EndpointSpec) -> ProbeResult {
    Prober::new().probe_one(spec).await
}

pub async fn probe_all(specs: &[EndpointSpec]) -> Vec<ProbeResult> {
    Prober::new().probe_batch(specs).await
}
