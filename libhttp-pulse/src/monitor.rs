use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::info;

use crate::prober::Prober;
use crate::stats::{CumulativeStats, Tally};
use crate::types::{EndpointSpec, MonitorConfig, ProbeResult};

/// Everything one cycle hands to a reporter: the raw results, the
/// per-cycle domain verdicts, and snapshots of both cumulative counter
/// maps.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub results: Vec<ProbeResult>,
    pub domain_availability: BTreeMap<String, bool>,
    pub endpoint_stats: BTreeMap<String, Tally>,
    pub domain_stats: BTreeMap<String, Tally>,
}

/// Fixed-cadence probe loop over a set of endpoint specs.
///
/// Owns the prober and the cumulative counters. A new cycle starts every
/// `config.interval` measured from the previous cycle's start; when a cycle
/// overruns the interval the next one starts immediately.
pub struct Monitor {
    prober: Prober,
    endpoints: Vec<EndpointSpec>,
    stats: CumulativeStats,
    config: MonitorConfig,
    cycle: u64,
}

impl Monitor {
    pub fn new(endpoints: Vec<EndpointSpec>) -> Self {
        Self::with_config(endpoints, MonitorConfig::default())
    }

    pub fn with_config(endpoints: Vec<EndpointSpec>, config: MonitorConfig) -> Self {
        Self {
            prober: Prober::with_config(config.clone()),
            endpoints,
            stats: CumulativeStats::new(),
            config,
            cycle: 0,
        }
    }

    pub fn stats(&self) -> &CumulativeStats {
        &self.stats
    }

    /// Probe every endpoint once, fold the batch into the cumulative
    /// counters, and assemble the report for this cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let results = self.prober.probe_batch(&self.endpoints).await;
        let domain_availability = self.stats.record_cycle(&results);

        self.cycle += 1;
        CycleReport {
            cycle: self.cycle,
            results,
            domain_availability,
            endpoint_stats: self.stats.endpoints().clone(),
            domain_stats: self.stats.domains().clone(),
        }
    }

    /// Run cycles until the shutdown channel flips to `true`, handing each
    /// report to `on_report`. A cycle in flight always completes before
    /// exit; the final counters are returned.
    pub async fn run<F>(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        mut on_report: F,
    ) -> CumulativeStats
    where
        F: FnMut(&CycleReport),
    {
        info!(
            endpoints = self.endpoints.len(),
            interval_secs = self.config.interval.as_secs(),
            "monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let cycle_start = Instant::now();
            let report = self.run_cycle().await;
            on_report(&report);

            let delay = remaining_delay(self.config.interval, cycle_start.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!(cycles = self.cycle, "monitor stopped");
        self.stats
    }
}

/// Time left until the next cycle is due, zero when probing overran the
/// interval.
fn remaining_delay(interval: Duration, cycle_time: Duration) -> Duration {
    interval.saturating_sub(cycle_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec(name: &str, url: String) -> EndpointSpec {
        EndpointSpec {
            name: Some(name.to_string()),
            url,
            method: "GET".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    #[test]
    fn delay_fills_the_rest_of_the_interval() {
        let interval = Duration::from_secs(15);
        assert_eq!(
            remaining_delay(interval, Duration::from_secs(2)),
            Duration::from_secs(13)
        );
    }

    #[test]
    fn overrun_cycles_restart_immediately() {
        let interval = Duration::from_secs(15);
        assert_eq!(remaining_delay(interval, Duration::from_secs(16)), Duration::ZERO);
        assert_eq!(remaining_delay(interval, interval), Duration::ZERO);
    }

    #[tokio::test]
    async fn mixed_domain_cycle_marks_domain_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut monitor = Monitor::new(vec![
            spec("ok", format!("{}/ok", server.uri())),
            spec("broken", format!("{}/broken", server.uri())),
        ]);

        let report = monitor.run_cycle().await;

        assert_eq!(report.cycle, 1);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.domain_availability.get("127.0.0.1"), Some(&false));
        assert_eq!(report.endpoint_stats.get("ok"), Some(&Tally { up: 1, total: 1 }));
        assert_eq!(
            report.endpoint_stats.get("broken"),
            Some(&Tally { up: 0, total: 1 })
        );
        assert_eq!(
            report.domain_stats.get("127.0.0.1"),
            Some(&Tally { up: 0, total: 1 })
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_does_not_stop_the_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut monitor = Monitor::new(vec![
            spec("dead", "http://127.0.0.1:1/x".to_string()),
            spec("alive", format!("{}/ok", server.uri())),
        ]);

        let report = monitor.run_cycle().await;

        assert!(!report.results[0].available);
        assert!(report.results[0].error.is_some());
        assert!(report.results[1].available);
    }

    #[tokio::test]
    async fn totals_equal_cycle_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut monitor = Monitor::new(vec![spec("ok", format!("{}/ok", server.uri()))]);
        for _ in 0..3 {
            monitor.run_cycle().await;
        }

        assert_eq!(monitor.stats().endpoint("ok"), Some(Tally { up: 3, total: 3 }));
        assert_eq!(
            monitor.stats().domain("127.0.0.1"),
            Some(Tally { up: 3, total: 3 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_cadence_and_exits_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();

        let monitor = Monitor::new(Vec::new());
        let handle = tokio::spawn(monitor.run(shutdown_rx, move |report| {
            let _ = report_tx.send(report.cycle);
        }));

        for expected in 1..=3u64 {
            assert_eq!(report_rx.recv().await, Some(expected));
        }

        shutdown_tx.send(true).expect("send shutdown");
        let stats = handle.await.expect("join monitor");
        assert!(stats.endpoints().is_empty());
    }
}
