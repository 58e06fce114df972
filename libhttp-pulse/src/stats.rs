use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::ProbeResult;

/// Running up/total pair for one endpoint or one domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub up: u64,
    pub total: u64,
}

impl Tally {
    fn record(&mut self, available: bool) {
        self.total += 1;
        if available {
            self.up += 1;
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.up as f64 * 100.0 / self.total as f64
        }
    }
}

/// Cumulative availability counters, keyed by endpoint name and by domain.
///
/// Counters are created lazily on first observation and only ever grow.
#[derive(Debug, Clone, Default)]
pub struct CumulativeStats {
    endpoints: BTreeMap<String, Tally>,
    domains: BTreeMap<String, Tally>,
}

impl CumulativeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle of probe results into the counters and return the
    /// per-domain availability snapshot for that cycle.
    ///
    /// A domain is up only if every result under it this cycle is up.
    /// Results without a domain count toward endpoint stats only.
    pub fn record_cycle(&mut self, results: &[ProbeResult]) -> BTreeMap<String, bool> {
        for result in results {
            self.endpoints
                .entry(result.name.clone())
                .or_default()
                .record(result.available);
        }

        let mut snapshot: BTreeMap<String, bool> = BTreeMap::new();
        for result in results {
            if let Some(domain) = &result.domain {
                snapshot
                    .entry(domain.clone())
                    .and_modify(|up| *up = *up && result.available)
                    .or_insert(result.available);
            }
        }

        for (domain, up) in &snapshot {
            self.domains.entry(domain.clone()).or_default().record(*up);
        }

        snapshot
    }

    pub fn endpoint(&self, name: &str) -> Option<Tally> {
        self.endpoints.get(name).copied()
    }

    pub fn domain(&self, domain: &str) -> Option<Tally> {
        self.domains.get(domain).copied()
    }

    pub fn endpoints(&self) -> &BTreeMap<String, Tally> {
        &self.endpoints
    }

    pub fn domains(&self) -> &BTreeMap<String, Tally> {
        &self.domains
    }
}
