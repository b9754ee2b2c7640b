//! Simulated modems for local development (`--simulate`).
//!
//! Three connected modems report RSRQ around a per-link baseline with random
//! jitter. Every [`LEADER_PERIOD`] readings the favoured modem rotates so
//! the daemon has something to promote. Without `--store` the daemon pairs
//! it with an in-memory store that is seeded at boot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use strata_select::{Link, SelectError, TelemetrySource};

use crate::modem::{read_uptime, LINK_PREFIX};

/// Number of quality reads before the favoured modem changes.
const LEADER_PERIOD: u64 = 120;

/// Extra RSRQ given to the favoured modem, in dB.
const LEADER_BONUS: i64 = 5;

/// Baseline RSRQ (dB) per simulated modem.
const BASELINES: [i64; 3] = [-11, -10, -12];

pub struct SimulatedTelemetry {
    links: Vec<Link>,
    reads: AtomicU64,
}

impl SimulatedTelemetry {
    pub fn new() -> Self {
        let links = (0..BASELINES.len())
            .map(|i| Link::new(format!("{LINK_PREFIX}{i}"), format!("wwan{i}")))
            .collect();
        SimulatedTelemetry {
            links,
            reads: AtomicU64::new(0),
        }
    }

    fn leader(&self, reads: u64) -> usize {
        ((reads / LEADER_PERIOD) as usize) % self.links.len()
    }
}

impl Default for SimulatedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for SimulatedTelemetry {
    async fn uptime(&self) -> Result<Duration, SelectError> {
        Ok(read_uptime()
            .await
            .unwrap_or_else(|_| Duration::from_secs(3600)))
    }

    async fn links(&self) -> Result<Vec<Link>, SelectError> {
        Ok(self.links.clone())
    }

    async fn quality(&self, link: &Link) -> Result<i64, SelectError> {
        use rand::Rng;

        let index = self
            .links
            .iter()
            .position(|l| l.id == link.id)
            .ok_or_else(|| SelectError::Telemetry(format!("unknown simulated link {}", link.id)))?;
        let reads = self.reads.fetch_add(1, Ordering::Relaxed);

        let mut rng = rand::rng();
        let bonus = if self.leader(reads) == index { LEADER_BONUS } else { 0 };
        Ok(BASELINES[index] + bonus - rng.random_range(0..4))
    }
}
