//! # Selection Loop
//!
//! Orchestrates collector → voter → arbiter on a fixed cadence.
//!
//! ```text
//! Boot → Sampling → (Evaluating) ─┬─ winner → Promoting → Sampling
//!                                 └─ none ──────────────→ Sampling
//! ```
//!
//! `Boot` runs once: it waits until host uptime reaches the minimum so that
//! modems have settled after a restart, then enumerates the candidate links.
//! The loop has no terminal state; it only stops when shutdown is signalled
//! through the watch channel, which also interrupts any interval or dwell
//! wait in progress.

use std::time::Duration;

use tokio::sync::watch;

use crate::arbiter::{PriorityArbiter, Promotion};
use crate::collector::SampleCollector;
use crate::error::SelectError;
use crate::link::{best_sample, Link, LinkId};
use crate::pause::{is_shutdown, pause, Pause};
use crate::source::{ConfigStore, TelemetrySource};
use crate::tunables::Tunables;
use crate::voter::SlidingWindowVoter;

/// Default minimum host uptime before the loop starts.
pub const DEFAULT_MIN_UPTIME: Duration = Duration::from_secs(120);

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Boot,
    Sampling,
    Promoting,
    Stopped,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Boot => "boot",
            LoopState::Sampling => "sampling",
            LoopState::Promoting => "promoting",
            LoopState::Stopped => "stopped",
        }
    }
}

/// What a single [`SelectionLoop::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No link produced a sample.
    NoVote,
    /// A vote was recorded without reaching quorum.
    Voted { best: LinkId },
    /// Quorum was reached and the link's rule was rewritten.
    Promoted { link: LinkId, priority: f64 },
    /// Quorum was reached for the link that is already preferred.
    AlreadyPreferred { link: LinkId },
}

/// The selection context: collaborators, candidate links, voting window and
/// the last good tunables.
pub struct SelectionLoop<T, C> {
    telemetry: T,
    store: C,
    links: Vec<Link>,
    collector: SampleCollector,
    voter: SlidingWindowVoter,
    arbiter: PriorityArbiter,
    tunables: Tunables,
    min_uptime: Duration,
    seed_rules: bool,
    state: LoopState,
    shutdown: watch::Receiver<bool>,
}

impl<T: TelemetrySource, C: ConfigStore> SelectionLoop<T, C> {
    pub fn new(telemetry: T, store: C, shutdown: watch::Receiver<bool>) -> Self {
        let tunables = Tunables::default();
        SelectionLoop {
            telemetry,
            store,
            links: Vec::new(),
            collector: SampleCollector::new(),
            voter: SlidingWindowVoter::new(&tunables),
            arbiter: PriorityArbiter::new(shutdown.clone()),
            tunables,
            min_uptime: DEFAULT_MIN_UPTIME,
            seed_rules: false,
            state: LoopState::Boot,
            shutdown,
        }
    }

    pub fn with_min_uptime(mut self, min_uptime: Duration) -> Self {
        self.min_uptime = min_uptime;
        self
    }

    /// Seed one routing-priority rule per enumerated link at boot when the
    /// store has none.
    pub fn with_rule_seeding(mut self, seed: bool) -> Self {
        self.seed_rules = seed;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn voter(&self) -> &SlidingWindowVoter {
        &self.voter
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    /// Startup gate followed by link enumeration.
    ///
    /// Returns `Ok(false)` if shutdown was requested while waiting.
    pub async fn boot(&mut self) -> Result<bool, SelectError> {
        self.state = LoopState::Boot;

        let uptime = self.telemetry.uptime().await?;
        tracing::info!(uptime_s = uptime.as_secs(), "current uptime");
        if uptime < self.min_uptime {
            let remaining = self.min_uptime - uptime;
            tracing::info!(sleep_s = remaining.as_secs(), "waiting for interfaces to settle");
            if pause(remaining, &mut self.shutdown).await == Pause::Cancelled {
                self.state = LoopState::Stopped;
                return Ok(false);
            }
        }
        tracing::info!("uptime check passed, continuing");

        self.links = self.telemetry.links().await?;
        if self.links.is_empty() {
            tracing::warn!("no connected modem links; every tick will be a no-vote");
        } else {
            for link in &self.links {
                tracing::info!(link = %link.id, rule = %link.rule, "candidate link");
            }
            if self.seed_rules {
                match self.store.seed_rules(&self.links).await {
                    Ok(0) => {}
                    Ok(added) => tracing::info!(added, "seeded routing-priority rules"),
                    Err(e) => tracing::warn!(error = %e, "failed to seed routing-priority rules"),
                }
            }
        }

        self.state = LoopState::Sampling;
        Ok(true)
    }

    /// Re-read tunables, keeping the last good values if the store fails.
    async fn refresh_tunables(&mut self) {
        match self.store.tunables().await {
            Ok(tunables) => {
                if tunables != self.tunables {
                    tracing::debug!(?tunables, "tunables changed");
                }
                self.tunables = tunables;
            }
            Err(e) => {
                tracing::warn!(error = %e, "tunables unreadable, keeping last known values");
            }
        }
        self.voter.retune(&self.tunables);
    }

    /// One sampling step: refresh tunables, sample every link, vote, and
    /// promote on quorum. Does not include the interval wait.
    pub async fn tick(&mut self) -> Result<TickOutcome, SelectError> {
        self.state = LoopState::Sampling;
        self.refresh_tunables().await;

        let samples = self.collector.collect(&self.telemetry, &self.links).await;
        let Some(best) = best_sample(&samples).map(|s| s.link.clone()) else {
            tracing::debug!("no samples this tick");
            return Ok(TickOutcome::NoVote);
        };

        let Some(winner) = self.voter.record_tick(&samples) else {
            return Ok(TickOutcome::Voted { best });
        };

        let link = self
            .links
            .iter()
            .find(|l| l.id == winner)
            .cloned()
            .ok_or_else(|| SelectError::Telemetry(format!("winner {winner} is not a known link")))?;

        self.state = LoopState::Promoting;
        let result = self
            .arbiter
            .promote(&self.store, &link, self.tunables.dwell_time())
            .await;
        self.state = LoopState::Sampling;

        match result? {
            Promotion::Promoted { priority, .. } => Ok(TickOutcome::Promoted {
                link: link.id,
                priority,
            }),
            Promotion::AlreadyPreferred { .. } => Ok(TickOutcome::AlreadyPreferred { link: link.id }),
        }
    }

    /// Boot, then tick forever until shutdown.
    ///
    /// Promotion failures are logged and the loop carries on with the next
    /// tick; only a failed boot is returned as an error.
    pub async fn run(mut self) -> Result<(), SelectError> {
        if !self.boot().await? {
            tracing::info!("shutdown requested during boot");
            return Ok(());
        }

        loop {
            if is_shutdown(&self.shutdown) {
                break;
            }

            match self.tick().await {
                Ok(outcome) => tracing::trace!(?outcome, state = self.state.as_str(), "tick complete"),
                Err(e) => tracing::error!(error = %e, "tick failed"),
            }

            if pause(self.tunables.scan_interval(), &mut self.shutdown).await == Pause::Cancelled {
                break;
            }
        }

        self.state = LoopState::Stopped;
        tracing::info!("selection loop stopped");
        Ok(())
    }
}
