//! # Priority Arbiter
//!
//! Applies a voting decision to the routing configuration. The winning
//! link's rule is moved one decile below the current best priority so it
//! takes strict precedence without renumbering any other rule:
//!
//! ```text
//! {wwan0: 1.0, wwan1: 1.1, wwan2: 1.2}  promote wwan2  →  wwan2: 0.9
//! ```
//!
//! After a write the arbiter holds the caller for the dwell time. This is
//! the cooldown gate: nothing is sampled or re-promoted until it elapses or
//! shutdown is requested.
//!
//! Reading the minimum and writing the new priority are two separate store
//! calls; a concurrent external edit between them is not detected.

use std::time::Duration;

use tokio::sync::watch;

use crate::error::SelectError;
use crate::link::Link;
use crate::pause::{pause, Pause};
use crate::source::ConfigStore;

/// Amount subtracted from the current best priority on promotion.
pub const PROMOTION_STEP: f64 = 0.1;

/// Result of a successful [`PriorityArbiter::promote`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Promotion {
    /// The link already held the lowest priority; nothing was written.
    AlreadyPreferred { priority: f64 },
    /// The link's rule was rewritten from `previous` to `priority`.
    Promoted {
        previous: f64,
        priority: f64,
        /// `false` when shutdown cut the dwell short.
        dwell_completed: bool,
    },
}

/// Mutates routing priority once per decision and enforces the dwell.
pub struct PriorityArbiter {
    shutdown: watch::Receiver<bool>,
}

impl PriorityArbiter {
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        PriorityArbiter { shutdown }
    }

    pub async fn promote<C: ConfigStore>(
        &mut self,
        store: &C,
        link: &Link,
        dwell: Duration,
    ) -> Result<Promotion, SelectError> {
        let rules = store.priority_rules().await?;

        let Some(current) = rules.iter().find(|r| r.id == link.rule) else {
            return Err(SelectError::MissingRule {
                link: link.id.clone(),
                rule: link.rule.clone(),
            });
        };
        let previous = current.priority;
        let lowest = rules
            .iter()
            .map(|r| r.priority)
            .fold(f64::INFINITY, f64::min);

        if previous == lowest {
            tracing::info!(link = %link.id, rule = %link.rule, priority = previous, "link already has the lowest priority");
            return Ok(Promotion::AlreadyPreferred { priority: previous });
        }

        let priority = lowest - PROMOTION_STEP;
        store.set_priority(&link.rule, priority).await?;
        tracing::info!(
            link = %link.id,
            rule = %link.rule,
            previous,
            priority,
            "updated link to the lowest priority"
        );

        tracing::info!(dwell_s = dwell.as_secs(), "dwelling before next iteration");
        let dwell_completed = match pause(dwell, &mut self.shutdown).await {
            Pause::Elapsed => true,
            Pause::Cancelled => {
                tracing::info!(link = %link.id, "dwell interrupted by shutdown");
                false
            }
        };

        Ok(Promotion::Promoted {
            previous,
            priority,
            dwell_completed,
        })
    }
}
