//! Collaborator contracts consumed by the selection core.
//!
//! Both are polled; neither is assumed to be transactional across calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SelectError;
use crate::link::{Link, PriorityRule};
use crate::tunables::Tunables;

/// Read-only view of the router's modems.
pub trait TelemetrySource: Send + Sync {
    /// Host uptime.
    fn uptime(&self) -> impl Future<Output = Result<Duration, SelectError>> + Send;

    /// Currently connected candidate links.
    fn links(&self) -> impl Future<Output = Result<Vec<Link>, SelectError>> + Send;

    /// One signal-quality reading for `link`. Higher is better.
    fn quality(&self, link: &Link) -> impl Future<Output = Result<i64, SelectError>> + Send;
}

/// Tunables and routing-priority rules.
pub trait ConfigStore: Send + Sync {
    /// Current tunables. Implementations insert defaults for missing
    /// entries before returning.
    fn tunables(&self) -> impl Future<Output = Result<Tunables, SelectError>> + Send;

    /// Full routing-priority rule set.
    fn priority_rules(&self) -> impl Future<Output = Result<Vec<PriorityRule>, SelectError>> + Send;

    /// Overwrite the priority of rule `rule`.
    fn set_priority(
        &self,
        rule: &str,
        priority: f64,
    ) -> impl Future<Output = Result<(), SelectError>> + Send;

    /// Create one rule per link when the store holds no rules at all.
    /// Returns how many rules were added; an existing rule set is left alone.
    fn seed_rules(&self, links: &[Link]) -> impl Future<Output = Result<usize, SelectError>> + Send;
}

impl<T: TelemetrySource> TelemetrySource for Arc<T> {
    fn uptime(&self) -> impl Future<Output = Result<Duration, SelectError>> + Send {
        (**self).uptime()
    }

    fn links(&self) -> impl Future<Output = Result<Vec<Link>, SelectError>> + Send {
        (**self).links()
    }

    fn quality(&self, link: &Link) -> impl Future<Output = Result<i64, SelectError>> + Send {
        (**self).quality(link)
    }
}

impl<C: ConfigStore> ConfigStore for Arc<C> {
    fn tunables(&self) -> impl Future<Output = Result<Tunables, SelectError>> + Send {
        (**self).tunables()
    }

    fn priority_rules(&self) -> impl Future<Output = Result<Vec<PriorityRule>, SelectError>> + Send {
        (**self).priority_rules()
    }

    fn set_priority(
        &self,
        rule: &str,
        priority: f64,
    ) -> impl Future<Output = Result<(), SelectError>> + Send {
        (**self).set_priority(rule, priority)
    }

    fn seed_rules(&self, links: &[Link]) -> impl Future<Output = Result<usize, SelectError>> + Send {
        (**self).seed_rules(links)
    }
}
