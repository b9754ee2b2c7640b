//! Cellular WAN selection for multi-modem senders.
//!
//! This crate contains:
//! - **Collector**: one quality (RSRQ) sample per link per tick
//! - **Voter**: sliding window of per-tick winners with a quorum threshold
//! - **Arbiter**: promotes the winning link's routing-priority rule, then dwells
//! - **Selection loop**: boot gate, sampling cadence and shutdown handling
//!
//! The modem telemetry and the routing configuration are reached through the
//! [`TelemetrySource`] and [`ConfigStore`] traits; the daemon binary provides
//! the production adapters.

pub mod arbiter;
pub mod collector;
pub mod error;
pub mod link;
pub mod memory;
pub mod pause;
pub mod selection;
pub mod source;
pub mod tunables;
pub mod voter;

pub use arbiter::{PriorityArbiter, Promotion};
pub use collector::SampleCollector;
pub use error::SelectError;
pub use link::{Link, LinkId, PriorityRule, Sample, SampleSet};
pub use selection::{LoopState, SelectionLoop, TickOutcome};
pub use source::{ConfigStore, TelemetrySource};
pub use tunables::{AppDataEntry, Tunables};
pub use voter::SlidingWindowVoter;
