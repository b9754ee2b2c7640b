//! Error type shared by the selection core and its collaborators.

use thiserror::Error;

use crate::link::LinkId;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SelectError {
    /// A telemetry read (uptime, link list, quality) failed.
    #[error("telemetry read failed: {0}")]
    Telemetry(String),
    /// Tunables or priority rules could not be read.
    #[error("configuration read failed: {0}")]
    ConfigRead(String),
    /// A priority write was rejected by the configuration store.
    #[error("configuration write failed: {0}")]
    ConfigWrite(String),
    /// The winning link has no routing-priority rule to mutate.
    #[error("link {link} has no priority rule `{rule}`")]
    MissingRule { link: LinkId, rule: String },
    /// A stored tunable is not a positive integer.
    #[error("invalid tunable {name}={value:?}")]
    InvalidTunable { name: String, value: String },
}
