//! Operator tunables for the selection loop.
//!
//! Tunables are persisted in the configuration store as string
//! name/value pairs ([`AppDataEntry`]). Missing entries are bootstrapped
//! with defaults; unparseable or zero values fall back to the default for
//! that field only.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SelectError;

pub const SCAN_TIME_SEC: &str = "scan_time_sec";
pub const SCAN_INTERVAL_SEC: &str = "scan_interval_sec";
pub const SCAN_COUNT: &str = "scan_count";
pub const DWELL_TIME_SEC: &str = "dwell_time_sec";

/// A single persisted tunable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDataEntry {
    pub name: String,
    pub value: String,
}

impl AppDataEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        AppDataEntry {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Selection tunables, all in whole seconds except `scan_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunables {
    /// Length of the voting window in seconds.
    pub scan_time_sec: u64,
    /// Seconds between two samples.
    pub scan_interval_sec: u64,
    /// Wins within the window required to promote (quorum).
    pub scan_count: u64,
    /// Cooldown after a promotion.
    pub dwell_time_sec: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            scan_time_sec: 180,
            scan_interval_sec: 10,
            scan_count: 15,
            dwell_time_sec: 240,
        }
    }
}

impl Tunables {
    /// Number of votes held by the window: `scan_time / scan_interval`,
    /// never less than one.
    pub fn window_size(&self) -> usize {
        let interval = self.scan_interval_sec.max(1);
        ((self.scan_time_sec / interval) as usize).max(1)
    }

    /// Quorum threshold, never less than one.
    pub fn quorum(&self) -> usize {
        (self.scan_count as usize).max(1)
    }

    /// Pause between ticks, never less than one second.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_sec.max(1))
    }

    pub fn dwell_time(&self) -> Duration {
        Duration::from_secs(self.dwell_time_sec)
    }

    /// Default entries in their canonical store order.
    pub fn default_entries() -> Vec<AppDataEntry> {
        let d = Tunables::default();
        vec![
            AppDataEntry::new(SCAN_TIME_SEC, d.scan_time_sec.to_string()),
            AppDataEntry::new(SCAN_INTERVAL_SEC, d.scan_interval_sec.to_string()),
            AppDataEntry::new(SCAN_COUNT, d.scan_count.to_string()),
            AppDataEntry::new(DWELL_TIME_SEC, d.dwell_time_sec.to_string()),
        ]
    }

    /// Build tunables from stored entries. Unknown names are ignored; a
    /// missing, unparseable or zero value keeps the default for that field.
    pub fn from_entries(entries: &[AppDataEntry]) -> Self {
        let mut tunables = Tunables::default();
        for entry in entries {
            let slot = match entry.name.as_str() {
                SCAN_TIME_SEC => &mut tunables.scan_time_sec,
                SCAN_INTERVAL_SEC => &mut tunables.scan_interval_sec,
                SCAN_COUNT => &mut tunables.scan_count,
                DWELL_TIME_SEC => &mut tunables.dwell_time_sec,
                _ => continue,
            };
            match parse_positive(entry) {
                Ok(v) => *slot = v,
                Err(e) => tracing::warn!(
                    error = %e,
                    default = *slot,
                    "ignoring tunable, using default"
                ),
            }
        }
        tunables
    }
}

/// Append a default entry for every tunable missing from `entries`.
///
/// Returns the entries that were added so the caller can persist them.
pub fn bootstrap_defaults(entries: &mut Vec<AppDataEntry>) -> Vec<AppDataEntry> {
    let mut added = Vec::new();
    for default in Tunables::default_entries() {
        if entries.iter().any(|e| e.name == default.name) {
            tracing::trace!(name = %default.name, "tunable already present");
            continue;
        }
        tracing::info!(name = %default.name, value = %default.value, "added default tunable");
        entries.push(default.clone());
        added.push(default);
    }
    added
}

fn parse_positive(entry: &AppDataEntry) -> Result<u64, SelectError> {
    entry
        .value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| SelectError::InvalidTunable {
            name: entry.name.clone(),
            value: entry.value.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let t = Tunables::default();
        assert_eq!(t.scan_time_sec, 180);
        assert_eq!(t.scan_interval_sec, 10);
        assert_eq!(t.scan_count, 15);
        assert_eq!(t.dwell_time_sec, 240);
        assert_eq!(t.window_size(), 18);
    }

    #[test]
    fn window_size_floors() {
        let t = Tunables {
            scan_time_sec: 35,
            scan_interval_sec: 10,
            ..Default::default()
        };
        assert_eq!(t.window_size(), 3);
    }

    #[test]
    fn window_size_is_at_least_one() {
        let t = Tunables {
            scan_time_sec: 5,
            scan_interval_sec: 10,
            ..Default::default()
        };
        assert_eq!(t.window_size(), 1);
    }

    #[test]
    fn zero_interval_still_pauses() {
        let t = Tunables {
            scan_interval_sec: 0,
            ..Default::default()
        };
        assert_eq!(t.scan_interval(), Duration::from_secs(1));
        assert_eq!(t.window_size(), 180);
    }

    #[test]
    fn from_entries_overrides_known_names() {
        let entries = vec![
            AppDataEntry::new(SCAN_TIME_SEC, "30"),
            AppDataEntry::new(SCAN_COUNT, "2"),
            AppDataEntry::new("unrelated", "x"),
        ];
        let t = Tunables::from_entries(&entries);
        assert_eq!(t.scan_time_sec, 30);
        assert_eq!(t.scan_count, 2);
        assert_eq!(t.scan_interval_sec, 10);
        assert_eq!(t.dwell_time_sec, 240);
    }

    #[test]
    fn invalid_values_fall_back_per_field() {
        let entries = vec![
            AppDataEntry::new(SCAN_INTERVAL_SEC, "0"),
            AppDataEntry::new(DWELL_TIME_SEC, "soon"),
            AppDataEntry::new(SCAN_COUNT, " 4 "),
        ];
        let t = Tunables::from_entries(&entries);
        assert_eq!(t.scan_interval_sec, 10);
        assert_eq!(t.dwell_time_sec, 240);
        assert_eq!(t.scan_count, 4);
    }

    #[test]
    fn negative_value_is_invalid() {
        let err = parse_positive(&AppDataEntry::new(SCAN_COUNT, "-3")).unwrap_err();
        assert!(matches!(err, SelectError::InvalidTunable { ref name, .. } if name == SCAN_COUNT));
    }

    #[test]
    fn bootstrap_adds_only_missing() {
        let mut entries = vec![AppDataEntry::new(SCAN_COUNT, "5")];
        let added = bootstrap_defaults(&mut entries);
        assert_eq!(added.len(), 3);
        assert_eq!(entries.len(), 4);
        assert!(added.iter().all(|e| e.name != SCAN_COUNT));
        assert_eq!(Tunables::from_entries(&entries).scan_count, 5);

        let again = bootstrap_defaults(&mut entries);
        assert!(again.is_empty());
    }
}
