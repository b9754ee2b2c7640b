//! In-memory collaborators.
//!
//! Used by the daemon's `--simulate` mode for the configuration store and by
//! the test suites for both sides. Interior state sits behind `std::sync::Mutex`
//! since no lock is ever held across an await point.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::SelectError;
use crate::link::{Link, LinkId, PriorityRule};
use crate::source::{ConfigStore, TelemetrySource};
use crate::tunables::{bootstrap_defaults, AppDataEntry, Tunables};

// ── Telemetry ───────────────────────────────────────────────────────

#[derive(Default)]
struct LinkQuality {
    /// Readings consumed one per call before falling back to `steady`.
    scripted: VecDeque<i64>,
    steady: Option<i64>,
    failing: bool,
    reads: usize,
}

/// Scriptable telemetry source.
pub struct MemoryTelemetry {
    links: Vec<Link>,
    uptime: Mutex<Duration>,
    quality: Mutex<HashMap<LinkId, LinkQuality>>,
}

impl MemoryTelemetry {
    pub fn new(links: Vec<Link>) -> Self {
        MemoryTelemetry {
            links,
            uptime: Mutex::new(Duration::from_secs(3600)),
            quality: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot_links(&self) -> Vec<Link> {
        self.links.clone()
    }

    pub fn set_uptime(&self, uptime: Duration) {
        *self.uptime.lock().unwrap() = uptime;
    }

    /// Reading returned whenever no scripted value is queued.
    pub fn set_quality(&self, link: &str, quality: i64) {
        let mut map = self.quality.lock().unwrap();
        let entry = map.entry(LinkId::from(link)).or_default();
        entry.steady = Some(quality);
        entry.failing = false;
    }

    /// Queue readings returned in order, one per `quality` call.
    pub fn script(&self, link: &str, readings: &[i64]) {
        let mut map = self.quality.lock().unwrap();
        let entry = map.entry(LinkId::from(link)).or_default();
        entry.scripted.extend(readings.iter().copied());
    }

    /// Number of `quality` calls made for `link`, failed ones included.
    pub fn reads(&self, link: &str) -> usize {
        self.quality
            .lock()
            .unwrap()
            .get(&LinkId::from(link))
            .map_or(0, |q| q.reads)
    }

    /// Make every subsequent read of `link` fail.
    pub fn fail_quality(&self, link: &str) {
        let mut map = self.quality.lock().unwrap();
        map.entry(LinkId::from(link)).or_default().failing = true;
    }
}

impl TelemetrySource for MemoryTelemetry {
    async fn uptime(&self) -> Result<Duration, SelectError> {
        Ok(*self.uptime.lock().unwrap())
    }

    async fn links(&self) -> Result<Vec<Link>, SelectError> {
        Ok(self.links.clone())
    }

    async fn quality(&self, link: &Link) -> Result<i64, SelectError> {
        let mut map = self.quality.lock().unwrap();
        let entry = map
            .get_mut(&link.id)
            .ok_or_else(|| SelectError::Telemetry(format!("no reading for {}", link.id)))?;
        entry.reads += 1;
        if entry.failing {
            return Err(SelectError::Telemetry(format!("{} unavailable", link.id)));
        }
        entry
            .scripted
            .pop_front()
            .or(entry.steady)
            .ok_or_else(|| SelectError::Telemetry(format!("no reading for {}", link.id)))
    }
}

// ── Configuration store ─────────────────────────────────────────────

/// Configuration store holding appdata entries and priority rules in memory.
#[derive(Default)]
pub struct MemoryStore {
    appdata: Mutex<Vec<AppDataEntry>>,
    rules: Mutex<Vec<PriorityRule>>,
    writes: Mutex<Vec<(String, f64)>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new(rules: Vec<PriorityRule>) -> Self {
        MemoryStore {
            rules: Mutex::new(rules),
            ..Default::default()
        }
    }

    /// Replace a stored tunable, inserting it if absent.
    pub fn set_tunable(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let mut appdata = self.appdata.lock().unwrap();
        match appdata.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => appdata.push(AppDataEntry::new(name, value)),
        }
    }

    pub fn appdata(&self) -> Vec<AppDataEntry> {
        self.appdata.lock().unwrap().clone()
    }

    pub fn rules(&self) -> Vec<PriorityRule> {
        self.rules.lock().unwrap().clone()
    }

    pub fn priority_of(&self, rule: &str) -> Option<f64> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == rule)
            .map(|r| r.priority)
    }

    /// Every `set_priority` call accepted so far, in order.
    pub fn writes(&self) -> Vec<(String, f64)> {
        self.writes.lock().unwrap().clone()
    }

    /// Make tunable and rule reads fail until reset.
    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Make priority writes fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    fn check_reads(&self) -> Result<(), SelectError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(SelectError::ConfigRead("store unavailable".into()));
        }
        Ok(())
    }
}

impl ConfigStore for MemoryStore {
    async fn tunables(&self) -> Result<Tunables, SelectError> {
        self.check_reads()?;
        let mut appdata = self.appdata.lock().unwrap();
        bootstrap_defaults(&mut appdata);
        Ok(Tunables::from_entries(&appdata))
    }

    async fn priority_rules(&self) -> Result<Vec<PriorityRule>, SelectError> {
        self.check_reads()?;
        Ok(self.rules())
    }

    async fn set_priority(&self, rule: &str, priority: f64) -> Result<(), SelectError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(SelectError::ConfigWrite("store is read-only".into()));
        }
        let mut rules = self.rules.lock().unwrap();
        let target = rules
            .iter_mut()
            .find(|r| r.id == rule)
            .ok_or_else(|| SelectError::ConfigWrite(format!("no rule `{rule}`")))?;
        target.priority = priority;
        self.writes.lock().unwrap().push((rule.to_string(), priority));
        Ok(())
    }

    async fn seed_rules(&self, links: &[Link]) -> Result<usize, SelectError> {
        self.check_reads()?;
        let mut rules = self.rules.lock().unwrap();
        if !rules.is_empty() {
            return Ok(0);
        }
        *rules = PriorityRule::seed_for(links);
        Ok(rules.len())
    }
}
