//! Integration tests for the selection loop.
//!
//! These drive `SelectionLoop::run` end to end with in-memory telemetry and
//! configuration on a paused tokio clock: boot gate, sampling cadence,
//! quorum, promotion, dwell, live retuning and shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use strata_select::memory::{MemoryStore, MemoryTelemetry};
use strata_select::tunables::{DWELL_TIME_SEC, SCAN_COUNT, SCAN_INTERVAL_SEC, SCAN_TIME_SEC};
use strata_select::{Link, PriorityRule, SelectionLoop};

// ─── Fixtures ───────────────────────────────────────────────────────────

struct Harness {
    telemetry: Arc<MemoryTelemetry>,
    store: Arc<MemoryStore>,
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<Result<(), strata_select::SelectError>>,
}

impl Harness {
    /// Three modems, rules for wwan0..wwan2, window of 3 votes, quorum 2,
    /// 10 s interval and 60 s dwell.
    fn start(extra_links: Vec<Link>, setup: impl FnOnce(&MemoryTelemetry, &MemoryStore)) -> Self {
        let mut links = vec![
            Link::new("mdm-0", "wwan0"),
            Link::new("mdm-1", "wwan1"),
            Link::new("mdm-2", "wwan2"),
        ];
        links.extend(extra_links);

        let telemetry = Arc::new(MemoryTelemetry::new(links));
        let store = Arc::new(MemoryStore::new(vec![
            PriorityRule::new("wwan0", 1.0),
            PriorityRule::new("wwan1", 1.1),
            PriorityRule::new("wwan2", 1.2),
        ]));
        store.set_tunable(SCAN_TIME_SEC, "30");
        store.set_tunable(SCAN_INTERVAL_SEC, "10");
        store.set_tunable(SCAN_COUNT, "2");
        store.set_tunable(DWELL_TIME_SEC, "60");
        setup(&telemetry, &store);

        let (shutdown, rx) = watch::channel(false);
        let selection = SelectionLoop::new(telemetry.clone(), store.clone(), rx)
            .with_min_uptime(Duration::from_secs(120));
        let handle = tokio::spawn(selection.run());

        Harness {
            telemetry,
            store,
            shutdown,
            handle,
        }
    }

    async fn stop(self) -> (Arc<MemoryTelemetry>, Arc<MemoryStore>) {
        let _ = self.shutdown.send(true);
        self.handle.await.unwrap().unwrap();
        (self.telemetry, self.store)
    }
}

fn steady(t: &MemoryTelemetry, values: &[(&str, i64)]) {
    for (link, q) in values {
        t.set_quality(link, *q);
    }
}

// ─── Promotion ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn sustained_best_link_is_promoted_once() {
    let h = Harness::start(Vec::new(), |t, _| {
        steady(t, &[("mdm-0", -14), ("mdm-1", -12), ("mdm-2", -6)]);
    });

    tokio::time::sleep(Duration::from_secs(600)).await;
    let (_, store) = h.stop().await;

    // Later quorums for the same link find it already preferred.
    assert_eq!(store.writes().len(), 1);
    let promoted = store.priority_of("wwan2").unwrap();
    assert!((promoted - 0.9).abs() < 1e-9);
    assert_eq!(store.priority_of("wwan0"), Some(1.0));
    assert_eq!(store.priority_of("wwan1"), Some(1.1));
}

#[tokio::test(start_paused = true)]
async fn rotating_leaders_never_reach_quorum() {
    let h = Harness::start(Vec::new(), |t, _| {
        let rotation: Vec<i64> = (0..30).map(|i| if i % 3 == 0 { -4 } else { -15 }).collect();
        let shifted = |k: usize| -> Vec<i64> {
            rotation.iter().cycle().skip(k).take(30).copied().collect()
        };
        t.script("mdm-0", &shifted(0));
        t.script("mdm-1", &shifted(2));
        t.script("mdm-2", &shifted(1));
        steady(t, &[("mdm-0", -20), ("mdm-1", -20), ("mdm-2", -20)]);
    });

    // 30 ticks at 10 s each.
    tokio::time::sleep(Duration::from_secs(295)).await;
    let (_, store) = h.stop().await;
    assert!(store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_rule_does_not_stop_the_loop() {
    let h = Harness::start(vec![Link::new("mdm-3", "wwan3")], |t, _| {
        t.script("mdm-3", &[-3, -3, -3]);
        steady(t, &[("mdm-0", -12), ("mdm-1", -8), ("mdm-2", -15), ("mdm-3", -20)]);
    });

    tokio::time::sleep(Duration::from_secs(300)).await;
    let (_, store) = h.stop().await;

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "wwan1");
    assert!((writes[0].1 - 0.9).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn failing_link_loses_its_votes() {
    let h = Harness::start(Vec::new(), |t, _| {
        steady(t, &[("mdm-0", -14), ("mdm-1", -9)]);
        t.fail_quality("mdm-2");
    });

    tokio::time::sleep(Duration::from_secs(100)).await;
    let (_, store) = h.stop().await;
    assert_eq!(store.writes().len(), 1);
    assert_eq!(store.writes()[0].0, "wwan1");
}

// ─── Timing ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn boot_gate_delays_first_promotion() {
    let start = Instant::now();
    let h = Harness::start(Vec::new(), |t, _| {
        t.set_uptime(Duration::from_secs(20));
        steady(t, &[("mdm-0", -14), ("mdm-1", -5), ("mdm-2", -14)]);
    });

    // Boot waits 100 s; three ticks at +0, +10, +20 promote at ~120 s.
    tokio::time::sleep(Duration::from_secs(115)).await;
    assert!(h.store.writes().is_empty());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.store.writes().len(), 1);
    assert!(start.elapsed() >= Duration::from_secs(120));
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_dwell_returns_promptly() {
    let h = Harness::start(Vec::new(), |t, _| {
        steady(t, &[("mdm-0", -14), ("mdm-1", -12), ("mdm-2", -6)]);
    });

    // Promotion lands at t=20 and the 60 s dwell runs until t=80.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.store.writes().len(), 1);

    let before = Instant::now();
    h.stop().await;
    assert!(before.elapsed() < Duration::from_secs(50));
}

#[tokio::test(start_paused = true)]
async fn live_retune_changes_the_window() {
    let h = Harness::start(Vec::new(), |t, store| {
        // Start with a window the leader can never fill within the test.
        store.set_tunable(SCAN_TIME_SEC, "100000");
        steady(t, &[("mdm-0", -14), ("mdm-1", -12), ("mdm-2", -6)]);
    });

    tokio::time::sleep(Duration::from_secs(95)).await;
    assert!(h.store.writes().is_empty());

    // Shrink the window to a single vote with quorum 1: next tick promotes.
    h.store.set_tunable(SCAN_TIME_SEC, "10");
    h.store.set_tunable(SCAN_COUNT, "1");
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.store.writes().len(), 1);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn live_interval_change_sets_the_cadence() {
    // Equal readings: mdm-0 wins every quorum but already holds the best
    // rule, so no dwell ever interrupts the cadence.
    let h = Harness::start(Vec::new(), |t, _| {
        steady(t, &[("mdm-0", -10), ("mdm-1", -10), ("mdm-2", -10)]);
    });

    // Ticks at 0, 10, ..., 50.
    tokio::time::sleep(Duration::from_secs(55)).await;
    assert_eq!(h.telemetry.reads("mdm-0"), 6);

    // The tick at 60 picks up the new interval; then 90 and 120.
    h.store.set_tunable(SCAN_INTERVAL_SEC, "30");
    tokio::time::sleep(Duration::from_secs(70)).await;
    assert_eq!(h.telemetry.reads("mdm-0"), 9);

    let (_, store) = h.stop().await;
    assert!(store.writes().is_empty());
}
