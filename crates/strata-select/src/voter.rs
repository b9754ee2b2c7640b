//! # Sliding Window Voter
//!
//! Turns a noisy stream of per-tick samples into a stable preferred-link
//! decision.
//!
//! Each tick that produced at least one sample appends its best link to the
//! window. The window primes until it holds `window_size` votes; from then on
//! every append is evaluated once:
//!
//! ```text
//! [A, B, A]  quorum 2  →  A wins, window cleared
//! [A, B, C]  quorum 2  →  no winner, evict A → [B, C]
//! ```
//!
//! Without a winner exactly one (the oldest) vote is evicted, so the next
//! tick re-fills the window and is evaluated again.

use std::collections::{BTreeMap, VecDeque};

use crate::link::{best_sample, LinkId, SampleSet};
use crate::tunables::Tunables;

/// Bounded FIFO of per-tick winners with a quorum threshold.
#[derive(Debug, Clone)]
pub struct SlidingWindowVoter {
    window: VecDeque<LinkId>,
    window_size: usize,
    quorum: usize,
}

impl SlidingWindowVoter {
    pub fn new(tunables: &Tunables) -> Self {
        SlidingWindowVoter {
            window: VecDeque::with_capacity(tunables.window_size()),
            window_size: tunables.window_size(),
            quorum: tunables.quorum(),
        }
    }

    /// Apply freshly read tunables. A shrunken window drops its oldest votes
    /// so that `len() <= window_size()` keeps holding.
    pub fn retune(&mut self, tunables: &Tunables) {
        let window_size = tunables.window_size();
        let quorum = tunables.quorum();
        if window_size != self.window_size || quorum != self.quorum {
            tracing::info!(
                window_size,
                quorum,
                previous_window_size = self.window_size,
                previous_quorum = self.quorum,
                "voting window retuned"
            );
        }
        self.window_size = window_size;
        self.quorum = quorum;
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
    }

    /// Record one tick. Returns the link that reached quorum, if any.
    pub fn record_tick(&mut self, samples: &SampleSet) -> Option<LinkId> {
        let best = best_sample(samples)?;
        // Only reachable as full right after a shrinking retune.
        while self.window.len() >= self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(best.link.clone());
        tracing::debug!(
            vote = %best.link,
            quality = best.quality,
            votes = self.window.len(),
            window_size = self.window_size,
            "recorded tick winner"
        );

        if self.window.len() < self.window_size {
            return None;
        }

        if let Some((winner, wins)) = self.quorum_winner() {
            tracing::info!(
                link = %winner,
                wins,
                quorum = self.quorum,
                window_size = self.window_size,
                "link had the best quality for at least {} of the previous {} scans",
                self.quorum,
                self.window_size
            );
            self.window.clear();
            return Some(winner);
        }

        if let Some(evicted) = self.window.pop_front() {
            tracing::debug!(evicted = %evicted, votes = self.window.len(), "no quorum, removed oldest vote");
        }
        None
    }

    /// Link with the most wins among those at or above quorum. Equal counts
    /// go to the smallest link id.
    fn quorum_winner(&self) -> Option<(LinkId, usize)> {
        let mut counts: BTreeMap<&LinkId, usize> = BTreeMap::new();
        for id in &self.window {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n >= self.quorum)
            .fold(None, |best: Option<(&LinkId, usize)>, (id, n)| match best {
                Some((_, b)) if b >= n => best,
                _ => Some((id, n)),
            })
            .map(|(id, n)| (id.clone(), n))
    }

    pub fn window(&self) -> impl Iterator<Item = &LinkId> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}
