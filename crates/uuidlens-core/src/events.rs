//! Lens events and counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::entity::EntityType;
use crate::error::ResolutionFailure;

/// Notification emitted by an enhancement session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LensEvent {
    /// A pass found new occurrences.
    Detected { count: usize },
    Resolved {
        uuid: String,
        entity_type: EntityType,
        name: String,
    },
    Failed {
        uuid: String,
        entity_type: EntityType,
        failure: ResolutionFailure,
    },
    /// All annotations were removed.
    Cleared { removed: usize },
    CacheCleared,
}

/// Counters for one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// New occurrences found by the scan.
    pub detected: usize,
    /// Detected occurrences per classified type.
    pub by_type: BTreeMap<EntityType, usize>,
    /// Not resolved because their type is disabled.
    pub skipped: usize,
    pub resolved: usize,
    pub failed: usize,
    pub annotated: usize,
    /// Already annotated at that location.
    pub duplicate: usize,
    /// Results dropped because the source went away or a clear happened.
    pub discarded: usize,
    /// Failure markers not rendered.
    pub suppressed: usize,
}

impl PassReport {
    pub(crate) fn count_type(&mut self, entity_type: EntityType) {
        *self.by_type.entry(entity_type).or_default() += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.detected == 0
    }
}

/// Cumulative counters across passes.
#[derive(Debug, Default)]
pub struct LensStats {
    passes: AtomicU64,
    detected: AtomicU64,
    skipped: AtomicU64,
    resolved: AtomicU64,
    failed: AtomicU64,
    annotated: AtomicU64,
    duplicate: AtomicU64,
    discarded: AtomicU64,
    suppressed: AtomicU64,
    by_type: Mutex<BTreeMap<EntityType, u64>>,
}

/// Point-in-time copy of [`LensStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub passes: u64,
    pub detected: u64,
    pub by_type: BTreeMap<EntityType, u64>,
    pub skipped: u64,
    pub resolved: u64,
    pub failed: u64,
    pub annotated: u64,
    pub duplicate: u64,
    pub discarded: u64,
    pub suppressed: u64,
}

impl LensStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished pass into the totals.
    pub fn record_pass(&self, report: &PassReport) {
        let add = |counter: &AtomicU64, n: usize| {
            counter.fetch_add(n as u64, Ordering::Relaxed);
        };
        add(&self.passes, 1);
        add(&self.detected, report.detected);
        add(&self.skipped, report.skipped);
        add(&self.resolved, report.resolved);
        add(&self.failed, report.failed);
        add(&self.annotated, report.annotated);
        add(&self.duplicate, report.duplicate);
        add(&self.discarded, report.discarded);
        add(&self.suppressed, report.suppressed);

        let mut by_type = self.by_type.lock();
        for (entity_type, count) in &report.by_type {
            *by_type.entry(*entity_type).or_default() += *count as u64;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            passes: get(&self.passes),
            detected: get(&self.detected),
            by_type: self.by_type.lock().clone(),
            skipped: get(&self.skipped),
            resolved: get(&self.resolved),
            failed: get(&self.failed),
            annotated: get(&self.annotated),
            duplicate: get(&self.duplicate),
            discarded: get(&self.discarded),
            suppressed: get(&self.suppressed),
        }
    }
}
