//! Live scanning of a changing document.
//!
//! A subscription observes document mutations, coalesces bursts with a
//! debounce and re-scans the subtree. A periodic reconciliation pass catches
//! changes that were never reported as mutations (late framework renders
//! that replace whole subtrees, value properties set without events).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, trace};

use uuidlens_config::ScanConfig;

use super::{ScanSession, UuidOccurrence, UuidScanner};
use crate::dom::{Document, MutationKind, MutationRecord, NodeId};

/// A document shared between the page owner and the lens.
pub type SharedDocument = Arc<RwLock<Document>>;

/// Batches buffered before the subscriber falls behind.
const BATCH_BUFFER: usize = 32;

/// Re-scan timing for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTiming {
    /// Delay between the first relevant mutation of a burst and the re-scan.
    pub debounce: Duration,
    /// Period of the reconciliation pass; `None` disables it.
    pub reconcile: Option<Duration>,
}

impl ScanTiming {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            reconcile: (config.reconcile_interval_ms > 0)
                .then(|| Duration::from_millis(config.reconcile_interval_ms)),
        }
    }
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Handle to a running subscription. Dropping it stops the background task.
pub struct ScanSubscription {
    shutdown_tx: Option<mpsc::Sender<()>>,
    paused: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ScanSubscription {
    /// Shared pause flag, for owners that toggle it from elsewhere.
    pub fn pause_flag(&self) -> Arc<AtomicBool> {
        self.paused.clone()
    }

    /// While paused, mutations are ignored and no passes run.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Stop the background task and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ScanSubscription {
    fn drop(&mut self) {
        // Closing the channel ends the loop on its next wakeup.
        self.shutdown_tx.take();
    }
}

impl UuidScanner {
    /// Watch `root` for changes and stream newly found occurrences.
    ///
    /// No pass runs at subscription time; callers scan once themselves and
    /// share `session` so nothing is reported twice.
    pub fn subscribe(
        self: &Arc<Self>,
        document: SharedDocument,
        root: NodeId,
        session: Arc<Mutex<ScanSession>>,
    ) -> (ReceiverStream<Vec<UuidOccurrence>>, ScanSubscription) {
        let (batch_tx, batch_rx) = mpsc::channel(BATCH_BUFFER);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let paused = Arc::new(AtomicBool::new(false));

        let mut mutations = document.write().observe();
        let scanner = Arc::clone(self);
        let flag = paused.clone();
        let timing = self.timing;

        let task = tokio::spawn(async move {
            let mut deadline: Option<Instant> = None;
            let mut reconcile = timing.reconcile.map(|period| {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                interval
            });

            info!(root = %root, "UUID scan subscription started");

            loop {
                let due = deadline;
                let run_pass = tokio::select! {
                    record = mutations.recv() => {
                        let Some(record) = record else {
                            debug!("Document dropped, ending subscription");
                            break;
                        };
                        if !flag.load(Ordering::SeqCst)
                            && deadline.is_none()
                            && scanner.is_relevant(&document.read(), root, &record)
                        {
                            trace!(target_node = %record.target, "Relevant mutation, debouncing");
                            deadline = Some(Instant::now() + timing.debounce);
                        }
                        false
                    }
                    _ = shutdown_rx.recv() => {
                        info!("UUID scan subscription shutting down");
                        break;
                    }
                    _ = tokio::time::sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => {
                        deadline = None;
                        true
                    }
                    _ = next_tick(&mut reconcile) => {
                        trace!("Reconciliation pass");
                        true
                    }
                };

                if !run_pass || flag.load(Ordering::SeqCst) {
                    continue;
                }

                let found = {
                    let doc = document.read();
                    let mut session = session.lock();
                    scanner.scan(&doc, root, &mut session)
                };
                if !found.is_empty() && batch_tx.send(found).await.is_err() {
                    debug!("Subscriber dropped, ending subscription");
                    break;
                }
            }
        });

        (
            ReceiverStream::new(batch_rx),
            ScanSubscription {
                shutdown_tx: Some(shutdown_tx),
                paused,
                task: Some(task),
            },
        )
    }

    /// Whether a mutation can change what a scan of `root` would find.
    fn is_relevant(&self, doc: &Document, root: NodeId, record: &MutationRecord) -> bool {
        if !doc.contains(root, record.target) || self.is_inside_ignored(doc, record.target) {
            return false;
        }
        match &record.kind {
            MutationKind::Attribute { name } => self.is_value_attribute(name),
            MutationKind::CharacterData | MutationKind::FormValue => true,
            MutationKind::ChildList { added, removed } => added
                .iter()
                .chain(removed)
                .any(|&n| !self.is_ignored_element(doc, n)),
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
