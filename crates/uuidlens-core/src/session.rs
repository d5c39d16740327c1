//! Enhancement session: the detect, classify, resolve, annotate pipeline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use uuidlens_config::Config;

use crate::annotator::{AnnotateOutcome, Annotator};
use crate::authority::Authority;
use crate::cache::ResolutionCache;
use crate::classifier::EntityClassifier;
use crate::dom::NodeId;
use crate::entity::EntityType;
use crate::events::{LensEvent, LensStats, PassReport, StatsSnapshot};
use crate::resolver::EntityResolver;
use crate::scanner::{
    PageContext, ScanSession, ScanSubscription, SharedDocument, UuidOccurrence, UuidScanner,
};
use crate::settings::Settings;

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// The pipeline stages a session drives.
#[derive(Debug, Clone)]
pub struct LensComponents {
    pub scanner: UuidScanner,
    pub classifier: EntityClassifier,
    pub resolver: EntityResolver,
    pub annotator: Annotator,
}

impl LensComponents {
    /// Build every stage from configuration around `authority`.
    pub fn from_config(config: &Config, authority: Arc<dyn Authority>) -> Self {
        let cache = Arc::new(ResolutionCache::with_capacity(
            Duration::from_millis(config.settings.cache_timeout_ms),
            config.resolver.cache_capacity,
        ));
        Self {
            scanner: UuidScanner::new(&config.scan)
                .with_ignored_class(config.annotator.marker_class.clone()),
            classifier: EntityClassifier::new(&config.classifier),
            resolver: EntityResolver::new(authority, cache, &config.resolver),
            annotator: Annotator::new(&config.annotator),
        }
    }
}

struct SessionInner {
    document: SharedDocument,
    root: NodeId,
    scanner: Arc<UuidScanner>,
    classifier: EntityClassifier,
    resolver: EntityResolver,
    annotator: Annotator,
    settings: RwLock<Settings>,
    scan_session: Arc<Mutex<ScanSession>>,
    /// Bumped by every clear; in-flight results from an older epoch are dropped.
    epoch: AtomicU64,
    watch_flags: Mutex<Vec<Weak<AtomicBool>>>,
    events: broadcast::Sender<LensEvent>,
    stats: LensStats,
}

/// A lens attached to one document. Cheap to clone.
#[derive(Clone)]
pub struct EnhancementSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for EnhancementSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementSession")
            .field("root", &self.inner.root)
            .field("epoch", &self.epoch())
            .finish()
    }
}

impl EnhancementSession {
    pub fn new(document: SharedDocument, settings: Settings, components: LensComponents) -> Self {
        let root = document.read().root();
        components.resolver.cache().set_timeout(settings.cache_timeout);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionInner {
                document,
                root,
                scanner: Arc::new(components.scanner),
                classifier: components.classifier,
                resolver: components.resolver,
                annotator: components.annotator,
                settings: RwLock::new(settings),
                scan_session: Arc::new(Mutex::new(ScanSession::new())),
                epoch: AtomicU64::new(0),
                watch_flags: Mutex::new(Vec::new()),
                events,
                stats: LensStats::new(),
            }),
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.inner.document
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.inner.resolver
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.read().clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Receive lens events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LensEvent> {
        self.inner.events.subscribe()
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn emit(&self, event: LensEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Scan the document once and process everything new.
    pub async fn run_pass(&self) -> PassReport {
        if !self.inner.settings.read().enabled {
            debug!("Lens disabled, skipping pass");
            return PassReport::default();
        }

        self.set_watches_paused(false);

        let occurrences = {
            let doc = self.inner.document.read();
            let mut session = self.inner.scan_session.lock();
            self.inner.scanner.scan(&doc, self.inner.root, &mut session)
        };
        self.process(occurrences).await
    }

    /// Classify, resolve and annotate a batch of occurrences.
    async fn process(&self, occurrences: Vec<UuidOccurrence>) -> PassReport {
        let mut report = PassReport {
            detected: occurrences.len(),
            ..Default::default()
        };
        if occurrences.is_empty() {
            self.inner.stats.record_pass(&report);
            return report;
        }
        self.emit(LensEvent::Detected {
            count: occurrences.len(),
        });

        let epoch = self.epoch();
        let settings = self.settings();
        let page = PageContext::from_document(
            &self.inner.document.read(),
            Some(self.inner.annotator.marker_class()),
        );

        let mut jobs: Vec<(UuidOccurrence, EntityType)> = Vec::new();
        for occurrence in occurrences {
            let entity_type = self.inner.classifier.classify(&occurrence, &page).entity_type;
            report.count_type(entity_type);
            if settings.is_type_enabled(entity_type) {
                jobs.push((occurrence, entity_type));
            } else {
                debug!(uuid = %occurrence.uuid, %entity_type, "Type disabled, not resolving");
                report.skipped += 1;
            }
        }

        let resolver = self.inner.resolver.clone();
        let mut results = stream::iter(jobs)
            .map(|(occurrence, entity_type)| {
                let resolver = resolver.clone();
                async move {
                    let entity = resolver.resolve(&occurrence.uuid, entity_type).await;
                    (occurrence, entity)
                }
            })
            .buffer_unordered(resolver.max_concurrency());

        while let Some((occurrence, entity)) = results.next().await {
            if let Some(failure) = entity.error.clone() {
                report.failed += 1;
                self.emit(LensEvent::Failed {
                    uuid: entity.uuid.clone(),
                    entity_type: entity.entity_type,
                    failure,
                });
            } else {
                report.resolved += 1;
                self.emit(LensEvent::Resolved {
                    uuid: entity.uuid.clone(),
                    entity_type: entity.entity_type,
                    name: entity.name.clone(),
                });
            }

            if self.epoch() != epoch {
                report.discarded += 1;
                continue;
            }

            let outcome = {
                let mut doc = self.inner.document.write();
                self.inner.annotator.annotate(&mut doc, &occurrence, &entity)
            };
            match outcome {
                Ok(AnnotateOutcome::Inserted(_)) => report.annotated += 1,
                Ok(AnnotateOutcome::Duplicate) => report.duplicate += 1,
                Ok(AnnotateOutcome::Detached) => report.discarded += 1,
                Ok(AnnotateOutcome::Suppressed) => report.suppressed += 1,
                Err(e) => {
                    warn!(uuid = %occurrence.uuid, "Failed to annotate: {}", e);
                    report.discarded += 1;
                }
            }
        }

        self.inner.stats.record_pass(&report);
        info!(
            detected = report.detected,
            resolved = report.resolved,
            failed = report.failed,
            skipped = report.skipped,
            annotated = report.annotated,
            "Pass complete"
        );
        report
    }

    /// Keep annotating as the document changes.
    ///
    /// Does not run an initial pass; call [`run_pass`](Self::run_pass) first.
    pub fn watch(&self) -> WatchHandle {
        let (mut batches, subscription) = self.inner.scanner.subscribe(
            self.inner.document.clone(),
            self.inner.root,
            self.inner.scan_session.clone(),
        );
        subscription.set_paused(!self.inner.settings.read().enabled);

        let flag = subscription.pause_flag();
        let mut flags = self.inner.watch_flags.lock();
        flags.retain(|f| f.strong_count() > 0);
        flags.push(Arc::downgrade(&flag));
        drop(flags);

        let session = self.clone();
        let task = tokio::spawn(async move {
            while let Some(batch) = batches.next().await {
                session.process(batch).await;
            }
            debug!("Watch loop finished");
        });

        WatchHandle {
            subscription: Some(subscription),
            task,
        }
    }

    /// Remove every annotation. Results still in flight are discarded and
    /// active watches are paused, so nothing comes back until the next
    /// [`run_pass`](Self::run_pass) or a settings update that enables the lens.
    pub fn remove_all_annotations(&self) -> usize {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.set_watches_paused(true);
        let removed = {
            let mut doc = self.inner.document.write();
            self.inner.annotator.remove_all_annotations(&mut doc)
        };
        self.inner.scan_session.lock().reset();
        info!(removed, "Removed all annotations");
        self.emit(LensEvent::Cleared { removed });
        removed
    }

    fn set_watches_paused(&self, paused: bool) {
        let mut flags = self.inner.watch_flags.lock();
        flags.retain(|f| f.strong_count() > 0);
        for flag in flags.iter().filter_map(Weak::upgrade) {
            flag.store(paused, Ordering::SeqCst);
        }
    }

    /// Drop every cached resolution.
    pub fn clear_cache(&self) {
        self.inner.resolver.cache().invalidate_all();
        self.emit(LensEvent::CacheCleared);
    }

    /// Replace the settings. Disabling pauses active watches, enabling resumes them.
    pub fn update_settings(&self, settings: Settings) {
        self.inner.resolver.cache().set_timeout(settings.cache_timeout);
        let paused = !settings.enabled;
        *self.inner.settings.write() = settings;
        self.set_watches_paused(paused);
        debug!(paused, "Settings updated");
    }
}

/// Running watch; stops when dropped or via [`WatchHandle::stop`].
pub struct WatchHandle {
    subscription: Option<ScanSubscription>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn is_paused(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_paused())
    }

    pub async fn stop(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.stop().await;
        }
        let _ = self.task.await;
    }
}
