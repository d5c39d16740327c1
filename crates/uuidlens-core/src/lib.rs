//! # uuidlens Core
//!
//! Finds UUIDs in a rendered document, guesses what each one identifies,
//! resolves it to a name through a remote authority and annotates the page.
//!
//! ## Components
//!
//! - [`UuidScanner`] - single-pass detection plus a debounced live subscription
//! - [`EntityClassifier`] - keyword heuristics mapping context to an [`EntityType`]
//! - [`ResolutionCache`] - expiring (uuid, type) cache shared by all passes
//! - [`EntityResolver`] - cache-first, coalescing, bounded client of an [`Authority`]
//! - [`Annotator`] - inserts and removes markers in the [`Document`]
//! - [`EnhancementSession`] - drives the pipeline for one document

pub mod annotator;
pub mod authority;
pub mod cache;
pub mod classifier;
pub mod dom;
pub mod entity;
pub mod error;
pub mod events;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod settings;

pub use annotator::{AnnotateOutcome, Annotator, Placement};
pub use authority::{Authority, UnavailableAuthority};
pub use cache::{CacheKey, ResolutionCache};
pub use classifier::{Classification, EntityClassifier, Evidence, KeywordTable};
pub use dom::{Document, DomSnapshot, MutationKind, MutationRecord, NodeId};
pub use entity::{EntityDetails, EntityRecord, EntityType, ResolvedEntity};
pub use error::{DomError, ResolutionFailure, UnknownEntityType};
pub use events::{LensEvent, LensStats, PassReport, StatsSnapshot};
pub use resolver::EntityResolver;
pub use scanner::{
    ContextHints, PageContext, ScanSession, ScanSubscription, SharedDocument, SourceKind,
    UuidOccurrence, UuidScanner, find_uuids,
};
pub use session::{EnhancementSession, LensComponents, WatchHandle};
pub use settings::Settings;
