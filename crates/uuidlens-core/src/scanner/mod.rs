//! UUID scanner.
//!
//! Walks a document subtree once and reports every UUID found in element
//! text, value-bearing attributes and live form values. Each distinct
//! (uuid, element) pair is reported once per [`ScanSession`]; the same UUID
//! in two different elements yields two occurrences.

mod context;
mod subscription;

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use uuidlens_config::ScanConfig;

use crate::dom::{Document, NodeId, SelectorList};
use crate::error::DomError;

pub use context::{ContextHints, PageContext};
pub use subscription::{ScanSubscription, ScanTiming, SharedDocument};

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern is valid")
});

/// How far up a label-like sibling is looked for when accepting a field
/// outside the include list.
const LABELED_FIELD_DEPTH: usize = 2;

/// Elements whose content is never rendered text.
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "template", "noscript"];

/// Where in an element a UUID was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum SourceField {
    /// A direct text child of the element.
    Text(NodeId),
    /// A value-bearing attribute.
    Attribute(String),
    /// The live form-control value.
    FormValue,
}

/// Coarse source category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Text,
    AttributeValue,
    FormValue,
}

/// DOM location of an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OccurrenceLocation {
    /// Element owning the UUID text.
    pub element: NodeId,
    pub field: SourceField,
}

impl OccurrenceLocation {
    /// Node an inline annotation is placed after.
    pub fn anchor(&self) -> NodeId {
        match self.field {
            SourceField::Text(text) => text,
            _ => self.element,
        }
    }
}

/// A UUID found during a scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UuidOccurrence {
    /// Canonical lowercase hyphenated form.
    pub uuid: String,
    pub location: OccurrenceLocation,
    pub context: ContextHints,
}

impl UuidOccurrence {
    pub fn source_kind(&self) -> SourceKind {
        match self.location.field {
            SourceField::Text(_) => SourceKind::Text,
            SourceField::Attribute(_) => SourceKind::AttributeValue,
            SourceField::FormValue => SourceKind::FormValue,
        }
    }

    /// Nearby label and identifier strings, most specific first.
    pub fn context_hints(&self) -> Vec<&str> {
        self.context.ordered()
    }
}

/// Per-session scan state: which (uuid, element) pairs were already emitted.
#[derive(Debug, Default)]
pub struct ScanSession {
    seen: HashSet<(String, NodeId)>,
    passes: u64,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything seen so a following pass reports it again.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }
}

/// Extract canonical UUIDs from a string, in order of appearance.
///
/// UUIDs may be glued to other text (`script_<uuid>`, `id:<uuid>x`), but a
/// match that is part of a longer hex run is not a UUID.
pub fn find_uuids(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    UUID_PATTERN
        .find_iter(text)
        .filter(|m| !touches_hex(bytes, m.start(), m.end()))
        .filter_map(|m| uuid::Uuid::parse_str(m.as_str()).ok())
        .map(|u| u.hyphenated().to_string())
        .collect()
}

fn touches_hex(bytes: &[u8], start: usize, end: usize) -> bool {
    let before = start.checked_sub(1).and_then(|i| bytes.get(i));
    let after = bytes.get(end);
    before.into_iter().chain(after).any(|b| b.is_ascii_hexdigit())
}

/// Remove UUID text from a string.
pub(crate) fn strip_uuids(text: &str) -> String {
    UUID_PATTERN.replace_all(text, " ").into_owned()
}

/// Single-pass UUID detector.
#[derive(Debug, Clone)]
pub struct UuidScanner {
    include: SelectorList,
    labeled_fields: bool,
    exclude: SelectorList,
    value_attributes: Vec<String>,
    label_selectors: SelectorList,
    ignore_class: Option<String>,
    max_ancestor_depth: usize,
    timing: ScanTiming,
}

impl UuidScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            include: SelectorList::parse_lenient(&config.include),
            labeled_fields: config.labeled_fields,
            exclude: SelectorList::parse_lenient(&config.exclude),
            value_attributes: config
                .value_attributes
                .iter()
                .map(|a| a.to_ascii_lowercase())
                .collect(),
            label_selectors: SelectorList::parse_lenient(&config.label_selectors),
            ignore_class: None,
            max_ancestor_depth: config.max_ancestor_depth.max(1),
            timing: ScanTiming::from_config(config),
        }
    }

    /// Skip subtrees of elements with this class (our own markers).
    pub fn with_ignored_class(mut self, class: impl Into<String>) -> Self {
        self.ignore_class = Some(class.into());
        self
    }

    pub fn timing(&self) -> ScanTiming {
        self.timing
    }

    pub fn ignored_class(&self) -> Option<&str> {
        self.ignore_class.as_deref()
    }

    pub fn max_ancestor_depth(&self) -> usize {
        self.max_ancestor_depth
    }

    pub(crate) fn is_value_attribute(&self, name: &str) -> bool {
        self.value_attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Whether `id` itself carries the ignored class.
    pub(crate) fn is_ignored_element(&self, doc: &Document, id: NodeId) -> bool {
        self.ignore_class
            .as_deref()
            .is_some_and(|class| doc.has_class(id, class))
    }

    /// Whether `id` sits inside an ignored subtree.
    pub(crate) fn is_inside_ignored(&self, doc: &Document, id: NodeId) -> bool {
        doc.inclusive_ancestors(id)
            .any(|n| self.is_ignored_element(doc, n))
    }

    /// Scan the subtree at `root`, returning occurrences not yet seen by `session`.
    pub fn scan(
        &self,
        doc: &Document,
        root: NodeId,
        session: &mut ScanSession,
    ) -> Vec<UuidOccurrence> {
        session.passes += 1;
        let mut found = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let Ok(element) = doc.element(id) else {
                continue;
            };
            if SKIPPED_TAGS.contains(&element.tag.as_str()) || self.is_ignored_element(doc, id) {
                continue;
            }

            match self.scan_element(doc, id, session) {
                Ok(occurrences) => found.extend(occurrences),
                Err(e) => debug!("Skipping node {} during scan: {}", id, e),
            }

            stack.extend(doc.children(id).iter().rev().copied());
        }

        if !found.is_empty() {
            debug!(
                pass = session.passes,
                count = found.len(),
                "Scan found new UUID occurrences"
            );
        }
        found
    }

    /// Inside an included container, or a field with a label beside it.
    fn is_included(&self, doc: &Document, id: NodeId) -> bool {
        if self.include.is_empty() || doc.closest(id, &self.include).is_some() {
            return true;
        }
        self.labeled_fields
            && doc.ancestors(id).take(LABELED_FIELD_DEPTH).any(|container| {
                doc.children(container)
                    .iter()
                    .any(|&c| !doc.contains(c, id) && self.label_selectors.matches(doc, c))
            })
    }

    fn scan_element(
        &self,
        doc: &Document,
        id: NodeId,
        session: &mut ScanSession,
    ) -> Result<Vec<UuidOccurrence>, DomError> {
        let element = doc.element(id)?;
        let mut candidates: Vec<(String, SourceField)> = Vec::new();

        for &child in doc.children(id) {
            if let Some(text) = doc.text(child) {
                for uuid in find_uuids(text) {
                    candidates.push((uuid, SourceField::Text(child)));
                }
            }
        }
        for name in &self.value_attributes {
            if let Some(value) = element.attribute(name) {
                for uuid in find_uuids(value) {
                    candidates.push((uuid, SourceField::Attribute(name.clone())));
                }
            }
        }
        if let Some(ref value) = element.form_value {
            for uuid in find_uuids(value) {
                candidates.push((uuid, SourceField::FormValue));
            }
        }

        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        if doc.closest(id, &self.exclude).is_some() {
            trace!("Excluded container around node {}", id);
            return Ok(Vec::new());
        }
        if !self.is_included(doc, id) {
            trace!("Node {} is outside every included container", id);
            return Ok(Vec::new());
        }

        let mut context: Option<ContextHints> = None;
        let mut out = Vec::new();
        for (uuid, field) in candidates {
            if !session.seen.insert((uuid.clone(), id)) {
                continue;
            }
            let context = context
                .get_or_insert_with(|| self.context_for(doc, id))
                .clone();
            out.push(UuidOccurrence {
                uuid,
                location: OccurrenceLocation { element: id, field },
                context,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
