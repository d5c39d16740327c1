//! UI annotator.
//!
//! Renders a resolved entity next to the UUID it came from. Markers are
//! plain `span` subtrees tagged with the configured marker class:
//!
//! ```text
//! <span class="uuidlens-annotation" data-uuidlens-uuid=".." data-uuidlens-type=".."
//!       data-uuidlens-anchor="17" title="Nightly Cleanup (script) ...">
//!   <span class="uuidlens-name">Nightly Cleanup</span>
//!   <span class="uuidlens-pill">(script)</span>
//!   <span class="uuidlens-details" hidden>...rows...</span>
//! </span>
//! ```
//!
//! Markers are only ever added as siblings, so removing them restores the
//! original markup exactly.

use serde::Serialize;
use tracing::{debug, trace};

use uuidlens_config::AnnotatorConfig;

use crate::dom::{Document, NodeId, SelectorList};
use crate::entity::ResolvedEntity;
use crate::error::DomError;
use crate::scanner::UuidOccurrence;

pub const ATTR_UUID: &str = "data-uuidlens-uuid";
pub const ATTR_TYPE: &str = "data-uuidlens-type";
pub const ATTR_ANCHOR: &str = "data-uuidlens-anchor";

/// Overlay containers are looked for this many levels above the source.
const OVERLAY_SEARCH_DEPTH: usize = 2;

/// How a marker is positioned relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// Directly after the source text or element.
    Inline,
    /// Floating, anchored to an input-like container.
    Overlay,
}

/// Result of one `annotate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotateOutcome {
    Inserted(NodeId),
    /// A marker for this (location, uuid) already exists.
    Duplicate,
    /// The source location is no longer in the document.
    Detached,
    /// Failure markers are turned off.
    Suppressed,
}

#[derive(Debug, Clone)]
pub struct Annotator {
    marker_class: String,
    overlay: SelectorList,
    show_failures: bool,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(&AnnotatorConfig::default())
    }
}

impl Annotator {
    pub fn new(config: &AnnotatorConfig) -> Self {
        Self {
            marker_class: config.marker_class.clone(),
            overlay: SelectorList::parse_lenient(&config.overlay_selectors),
            show_failures: config.show_failures,
        }
    }

    pub fn marker_class(&self) -> &str {
        &self.marker_class
    }

    pub fn is_marker(&self, doc: &Document, id: NodeId) -> bool {
        doc.has_class(id, &self.marker_class)
    }

    /// Where a marker for `occurrence` goes: the node it follows, and how.
    pub fn placement(&self, doc: &Document, occurrence: &UuidOccurrence) -> (NodeId, Placement) {
        let element = occurrence.location.element;
        let container = doc
            .inclusive_ancestors(element)
            .take(OVERLAY_SEARCH_DEPTH + 1)
            .find(|&n| doc.parent(n).is_some() && self.overlay.matches(doc, n));

        match container {
            Some(container) => (container, Placement::Overlay),
            None => (occurrence.location.anchor(), Placement::Inline),
        }
    }

    /// Insert a marker for `entity` next to `occurrence`.
    pub fn annotate(
        &self,
        doc: &mut Document,
        occurrence: &UuidOccurrence,
        entity: &ResolvedEntity,
    ) -> Result<AnnotateOutcome, DomError> {
        let anchor = occurrence.location.anchor();
        if !doc.is_connected(anchor) || !doc.is_connected(occurrence.location.element) {
            trace!(uuid = %occurrence.uuid, "Source detached, discarding annotation");
            return Ok(AnnotateOutcome::Detached);
        }
        if entity.is_failure() && !self.show_failures {
            return Ok(AnnotateOutcome::Suppressed);
        }

        let (reference, placement) = self.placement(doc, occurrence);
        if self.find_existing(doc, reference, occurrence).is_some() {
            return Ok(AnnotateOutcome::Duplicate);
        }

        let marker = self.build_marker(doc, occurrence, entity, placement)?;
        if doc.parent(reference).is_some() {
            doc.insert_after(reference, marker)?;
        } else {
            doc.append_child(reference, marker)?;
        }

        debug!(
            uuid = %occurrence.uuid,
            entity_type = %entity.entity_type,
            ?placement,
            "Inserted annotation"
        );
        Ok(AnnotateOutcome::Inserted(marker))
    }

    /// Existing marker for `occurrence`, searched among the siblings of
    /// the insertion reference only.
    fn find_existing(
        &self,
        doc: &Document,
        reference: NodeId,
        occurrence: &UuidOccurrence,
    ) -> Option<NodeId> {
        let scope = doc.parent(reference).unwrap_or(reference);
        let anchor = occurrence.location.element.index().to_string();
        doc.children(scope).iter().copied().find(|&n| {
            self.is_marker(doc, n)
                && doc.attribute(n, ATTR_UUID) == Some(occurrence.uuid.as_str())
                && doc.attribute(n, ATTR_ANCHOR) == Some(anchor.as_str())
        })
    }

    fn build_marker(
        &self,
        doc: &mut Document,
        occurrence: &UuidOccurrence,
        entity: &ResolvedEntity,
        placement: Placement,
    ) -> Result<NodeId, DomError> {
        let mut class = self.marker_class.clone();
        if placement == Placement::Overlay {
            class.push_str(" uuidlens-overlay");
        }
        if entity.is_failure() {
            class.push_str(" uuidlens-failed");
        }

        let fields = entity.detail_fields();
        let mut tooltip = entity.display_label();
        for (label, value) in &fields {
            tooltip.push_str(&format!("\n{}: {}", label, value));
        }

        let marker = doc.create_element("span");
        doc.set_attribute(marker, "class", &class)?;
        doc.set_attribute(marker, ATTR_UUID, &occurrence.uuid)?;
        doc.set_attribute(marker, ATTR_TYPE, entity.entity_type.as_str())?;
        doc.set_attribute(marker, ATTR_ANCHOR, &occurrence.location.element.index().to_string())?;
        doc.set_attribute(marker, "title", &tooltip)?;
        match placement {
            Placement::Overlay => doc.set_attribute(marker, "style", "position:absolute")?,
            Placement::Inline => doc.set_attribute(marker, "style", "margin-left:0.25em")?,
        }

        let name = doc.append_element(marker, "span", &[("class", "uuidlens-name")])?;
        doc.append_text(name, &entity.name)?;
        doc.append_text(marker, " ")?;
        let pill = doc.append_element(marker, "span", &[("class", "uuidlens-pill")])?;
        doc.append_text(pill, &format!("({})", entity.entity_type.label()))?;

        let details = doc.append_element(
            marker,
            "span",
            &[("class", "uuidlens-details"), ("hidden", "")],
        )?;
        for (label, value) in fields {
            let row = doc.append_element(details, "span", &[("class", "uuidlens-detail-row")])?;
            let label_node =
                doc.append_element(row, "span", &[("class", "uuidlens-detail-label")])?;
            doc.append_text(label_node, &format!("{}:", label))?;
            doc.append_text(row, " ")?;
            let value_node =
                doc.append_element(row, "span", &[("class", "uuidlens-detail-value")])?;
            doc.append_text(value_node, &value)?;
        }

        Ok(marker)
    }

    /// All connected markers, outermost only.
    pub fn annotations(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&n| {
                self.is_marker(doc, n)
                    && !doc.ancestors(n).any(|a| self.is_marker(doc, a))
            })
            .collect()
    }

    /// Remove every marker, returning how many were removed.
    pub fn remove_all_annotations(&self, doc: &mut Document) -> usize {
        let markers = self.annotations(doc);
        let mut removed = 0;
        for marker in markers {
            match doc.remove(marker) {
                Ok(()) => removed += 1,
                Err(e) => debug!("Failed to remove annotation {}: {}", marker, e),
            }
        }
        debug!(removed, "Removed annotations");
        removed
    }
}

#[cfg(test)]
#[path = "annotator_tests.rs"]
mod tests;
