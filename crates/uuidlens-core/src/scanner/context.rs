//! Structural context captured alongside each occurrence.

use serde::Serialize;

use super::{UuidScanner, strip_uuids};
use crate::dom::{Document, NodeId};

/// Attributes that name or describe a form control.
const IDENTIFIER_ATTRIBUTES: [&str; 5] = ["id", "name", "formcontrolname", "placeholder", "aria-label"];

/// Ancestor text is truncated to this many characters.
const MAX_ANCESTOR_TEXT: usize = 2000;

/// Hints gathered around an occurrence, used by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextHints {
    /// Text of the nearest field label.
    pub label: Option<String>,
    /// Identifier, name and placeholder of the owning control.
    pub control_identifiers: Vec<String>,
    /// Aggregate text of each ancestor, nearest first.
    pub ancestor_texts: Vec<String>,
}

impl ContextHints {
    /// Label first, then identifiers, then ancestor texts.
    pub fn ordered(&self) -> Vec<&str> {
        self.label
            .iter()
            .map(String::as_str)
            .chain(self.control_identifiers.iter().map(String::as_str))
            .chain(self.ancestor_texts.iter().map(String::as_str))
            .collect()
    }
}

/// Page-level signals for the last-resort classification step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub title: String,
    pub url: String,
    pub body_text: String,
}

impl PageContext {
    pub fn from_document(doc: &Document, skip_class: Option<&str>) -> Self {
        Self {
            title: doc.title().to_string(),
            url: doc.url().to_string(),
            body_text: normalize(&doc.text_content_excluding(doc.root(), skip_class)),
        }
    }
}

/// Collapse whitespace, drop UUID text.
fn normalize(text: &str) -> String {
    strip_uuids(text).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

impl UuidScanner {
    pub(crate) fn context_for(&self, doc: &Document, element: NodeId) -> ContextHints {
        let skip = self.ignored_class();

        let control_identifiers = IDENTIFIER_ATTRIBUTES
            .iter()
            .filter_map(|name| doc.attribute(element, name))
            .filter_map(|value| non_empty(normalize(value)))
            .collect();

        let ancestor_texts = doc
            .ancestors(element)
            .take(self.max_ancestor_depth())
            .map(|a| {
                normalize(&doc.text_content_excluding(a, skip))
                    .chars()
                    .take(MAX_ANCESTOR_TEXT)
                    .collect()
            })
            .collect();

        ContextHints {
            label: self.find_label(doc, element),
            control_identifiers,
            ancestor_texts,
        }
    }

    fn label_text(&self, doc: &Document, id: NodeId) -> Option<String> {
        non_empty(normalize(&doc.text_content_excluding(id, self.ignored_class())))
    }

    /// Nearest label for the field owning `element`.
    fn find_label(&self, doc: &Document, element: NodeId) -> Option<String> {
        // <label for="..."> pointing at the control
        if let Some(id_attr) = doc.attribute(element, "id").filter(|v| !v.is_empty()) {
            let explicit = doc.descendants(doc.root()).into_iter().find(|&n| {
                doc.tag(n) == Some("label") && doc.attribute(n, "for") == Some(id_attr)
            });
            if let Some(text) = explicit.and_then(|n| self.label_text(doc, n)) {
                return Some(text);
            }
        }

        // Wrapping <label>
        if let Some(text) = doc
            .inclusive_ancestors(element)
            .find(|&n| doc.tag(n) == Some("label"))
            .and_then(|n| self.label_text(doc, n))
        {
            return Some(text);
        }

        if let Some(text) = doc
            .attribute(element, "aria-label")
            .and_then(|v| non_empty(normalize(v)))
        {
            return Some(text);
        }

        if let Some(text) = doc
            .attribute(element, "aria-labelledby")
            .and_then(|ids| ids.split_whitespace().next())
            .and_then(|id| doc.element_by_id(id))
            .and_then(|n| self.label_text(doc, n))
        {
            return Some(text);
        }

        // Label-like element in the nearest ancestor that has one,
        // preferring the closest one before the field.
        for ancestor in doc.ancestors(element).take(self.max_ancestor_depth()) {
            let order = doc.descendants(ancestor);
            let Some(position) = order.iter().position(|&n| n == element) else {
                continue;
            };
            let is_candidate = |n: NodeId| {
                !doc.contains(element, n)
                    && !self.is_inside_ignored(doc, n)
                    && self.label_selectors.matches(doc, n)
            };
            let before = order[..position]
                .iter()
                .rev()
                .copied()
                .filter(|&n| is_candidate(n))
                .find_map(|n| self.label_text(doc, n));
            let label = before.or_else(|| {
                order[position + 1..]
                    .iter()
                    .copied()
                    .filter(|&n| is_candidate(n))
                    .find_map(|n| self.label_text(doc, n))
            });
            if label.is_some() {
                return label;
            }
        }

        None
    }
}
