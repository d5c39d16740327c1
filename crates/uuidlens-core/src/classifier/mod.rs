//! Entity type classifier.
//!
//! Guesses which kind of entity a UUID identifies from the text around it.
//! Signals are tried from most to least reliable and the first one that
//! matches wins:
//!
//! 1. the field label as a canonical phrase ("Script UUID"),
//! 2. keywords in the field label,
//! 3. keywords in the control's id, name or placeholder,
//! 4. keywords in the text of up to ten enclosing containers,
//! 5. keywords in the page title, then URL, then body text,
//! 6. otherwise [`EntityType::Application`].
//!
//! Keyword matching is whole-word over [`tokenize`]d text, so "application"
//! never fires inside "organization". Within each step types are tried in
//! [`EntityType::PRIORITY`] order.

mod keywords;

use serde::Serialize;
use tracing::trace;

use uuidlens_config::ClassifierConfig;

use crate::entity::EntityType;
use crate::scanner::{PageContext, UuidOccurrence};

pub use keywords::{KeywordTable, tokenize};

/// Ancestors examined by the container-text step.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// Which signal decided a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Evidence {
    LabelPhrase,
    LabelKeyword,
    ControlIdentifier,
    AncestorText { depth: usize },
    PageTitle,
    PageUrl,
    PageBody,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub entity_type: EntityType,
    pub evidence: Evidence,
}

impl Classification {
    fn new(entity_type: EntityType, evidence: Evidence) -> Self {
        Self {
            entity_type,
            evidence,
        }
    }

    /// Whether the type came from the fallback rather than any evidence.
    pub fn is_default(&self) -> bool {
        self.evidence == Evidence::Default
    }
}

/// Heuristic classifier over a [`KeywordTable`].
#[derive(Debug, Clone, Default)]
pub struct EntityClassifier {
    table: KeywordTable,
}

impl EntityClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self::with_table(KeywordTable::from_config(config))
    }

    pub fn with_table(table: KeywordTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    pub fn classify(&self, occurrence: &UuidOccurrence, page: &PageContext) -> Classification {
        let classification = self.classify_context(occurrence, page);
        trace!(
            uuid = %occurrence.uuid,
            entity_type = %classification.entity_type,
            evidence = ?classification.evidence,
            "Classified occurrence"
        );
        classification
    }

    fn classify_context(&self, occurrence: &UuidOccurrence, page: &PageContext) -> Classification {
        let hints = &occurrence.context;

        if let Some(label) = hints.label.as_deref() {
            if let Some(t) = self.table.phrase(label) {
                return Classification::new(t, Evidence::LabelPhrase);
            }
            if let Some(t) = self.table.match_text(label) {
                return Classification::new(t, Evidence::LabelKeyword);
            }
        }

        let identifiers: Vec<String> = hints
            .control_identifiers
            .iter()
            .flat_map(|id| tokenize(id))
            .collect();
        if let Some(t) = self.table.match_tokens(&identifiers) {
            return Classification::new(t, Evidence::ControlIdentifier);
        }

        for (depth, text) in hints.ancestor_texts.iter().take(MAX_ANCESTOR_DEPTH).enumerate() {
            if let Some(t) = self.table.match_text(text) {
                return Classification::new(t, Evidence::AncestorText { depth: depth + 1 });
            }
        }

        let page_signals = [
            (page.title.as_str(), Evidence::PageTitle),
            (page.url.as_str(), Evidence::PageUrl),
            (page.body_text.as_str(), Evidence::PageBody),
        ];
        for (text, evidence) in page_signals {
            if let Some(t) = self.table.match_text(text) {
                return Classification::new(t, evidence);
            }
        }

        Classification::new(EntityType::Application, Evidence::Default)
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
