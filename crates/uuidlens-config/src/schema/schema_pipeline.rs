//! Pipeline configuration types (scan, classifier, annotator, resolver).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::default_true;

/// Scanner configuration.
///
/// Selectors are single compound selectors: `tag.class#id[attr=value]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Containers an occurrence must sit inside. Empty accepts everything.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Also accept occurrences outside `include` when a label-like element
    /// (see `label_selectors`) sits beside them, within two levels up.
    #[serde(default = "default_true")]
    pub labeled_fields: bool,

    /// Containers whose occurrences are ignored (navigation, link rows).
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Attributes inspected for UUID text, in inspection order.
    #[serde(default = "default_value_attributes")]
    pub value_attributes: Vec<String>,

    /// Elements whose text acts as a field label.
    #[serde(default = "default_label_selectors")]
    pub label_selectors: Vec<String>,

    /// Minimum spacing between two observer-driven rescans.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Interval of the reconciliation rescan. 0 disables it.
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    /// How many ancestors are consulted for labels and fallback text.
    #[serde(default = "default_max_ancestor_depth")]
    pub max_ancestor_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            labeled_fields: default_true(),
            exclude: default_exclude(),
            value_attributes: default_value_attributes(),
            label_selectors: default_label_selectors(),
            debounce_ms: default_debounce_ms(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            max_ancestor_depth: default_max_ancestor_depth(),
        }
    }
}

fn default_include() -> Vec<String> {
    [
        "form",
        "fieldset",
        "input",
        "textarea",
        "select",
        ".form-group",
        ".clr-form-control",
        "clr-input-container",
        "clr-textarea-container",
        "dl",
        "[data-uuid]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_exclude() -> Vec<String> {
    [
        "nav",
        "a[href]",
        "[role=listitem]",
        "[role=row]",
        ".list-group-item",
        "clr-dg-row",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_value_attributes() -> Vec<String> {
    ["value", "data-value", "data-uuid", "placeholder", "title"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_label_selectors() -> Vec<String> {
    ["label", ".clr-control-label", ".form-label", "legend", "dt", "th"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_reconcile_interval_ms() -> u64 {
    1500
}

fn default_max_ancestor_depth() -> usize {
    10
}

/// Classifier table overrides.
///
/// Keyword lists replace the built-in list for that type; phrases are added
/// on top of the built-in canonical label phrases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,

    /// Canonical label phrase -> entity type name.
    #[serde(default)]
    pub phrases: BTreeMap<String, String>,
}

/// Annotator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Class carried by every inserted marker.
    #[serde(default = "default_marker_class")]
    pub marker_class: String,

    /// Input-like containers that get a floating overlay instead of an inline marker.
    #[serde(default = "default_overlay_selectors")]
    pub overlay_selectors: Vec<String>,

    /// Render error markers for failed resolutions.
    #[serde(default = "default_true")]
    pub show_failures: bool,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            marker_class: default_marker_class(),
            overlay_selectors: default_overlay_selectors(),
            show_failures: default_true(),
        }
    }
}

fn default_marker_class() -> String {
    "uuidlens-annotation".to_string()
}

fn default_overlay_selectors() -> Vec<String> {
    ["input", "textarea", "select", ".input-group", ".clr-input-wrapper"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum simultaneous outstanding authority requests.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Cache failed resolutions with the normal expiry.
    #[serde(default = "default_true")]
    pub cache_failures: bool,

    /// Maximum cached resolutions; least recently used entries go first.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            cache_failures: default_true(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_max_concurrency() -> usize {
    6
}

fn default_cache_capacity() -> usize {
    4096
}
