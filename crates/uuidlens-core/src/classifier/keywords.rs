//! Keyword and phrase tables.

use std::collections::HashMap;

use tracing::warn;

use uuidlens_config::ClassifierConfig;

use crate::entity::EntityType;

/// Built-in keyword synonyms per entity type.
fn builtin_keywords(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::OrganizationGroup => &[
            "organization group",
            "organization groups",
            "org group",
            "location group",
            "og",
        ],
        EntityType::Product => &["product", "products", "provisioning product"],
        EntityType::Script => &["script", "scripts", "sensor", "sensors"],
        EntityType::Tag => &["tag", "tags", "device tag"],
        EntityType::Application => &[
            "application",
            "applications",
            "app",
            "apps",
            "bundle id",
        ],
        EntityType::Profile => &["profile", "profiles", "payload", "configuration profile"],
    }
}

/// Built-in canonical label phrases.
const BUILTIN_PHRASES: [(&str, EntityType); 13] = [
    ("organization group uuid", EntityType::OrganizationGroup),
    ("organization group id", EntityType::OrganizationGroup),
    ("og uuid", EntityType::OrganizationGroup),
    ("product uuid", EntityType::Product),
    ("product id", EntityType::Product),
    ("script uuid", EntityType::Script),
    ("sensor uuid", EntityType::Script),
    ("tag uuid", EntityType::Tag),
    ("tag id", EntityType::Tag),
    ("application uuid", EntityType::Application),
    ("app uuid", EntityType::Application),
    ("profile uuid", EntityType::Profile),
    ("profile id", EntityType::Profile),
];

/// Split text into lowercase word tokens.
///
/// Any non-alphanumeric character separates words, and camelCase or
/// PascalCase identifiers are split at case boundaries, so `scriptId`,
/// `script_id` and `Script ID` all yield `["script", "id"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = word.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            tokens.push(current);
        }
    }
    tokens
}

/// Normalized phrase key: tokens joined by single spaces.
fn phrase_key(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Per-type keyword lists plus canonical label phrases.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    /// In classification priority order.
    keywords: Vec<(EntityType, Vec<Vec<String>>)>,
    phrases: HashMap<String, EntityType>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeywordTable {
    pub fn builtin() -> Self {
        let keywords = EntityType::PRIORITY
            .iter()
            .map(|&t| {
                let words = builtin_keywords(t).iter().map(|k| tokenize(k)).collect();
                (t, words)
            })
            .collect();
        let phrases = BUILTIN_PHRASES
            .iter()
            .map(|(phrase, t)| (phrase_key(phrase), *t))
            .collect();
        Self { keywords, phrases }
    }

    /// Built-in tables with configured overrides applied.
    ///
    /// A keyword list in the config replaces the built-in list for that type;
    /// phrases are merged. Unknown type names are logged and ignored.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut table = Self::builtin();

        for (name, words) in &config.keywords {
            match name.parse::<EntityType>() {
                Ok(entity_type) => table.set_keywords(entity_type, words),
                Err(e) => warn!("Ignoring classifier keywords: {}", e),
            }
        }
        for (phrase, name) in &config.phrases {
            match name.parse::<EntityType>() {
                Ok(entity_type) => {
                    table.phrases.insert(phrase_key(phrase), entity_type);
                }
                Err(e) => warn!("Ignoring classifier phrase '{}': {}", phrase, e),
            }
        }
        table
    }

    pub fn set_keywords<S: AsRef<str>>(&mut self, entity_type: EntityType, words: &[S]) {
        let tokens: Vec<Vec<String>> = words
            .iter()
            .map(|w| tokenize(w.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        if let Some(entry) = self.keywords.iter_mut().find(|(t, _)| *t == entity_type) {
            entry.1 = tokens;
        }
    }

    /// Exact canonical phrase lookup.
    pub fn phrase(&self, label: &str) -> Option<EntityType> {
        self.phrases.get(&phrase_key(label)).copied()
    }

    /// First type, in priority order, with a keyword occurring in `text`
    /// as whole words.
    pub fn match_text(&self, text: &str) -> Option<EntityType> {
        self.match_tokens(&tokenize(text))
    }

    pub fn match_tokens(&self, tokens: &[String]) -> Option<EntityType> {
        if tokens.is_empty() {
            return None;
        }
        self.keywords
            .iter()
            .find(|(_, words)| {
                words
                    .iter()
                    .any(|kw| tokens.windows(kw.len()).any(|w| w == kw.as_slice()))
            })
            .map(|(t, _)| *t)
    }
}
