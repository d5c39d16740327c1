//! Compound selectors: `tag.class#id[attr][attr=value]`.
//!
//! Only single compound selectors are supported (no combinators); they are
//! what the include/exclude, label and overlay tables are written in.

use std::str::FromStr;

use tracing::warn;

use super::{Document, NodeId};
use crate::error::DomError;

/// A single compound selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let source = input.trim();
        if source.is_empty() {
            return Err(invalid());
        }

        let mut selector = Selector::default();
        let mut rest = source;

        let tag_len = rest
            .find(|c: char| !(is_ident_char(c) || c == '*'))
            .unwrap_or(rest.len());
        if tag_len > 0 {
            let tag = &rest[..tag_len];
            if tag != "*" {
                if tag.contains('*') {
                    return Err(invalid());
                }
                selector.tag = Some(tag.to_ascii_lowercase());
            }
            rest = &rest[tag_len..];
        }

        while let Some(first) = rest.chars().next() {
            match first {
                '.' | '#' => {
                    let body = &rest[1..];
                    let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
                    if len == 0 {
                        return Err(invalid());
                    }
                    let ident = body[..len].to_string();
                    if first == '.' {
                        selector.classes.push(ident);
                    } else {
                        selector.id = Some(ident);
                    }
                    rest = &body[len..];
                }
                '[' => {
                    let close = rest.find(']').ok_or_else(invalid)?;
                    let inner = &rest[1..close];
                    let (name, value) = match inner.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                            (name.trim(), Some(value.to_string()))
                        }
                        None => (inner.trim(), None),
                    };
                    if name.is_empty() || !name.chars().all(is_ident_char) {
                        return Err(invalid());
                    }
                    selector.attributes.push((name.to_ascii_lowercase(), value));
                    rest = &rest[close + 1..];
                }
                _ => return Err(invalid()),
            }
        }

        Ok(selector)
    }

    /// Whether the element `id` in `doc` matches.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Ok(element) = doc.element(id) else {
            return false;
        };
        if let Some(ref tag) = self.tag {
            if element.tag != *tag {
                return false;
            }
        }
        if let Some(ref wanted) = self.id {
            if element.attribute("id") != Some(wanted.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attributes.iter().all(|(name, value)| match value {
            Some(value) => element.attribute(name) == Some(value.as_str()),
            None => element.attribute(name).is_some(),
        })
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A set of selectors; matches when any member matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList(Vec<Selector>);

impl SelectorList {
    /// Parse every selector, failing on the first invalid one.
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, DomError> {
        selectors
            .iter()
            .map(|s| Selector::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parse every selector, dropping invalid ones with a warning.
    pub fn parse_lenient<S: AsRef<str>>(selectors: &[S]) -> Self {
        Self(
            selectors
                .iter()
                .filter_map(|s| match Selector::parse(s.as_ref()) {
                    Ok(selector) => Some(selector),
                    Err(e) => {
                        warn!("Ignoring selector: {}", e);
                        None
                    }
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(doc, id))
    }
}
