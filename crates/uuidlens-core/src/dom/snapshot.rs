//! Serializable document snapshots.
//!
//! The JSON shape a browser bridge exports for a page:
//!
//! ```json
//! {
//!   "title": "Scripts",
//!   "url": "https://uem.example.com/AirWatch/#/scripts",
//!   "root": { "tag": "body", "children": [
//!     { "tag": "input", "attributes": { "value": "..." }, "value": "..." },
//!     { "text": "plain text" }
//!   ]}
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Document, NodeData, NodeId};
use crate::error::DomError;

/// A whole page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomSnapshot {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub root: SnapshotNode,
}

/// One node of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Text {
        text: String,
    },
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        /// Live form-control value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<SnapshotNode>,
    },
}

impl Document {
    /// Build a document from a snapshot. The snapshot root must be an element.
    pub fn from_snapshot(snapshot: &DomSnapshot) -> Result<Self, DomError> {
        let SnapshotNode::Element { tag, .. } = &snapshot.root else {
            return Err(DomError::InvalidSnapshot(
                "root must be an element".to_string(),
            ));
        };
        let mut doc = Document::new(tag);
        doc.set_title(snapshot.title.clone());
        doc.set_url(snapshot.url.clone());
        let root = doc.root();
        doc.fill(root, &snapshot.root)?;
        Ok(doc)
    }

    /// Parse a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, DomError> {
        let snapshot: DomSnapshot =
            serde_json::from_str(json).map_err(|e| DomError::InvalidSnapshot(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    fn fill(&mut self, target: NodeId, source: &SnapshotNode) -> Result<(), DomError> {
        let SnapshotNode::Element {
            attributes,
            value,
            children,
            ..
        } = source
        else {
            return Ok(());
        };
        for (name, attr_value) in attributes {
            self.set_attribute(target, name, attr_value)?;
        }
        if value.is_some() {
            self.set_form_value(target, value.as_deref())?;
        }
        for child in children {
            match child {
                SnapshotNode::Text { text } => {
                    self.append_text(target, text)?;
                }
                SnapshotNode::Element { tag, .. } => {
                    let id = self.create_element(tag);
                    self.append_child(target, id)?;
                    self.fill(id, child)?;
                }
            }
        }
        Ok(())
    }

    /// Export the connected tree as a snapshot.
    pub fn snapshot(&self) -> DomSnapshot {
        DomSnapshot {
            title: self.title().to_string(),
            url: self.url().to_string(),
            root: self.snapshot_node(self.root()),
        }
    }

    fn snapshot_node(&self, id: NodeId) -> SnapshotNode {
        match self.node(id).map(|n| n.data()) {
            Ok(NodeData::Element(element)) => SnapshotNode::Element {
                tag: element.tag.clone(),
                attributes: element.attributes.iter().cloned().collect(),
                value: element.form_value.clone(),
                children: self
                    .children(id)
                    .iter()
                    .map(|&c| self.snapshot_node(c))
                    .collect(),
            },
            Ok(NodeData::Text(text)) => SnapshotNode::Text { text: text.clone() },
            Err(_) => SnapshotNode::Text {
                text: String::new(),
            },
        }
    }
}
