//! Mutation records delivered to document observers.

use super::NodeId;

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Children added to or removed from `target`.
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute of `target` was set or removed.
    Attribute { name: String },
    /// The text of a text node changed.
    CharacterData,
    /// The live value of a form control changed.
    FormValue,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList { added, removed },
        }
    }

    pub fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            target,
            kind: MutationKind::Attribute {
                name: name.to_string(),
            },
        }
    }
}
