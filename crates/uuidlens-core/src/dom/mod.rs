//! In-memory host document.
//!
//! An arena of element and text nodes standing in for the live page the
//! pipeline reads from and writes to. Nodes are addressed by [`NodeId`];
//! removed nodes stay in the arena, detached, so stale ids never dangle.
//!
//! Every mutating operation emits a [`MutationRecord`] to the observers
//! registered with [`Document::observe`], which is what the scanner's
//! subscription listens to.

mod document;
mod mutation;
mod node;
mod selector;
mod snapshot;

pub use document::Document;
pub use mutation::{MutationKind, MutationRecord};
pub use node::{ElementData, Node, NodeData, NodeId};
pub use selector::{Selector, SelectorList};
pub use snapshot::{DomSnapshot, SnapshotNode};

#[cfg(test)]
#[path = "dom_tests.rs"]
mod tests;
