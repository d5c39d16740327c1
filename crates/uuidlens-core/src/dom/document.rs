//! Document: node arena, tree operations, queries and mutation notification.

use tokio::sync::mpsc;

use super::{ElementData, MutationKind, MutationRecord, Node, NodeData, NodeId, SelectorList};
use crate::error::DomError;

/// A mutable host document.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    title: String,
    url: String,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

impl Document {
    /// Create a document whose root is an empty element with `root_tag`.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Element(ElementData::new(root_tag)))],
            root: NodeId::from_index(0),
            title: String::new(),
            url: String::new(),
            observers: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Number of nodes ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Register an observer. Records for connected targets are delivered
    /// until the receiver is dropped.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, record: MutationRecord) {
        if self.observers.is_empty() || !self.is_connected(record.target) {
            return;
        }
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    // ------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    pub fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        self.node(id)?.as_element().ok_or(DomError::NotAnElement(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_ok()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok().and_then(|e| e.attribute(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).map(|e| e.has_class(class)).unwrap_or(false)
    }

    pub fn form_value(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().and_then(|e| e.form_value.as_deref())
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).ok().and_then(|n| n.as_text())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// `id` followed by its ancestors.
    pub fn inclusive_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(id).chain(self.ancestors(id))
    }

    /// Pre-order list of `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.node(id).is_err() {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        if self.node(id).is_err() {
            return false;
        }
        self.inclusive_ancestors(id).any(|n| n == self.root)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.inclusive_ancestors(id).any(|n| n == ancestor)
    }

    /// Nearest inclusive ancestor element matching any selector in `selectors`.
    pub fn closest(&self, id: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.inclusive_ancestors(id)
            .find(|&n| self.is_element(n) && selectors.matches(self, n))
    }

    /// First connected element whose `id` attribute equals `element_id`.
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(element_id))
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_content_excluding(id, None)
    }

    /// Like [`text_content`](Self::text_content) but skipping subtrees of
    /// elements carrying `skip_class`.
    pub fn text_content_excluding(&self, id: NodeId, skip_class: Option<&str>) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match self.node(n).map(|node| &node.data) {
                Ok(NodeData::Text(text)) => out.push_str(text),
                Ok(NodeData::Element(element)) => {
                    if skip_class.is_some_and(|class| element.has_class(class)) {
                        continue;
                    }
                    stack.extend(self.children(n).iter().rev().copied());
                }
                Err(_) => {}
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Construction and mutation
    // ------------------------------------------------------------------

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.element(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(DomError::HierarchyRequest("cannot move the root".to_string()));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "node {} is an ancestor of {}",
                child, parent
            )));
        }
        Ok(())
    }

    /// Unlink `id` from its parent without notifying.
    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if let Ok(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != id);
        }
        if let Ok(node) = self.node_mut(id) {
            node.parent = None;
        }
        Some(parent)
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        if let Some(old) = self.detach(child) {
            self.notify(MutationRecord::child_list(old, vec![], vec![child]));
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.notify(MutationRecord::child_list(parent, vec![child], vec![]));
        Ok(())
    }

    /// Insert `new` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or_else(|| {
            DomError::HierarchyRequest(format!("node {} has no parent", reference))
        })?;
        if new == reference {
            return Err(DomError::HierarchyRequest(
                "cannot insert a node after itself".to_string(),
            ));
        }
        self.check_insertable(parent, new)?;
        if let Some(old) = self.detach(new) {
            self.notify(MutationRecord::child_list(old, vec![], vec![new]));
        }
        let siblings = &mut self.node_mut(parent)?.children;
        let position = siblings
            .iter()
            .position(|&c| c == reference)
            .map(|p| p + 1)
            .unwrap_or(siblings.len());
        siblings.insert(position, new);
        self.node_mut(new)?.parent = Some(parent);
        self.notify(MutationRecord::child_list(parent, vec![new], vec![]));
        Ok(())
    }

    /// Detach `id` (and its subtree) from the document.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if id == self.root {
            return Err(DomError::HierarchyRequest("cannot remove the root".to_string()));
        }
        if let Some(parent) = self.detach(id) {
            self.notify(MutationRecord::child_list(parent, vec![], vec![id]));
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        match element.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => element.attributes.push((name.clone(), value.to_string())),
        }
        self.notify(MutationRecord::attribute(id, &name));
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        let before = element.attributes.len();
        element.attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        if element.attributes.len() != before {
            self.notify(MutationRecord::attribute(id, &name.to_ascii_lowercase()));
        }
        Ok(())
    }

    /// Replace the text of a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(current) => *current = text.to_string(),
            NodeData::Element(_) => return Err(DomError::NotText(id)),
        }
        self.notify(MutationRecord {
            target: id,
            kind: MutationKind::CharacterData,
        });
        Ok(())
    }

    /// Set the live value of a form control.
    pub fn set_form_value(&mut self, id: NodeId, value: Option<&str>) -> Result<(), DomError> {
        self.element_mut(id)?.form_value = value.map(str::to_string);
        self.notify(MutationRecord {
            target: id,
            kind: MutationKind::FormValue,
        });
        Ok(())
    }

    /// Create an element with attributes and append it under `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let id = self.create_element(tag);
        if let Ok(element) = self.element_mut(id) {
            element.attributes = attributes
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect();
        }
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Create a text node and append it under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let id = self.create_text(text);
        self.append_child(parent, id)?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the subtree at `id` as HTML.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Ok(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void(&element.tag) {
                    return;
                }
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "wbr"
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
