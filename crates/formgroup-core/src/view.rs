use std::rc::Rc;

use indexmap::IndexMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::{Event, Result};

new_key_type! {
    pub struct NodeId;
}

pub type Listener = Rc<dyn Fn(&Event) -> Result<()>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Container,
    Heading,
    Description,
    Input,
}

impl ElementKind {
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Container => "div",
            ElementKind::Heading => "h3",
            ElementKind::Description => "p",
            ElementKind::Input => "input",
        }
    }

    /// Void elements have no children and no closing tag.
    pub fn is_void(self) -> bool {
        matches!(self, ElementKind::Input)
    }
}

struct Node {
    kind: ElementKind,
    attributes: IndexMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: SmallVec<[(String, Listener); 2]>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("text", &self.text)
            .field("children", &self.children)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Retained tree of view nodes.
///
/// Nodes are addressed by `NodeId`; operations on a freed id are no-ops and
/// queries on it return `None`/empty. A node has at most one parent:
/// appending it elsewhere moves it.
#[derive(Debug, Default)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    focused: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&mut self, kind: ElementKind) -> NodeId {
        self.nodes.insert(Node {
            kind,
            attributes: IndexMap::new(),
            text: None,
            parent: None,
            children: Vec::new(),
            listeners: SmallVec::new(),
        })
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, node: NodeId) -> Option<ElementKind> {
        self.nodes.get(node).map(|n| n.kind)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.attributes.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .get_mut(node)
            .and_then(|n| n.attributes.shift_remove(name))
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(node)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes
            .get(node)
            .into_iter()
            .flat_map(|n| n.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.text = Some(text.into());
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).and_then(|n| n.text.as_deref())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    pub fn is_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.parent(child) == Some(parent)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        // Re-appending an existing child moves it to the end.
        let index = if self.is_child(parent, child) { len - 1 } else { len };
        self.insert_child(parent, index, child);
    }

    /// Inserts `child` at `index` (clamped) after detaching it from its
    /// current parent.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if parent == child || !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            let index = index.min(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Removes `child` from `parent`, returning its former position.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Option<usize> {
        if !self.is_child(parent, child) {
            return None;
        }
        self.detach(child)
    }

    fn detach(&mut self, child: NodeId) -> Option<usize> {
        let parent = self.nodes.get_mut(child)?.parent.take()?;
        let p = self.nodes.get_mut(parent)?;
        let index = p.children.iter().position(|&c| c == child)?;
        p.children.remove(index);
        Some(index)
    }

    /// Detaches `node` and frees it together with its descendants and their
    /// listeners.
    pub fn remove_subtree(&mut self, node: NodeId) {
        self.detach(node);
        let mut stack = vec![node];
        let mut freed = 0;
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(id) {
                stack.extend(n.children);
                freed += 1;
            }
            if self.focused == Some(id) {
                self.focused = None;
            }
        }
        log::trace!("freed {freed} nodes, {} left", self.nodes.len());
    }

    pub fn add_event_listener(&mut self, node: NodeId, event: impl Into<String>, listener: Listener) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.listeners.push((event.into(), listener));
        }
    }

    /// Listeners bound to `event` on `node`, in binding order.
    pub fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener> {
        self.nodes
            .get(node)
            .map(|n| {
                n.listeners
                    .iter()
                    .filter(|(kind, _)| kind == event)
                    .map(|(_, l)| l.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn focus(&mut self, node: NodeId) {
        if self.nodes.contains_key(node) {
            self.focused = Some(node);
        }
    }

    pub fn blur(&mut self, node: NodeId) {
        if self.focused == Some(node) {
            self.focused = None;
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }
}
