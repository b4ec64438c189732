use std::fmt::Write;

use crate::view::{Document, NodeId};

pub trait RenderBackend {
    /// Paint the subtree rooted at `root`.
    fn commit(&mut self, document: &Document, root: NodeId);
}

/// Renders a subtree as HTML-like markup.
#[derive(Debug, Default)]
pub struct MarkupRenderer {
    out: String,
    indent: Option<usize>,
}

impl MarkupRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One element per line, nested `width` spaces per level.
    pub fn pretty(width: usize) -> Self {
        Self {
            out: String::new(),
            indent: Some(width),
        }
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }

    fn newline(&mut self, depth: usize) {
        if let Some(width) = self.indent {
            if !self.out.is_empty() {
                self.out.push('\n');
            }
            self.out.extend(std::iter::repeat_n(' ', width * depth));
        }
    }

    fn node(&mut self, doc: &Document, node: NodeId, depth: usize) {
        let Some(kind) = doc.kind(node) else {
            return;
        };
        self.newline(depth);
        let _ = write!(self.out, "<{}", kind.tag());
        for (name, value) in doc.attributes(node) {
            let _ = write!(self.out, " {name}=\"{}\"", escape(value));
        }
        self.out.push('>');
        if kind.is_void() {
            return;
        }
        if let Some(text) = doc.text(node) {
            self.out.push_str(&escape(text));
        }
        let children = doc.children(node);
        for &child in children {
            self.node(doc, child, depth + 1);
        }
        if !children.is_empty() {
            self.newline(depth);
        }
        let _ = write!(self.out, "</{}>", kind.tag());
    }
}

impl RenderBackend for MarkupRenderer {
    fn commit(&mut self, document: &Document, root: NodeId) {
        self.out.clear();
        self.node(document, root, 0);
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
