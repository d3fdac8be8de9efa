//! Arena-backed document tree for the editable surface.
//!
//! Nodes live in a slot vector and are addressed by generation-checked
//! [`NodeId`]s. Freeing a node bumps the generation of its slot, so an id
//! captured before a wholesale content replacement (undo, import, view toggle)
//! resolves to nothing instead of pointing at whatever reused the slot.
//!
//! The root node is the editable surface itself. It is never serialized;
//! [`Surface::inner_html`] returns the markup of its children.

use smol_str::SmolStr;

use crate::css;
use crate::parse;
use crate::serialize;

/// Generation-checked handle to a node in a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// An element: lowercased tag name plus attributes in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k.as_str() == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((SmolStr::new(name), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k.as_str() == name)?;
        Some(self.attrs.remove(pos).1)
    }
}

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements that start a new block (and therefore imply a line break).
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// The editable surface: a single mutable document tree.
#[derive(Clone, Debug)]
pub struct Surface {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    /// Create an empty surface.
    pub fn new() -> Self {
        let mut surface = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        surface.root = surface.alloc(NodeKind::Element(Element::new("div")));
        surface
    }

    /// Create a surface whose content is parsed from `markup`.
    pub fn from_markup(markup: &str) -> Self {
        let mut surface = Self::new();
        surface.set_inner_html(markup);
        surface
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // === Allocation ===

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                data: Some(data),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Create an element with the given attributes and a single text child.
    pub fn create_element_with_text(
        &mut self,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let el = self.create_element(tag);
        if let Some(element) = self.element_mut(el) {
            for (name, value) in attrs {
                element.set_attr(name, *value);
            }
        }
        if !text.is_empty() {
            let text = self.create_text(text);
            self.append_child(el, text);
        }
        el
    }

    // === Queries ===

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    /// Whether `id` is live and reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.data(current).and_then(|d| d.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(NodeData {
            kind: NodeKind::Text(text),
            ..
        }) = self.data_mut(id)
        {
            *text = value.into();
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.remove_attr(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// DOM "node length": chars for text, child count for elements.
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            Some(NodeKind::Element(_)) => self.children(id).len(),
            None => 0,
        }
    }

    /// The node itself if it is an element, otherwise its parent.
    pub fn nearest_element(&self, id: NodeId) -> Option<NodeId> {
        if self.is_element(id) {
            Some(id)
        } else {
            self.parent(id)
        }
    }

    /// Walk from `id` (inclusive) towards the root (inclusive) and return the
    /// first node matching `pred`.
    pub fn closest(&self, id: NodeId, mut pred: impl FnMut(&Self, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Closest element (inclusive) with the given tag, stopping before the root.
    pub fn closest_tag(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        let root = self.root;
        self.closest(id, |s, n| {
            n != root && s.tag(n).is_some_and(|t| tags.contains(&t))
        })
    }

    /// Whether `ancestor` contains `node` (inclusive).
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.closest(node, |_, n| n == ancestor).is_some()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    /// Descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Child-index path from the root to `id`. Empty for the root itself.
    pub fn path_of(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for index in path {
            current = *self.children(current).get(*index)?;
        }
        Some(current)
    }

    // === Mutation ===

    /// Unlink `id` from its parent, keeping the subtree alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(data) = self.data_mut(parent) {
            data.children.retain(|c| *c != id);
        }
        if let Some(data) = self.data_mut(id) {
            data.parent = None;
        }
    }

    /// Insert `child` into `parent` at `index` (clamped), detaching it first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if child == self.root || !self.contains(parent) || !self.contains(child) {
            return;
        }
        if self.is_inclusive_ancestor(child, parent) {
            tracing::warn!("refusing to insert a node into its own subtree");
            return;
        }
        self.detach(child);
        if let Some(data) = self.data_mut(parent) {
            let index = index.min(data.children.len());
            data.children.insert(index, child);
        }
        if let Some(data) = self.data_mut(child) {
            data.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference)) {
            self.insert_child(parent, index, node);
        }
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if let (Some(parent), Some(index)) = (self.parent(reference), self.index_in_parent(reference)) {
            self.insert_child(parent, index + 1, node);
        }
    }

    /// Detach `id` and free its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            stack.extend_from_slice(self.children(node));
            if let Some(slot) = self.slots.get_mut(node.index as usize) {
                if slot.generation == node.generation && slot.data.take().is_some() {
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free.push(node.index);
                }
            }
        }
    }

    /// Free every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Put `new` where `old` is and free `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.insert_before(old, new);
        self.remove(old);
    }

    /// Replace an element by its children.
    pub fn unwrap(&mut self, id: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(id), self.index_in_parent(id)) else {
            return;
        };
        let children = self.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        self.remove(id);
    }

    /// Move `nodes` (siblings, in order) into `wrapper`, which takes the place
    /// of the first of them.
    pub fn wrap_siblings(&mut self, nodes: &[NodeId], wrapper: NodeId) {
        let Some(first) = nodes.first() else {
            return;
        };
        self.insert_before(*first, wrapper);
        for node in nodes {
            self.append_child(wrapper, *node);
        }
    }

    /// Split a text node at a char offset. The tail becomes a new text node
    /// right after `id`, which is returned. Offsets at either end split
    /// nothing and return `None`.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let len = text.chars().count();
        if offset == 0 || offset >= len {
            return None;
        }
        let byte = char_to_byte(text, offset);
        let tail = text[byte..].to_string();
        let head = text[..byte].to_string();
        self.set_text(id, head);
        let tail_node = self.create_text(tail);
        self.insert_after(id, tail_node);
        Some(tail_node)
    }

    /// Merge adjacent text siblings and drop empty text nodes below `id`.
    pub fn normalize_text(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match self.text(child).map(str::to_owned) {
                Some(text) if text.is_empty() => self.remove(child),
                Some(text) => match previous_text {
                    Some(prev) => {
                        let merged = format!("{}{}", self.text(prev).unwrap_or_default(), text);
                        self.set_text(prev, merged);
                        self.remove(child);
                    }
                    None => previous_text = Some(child),
                },
                None => {
                    previous_text = None;
                    self.normalize_text(child);
                }
            }
        }
    }

    // === Inline style ===

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        css::parse_declarations(style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Set one declaration of the inline style, keeping the others.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut decls = self
            .attr(id, "style")
            .map(css::parse_declarations)
            .unwrap_or_default();
        match decls.iter_mut().find(|(name, _)| name == property) {
            Some((_, v)) => *v = value.to_string(),
            None => decls.push((property.to_string(), value.to_string())),
        }
        self.set_attr(id, "style", css::serialize_declarations(&decls));
    }

    /// Remove one declaration; drops the `style` attribute once it is empty.
    pub fn remove_style_property(&mut self, id: NodeId, property: &str) {
        let Some(style) = self.attr(id, "style") else {
            return;
        };
        let decls: Vec<_> = css::parse_declarations(style)
            .into_iter()
            .filter(|(name, _)| name != property)
            .collect();
        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", css::serialize_declarations(&decls));
        }
    }

    // === Markup ===

    /// Serialized markup of the surface content.
    pub fn inner_html(&self) -> String {
        self.inner_html_of(self.root)
    }

    pub fn inner_html_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            serialize::write_node(self, *child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, id, &mut out);
        out
    }

    /// Replace the whole surface content with parsed `markup`.
    pub fn set_inner_html(&mut self, markup: &str) {
        let root = self.root;
        self.clear_children(root);
        parse::parse_into(self, root, markup);
    }

    /// Replace the whole surface content with a single text node.
    pub fn set_inner_text(&mut self, text: &str) {
        let root = self.root;
        self.clear_children(root);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(root, node);
        }
    }

    /// Parse `markup` into detached nodes owned by this surface.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        let holder = self.create_element("div");
        parse::parse_into(self, holder, markup);
        let nodes = self.children(holder).to_vec();
        for node in &nodes {
            self.detach(*node);
        }
        self.remove(holder);
        nodes
    }
}

/// Byte index of the `chars`-th char of `s` (or `s.len()`).
pub(crate) fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_id_after_replacement() {
        let mut surface = Surface::from_markup("<p>hello</p>");
        let p = surface.children(surface.root())[0];
        assert!(surface.is_attached(p));

        surface.set_inner_html("<p>other</p>");
        assert!(!surface.contains(p));
        assert!(!surface.is_attached(p));
        // The slot was reused, but the old id must not alias the new node.
        assert_eq!(surface.tag(p), None);
    }

    #[test]
    fn test_detached_node_is_live_but_not_attached() {
        let mut surface = Surface::new();
        let p = surface.create_element("p");
        assert!(surface.contains(p));
        assert!(!surface.is_attached(p));
        surface.append_child(surface.root(), p);
        assert!(surface.is_attached(p));
    }

    #[test]
    fn test_split_text() {
        let mut surface = Surface::from_markup("<p>hello world</p>");
        let p = surface.children(surface.root())[0];
        let text = surface.children(p)[0];

        let tail = surface.split_text(text, 5).unwrap();
        assert_eq!(surface.text(text), Some("hello"));
        assert_eq!(surface.text(tail), Some(" world"));
        assert_eq!(surface.inner_html(), "<p>hello world</p>");

        assert_eq!(surface.split_text(text, 0), None);
        assert_eq!(surface.split_text(text, 5), None);
    }

    #[test]
    fn test_split_text_multibyte() {
        let mut surface = Surface::from_markup("नमस्ते");
        let text = surface.children(surface.root())[0];
        let tail = surface.split_text(text, 2).unwrap();
        assert_eq!(surface.text(text), Some("नम"));
        assert_eq!(surface.text(tail), Some("स्ते"));
    }

    #[test]
    fn test_unwrap_keeps_children_in_place() {
        let mut surface = Surface::from_markup("a<span>b<i>c</i></span>d");
        let span = surface.children(surface.root())[1];
        surface.unwrap(span);
        assert_eq!(surface.inner_html(), "ab<i>c</i>d");
    }

    #[test]
    fn test_paths_round_trip() {
        let surface = Surface::from_markup("<p>a</p><ul><li>one</li><li>two</li></ul>");
        let ul = surface.children(surface.root())[1];
        let second_li = surface.children(ul)[1];
        let text = surface.children(second_li)[0];

        let path = surface.path_of(text).unwrap();
        assert_eq!(path, vec![1, 1, 0]);
        assert_eq!(surface.node_at_path(&path), Some(text));
        assert_eq!(surface.node_at_path(&[5]), None);
    }

    #[test]
    fn test_style_properties() {
        let mut surface = Surface::from_markup(r#"<span style="color: red;">x</span>"#);
        let span = surface.children(surface.root())[0];

        surface.set_style_property(span, "font-size", "14px");
        assert_eq!(
            surface.attr(span, "style"),
            Some("color: red; font-size: 14px;")
        );
        assert_eq!(surface.style_property(span, "color").as_deref(), Some("red"));

        surface.remove_style_property(span, "color");
        surface.remove_style_property(span, "font-size");
        assert_eq!(surface.attr(span, "style"), None);
    }

    #[test]
    fn test_normalize_text_merges_siblings() {
        let mut surface = Surface::new();
        let root = surface.root();
        for part in ["a", "", "b"] {
            let t = surface.create_text(part);
            surface.append_child(root, t);
        }
        surface.normalize_text(root);
        assert_eq!(surface.children(root).len(), 1);
        assert_eq!(surface.inner_html(), "ab");
    }

    #[test]
    fn test_refuses_cycle() {
        let mut surface = Surface::from_markup("<div><p>x</p></div>");
        let div = surface.children(surface.root())[0];
        let p = surface.children(div)[0];
        surface.append_child(p, div);
        assert_eq!(surface.inner_html(), "<div><p>x</p></div>");
    }
}
