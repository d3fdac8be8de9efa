//! DOM selection <-> core path synchronization.
//!
//! The live element mirrors the core surface node for node, so a DOM
//! boundary point maps onto a child-index path from the editor element.
//! Text offsets differ in unit: the DOM counts UTF-16 code units, the core
//! counts chars.

use web_sys::{HtmlElement, Node};

use kalpna_editor_core::{PathPoint, PathRange, Rect};

/// What the browser reports about the current selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomSelection {
    /// `None` when the selection lies outside the editor element.
    pub range: Option<PathRange>,
    pub rect: Option<Rect>,
    pub text: String,
}

/// Char offset for a UTF-16 offset into `text`.
pub fn utf16_to_chars(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (i, c) in text.chars().enumerate() {
        if seen >= units {
            return i;
        }
        seen += c.len_utf16();
    }
    text.chars().count()
}

/// UTF-16 offset for a char offset into `text`.
pub fn chars_to_utf16(text: &str, chars: usize) -> usize {
    text.chars().take(chars).map(char::len_utf16).sum()
}

fn child_index(parent: &Node, child: &Node) -> Option<usize> {
    let children = parent.child_nodes();
    (0..children.length()).position(|i| {
        children
            .item(i)
            .is_some_and(|c| c.is_same_node(Some(child)))
    })
}

fn is_text(node: &Node) -> bool {
    node.node_type() == Node::TEXT_NODE
}

/// Map a DOM boundary point to a core path point.
pub fn dom_point_to_path(editor: &Node, node: &Node, offset: u32) -> Option<PathPoint> {
    let mut path = Vec::new();
    let mut current = node.clone();
    while !current.is_same_node(Some(editor)) {
        let parent = current.parent_node()?;
        path.push(child_index(&parent, &current)?);
        current = parent;
    }
    path.reverse();

    let offset = if is_text(node) {
        utf16_to_chars(&node.node_value().unwrap_or_default(), offset as usize)
    } else {
        offset as usize
    };
    Some(PathPoint::new(path, offset))
}

/// Map a core path point back to a DOM boundary point.
pub fn path_to_dom_point(editor: &Node, point: &PathPoint) -> Option<(Node, u32)> {
    let mut node = editor.clone();
    for index in &point.path {
        node = node.child_nodes().item(u32::try_from(*index).ok()?)?;
    }
    let offset = if is_text(&node) {
        chars_to_utf16(&node.node_value().unwrap_or_default(), point.offset)
    } else {
        point.offset
    };
    Some((node, u32::try_from(offset).ok()?))
}

/// Read the window selection relative to `editor`.
pub fn read_selection(editor: &HtmlElement) -> DomSelection {
    read_selection_impl(editor).unwrap_or_default()
}

fn read_selection_impl(editor: &HtmlElement) -> Option<DomSelection> {
    let selection = web_sys::window()?.get_selection().ok()??;
    let text = String::from(selection.to_string());
    if selection.range_count() == 0 {
        return Some(DomSelection {
            text,
            ..DomSelection::default()
        });
    }
    let range = selection.get_range_at(0).ok()?;
    let editor_node: &Node = editor.as_ref();

    let ancestor = range.common_ancestor_container().ok()?;
    if !editor_node.contains(Some(&ancestor)) {
        tracing::trace!(target: "kalpna::selection", "selection outside the editor");
        return Some(DomSelection::default());
    }

    let start = dom_point_to_path(
        editor_node,
        &range.start_container().ok()?,
        range.start_offset().ok()?,
    );
    let end = dom_point_to_path(
        editor_node,
        &range.end_container().ok()?,
        range.end_offset().ok()?,
    );
    let rect = range.get_bounding_client_rect();
    Some(DomSelection {
        range: start.zip(end).map(|(start, end)| PathRange::new(start, end)),
        rect: Some(Rect {
            top: rect.top(),
            left: rect.left(),
            width: rect.width(),
            height: rect.height(),
        }),
        text,
    })
}

/// Replace the window selection with `range`, or clear it.
pub fn apply_selection(editor: &HtmlElement, range: Option<&PathRange>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(Some(selection)) = window.get_selection() else {
        return;
    };
    let Some(range) = range else {
        if let Err(e) = selection.remove_all_ranges() {
            tracing::warn!(target: "kalpna::selection", "clearing selection failed: {:?}", e);
        }
        return;
    };

    let editor_node: &Node = editor.as_ref();
    let (Some(start), Some(end)) = (
        path_to_dom_point(editor_node, &range.start),
        path_to_dom_point(editor_node, &range.end),
    ) else {
        tracing::debug!(target: "kalpna::selection", "saved range does not map onto the DOM");
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let result = document.create_range().and_then(|dom_range| {
        dom_range.set_start(&start.0, start.1)?;
        dom_range.set_end(&end.0, end.1)?;
        selection.remove_all_ranges()?;
        selection.add_range(&dom_range)
    });
    if let Err(e) = result {
        tracing::warn!(target: "kalpna::selection", "restoring selection failed: {:?}", e);
    }
}
