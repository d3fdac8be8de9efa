//! Cursor-relative insertion of structural nodes.
//!
//! Everything goes through [`insert_nodes_at_cursor`]: restore the saved
//! range, delete what it selects, insert at that spot and leave the saved
//! range collapsed right after the inserted nodes, so consecutive insertions
//! stack in document order. Without a usable range the nodes are appended to
//! the end of the surface.
//!
//! Inserted nodes are fitted to their context the way the parser would read
//! them, so the surface never holds a tree its own markup does not
//! reproduce: a block splits the paragraph, heading or `pre` around the
//! caret, a list item splits the open item, a link splits the open link, and
//! nothing lands directly inside table structure.

use crate::dom::{NodeId, Surface};
use crate::error::EditorError;
use crate::parse::{
    BUTTON_SCOPE, CLOSES_PARAGRAPH, HEADINGS, ITEM_SCOPE, LINK_SCOPE, TABLE_PARTS, TABLE_SECTIONS,
};
use crate::range::{ChildSlot, delete_contents, insert_at, split_up_to};
use crate::selection::SelectionManager;
use crate::types::SelectionRange;

pub const HEADING_PLACEHOLDER: &str = "Heading Text";
pub const TABLE_CLASS: &str = "table table-bordered table-striped";
pub const MEDIA_WRAPPER_CLASS: &str = "resizable-media";

/// Where an insertion ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// At the restored saved range.
    AtCursor,
    /// No valid saved range; appended to the end of the surface.
    Appended,
}

/// Insert `nodes` (detached, in order) at the saved range.
pub fn insert_nodes_at_cursor(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    nodes: &[NodeId],
) -> Placement {
    let restored = selection
        .restore(surface)
        .and_then(|range| delete_contents(surface, &range));
    let (slot, placement) = match restored {
        Some(slot) => (slot, Placement::AtCursor),
        None => {
            tracing::debug!(target: "kalpna::blocks", "no saved range, appending at the end");
            let root = surface.root();
            let slot = ChildSlot {
                parent: root,
                index: surface.children(root).len(),
            };
            (slot, Placement::Appended)
        }
    };
    let mut after = slot;
    for node in nodes {
        let fitted = fit_slot(surface, after, *node);
        after = insert_at(surface, fitted, std::slice::from_ref(node));
    }
    selection.set_saved(SelectionRange::caret(after.as_anchor()));
    placement
}

/// Where `node` can go at `slot` without the parser restructuring it.
fn fit_slot(surface: &mut Surface, slot: ChildSlot, node: NodeId) -> ChildSlot {
    let mut slot = slot;
    let in_structure = surface
        .tag(slot.parent)
        .is_some_and(|t| t == "table" || t == "tr" || TABLE_SECTIONS.contains(&t));
    if in_structure && !surface.tag(node).is_some_and(|t| TABLE_PARTS.contains(&t)) {
        let table = surface.closest_tag(slot.parent, &["table"]);
        if let Some((parent, index)) =
            table.and_then(|t| Some((surface.parent(t)?, surface.index_in_parent(t)?)))
        {
            slot = ChildSlot {
                parent,
                index: index + 1,
            };
        }
    }
    while let Some(ancestor) = split_target(surface, slot.parent, node) {
        let next = split_up_to(surface, slot, ancestor);
        if next.parent == slot.parent {
            break;
        }
        slot = next;
    }
    slot
}

/// The highest ancestor of `parent` the parser would close on reading
/// `node` inside it.
fn split_target(surface: &Surface, parent: NodeId, node: NodeId) -> Option<NodeId> {
    let root = surface.root();
    let mut target = None;
    let (mut paragraph, mut item, mut link) = (true, true, true);
    let mut current = parent;
    while current != root {
        let Some(tag) = surface.tag(current) else {
            break;
        };
        let clash = match tag {
            "p" | "pre" => paragraph && holds_any(surface, node, CLOSES_PARAGRAPH, BUTTON_SCOPE),
            h if HEADINGS.contains(&h) => {
                paragraph && holds_any(surface, node, CLOSES_PARAGRAPH, BUTTON_SCOPE)
            }
            "li" => item && holds_any(surface, node, &["li"], ITEM_SCOPE),
            "dd" | "dt" => item && holds_any(surface, node, &["dd", "dt"], ITEM_SCOPE),
            "a" => link && holds_any(surface, node, &["a"], LINK_SCOPE),
            _ => false,
        };
        if clash {
            target = Some(current);
        }
        paragraph &= !BUTTON_SCOPE.contains(&tag);
        item &= !ITEM_SCOPE.contains(&tag);
        link &= !LINK_SCOPE.contains(&tag);
        let Some(next) = surface.parent(current) else {
            break;
        };
        current = next;
    }
    target
}

/// Whether `node` or a descendant reachable without entering `barriers`
/// has one of `tags`.
fn holds_any(surface: &Surface, node: NodeId, tags: &[&str], barriers: &[&str]) -> bool {
    let Some(tag) = surface.tag(node) else {
        return false;
    };
    if tags.contains(&tag) {
        return true;
    }
    !barriers.contains(&tag)
        && surface
            .children(node)
            .iter()
            .any(|child| holds_any(surface, *child, tags, barriers))
}

pub fn insert_block_at_cursor(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    node: NodeId,
) -> Placement {
    insert_nodes_at_cursor(surface, selection, &[node])
}

/// Parse `markup` and insert its top-level nodes at the saved range.
pub fn insert_markup_at_cursor(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    markup: &str,
) -> Placement {
    let nodes = surface.parse_fragment(markup);
    insert_nodes_at_cursor(surface, selection, &nodes)
}

/// Insert literal text (no markup interpretation) at the saved range.
pub fn insert_text_at_cursor(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    text: &str,
) -> Placement {
    let node = surface.create_text(text);
    insert_nodes_at_cursor(surface, selection, &[node])
}

pub fn insert_paragraph(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    text: &str,
) -> NodeId {
    let p = surface.create_element_with_text("p", &[], text);
    insert_block_at_cursor(surface, selection, p);
    p
}

pub fn insert_heading(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    level: u8,
) -> Result<NodeId, EditorError> {
    if !(1..=6).contains(&level) {
        return Err(EditorError::InvalidHeadingLevel(level));
    }
    let heading = surface.create_element_with_text(&format!("h{level}"), &[], HEADING_PLACEHOLDER);
    insert_block_at_cursor(surface, selection, heading);
    Ok(heading)
}

/// `100 / cols` with at most two decimals and no trailing zeros.
pub(crate) fn format_percent(cols: u32) -> String {
    let value = (100.0 / f64::from(cols) * 100.0).round() / 100.0;
    format!("{value}")
}

/// Build a detached table: a header row of `cols` cells followed by
/// `rows - 1` body rows.
pub fn build_table(surface: &mut Surface, rows: u32, cols: u32) -> Result<NodeId, EditorError> {
    if rows < 1 || cols < 1 {
        return Err(EditorError::InvalidTableDimensions { rows, cols });
    }
    let width = format!("width: {}%;", format_percent(cols));

    let table = surface.create_element("table");
    surface.set_attr(table, "class", TABLE_CLASS);

    let thead = surface.create_element("thead");
    let header_row = surface.create_element("tr");
    for c in 1..=cols {
        let th = surface.create_element_with_text("th", &[("style", width.as_str())], &format!("Header {c}"));
        surface.append_child(header_row, th);
    }
    surface.append_child(thead, header_row);
    surface.append_child(table, thead);

    let tbody = surface.create_element("tbody");
    for r in 2..=rows {
        let tr = surface.create_element("tr");
        for c in 1..=cols {
            let td = surface.create_element_with_text(
                "td",
                &[("style", width.as_str())],
                &format!("Row {r} Col {c}"),
            );
            surface.append_child(tr, td);
        }
        surface.append_child(tbody, tr);
    }
    surface.append_child(table, tbody);
    Ok(table)
}

/// Validate, build and insert a table. Nothing is mutated on error.
pub fn insert_table(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    rows: u32,
    cols: u32,
) -> Result<NodeId, EditorError> {
    let table = build_table(surface, rows, cols)?;
    insert_block_at_cursor(surface, selection, table);
    Ok(table)
}

/// The rows/columns form shown before inserting a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableForm {
    pub visible: bool,
    pub rows: Option<u32>,
    pub cols: Option<u32>,
}

impl TableForm {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Take the entered dimensions (missing counts as 0), hiding and
    /// resetting the form.
    pub fn take(&mut self) -> (u32, u32) {
        let dims = (self.rows.unwrap_or(0), self.cols.unwrap_or(0));
        *self = Self::default();
        dims
    }
}

/// A non-editable, manually resizable container around an image.
pub fn build_image(surface: &mut Surface, src: &str, alt: &str) -> NodeId {
    let wrapper = surface.create_element("div");
    surface.set_attr(wrapper, "class", MEDIA_WRAPPER_CLASS);
    surface.set_attr(wrapper, "contenteditable", "false");
    surface.set_attr(
        wrapper,
        "style",
        "display: inline-block; resize: both; overflow: hidden;",
    );
    let img = surface.create_element("img");
    surface.set_attr(img, "src", src);
    surface.set_attr(img, "alt", alt);
    surface.set_attr(img, "style", "width: 100%; height: auto;");
    surface.append_child(wrapper, img);
    wrapper
}

/// A link to an uploaded document, labelled with its file name.
pub fn build_document_link(surface: &mut Surface, href: &str, name: &str) -> NodeId {
    surface.create_element_with_text("a", &[("href", href), ("target", "_blank")], name)
}
