//! Named formatting commands (bold, lists, links) executed on the surface.

use smol_str::SmolStr;

use crate::dom::{NodeId, Surface};
use crate::range::{delete_contents, insert_at, lift_boundaries, split_up_to, wrap_between};
use crate::selection::SelectionManager;
use crate::types::{Anchor, SelectionRange};

const BOLD_TAGS: &[&str] = &["b", "strong"];
const ITALIC_TAGS: &[&str] = &["i", "em"];
const UNDERLINE_TAGS: &[&str] = &["u"];
const STRIKE_TAGS: &[&str] = &["s", "strike", "del"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    UnorderedList,
    OrderedList,
    /// Link the selection. `target` is only written when non-empty.
    CreateLink { url: String, target: Option<String> },
}

impl FormatCommand {
    /// Parse a command name as the toolbar sends it. `createLink` carries
    /// answers and is built directly instead.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "underline" => Self::Underline,
            "strikeThrough" => Self::StrikeThrough,
            "insertUnorderedList" => Self::UnorderedList,
            "insertOrderedList" => Self::OrderedList,
            _ => return None,
        })
    }

    /// Tags that count as this inline format; the first is the one written.
    fn inline_tags(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Bold => Some(BOLD_TAGS),
            Self::Italic => Some(ITALIC_TAGS),
            Self::Underline => Some(UNDERLINE_TAGS),
            Self::StrikeThrough => Some(STRIKE_TAGS),
            _ => None,
        }
    }
}

/// Run `command` against the saved range. Returns whether anything changed.
pub fn execute_format(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    command: &FormatCommand,
) -> bool {
    if let Some(tags) = command.inline_tags() {
        return toggle_inline(surface, selection, tags);
    }
    match command {
        FormatCommand::UnorderedList => toggle_list(surface, selection, "ul"),
        FormatCommand::OrderedList => toggle_list(surface, selection, "ol"),
        FormatCommand::CreateLink { url, target } => {
            create_link(surface, selection, url, target.as_deref())
        }
        _ => false,
    }
}

fn select_contents(selection: &mut SelectionManager, surface: &Surface, first: NodeId, last: NodeId) {
    let len = surface.children(last).len();
    selection.set_saved(SelectionRange::new(
        Anchor::new(first, 0),
        Anchor::new(last, len),
    ));
}

fn toggle_inline(surface: &mut Surface, selection: &mut SelectionManager, tags: &[&str]) -> bool {
    let Some(range) = selection.restore(surface) else {
        return false;
    };
    if range.is_collapsed() {
        return false;
    }

    let start_wrapper = surface.closest_tag(range.start.node, tags);
    let end_wrapper = surface.closest_tag(range.end.node, tags);
    if let Some(wrapper) = start_wrapper.filter(|w| Some(*w) == end_wrapper) {
        return unwrap_selected(surface, selection, &range, wrapper);
    }

    let Some((start, end)) = lift_boundaries(surface, &range) else {
        return false;
    };
    let tag = tags[0];
    let wrappers = wrap_between(
        surface,
        start,
        end,
        |s, n| s.tag(n).is_some_and(|t| tags.contains(&t)),
        |s| s.create_element(tag),
    );
    match (wrappers.first(), wrappers.last()) {
        (Some(first), Some(last)) => {
            select_contents(selection, surface, *first, *last);
            true
        }
        _ => false,
    }
}

/// Remove `wrapper` from the selected part only: the wrapper is split at
/// both range ends and the middle piece unwrapped.
fn unwrap_selected(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    range: &SelectionRange,
    wrapper: NodeId,
) -> bool {
    let Some((start, end)) = lift_boundaries(surface, range) else {
        return false;
    };
    // Splitting at the end never moves what precedes it, so `start` holds.
    split_up_to(surface, end, wrapper);
    let before = split_up_to(surface, start, wrapper);
    let Some(middle) = surface.children(before.parent).get(before.index).copied() else {
        return false;
    };
    if surface.tag(middle) != surface.tag(wrapper) {
        return false;
    }
    let count = surface.children(middle).len();
    surface.unwrap(middle);
    selection.set_saved(SelectionRange::new(
        Anchor::new(before.parent, before.index),
        Anchor::new(before.parent, before.index + count),
    ));
    true
}

const LIST_BLOCKS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "blockquote",
];

fn toggle_list(surface: &mut Surface, selection: &mut SelectionManager, list_tag: &str) -> bool {
    let Some(range) = selection.restore(surface) else {
        return false;
    };
    let anchor = range.start.node;

    let item = surface
        .closest(anchor, |s, n| s.tag(n).is_some_and(|t| t == "li" || CELL_TAGS.contains(&t)))
        .filter(|n| surface.tag(*n) == Some("li"));
    if let Some(li) = item {
        let Some(list) = surface.parent(li).filter(|l| {
            surface.tag(*l).is_some_and(|t| t == "ul" || t == "ol")
        }) else {
            return false;
        };
        if surface.tag(list) == Some(list_tag) {
            // Same list type: turn every item back into a paragraph.
            for item in surface.children(list).to_vec() {
                if let Some(el) = surface.element_mut(item) {
                    if el.tag == "li" {
                        el.tag = SmolStr::new_static("p");
                    }
                }
            }
            let first = surface.children(list).first().copied();
            let last = surface.children(list).last().copied();
            surface.unwrap(list);
            if let (Some(first), Some(last)) = (first, last) {
                select_contents(selection, surface, first, last);
            }
        } else if let Some(el) = surface.element_mut(list) {
            el.tag = SmolStr::new(list_tag);
        }
        return true;
    }

    // The nearest block, but never past the table cell holding the anchor.
    let root = surface.root();
    let scope = surface
        .closest(anchor, |s, n| {
            n == root
                || s.tag(n)
                    .is_some_and(|t| LIST_BLOCKS.contains(&t) || CELL_TAGS.contains(&t))
        })
        .unwrap_or(root);

    let list = surface.create_element(list_tag);
    let li = surface.create_element("li");
    surface.append_child(list, li);

    if surface.tag(scope).is_some_and(|t| LIST_BLOCKS.contains(&t)) && scope != root {
        surface.insert_before(scope, list);
        for child in surface.children(scope).to_vec() {
            surface.append_child(li, child);
        }
        surface.remove(scope);
    } else {
        let Some(run) = inline_run(surface, scope, anchor, range.start.offset) else {
            surface.append_child(scope, list);
            select_contents(selection, surface, li, li);
            return true;
        };
        surface.insert_before(run[0], list);
        for node in run {
            surface.append_child(li, node);
        }
    }
    select_contents(selection, surface, li, li);
    true
}

/// Table cells keep their lists inside.
const CELL_TAGS: &[&str] = &["td", "th", "caption"];

/// The run of inline children of `container` around the one holding the
/// anchor. `None` when the container is empty.
fn inline_run(
    surface: &Surface,
    container: NodeId,
    anchor: NodeId,
    offset: usize,
) -> Option<Vec<NodeId>> {
    let siblings = surface.children(container).to_vec();
    let pos = if anchor == container {
        offset.min(siblings.len().checked_sub(1)?)
    } else {
        let top = surface.closest(anchor, |s, n| s.parent(n) == Some(container))?;
        siblings.iter().position(|n| *n == top)?
    };
    let is_inline = |n: NodeId| !surface.tag(n).is_some_and(crate::dom::is_block);
    if !is_inline(siblings[pos]) {
        return Some(vec![siblings[pos]]);
    }
    let mut first = pos;
    while first > 0 && is_inline(siblings[first - 1]) {
        first -= 1;
    }
    let mut last = pos;
    while last + 1 < siblings.len() && is_inline(siblings[last + 1]) {
        last += 1;
    }
    Some(siblings[first..=last].to_vec())
}

fn create_link(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    url: &str,
    target: Option<&str>,
) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    let Some(range) = selection.restore(surface) else {
        return false;
    };
    let target = target.map(str::trim).filter(|t| !t.is_empty());

    let anchors = if range.is_collapsed() {
        let Some(slot) = delete_contents(surface, &range) else {
            return false;
        };
        let a = surface.create_element_with_text("a", &[("href", url)], url);
        let after = insert_at(surface, slot, &[a]);
        selection.set_saved(SelectionRange::caret(after.as_anchor()));
        vec![a]
    } else {
        let Some((start, end)) = lift_boundaries(surface, &range) else {
            return false;
        };
        let wrappers = wrap_between(
            surface,
            start,
            end,
            |s, n| s.tag(n) == Some("a"),
            |s| s.create_element("a"),
        );
        if let (Some(first), Some(last)) = (wrappers.first(), wrappers.last()) {
            select_contents(selection, surface, *first, *last);
        }
        wrappers
    };

    for a in &anchors {
        surface.set_attr(*a, "href", url);
        if let Some(target) = target {
            surface.set_attr(*a, "target", target);
        }
    }
    !anchors.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(surface: &Surface, manager: &mut SelectionManager, start: (&[usize], usize), end: (&[usize], usize)) {
        let range = SelectionRange::new(
            Anchor::new(surface.node_at_path(start.0).unwrap(), start.1),
            Anchor::new(surface.node_at_path(end.0).unwrap(), end.1),
        );
        assert!(manager.capture(surface, Some(range)));
    }

    #[test]
    fn test_bold_toggles() {
        let mut surface = Surface::from_markup("<p>make this bold</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 5), (&[0, 0], 9));

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::Bold));
        assert_eq!(surface.inner_html(), "<p>make <b>this</b> bold</p>");

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::Bold));
        assert_eq!(surface.inner_html(), "<p>make this bold</p>");
    }

    #[test]
    fn test_partial_unbold_splits_wrapper() {
        let mut surface = Surface::from_markup("<p><b>make this bold</b></p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0, 0], 5), (&[0, 0, 0], 9));

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::Bold));
        assert_eq!(surface.inner_html(), "<p><b>make </b>this<b> bold</b></p>");
        let saved = manager.saved().unwrap();
        let p = surface.node_at_path(&[0]).unwrap();
        assert_eq!(saved.start, Anchor::new(p, 1));
        assert_eq!(saved.end, Anchor::new(p, 2));
    }

    #[test]
    fn test_partial_unbold_splits_nested_formatting() {
        let mut surface = Surface::from_markup("<p><strong><i>abc</i></strong></p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0, 0, 0], 1), (&[0, 0, 0, 0], 2));

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::Bold));
        assert_eq!(
            surface.inner_html(),
            "<p><strong><i>a</i></strong><i>b</i><strong><i>c</i></strong></p>"
        );
    }

    #[test]
    fn test_collapsed_inline_format_is_noop() {
        let mut surface = Surface::from_markup("<p>text</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 2), (&[0, 0], 2));
        assert!(!execute_format(&mut surface, &mut manager, &FormatCommand::Italic));
        assert_eq!(surface.inner_html(), "<p>text</p>");
    }

    #[test]
    fn test_list_toggle_round_trip() {
        let mut surface = Surface::from_markup("<p>item</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 1), (&[0, 0], 1));

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::UnorderedList));
        assert_eq!(surface.inner_html(), "<ul><li>item</li></ul>");

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::OrderedList));
        assert_eq!(surface.inner_html(), "<ol><li>item</li></ol>");

        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::OrderedList));
        assert_eq!(surface.inner_html(), "<p>item</p>");
    }

    #[test]
    fn test_list_in_table_cell_stays_in_cell() {
        let mut surface = Surface::from_markup(
            "<div><table><tbody><tr><td>x <b>y</b></td><td><p>z</p></td></tr></tbody></table></div>",
        );
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0, 0, 0, 0, 0], 1), (&[0, 0, 0, 0, 0, 0], 1));
        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::UnorderedList));

        select(&surface, &mut manager, (&[0, 0, 0, 0, 1, 0, 0], 0), (&[0, 0, 0, 0, 1, 0, 0], 0));
        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::OrderedList));
        assert_eq!(
            surface.inner_html(),
            "<div><table><tbody><tr><td><ul><li>x <b>y</b></li></ul></td><td><ol><li>z</li></ol></td></tr></tbody></table></div>"
        );
    }

    #[test]
    fn test_list_in_empty_cell() {
        let mut surface = Surface::from_markup("<table><tbody><tr><td></td></tr></tbody></table>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0, 0, 0], 0), (&[0, 0, 0, 0], 0));
        assert!(execute_format(&mut surface, &mut manager, &FormatCommand::UnorderedList));
        assert_eq!(
            surface.inner_html(),
            "<table><tbody><tr><td><ul><li></li></ul></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_create_link_with_target() {
        let mut surface = Surface::from_markup("<p>see docs here</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 4), (&[0, 0], 8));

        let command = FormatCommand::CreateLink {
            url: "https://example.com".into(),
            target: Some("_blank".into()),
        };
        assert!(execute_format(&mut surface, &mut manager, &command));
        assert_eq!(
            surface.inner_html(),
            "<p>see <a href=\"https://example.com\" target=\"_blank\">docs</a> here</p>"
        );
    }

    #[test]
    fn test_create_link_at_caret_inserts_url() {
        let mut surface = Surface::from_markup("<p>go </p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 3), (&[0, 0], 3));

        let command = FormatCommand::CreateLink {
            url: "https://example.com".into(),
            target: None,
        };
        assert!(execute_format(&mut surface, &mut manager, &command));
        assert_eq!(
            surface.inner_html(),
            "<p>go <a href=\"https://example.com\">https://example.com</a></p>"
        );
    }

    #[test]
    fn test_empty_url_is_noop() {
        let mut surface = Surface::from_markup("<p>x</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 0), (&[0, 0], 1));
        let command = FormatCommand::CreateLink {
            url: "  ".into(),
            target: None,
        };
        assert!(!execute_format(&mut surface, &mut manager, &command));
        assert_eq!(surface.inner_html(), "<p>x</p>");
    }

    #[test]
    fn test_command_names() {
        assert_eq!(FormatCommand::from_name("bold"), Some(FormatCommand::Bold));
        assert_eq!(
            FormatCommand::from_name("insertOrderedList"),
            Some(FormatCommand::OrderedList)
        );
        assert_eq!(FormatCommand::from_name("justifyFull"), None);
    }
}
