//! Range machinery shared by the style, block and paste paths.
//!
//! Operations first "lift" a range's boundary points to positions between
//! children (splitting text nodes where a boundary falls inside one), which
//! turns every later step into whole-node moves. Elements are only split
//! explicitly, through [`split_up_to`].

use crate::dom::{NodeId, Surface, is_void};
use crate::types::{Anchor, SelectionRange};

/// A position between two children of `parent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ChildSlot {
    pub parent: NodeId,
    pub index: usize,
}

impl ChildSlot {
    pub fn as_anchor(&self) -> Anchor {
        Anchor::new(self.parent, self.index)
    }

    fn key(&self, surface: &Surface) -> Option<Vec<usize>> {
        let mut key = surface.path_of(self.parent)?;
        key.push(self.index);
        Some(key)
    }
}

/// Lift one boundary point. Returns the slot and whether a text node was split.
fn lift(surface: &mut Surface, anchor: Anchor) -> Option<(ChildSlot, bool)> {
    let node = anchor.node;
    let is_leaf = surface.is_text(node) || surface.tag(node).is_some_and(is_void);
    if !is_leaf {
        let index = anchor.offset.min(surface.children(node).len());
        return Some((ChildSlot { parent: node, index }, false));
    }

    let parent = surface.parent(node)?;
    let index = surface.index_in_parent(node)?;
    if surface.is_element(node) || anchor.offset == 0 {
        return Some((ChildSlot { parent, index }, false));
    }
    if anchor.offset >= surface.node_len(node) {
        return Some((ChildSlot { parent, index: index + 1 }, false));
    }
    surface.split_text(node, anchor.offset);
    Some((ChildSlot { parent, index: index + 1 }, true))
}

/// Lift both ends of `range`. The end is lifted first so that splitting the
/// start never invalidates the end offset.
pub(crate) fn lift_boundaries(
    surface: &mut Surface,
    range: &SelectionRange,
) -> Option<(ChildSlot, ChildSlot)> {
    let (mut end, _) = lift(surface, range.end)?;
    let (start, split) = lift(surface, range.start)?;
    if split && start.parent == end.parent && start.index <= end.index {
        end.index += 1;
    }
    Some((start, end))
}

fn node_keys(surface: &Surface, node: NodeId) -> Option<(Vec<usize>, Vec<usize>)> {
    let before = surface.path_of(node)?;
    let mut after = before.clone();
    if let Some(last) = after.last_mut() {
        *last += 1;
    }
    Some((before, after))
}

/// Maximal nodes lying entirely between two slots, in document order.
pub(crate) fn nodes_between(surface: &Surface, start: ChildSlot, end: ChildSlot) -> Vec<NodeId> {
    let (Some(start_key), Some(end_key)) = (start.key(surface), end.key(surface)) else {
        return Vec::new();
    };
    let mut out: Vec<NodeId> = Vec::new();
    for node in surface.descendants(surface.root()) {
        if out
            .last()
            .is_some_and(|last| surface.is_inclusive_ancestor(*last, node))
        {
            continue;
        }
        let Some((before, after)) = node_keys(surface, node) else {
            continue;
        };
        if before >= start_key && after <= end_key {
            out.push(node);
        }
    }
    out
}

/// Every text node lying entirely between two slots, in document order.
pub(crate) fn text_leaves_between(
    surface: &Surface,
    start: ChildSlot,
    end: ChildSlot,
) -> Vec<NodeId> {
    let mut out = Vec::new();
    for node in nodes_between(surface, start, end) {
        if surface.is_text(node) {
            out.push(node);
        }
        out.extend(
            surface
                .descendants(node)
                .into_iter()
                .filter(|n| surface.is_text(*n)),
        );
    }
    out
}

/// Remove the range's content and return the slot where it was.
///
/// Only nodes entirely inside the range are removed; partially covered
/// elements keep their remaining content and are not merged.
pub(crate) fn delete_contents(surface: &mut Surface, range: &SelectionRange) -> Option<ChildSlot> {
    if range.is_collapsed() {
        return lift(surface, range.start).map(|(slot, _)| slot);
    }
    let (start, end) = lift_boundaries(surface, range)?;
    for node in nodes_between(surface, start, end) {
        surface.remove(node);
    }
    Some(start)
}

/// Insert `nodes` in order at `slot`; returns the slot right after the last.
pub(crate) fn insert_at(surface: &mut Surface, slot: ChildSlot, nodes: &[NodeId]) -> ChildSlot {
    let mut index = slot.index;
    for node in nodes {
        surface.insert_child(slot.parent, index, *node);
        index += 1;
    }
    ChildSlot {
        parent: slot.parent,
        index,
    }
}

/// Split every element from `slot.parent` up to `ancestor` (inclusive) at
/// the slot, moving what follows into shallow copies. Returns the slot
/// between the two halves, inside `ancestor`'s parent.
///
/// A split that would leave one half empty moves the slot past the element
/// instead, so no empty copies are created.
pub(crate) fn split_up_to(surface: &mut Surface, slot: ChildSlot, ancestor: NodeId) -> ChildSlot {
    let mut slot = slot;
    loop {
        let element = slot.parent;
        let (Some(parent), Some(index)) = (surface.parent(element), surface.index_in_parent(element))
        else {
            return slot;
        };
        let len = surface.children(element).len();
        let at = slot.index.min(len);
        let next = if at == 0 && len > 0 {
            ChildSlot { parent, index }
        } else if at == len {
            ChildSlot { parent, index: index + 1 }
        } else {
            let tail = surface.children(element)[at..].to_vec();
            let copy = shallow_copy(surface, element);
            for child in tail {
                surface.append_child(copy, child);
            }
            surface.insert_child(parent, index + 1, copy);
            ChildSlot { parent, index: index + 1 }
        };
        slot = next;
        if element == ancestor {
            return slot;
        }
    }
}

fn shallow_copy(surface: &mut Surface, element: NodeId) -> NodeId {
    let source = surface.element(element).cloned();
    let copy = surface.create_element(source.as_ref().map_or("span", |el| el.tag.as_str()));
    if let (Some(source), Some(target)) = (source, surface.element_mut(copy)) {
        *target = source;
    }
    copy
}

/// Wrap everything between two slots.
///
/// When both slots share a parent and the run holds no block elements, the
/// run moves into a single wrapper from `make`. Otherwise each non-blank text
/// leaf is wrapped on its own, and a leaf that already is the only child of
/// an element accepted by `reuse` keeps that element instead. Returns the
/// wrappers, new or reused, in document order.
pub(crate) fn wrap_between(
    surface: &mut Surface,
    start: ChildSlot,
    end: ChildSlot,
    reuse: impl Fn(&Surface, NodeId) -> bool,
    mut make: impl FnMut(&mut Surface) -> NodeId,
) -> Vec<NodeId> {
    if start.parent == end.parent {
        let run: Vec<NodeId> = surface
            .children(start.parent)
            .get(start.index..end.index)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default();
        if run.is_empty() {
            return Vec::new();
        }
        let has_block = run
            .iter()
            .any(|n| surface.tag(*n).is_some_and(crate::dom::is_block));
        if !has_block {
            let wrapper = make(surface);
            surface.wrap_siblings(&run, wrapper);
            return vec![wrapper];
        }
    }

    let mut wrappers = Vec::new();
    for leaf in text_leaves_between(surface, start, end) {
        if surface.text(leaf).is_some_and(|t| t.trim().is_empty()) {
            continue;
        }
        let parent = surface.parent(leaf);
        let reusable = parent.filter(|p| {
            *p != surface.root() && surface.children(*p) == [leaf] && reuse(surface, *p)
        });
        match reusable {
            Some(existing) => wrappers.push(existing),
            None => {
                let wrapper = make(surface);
                surface.wrap_siblings(&[leaf], wrapper);
                wrappers.push(wrapper);
            }
        }
    }
    wrappers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_in(surface: &Surface, start: (&[usize], usize), end: (&[usize], usize)) -> SelectionRange {
        SelectionRange::new(
            Anchor::new(surface.node_at_path(start.0).unwrap(), start.1),
            Anchor::new(surface.node_at_path(end.0).unwrap(), end.1),
        )
    }

    #[test]
    fn test_lift_within_one_text_node() {
        let mut surface = Surface::from_markup("<p>hello world</p>");
        let range = range_in(&surface, (&[0, 0], 2), (&[0, 0], 7));
        let (start, end) = lift_boundaries(&mut surface, &range).unwrap();

        let p = surface.node_at_path(&[0]).unwrap();
        assert_eq!(start, ChildSlot { parent: p, index: 1 });
        assert_eq!(end, ChildSlot { parent: p, index: 2 });
        let middle = surface.children(p)[1];
        assert_eq!(surface.text(middle), Some("llo w"));
        assert_eq!(surface.inner_html(), "<p>hello world</p>");
    }

    #[test]
    fn test_delete_across_paragraphs_keeps_structure() {
        let mut surface = Surface::from_markup("<p>one</p><p>two</p><p>three</p>");
        let range = range_in(&surface, (&[0, 0], 1), (&[2, 0], 2));
        let slot = delete_contents(&mut surface, &range).unwrap();

        assert_eq!(surface.inner_html(), "<p>o</p><p>ree</p>");
        assert_eq!(slot.parent, surface.node_at_path(&[0]).unwrap());
        assert_eq!(slot.index, 1);
    }

    #[test]
    fn test_text_leaves_between_nested() {
        let mut surface = Surface::from_markup("<p>ab<b>cd</b>ef</p>");
        let range = range_in(&surface, (&[0, 0], 1), (&[0, 2], 1));
        let (start, end) = lift_boundaries(&mut surface, &range).unwrap();
        let leaves: Vec<_> = text_leaves_between(&surface, start, end)
            .into_iter()
            .map(|n| surface.text(n).unwrap().to_string())
            .collect();
        assert_eq!(leaves, vec!["b", "cd", "e"]);
    }

    #[test]
    fn test_insert_at_returns_following_slot() {
        let mut surface = Surface::from_markup("<p>ab</p>");
        let range = range_in(&surface, (&[0, 0], 1), (&[0, 0], 1));
        let slot = delete_contents(&mut surface, &range).unwrap();
        let br = surface.create_element("br");
        let after = insert_at(&mut surface, slot, &[br]);
        assert_eq!(after.index, slot.index + 1);
        assert_eq!(surface.inner_html(), "<p>a<br>b</p>");
    }

    #[test]
    fn test_split_up_to_copies_attributes() {
        let mut surface = Surface::from_markup("<p class=\"lead\"><b>abc</b>d</p>");
        let range = range_in(&surface, (&[0, 0, 0], 1), (&[0, 0, 0], 1));
        let slot = delete_contents(&mut surface, &range).unwrap();
        let p = surface.node_at_path(&[0]).unwrap();

        let between = split_up_to(&mut surface, slot, p);
        assert_eq!(between, ChildSlot { parent: surface.root(), index: 1 });
        assert_eq!(
            surface.inner_html(),
            "<p class=\"lead\"><b>a</b></p><p class=\"lead\"><b>bc</b>d</p>"
        );
    }

    #[test]
    fn test_split_at_edges_moves_past() {
        let mut surface = Surface::from_markup("<p><b>ab</b></p>");
        let b = surface.node_at_path(&[0, 0]).unwrap();
        let p = surface.node_at_path(&[0]).unwrap();

        let before = split_up_to(&mut surface, ChildSlot { parent: b, index: 0 }, p);
        assert_eq!(before, ChildSlot { parent: surface.root(), index: 0 });
        let after = split_up_to(&mut surface, ChildSlot { parent: b, index: 1 }, p);
        assert_eq!(after, ChildSlot { parent: surface.root(), index: 1 });
        assert_eq!(surface.inner_html(), "<p><b>ab</b></p>");
    }
}
