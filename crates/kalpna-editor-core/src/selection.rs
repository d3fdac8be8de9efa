//! Selection persistence.
//!
//! The [`SelectionManager`] keeps a copy of the last selection captured inside
//! the surface. Captured ranges are value snapshots; every consumer goes
//! through [`validate`], which re-resolves the anchors against the current
//! tree and turns a stale range into `None` instead of an error.

use crate::dom::Surface;
use crate::types::{Anchor, PathPoint, PathRange, SelectionRange};

/// Holds the saved range.
#[derive(Clone, Debug, Default)]
pub struct SelectionManager {
    saved: Option<SelectionRange>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the platform's active range if it lies within the surface.
    ///
    /// Returns whether a range was stored. A range outside the surface (or
    /// no range at all) leaves the previously saved range untouched.
    pub fn capture(&mut self, surface: &Surface, active: Option<SelectionRange>) -> bool {
        let Some(range) = active else {
            return false;
        };
        match validate(surface, &range) {
            Some(range) => {
                self.saved = Some(range);
                true
            }
            None => {
                tracing::debug!(target: "kalpna::selection", "ignoring selection outside the surface");
                false
            }
        }
    }

    /// Same as [`capture`](Self::capture) for a range expressed as paths.
    pub fn capture_paths(&mut self, surface: &Surface, active: Option<&PathRange>) -> bool {
        let range = active.and_then(|paths| resolve_paths(surface, paths));
        if range.is_none() && active.is_some() {
            tracing::debug!(target: "kalpna::selection", "selection paths do not resolve in the surface");
        }
        self.capture(surface, range)
    }

    /// The saved range, validated against the current tree.
    ///
    /// A stale range is dropped so later calls do not keep re-checking it.
    pub fn restore(&mut self, surface: &Surface) -> Option<SelectionRange> {
        let saved = self.saved?;
        let valid = validate(surface, &saved);
        if valid.is_none() {
            tracing::debug!(target: "kalpna::selection", "dropping stale saved range");
            self.saved = None;
        }
        valid
    }

    /// The saved range as stored, without validation.
    pub fn saved(&self) -> Option<SelectionRange> {
        self.saved
    }

    pub(crate) fn set_saved(&mut self, range: SelectionRange) {
        self.saved = Some(range);
    }

    pub fn clear(&mut self) {
        self.saved = None;
    }
}

fn anchor_is_valid(surface: &Surface, anchor: &Anchor) -> bool {
    surface.is_attached(anchor.node) && anchor.offset <= surface.node_len(anchor.node)
}

/// Document-order key of a boundary point: the container path followed by
/// the offset. Lexicographic order of keys is document order.
pub(crate) fn point_key(surface: &Surface, anchor: &Anchor) -> Option<Vec<usize>> {
    let mut key = surface.path_of(anchor.node)?;
    key.push(anchor.offset);
    Some(key)
}

/// Re-check a range against the current tree, normalizing a backwards range.
pub fn validate(surface: &Surface, range: &SelectionRange) -> Option<SelectionRange> {
    if !anchor_is_valid(surface, &range.start) || !anchor_is_valid(surface, &range.end) {
        return None;
    }
    let start_key = point_key(surface, &range.start)?;
    let end_key = point_key(surface, &range.end)?;
    if start_key <= end_key {
        Some(*range)
    } else {
        Some(SelectionRange::new(range.end, range.start))
    }
}

pub fn resolve_point(surface: &Surface, point: &PathPoint) -> Option<Anchor> {
    let node = surface.node_at_path(&point.path)?;
    let anchor = Anchor::new(node, point.offset);
    anchor_is_valid(surface, &anchor).then_some(anchor)
}

pub fn resolve_paths(surface: &Surface, paths: &PathRange) -> Option<SelectionRange> {
    let start = resolve_point(surface, &paths.start)?;
    let end = resolve_point(surface, &paths.end)?;
    validate(surface, &SelectionRange::new(start, end))
}

pub fn to_path_point(surface: &Surface, anchor: &Anchor) -> Option<PathPoint> {
    Some(PathPoint::new(surface.path_of(anchor.node)?, anchor.offset))
}

pub fn to_path_range(surface: &Surface, range: &SelectionRange) -> Option<PathRange> {
    Some(PathRange::new(
        to_path_point(surface, &range.start)?,
        to_path_point(surface, &range.end)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_at(surface: &Surface, path: &[usize]) -> crate::dom::NodeId {
        surface.node_at_path(path).unwrap()
    }

    #[test]
    fn test_capture_and_restore() {
        let surface = Surface::from_markup("<p>hello</p>");
        let text = text_at(&surface, &[0, 0]);
        let mut manager = SelectionManager::new();

        let range = SelectionRange::new(Anchor::new(text, 1), Anchor::new(text, 3));
        assert!(manager.capture(&surface, Some(range)));
        assert_eq!(manager.restore(&surface), Some(range));
    }

    #[test]
    fn test_capture_rejects_detached_range() {
        let mut surface = Surface::from_markup("<p>hello</p>");
        let detached = surface.create_text("elsewhere");
        let mut manager = SelectionManager::new();

        let outside = SelectionRange::caret(Anchor::new(detached, 0));
        assert!(!manager.capture(&surface, Some(outside)));
        assert_eq!(manager.saved(), None);
        assert!(!manager.capture(&surface, None));
    }

    #[test]
    fn test_capture_outside_keeps_previous() {
        let mut surface = Surface::from_markup("<p>hello</p>");
        let text = text_at(&surface, &[0, 0]);
        let detached = surface.create_text("x");
        let mut manager = SelectionManager::new();

        let inside = SelectionRange::caret(Anchor::new(text, 2));
        manager.capture(&surface, Some(inside));
        manager.capture(&surface, Some(SelectionRange::caret(Anchor::new(detached, 0))));
        assert_eq!(manager.saved(), Some(inside));
    }

    #[test]
    fn test_restore_drops_stale_range() {
        let mut surface = Surface::from_markup("<p>hello</p>");
        let text = text_at(&surface, &[0, 0]);
        let mut manager = SelectionManager::new();
        manager.capture(&surface, Some(SelectionRange::caret(Anchor::new(text, 2))));

        surface.set_inner_html("<p>replaced</p>");
        assert_eq!(manager.restore(&surface), None);
        assert_eq!(manager.saved(), None);
    }

    #[test]
    fn test_offset_past_end_is_invalid() {
        let surface = Surface::from_markup("<p>hi</p>");
        let text = text_at(&surface, &[0, 0]);
        let range = SelectionRange::caret(Anchor::new(text, 3));
        assert_eq!(validate(&surface, &range), None);
    }

    #[test]
    fn test_backwards_range_is_normalized() {
        let surface = Surface::from_markup("<p>one</p><p>two</p>");
        let first = text_at(&surface, &[0, 0]);
        let second = text_at(&surface, &[1, 0]);

        let backwards = SelectionRange::new(Anchor::new(second, 1), Anchor::new(first, 2));
        let range = validate(&surface, &backwards).unwrap();
        assert_eq!(range.start, Anchor::new(first, 2));
        assert_eq!(range.end, Anchor::new(second, 1));
    }

    #[test]
    fn test_path_conversion_round_trip() {
        let surface = Surface::from_markup("<p>one</p><p>t<b>w</b>o</p>");
        let bold_text = text_at(&surface, &[1, 1, 0]);
        let range = SelectionRange::new(Anchor::new(bold_text, 0), Anchor::new(bold_text, 1));

        let paths = to_path_range(&surface, &range).unwrap();
        assert_eq!(paths.start, PathPoint::new(vec![1, 1, 0], 0));
        assert_eq!(resolve_paths(&surface, &paths), Some(range));

        let mut manager = SelectionManager::new();
        assert!(!manager.capture_paths(&surface, Some(&PathRange::caret(PathPoint::new(vec![9], 0)))));
        assert!(manager.capture_paths(&surface, Some(&paths)));
    }
}
