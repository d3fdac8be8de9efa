//! Core editor types: boundary points, ranges, and their platform-neutral
//! path form.
//!
//! These types are framework-agnostic. The browser layer converts DOM
//! selections into [`PathRange`]s; the core resolves them into
//! [`SelectionRange`]s against its own tree.

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// A boundary point: a container node and an offset inside it.
///
/// For text containers the offset counts chars (NOT UTF-16 units!); for
/// element containers it counts children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub node: NodeId,
    pub offset: usize,
}

impl Anchor {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Immutable snapshot of a selection at capture time.
///
/// `start` always precedes (or equals) `end` in document order. A range is
/// only meaningful while both anchor nodes are attached to the surface; use
/// [`crate::selection::validate`] before trusting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: Anchor,
    pub end: Anchor,
    collapsed: bool,
}

impl SelectionRange {
    pub fn new(start: Anchor, end: Anchor) -> Self {
        Self {
            start,
            end,
            collapsed: start == end,
        }
    }

    /// Create a collapsed range (caret).
    pub fn caret(at: Anchor) -> Self {
        Self::new(at, at)
    }

    /// Check if the range is collapsed (empty, caret only).
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }
}

/// A boundary point addressed by child indices from the surface root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPoint {
    pub path: Vec<usize>,
    pub offset: usize,
}

impl PathPoint {
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// A selection in path form, exchanged with the platform layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRange {
    pub start: PathPoint,
    pub end: PathPoint,
}

impl PathRange {
    pub fn new(start: PathPoint, end: PathPoint) -> Self {
        Self { start, end }
    }

    pub fn caret(at: PathPoint) -> Self {
        Self {
            start: at.clone(),
            end: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Viewport rectangle of a selection, as reported by the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}
