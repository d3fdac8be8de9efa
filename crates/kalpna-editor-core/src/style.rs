//! Inline style application.
//!
//! A style operation either patches an existing inline span that already
//! encloses the saved range (reuse) or wraps the range in fresh spans. It
//! never splits block elements, so text outside the affected run keeps its
//! packaging.

use crate::dom::{NodeId, Surface};
use crate::range::{lift_boundaries, nodes_between, wrap_between};
use crate::selection::SelectionManager;
use crate::types::{Anchor, SelectionRange};

/// Font sizes offered by the toolbar picker.
pub const FONT_SIZES: &[&str] = &[
    "8px", "10px", "12px", "14px", "18px", "24px", "36px", "48px", "72px", "Default",
];

/// Inline presentation properties the engine knows how to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleProperty {
    FontSize,
    LineHeight,
    Color,
    TextDecoration,
}

impl StyleProperty {
    pub fn css_name(&self) -> &'static str {
        match self {
            Self::FontSize => "font-size",
            Self::LineHeight => "line-height",
            Self::Color => "color",
            Self::TextDecoration => "text-decoration",
        }
    }

    /// Multi-valued properties toggle one token instead of overwriting.
    pub fn is_token_list(&self) -> bool {
        matches!(self, Self::TextDecoration)
    }
}

/// Whether `value` means "clear this property".
pub fn is_unset_value(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("default") || value == "unset"
}

/// What a style operation did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleOutcome {
    /// Nothing to style (no saved range, collapsed, or empty run).
    NoOp,
    /// An enclosing span was patched in place.
    Patched(NodeId),
    /// The range was wrapped; includes spans reused by the per-leaf path.
    Wrapped(Vec<NodeId>),
    /// The property was removed from spans inside the range.
    Cleared,
}

fn is_style_span(surface: &Surface, id: NodeId) -> bool {
    id != surface.root() && surface.tag(id) == Some("span")
}

/// Set (or toggle, for token lists) `property` on one element.
fn patch(surface: &mut Surface, id: NodeId, property: StyleProperty, value: &str) {
    let name = property.css_name();
    if is_unset_value(value) {
        surface.remove_style_property(id, name);
        return;
    }
    let value = value.trim();
    if !property.is_token_list() {
        surface.set_style_property(id, name, value);
        return;
    }

    let current = surface.style_property(id, name).unwrap_or_default();
    let mut tokens: Vec<&str> = current
        .split_whitespace()
        .filter(|t| *t != "none")
        .collect();
    match tokens.iter().position(|t| *t == value) {
        Some(i) => {
            tokens.remove(i);
        }
        None => tokens.push(value),
    }
    if tokens.is_empty() {
        surface.remove_style_property(id, name);
    } else {
        surface.set_style_property(id, name, &tokens.join(" "));
    }
}

/// Apply `property: value` to the saved range.
pub fn apply_style(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    property: StyleProperty,
    value: &str,
) -> StyleOutcome {
    let Some(range) = selection.restore(surface) else {
        tracing::debug!(target: "kalpna::style", "no saved range, style ignored");
        return StyleOutcome::NoOp;
    };
    if range.is_collapsed() {
        return StyleOutcome::NoOp;
    }

    let start_el = surface.nearest_element(range.start.node);
    let end_el = surface.nearest_element(range.end.node);
    if let (Some(start_el), Some(end_el)) = (start_el, end_el) {
        if start_el == end_el && is_style_span(surface, start_el) {
            tracing::trace!(target: "kalpna::style", property = property.css_name(), "patching enclosing span");
            patch(surface, start_el, property, value);
            return StyleOutcome::Patched(start_el);
        }
    }

    let Some((start, end)) = lift_boundaries(surface, &range) else {
        return StyleOutcome::NoOp;
    };

    if is_unset_value(value) {
        let spans: Vec<NodeId> = nodes_between(surface, start, end)
            .into_iter()
            .flat_map(|n| surface.descendants(n).into_iter().chain([n]))
            .filter(|n| is_style_span(surface, *n))
            .collect();
        for span in spans {
            patch(surface, span, property, value);
        }
        return StyleOutcome::Cleared;
    }

    let wrappers = wrap_between(surface, start, end, is_style_span, |s| {
        s.create_element("span")
    });
    let (Some(first), Some(last)) = (wrappers.first().copied(), wrappers.last().copied()) else {
        return StyleOutcome::NoOp;
    };
    for span in &wrappers {
        patch(surface, *span, property, value);
    }
    let last_len = surface.children(last).len();
    selection.set_saved(SelectionRange::new(
        Anchor::new(first, 0),
        Anchor::new(last, last_len),
    ));
    tracing::trace!(target: "kalpna::style", property = property.css_name(), spans = wrappers.len(), "wrapped range");
    StyleOutcome::Wrapped(wrappers)
}

pub fn apply_font_size(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    size: &str,
) -> StyleOutcome {
    apply_style(surface, selection, StyleProperty::FontSize, size)
}

pub fn apply_line_height_value(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    value: &str,
) -> StyleOutcome {
    apply_style(surface, selection, StyleProperty::LineHeight, value)
}

pub fn apply_color_live(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    color: &str,
) -> StyleOutcome {
    apply_style(surface, selection, StyleProperty::Color, color)
}

/// Toggle one decoration token (`underline`, `line-through`, ...).
pub fn apply_text_decoration(
    surface: &mut Surface,
    selection: &mut SelectionManager,
    token: &str,
) -> StyleOutcome {
    apply_style(surface, selection, StyleProperty::TextDecoration, token)
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
    fn test_collapsed_selection_is_noop() {
        let mut surface = Surface::from_markup("<p>hello</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 2), (&[0, 0], 2));

        let before = surface.inner_html();
        let outcome = apply_font_size(&mut surface, &mut manager, "18px");
        assert_eq!(outcome, StyleOutcome::NoOp);
        assert_eq!(surface.inner_html(), before);
    }

    #[test]
    fn test_no_saved_range_is_noop() {
        let mut surface = Surface::from_markup("<p>hello</p>");
        let mut manager = SelectionManager::new();
        assert_eq!(
            apply_color_live(&mut surface, &mut manager, "red"),
            StyleOutcome::NoOp
        );
        assert_eq!(surface.inner_html(), "<p>hello</p>");
    }

    #[test]
    fn test_wrap_inside_paragraph() {
        let mut surface = Surface::from_markup("<p>hello world</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 6), (&[0, 0], 11));

        apply_font_size(&mut surface, &mut manager, "18px");
        assert_eq!(
            surface.inner_html(),
            "<p>hello <span style=\"font-size: 18px;\">world</span></p>"
        );
    }

    #[test]
    fn test_repeated_operation_reuses_span() {
        let mut surface = Surface::from_markup("<p>hello world</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 0), (&[0, 0], 5));

        apply_font_size(&mut surface, &mut manager, "18px");
        let outcome = apply_color_live(&mut surface, &mut manager, "red");
        assert!(matches!(outcome, StyleOutcome::Patched(_)));
        assert_eq!(
            surface.inner_html(),
            "<p><span style=\"font-size: 18px; color: red;\">hello</span> world</p>"
        );

        apply_font_size(&mut surface, &mut manager, "24px");
        assert_eq!(
            surface.inner_html(),
            "<p><span style=\"font-size: 24px; color: red;\">hello</span> world</p>"
        );
    }

    #[test]
    fn test_unset_clears_property() {
        let mut surface = Surface::from_markup("<p><span style=\"font-size: 18px;\">hi</span></p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0, 0], 0), (&[0, 0, 0], 2));

        apply_font_size(&mut surface, &mut manager, "Default");
        assert_eq!(surface.inner_html(), "<p><span>hi</span></p>");
    }

    #[test]
    fn test_decoration_toggles_tokens() {
        let mut surface = Surface::from_markup("<p><span>hi</span></p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0, 0], 0), (&[0, 0, 0], 2));

        apply_text_decoration(&mut surface, &mut manager, "underline");
        apply_text_decoration(&mut surface, &mut manager, "line-through");
        assert_eq!(
            surface.inner_html(),
            "<p><span style=\"text-decoration: underline line-through;\">hi</span></p>"
        );

        apply_text_decoration(&mut surface, &mut manager, "underline");
        assert_eq!(
            surface.inner_html(),
            "<p><span style=\"text-decoration: line-through;\">hi</span></p>"
        );
        apply_text_decoration(&mut surface, &mut manager, "line-through");
        assert_eq!(surface.inner_html(), "<p><span>hi</span></p>");
    }

    #[test]
    fn test_cross_paragraph_wraps_each_leaf() {
        let mut surface = Surface::from_markup("<p>one</p><p>two</p>");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0, 0], 1), (&[1, 0], 2));

        let outcome = apply_color_live(&mut surface, &mut manager, "blue");
        assert!(matches!(outcome, StyleOutcome::Wrapped(ref spans) if spans.len() == 2));
        assert_eq!(
            surface.inner_html(),
            "<p>o<span style=\"color: blue;\">ne</span></p><p><span style=\"color: blue;\">tw</span>o</p>"
        );
        assert_eq!(surface.text_content(surface.root()), "onetwo");

        // Repeating reuses both spans instead of nesting new ones.
        apply_color_live(&mut surface, &mut manager, "green");
        assert_eq!(
            surface.inner_html(),
            "<p>o<span style=\"color: green;\">ne</span></p><p><span style=\"color: green;\">tw</span>o</p>"
        );
    }

    #[test]
    fn test_loose_text_at_surface_root() {
        let mut surface = Surface::from_markup("plain text");
        let mut manager = SelectionManager::new();
        select(&surface, &mut manager, (&[0], 0), (&[0], 5));

        apply_line_height_value(&mut surface, &mut manager, "1.5");
        assert_eq!(
            surface.inner_html(),
            "<span style=\"line-height: 1.5;\">plain</span> text"
        );
    }
}
