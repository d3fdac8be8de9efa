//! The normalization passes, in the order [`super::PASSES`] runs them.
//!
//! Each pass is a tree rewrite that assumes the passes before it have run and
//! must not undo what they established; together they reach a fixed point in
//! one run.

use crate::css;
use crate::dom::{NodeId, Surface, is_block, is_void};

use super::policy::{
    ALLOWED_ALIGNMENTS, CONTENT_CONTROL_TAGS, Disposition, KEEP_EMPTY, PRESERVE_WHITESPACE,
    disposition, is_blank, is_center_class, is_complex_script, is_invisible,
    is_stripped_attribute,
};

fn elements(surface: &Surface) -> Vec<NodeId> {
    surface
        .descendants(surface.root())
        .into_iter()
        .filter(|n| surface.is_element(*n))
        .collect()
}

/// Every element that can hold children, the surface root included.
fn containers(surface: &Surface) -> Vec<NodeId> {
    let mut out = vec![surface.root()];
    out.extend(elements(surface));
    out
}

fn text_nodes(surface: &Surface) -> Vec<NodeId> {
    surface
        .descendants(surface.root())
        .into_iter()
        .filter(|n| surface.is_text(*n))
        .collect()
}

fn is_blank_text(surface: &Surface, node: NodeId) -> bool {
    surface.text(node).is_some_and(is_blank)
}

fn is_block_element(surface: &Surface, node: NodeId) -> bool {
    surface.tag(node).is_some_and(is_block)
}

fn is_block_container(surface: &Surface, node: NodeId) -> bool {
    node == surface.root() || is_block_element(surface, node)
}

fn preserves_whitespace(surface: &Surface, node: NodeId) -> bool {
    surface.closest_tag(node, PRESERVE_WHITESPACE).is_some()
}

/// Nearest sibling in the given direction that is not blank text.
fn significant_sibling(surface: &Surface, node: NodeId, forward: bool) -> Option<NodeId> {
    let mut current = node;
    loop {
        current = if forward {
            surface.next_sibling(current)?
        } else {
            surface.prev_sibling(current)?
        };
        if !is_blank_text(surface, current) {
            return Some(current);
        }
    }
}

/// Replace structured content controls with a span holding their text.
pub fn unwrap_content_controls(surface: &mut Surface) {
    for node in elements(surface) {
        if !surface.is_attached(node) {
            continue;
        }
        if !surface
            .tag(node)
            .is_some_and(|t| CONTENT_CONTROL_TAGS.contains(&t))
        {
            continue;
        }
        let text = surface.text_content(node);
        let span = surface.create_element_with_text("span", &[], &text);
        surface.replace(node, span);
    }
}

/// Drop or unwrap producer-namespaced elements.
pub fn remove_denylisted(surface: &mut Surface) {
    for node in elements(surface) {
        if !surface.is_attached(node) {
            continue;
        }
        let Some(tag) = surface.tag(node).map(str::to_owned) else {
            continue;
        };
        let has_text = !is_blank(&surface.text_content(node));
        match disposition(&tag, has_text) {
            Disposition::Drop => surface.remove(node),
            Disposition::Unwrap => surface.unwrap(node),
            Disposition::Keep => {}
        }
    }
}

/// Remove language, class, handler and namespaced attributes, and reduce
/// inline style to an allowed alignment. A centering class becomes an
/// explicit `text-align: center`.
pub fn scrub_attributes(surface: &mut Surface) {
    for node in elements(surface) {
        let Some(el) = surface.element_mut(node) else {
            continue;
        };
        let centered = el
            .attr("class")
            .is_some_and(|class| class.split_whitespace().any(is_center_class));
        let declarations = el.attr("style").map(css::parse_declarations).unwrap_or_default();

        el.attrs
            .retain(|(name, _)| !is_stripped_attribute(name) && name.as_str() != "style");

        let mut alignment = declarations
            .into_iter()
            .filter(|(name, _)| name == "text-align")
            .map(|(_, value)| value.to_ascii_lowercase())
            .filter(|value| ALLOWED_ALIGNMENTS.contains(&value.as_str()))
            .last();
        if centered {
            alignment = Some("center".to_string());
        }
        if let Some(alignment) = alignment {
            el.set_attr("style", format!("text-align: {alignment};"));
        }
    }
}

/// Delete zero-width and other invisible characters, joining the characters
/// on either side. Runs after [`collapse_spaces`], so spaces that end up
/// adjacent are collapsed again outside preformatted blocks.
pub fn strip_invisible_chars(surface: &mut Surface) {
    for node in text_nodes(surface) {
        let Some(text) = surface.text(node) else {
            continue;
        };
        if !text.chars().any(is_invisible) {
            continue;
        }
        let mut cleaned: String = text.chars().filter(|c| !is_invisible(*c)).collect();
        if !preserves_whitespace(surface, node) {
            cleaned = collapse_whitespace(&cleaned);
        }
        if cleaned.is_empty() {
            surface.remove(node);
        } else {
            surface.set_text(node, cleaned);
        }
    }
}

pub fn nbsp_to_space(surface: &mut Surface) {
    for node in text_nodes(surface) {
        let Some(text) = surface.text(node) else {
            continue;
        };
        if text.contains('\u{A0}') {
            let replaced = text.replace('\u{A0}', " ");
            surface.set_text(node, replaced);
        }
    }
}

fn has_content(surface: &Surface, node: NodeId) -> bool {
    if !is_blank(&surface.text_content(node)) {
        return true;
    }
    surface.descendants(node).into_iter().any(|d| {
        surface
            .tag(d)
            .is_some_and(|t| (is_void(t) && t != "br") || KEEP_EMPTY.contains(&t))
    })
}

/// Remove elements holding nothing but whitespace, invisible characters and
/// line breaks. Inline elements that held real whitespace leave a single
/// space behind.
pub fn remove_empty_elements(surface: &mut Surface) {
    // Reverse document order visits children before their parents.
    let mut nodes = elements(surface);
    nodes.reverse();
    for node in nodes {
        if !surface.is_attached(node) {
            continue;
        }
        let Some(tag) = surface.tag(node) else {
            continue;
        };
        if is_void(tag) || KEEP_EMPTY.contains(&tag) || has_content(surface, node) {
            continue;
        }
        let block = is_block(tag);
        if !block && surface.text_content(node).chars().any(char::is_whitespace) {
            let space = surface.create_text(" ");
            surface.replace(node, space);
        } else {
            surface.remove(node);
        }
    }
}

fn is_br(surface: &Surface, node: NodeId) -> bool {
    surface.tag(node) == Some("br")
}

/// Keep only the first `<br>` of a run (blank text between them counts as
/// part of the run).
pub fn collapse_break_runs(surface: &mut Surface) {
    for parent in containers(surface) {
        let mut in_run = false;
        for child in surface.children(parent).to_vec() {
            if is_br(surface, child) {
                if in_run {
                    surface.remove(child);
                } else {
                    in_run = true;
                }
            } else if !is_blank_text(surface, child) {
                in_run = false;
            }
        }
    }
}

/// Remove `<br>`s next to a block boundary: first or last in a block, or
/// directly beside a block element.
pub fn strip_boundary_breaks(surface: &mut Surface) {
    let breaks: Vec<NodeId> = elements(surface)
        .into_iter()
        .filter(|n| is_br(surface, *n))
        .collect();
    for br in breaks {
        let Some(parent) = surface.parent(br) else {
            continue;
        };
        let prev = significant_sibling(surface, br, false);
        let next = significant_sibling(surface, br, true);
        let at_edge = is_block_container(surface, parent) && (prev.is_none() || next.is_none());
        let beside_block = prev.is_some_and(|n| is_block_element(surface, n))
            || next.is_some_and(|n| is_block_element(surface, n));
        if at_edge || beside_block {
            surface.remove(br);
        }
    }
}

/// Drop blank text that only separates blocks (source indentation, CRLFs).
pub fn drop_interblock_whitespace(surface: &mut Surface) {
    for node in text_nodes(surface) {
        if !is_blank_text(surface, node) || preserves_whitespace(surface, node) {
            continue;
        }
        let Some(parent) = surface.parent(node) else {
            continue;
        };
        let parent_is_block = is_block_container(surface, parent);
        let side_ok = |sibling: Option<NodeId>| match sibling {
            Some(n) => is_block_element(surface, n),
            None => parent_is_block,
        };
        if side_ok(surface.prev_sibling(node)) && side_ok(surface.next_sibling(node)) {
            surface.remove(node);
        }
    }
}

fn is_script_span(surface: &Surface, node: NodeId) -> bool {
    if surface.tag(node) != Some("span") {
        return false;
    }
    let children = surface.children(node);
    if children.is_empty() || !children.iter().all(|c| surface.is_text(*c)) {
        return false;
    }
    let text = surface.text_content(node);
    !text.is_empty() && text.chars().all(is_complex_script)
}

/// Merge adjacent spans that each hold only complex-script text, keeping the
/// first span's attributes.
pub fn merge_script_spans(surface: &mut Surface) {
    for parent in containers(surface) {
        if !surface.contains(parent) {
            continue;
        }
        let mut index = 0;
        loop {
            let children = surface.children(parent);
            let (Some(first), Some(second)) =
                (children.get(index).copied(), children.get(index + 1).copied())
            else {
                break;
            };
            if is_script_span(surface, first) && is_script_span(surface, second) {
                for child in surface.children(second).to_vec() {
                    surface.append_child(first, child);
                }
                surface.remove(second);
                surface.normalize_text(first);
                tracing::trace!(target: "kalpna::paste", "merged fragmented script spans");
            } else {
                index += 1;
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    collapsed
}

/// Collapse whitespace runs to a single space outside preformatted blocks.
pub fn collapse_spaces(surface: &mut Surface) {
    let root = surface.root();
    surface.normalize_text(root);
    for node in text_nodes(surface) {
        if preserves_whitespace(surface, node) {
            continue;
        }
        let Some(text) = surface.text(node) else {
            continue;
        };
        let collapsed = collapse_whitespace(text);
        if collapsed != text {
            surface.set_text(node, collapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(markup: &str, pass: fn(&mut Surface)) -> String {
        let mut surface = Surface::from_markup(markup);
        pass(&mut surface);
        surface.inner_html()
    }

    #[test]
    fn test_content_controls_become_spans() {
        assert_eq!(
            run(
                "<p><w:sdt id=\"1\"><w:sdtcontent><b>Name</b></w:sdtcontent></w:sdt></p>",
                unwrap_content_controls
            ),
            "<p><span>Name</span></p>"
        );
    }

    #[test]
    fn test_denylist_drops_and_unwraps() {
        assert_eq!(
            run(
                "<p>A<o:p>&nbsp;</o:p><st1:city>Pune</st1:city><v:shape id=\"x\"></v:shape></p>",
                remove_denylisted
            ),
            "<p>APune</p>"
        );
    }

    #[test]
    fn test_scrub_keeps_only_alignment() {
        assert_eq!(
            run(
                "<p class=\"MsoNormal\" lang=\"HI\" onclick=\"x()\" style=\"TEXT-ALIGN: RIGHT; font-family: Mangal; mso-bidi-font-size: 11pt\">x</p>",
                scrub_attributes
            ),
            "<p style=\"text-align: right;\">x</p>"
        );
        assert_eq!(
            run("<p class=\"MsoTitleCenter\" style=\"margin: 0\">x</p>", scrub_attributes),
            "<p style=\"text-align: center;\">x</p>"
        );
        assert_eq!(
            run("<p style=\"text-align: justify\"><a href=\"u\" v:shapes=\"s\">x</a></p>", scrub_attributes),
            "<p><a href=\"u\">x</a></p>"
        );
    }

    #[test]
    fn test_invisible_chars_join_script_text() {
        assert_eq!(
            run("<p>क\u{200D}ष\u{FEFF}</p>", strip_invisible_chars),
            "<p>कष</p>"
        );
    }

    #[test]
    fn test_stripping_does_not_double_spaces() {
        assert_eq!(
            run("<p>a \u{200B} b</p><pre>a \u{200B} b</pre>", strip_invisible_chars),
            "<p>a b</p><pre>a  b</pre>"
        );
    }

    #[test]
    fn test_invisible_only_elements_are_empty() {
        assert_eq!(
            run("<p>a<span>\u{200B}</span>b<i>\u{200B} </i>c</p><p>\u{FEFF}</p>", remove_empty_elements),
            "<p>ab c</p>"
        );
    }

    #[test]
    fn test_empty_elements() {
        assert_eq!(
            run(
                "<p> <br></p><p>a<span> </span>b<i></i></p><div><img src=\"x\"></div><table><tbody><tr><td></td></tr></tbody></table>",
                remove_empty_elements
            ),
            "<p>a b</p><div><img src=\"x\"></div><table><tbody><tr><td></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_break_runs_and_boundaries() {
        let mut surface = Surface::from_markup("<br><p>a<br><br> <br>b<br></p><br><div>c</div>");
        collapse_break_runs(&mut surface);
        assert_eq!(
            surface.inner_html(),
            "<br><p>a<br> b<br></p><br><div>c</div>"
        );
        strip_boundary_breaks(&mut surface);
        assert_eq!(surface.inner_html(), "<p>a<br> b</p><div>c</div>");
    }

    #[test]
    fn test_interblock_whitespace() {
        assert_eq!(
            run(
                "\r\n<p>a</p>\r\n<p><b>x</b> <i>y</i></p>\n<pre>\n</pre>",
                drop_interblock_whitespace
            ),
            "<p>a</p><p><b>x</b> <i>y</i></p><pre>\n</pre>"
        );
    }

    #[test]
    fn test_merge_script_spans_keeps_first_style() {
        assert_eq!(
            run(
                "<p><span style=\"text-align: center;\">नम</span><span style=\"text-align: left;\">स्ते</span><span>!</span></p>",
                merge_script_spans
            ),
            "<p><span style=\"text-align: center;\">नमस्ते</span><span>!</span></p>"
        );
    }

    #[test]
    fn test_mixed_script_spans_are_not_merged() {
        let markup = "<p><span>नम</span><span>abc</span></p>";
        assert_eq!(run(markup, merge_script_spans), markup);
    }

    #[test]
    fn test_collapse_spaces_skips_pre() {
        assert_eq!(
            run("<p>a  \r\n b</p><pre>x   y</pre>", collapse_spaces),
            "<p>a b</p><pre>x   y</pre>"
        );
    }
}
