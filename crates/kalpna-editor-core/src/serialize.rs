//! Markup serializer, matching what browsers produce for `innerHTML`.

use crate::dom::{Element, NodeId, NodeKind, Surface, is_void};
use crate::parse::RAW_TEXT_ELEMENTS;

pub(crate) fn write_node(surface: &Surface, id: NodeId, out: &mut String) {
    match surface.kind(id) {
        Some(NodeKind::Text(text)) => {
            let raw = surface
                .parent(id)
                .and_then(|p| surface.tag(p))
                .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
            if raw {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        Some(NodeKind::Element(el)) => {
            write_start_tag(el, out);
            if is_void(&el.tag) {
                return;
            }
            for child in surface.children(id) {
                write_node(surface, *child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        None => {}
    }
}

pub(crate) fn write_start_tag(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
}

pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
