//! Render-ready markup for downstream consumers.

use crate::dom::{NodeId, Surface, is_block, is_void};

const CELL_TAGS: &[&str] = &["td", "th"];

/// Current content with empty wrappers stripped. The live surface is left
/// untouched.
pub fn export_markup(surface: &Surface) -> String {
    let mut copy = surface.clone();
    let mut removed = 0;
    loop {
        let empty: Vec<NodeId> = copy
            .descendants(copy.root())
            .into_iter()
            .filter(|id| is_empty_wrapper(&copy, *id))
            .collect();
        if empty.is_empty() {
            break;
        }
        for id in empty {
            // An ancestor in the same batch may already have taken it.
            if copy.is_attached(id) {
                copy.remove(id);
                removed += 1;
            }
        }
    }
    tracing::debug!(target: "kalpna::export", removed, "exported markup");
    copy.inner_html()
}

fn is_empty_wrapper(surface: &Surface, id: NodeId) -> bool {
    let Some(tag) = surface.tag(id) else {
        return false;
    };
    if is_void(tag) || CELL_TAGS.contains(&tag) || has_media(surface, id) {
        return false;
    }
    let text = surface.text_content(id);
    if is_block(tag) {
        text.trim().is_empty()
    } else {
        text.is_empty()
    }
}

fn has_media(surface: &Surface, id: NodeId) -> bool {
    surface.descendants(id).into_iter().any(|d| {
        surface
            .tag(d)
            .is_some_and(|t| (is_void(t) && t != "br") || CELL_TAGS.contains(&t))
    })
}
