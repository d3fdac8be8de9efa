//! Paste sanitizer.
//!
//! Pasted markup (mostly word-processor output) is parsed into a detached
//! [`Surface`], run through an ordered list of named passes and serialized
//! again. The passes are not commutative; [`PASSES`] is the order.
//!
//! Sanitizing is best-effort and never fails. Markup it does not recognize is
//! passed through, since losing text is worse than imperfect cleanup.

mod passes;
pub mod policy;


pub use passes::{
    collapse_break_runs, collapse_spaces, drop_interblock_whitespace, merge_script_spans,
    nbsp_to_space, remove_denylisted, remove_empty_elements, scrub_attributes,
    strip_boundary_breaks, strip_invisible_chars, unwrap_content_controls,
};

use crate::dom::Surface;

/// A named tree rewrite.
pub type Pass = fn(&mut Surface);

pub const PASSES: &[(&str, Pass)] = &[
    // Producer noise.
    ("unwrap_content_controls", unwrap_content_controls),
    ("remove_denylisted", remove_denylisted),
    ("scrub_attributes", scrub_attributes),
    // Whitespace and line breaks.
    ("remove_empty_elements", remove_empty_elements),
    ("collapse_break_runs", collapse_break_runs),
    ("strip_boundary_breaks", strip_boundary_breaks),
    ("drop_interblock_whitespace", drop_interblock_whitespace),
    ("nbsp_to_space", nbsp_to_space),
    ("collapse_spaces", collapse_spaces),
    // Script repair. Invisible characters go after the space collapse, so
    // stripping must not leave a doubled space behind.
    ("strip_invisible_chars", strip_invisible_chars),
    ("merge_script_spans", merge_script_spans),
];

/// Run every pass over `surface`. Adjacent text nodes are joined after each
/// pass so every pass sees normalized text.
pub fn clean_tree(surface: &mut Surface) {
    let root = surface.root();
    for (name, pass) in PASSES {
        pass(surface);
        surface.normalize_text(root);
        tracing::trace!(target: "kalpna::paste", pass = *name, "pass done");
    }
}

/// Unwrapping can leave nesting the parser reads back differently, which the
/// next clean then tidies. A few rounds always settle.
const MAX_SETTLE_ROUNDS: usize = 4;

fn clean_markup(markup: &str) -> String {
    let mut surface = Surface::from_markup(markup);
    clean_tree(&mut surface);
    surface.inner_html()
}

/// Sanitize a markup payload into the allowed subset. The result is a fixed
/// point: sanitizing it again changes nothing.
pub fn sanitize(markup: &str) -> String {
    let mut cleaned = clean_markup(markup);
    for round in 0..MAX_SETTLE_ROUNDS {
        let again = clean_markup(&cleaned);
        if again == cleaned {
            break;
        }
        tracing::trace!(target: "kalpna::paste", round, "cleaned markup reparsed differently");
        cleaned = again;
    }
    tracing::debug!(
        target: "kalpna::paste",
        before = markup.len(),
        after = cleaned.len(),
        "sanitized pasted markup"
    );
    cleaned
}

/// Whether `s` contains something that starts a tag: `<` followed by a
/// letter, `/` or `!`.
pub fn has_tag_marker(s: &str) -> bool {
    s.as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/' || w[1] == b'!'))
}

/// What a paste event carries, after choosing between its flavors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PastePayload {
    /// Markup to sanitize and insert.
    Markup(String),
    /// Literal text, inserted as is.
    Text(String),
}

/// Prefer markup when it contains a tag, otherwise fall back to plain text.
pub fn choose_payload(html: Option<&str>, text: Option<&str>) -> Option<PastePayload> {
    let html = html.filter(|h| !h.is_empty());
    if let Some(html) = html.filter(|h| has_tag_marker(h)) {
        return Some(PastePayload::Markup(html.to_string()));
    }
    text.filter(|t| !t.is_empty())
        .or(html)
        .map(|t| PastePayload::Text(t.to_string()))
}
