//! The fixed rule set applied to pasted markup.

/// Word-processor elements dropped together with their content.
pub const DROP_TAGS: &[&str] = &["o:p", "w:sdtpr", "w:listitem", "w:tblpr", "xml"];

/// Wrappers removed while keeping their children (they wrap visible text).
pub const UNWRAP_TAGS: &[&str] = &["w:smarttag", "o:smarttagtype", "w:tbl", "w:tr", "w:tc"];

/// Smart-tag namespaces; any element in them is unwrapped.
pub const UNWRAP_PREFIXES: &[&str] = &["st1:", "st2:"];

/// Producer namespaces: dropped when they hold no text, unwrapped otherwise.
pub const PRODUCER_PREFIXES: &[&str] = &["o:", "v:", "w:"];

/// Structured content controls, replaced by a span with their text.
pub const CONTENT_CONTROL_TAGS: &[&str] = &["w:sdt", "w:sdtcontent"];

/// Attributes removed from every element.
pub const STRIPPED_ATTRIBUTES: &[&str] = &["lang", "xml:lang", "class"];

/// The only style declarations that survive.
pub const ALLOWED_ALIGNMENTS: &[&str] = &["left", "center", "right"];

/// Zero-width and other invisible separators.
pub const INVISIBLE_CHARS: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}', '\u{200E}',
    '\u{200F}', '\u{180E}',
];

/// Elements whose whitespace is significant.
pub const PRESERVE_WHITESPACE: &[&str] = &["pre", "textarea"];

/// Table cells are kept even when empty.
pub const KEEP_EMPTY: &[&str] = &["td", "th"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Drop,
    Unwrap,
}

/// What the denylist says about an element.
pub fn disposition(tag: &str, has_text: bool) -> Disposition {
    if DROP_TAGS.contains(&tag) {
        return Disposition::Drop;
    }
    if UNWRAP_TAGS.contains(&tag) || UNWRAP_PREFIXES.iter().any(|p| tag.starts_with(p)) {
        return Disposition::Unwrap;
    }
    if PRODUCER_PREFIXES.iter().any(|p| tag.starts_with(p)) {
        return if has_text {
            Disposition::Unwrap
        } else {
            Disposition::Drop
        };
    }
    Disposition::Keep
}

/// Whether an attribute is removed by the scrub.
pub fn is_stripped_attribute(name: &str) -> bool {
    STRIPPED_ATTRIBUTES.contains(&name) || name.starts_with("on") || name.contains(':')
}

/// A class token asking for centered text (`center`, `MsoCenter`, `TitleCenter`).
pub fn is_center_class(token: &str) -> bool {
    token.to_ascii_lowercase().ends_with("center")
}

/// Devanagari block, the script most often fragmented by producers.
pub fn is_complex_script(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

pub fn is_invisible(c: char) -> bool {
    INVISIBLE_CHARS.contains(&c)
}

/// Nothing but whitespace and invisible characters.
pub fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace() || is_invisible(c))
}
