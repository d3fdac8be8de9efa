//! Lenient markup parser.
//!
//! Builds nodes straight into a [`Surface`] and never fails: anything it
//! cannot make sense of is kept as text or skipped. It follows the browser's
//! body insertion rules closely enough that markup read back from a live
//! element and markup built by the editor agree:
//!
//! - comments, doctypes, `<![if ...]>`/`<![endif]>` markers and processing
//!   instructions are dropped
//! - [`RAW_TEXT_ELEMENTS`] hold raw text, [`RCDATA_ELEMENTS`] hold text with
//!   character references
//! - void elements never take children; a self-closing slash closes any tag
//! - block start tags close an open `p`, a heading closes an open heading,
//!   `li`/`dd`/`dt` close an open item and `a` closes an open `a`
//! - table parts are only accepted inside a `table`, and a missing `tbody`
//!   or `tr` is implied
//! - a stray `</p>` becomes an empty paragraph; other unmatched end tags are
//!   ignored
//! - document chrome (`head`, `meta`, `title`, `script`, `style`, `link`) is
//!   removed and `html`/`body` are unwrapped
//!
//! Serializer output parses back into the same tree.

use smol_str::SmolStr;

use crate::dom::{NodeId, Surface, is_void};

/// Text up to the matching end tag is kept verbatim.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];
/// Text up to the matching end tag, with character references decoded.
pub(crate) const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// Start tags that close an open `p` first.
pub(crate) const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p",
    "plaintext", "pre", "search", "section", "summary", "table", "ul", "xmp",
];

pub(crate) const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// An implicit `p` close does not reach past these.
pub(crate) const BUTTON_SCOPE: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

/// An implicit `li`, `dd` or `dt` close stops at these. `address`, `div` and
/// `p` are walked through.
pub(crate) const ITEM_SCOPE: &[&str] = &[
    "applet", "article", "aside", "blockquote", "body", "button", "caption", "center",
    "colgroup", "details", "dir", "dl", "fieldset", "figcaption", "figure", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "html", "iframe", "listing", "main",
    "marquee", "menu", "nav", "noembed", "noframes", "noscript", "object", "ol", "plaintext",
    "pre", "search", "section", "select", "summary", "table", "tbody", "td", "template",
    "textarea", "tfoot", "th", "thead", "tr", "ul", "xmp",
];

/// Only valid inside a `table`.
pub(crate) const TABLE_PARTS: &[&str] = &[
    "caption", "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr",
];

pub(crate) const TABLE_SECTIONS: &[&str] = &["tbody", "thead", "tfoot"];
/// A nested link closes an open one, but not across a table cell.
pub(crate) const LINK_SCOPE: &[&str] = &["caption", "table", "td", "th"];

const CHROME_ELEMENTS: &[&str] = &["head", "meta", "title", "script", "style", "link", "base"];
const UNWRAPPED_ELEMENTS: &[&str] = &["html", "body"];

/// Parse `markup` and append the resulting nodes to `parent`.
pub(crate) fn parse_into(surface: &mut Surface, parent: NodeId, markup: &str) {
    let mut builder = TreeBuilder {
        surface,
        stack: vec![parent],
    };
    builder.run(markup);
    strip_document_chrome(surface, parent);
}

struct TreeBuilder<'a> {
    surface: &'a mut Surface,
    stack: Vec<NodeId>,
}

impl TreeBuilder<'_> {
    fn current(&self) -> NodeId {
        // The base parent is never popped.
        self.stack[self.stack.len() - 1]
    }

    fn run(&mut self, markup: &str) {
        let bytes = markup.as_bytes();
        let mut pos = 0;
        let mut text_start = 0;

        while pos < bytes.len() {
            if bytes[pos] != b'<' {
                pos += 1;
                continue;
            }
            let rest = &markup[pos..];

            if rest.starts_with("<!--") {
                self.push_text(&markup[text_start..pos], true);
                pos = match rest[4..].find("-->") {
                    Some(end) => pos + 4 + end + 3,
                    None => bytes.len(),
                };
                text_start = pos;
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.push_text(&markup[text_start..pos], true);
                pos = match rest.find('>') {
                    Some(end) => pos + end + 1,
                    None => bytes.len(),
                };
                text_start = pos;
                continue;
            }

            let next = bytes.get(pos + 1).copied();
            let is_end_tag = next == Some(b'/')
                && bytes.get(pos + 2).is_some_and(|b| b.is_ascii_alphabetic());
            if is_end_tag {
                self.push_text(&markup[text_start..pos], true);
                let (name, after) = read_name(markup, pos + 2);
                pos = match markup[after..].find('>') {
                    Some(end) => after + end + 1,
                    None => bytes.len(),
                };
                text_start = pos;
                self.end_tag(&name);
                continue;
            }

            if next.is_some_and(|b| b.is_ascii_alphabetic()) {
                self.push_text(&markup[text_start..pos], true);
                let tag = read_start_tag(markup, pos + 1);
                pos = tag.end;
                text_start = pos;

                let raw = RAW_TEXT_ELEMENTS.contains(&tag.name.as_str());
                let rcdata = RCDATA_ELEMENTS.contains(&tag.name.as_str());
                let opened = self.start_tag(&tag);
                if (raw || rcdata) && opened {
                    let close = find_raw_text_end(markup, pos, &tag.name);
                    self.push_text(&markup[pos..close], rcdata);
                    pos = close;
                    text_start = pos;
                }
                continue;
            }

            // A lone '<' is text.
            pos += 1;
        }

        self.push_text(&markup[text_start..], true);
    }

    fn push_text(&mut self, raw: &str, decode: bool) {
        if raw.is_empty() {
            return;
        }
        let text = if decode {
            decode_entities(raw)
        } else {
            raw.to_string()
        };
        let parent = self.current();
        if let Some(last) = self.surface.children(parent).last().copied() {
            if let Some(existing) = self.surface.text(last) {
                let merged = format!("{existing}{text}");
                self.surface.set_text(last, merged);
                return;
            }
        }
        let node = self.surface.create_text(text);
        self.surface.append_child(parent, node);
    }

    /// Returns whether the element was pushed onto the open-element stack.
    fn start_tag(&mut self, tag: &StartTag) -> bool {
        let name = tag.name.as_str();
        if TABLE_PARTS.contains(&name) && self.find_open(&["table"], &[]).is_none() {
            tracing::trace!(target: "kalpna::parse", tag = name, "table part outside a table");
            return false;
        }

        match name {
            "li" => self.close_in_scope(&["li"], ITEM_SCOPE),
            "dd" | "dt" => self.close_in_scope(&["dd", "dt"], ITEM_SCOPE),
            "a" => self.close_in_scope(&["a"], LINK_SCOPE),
            "tbody" | "thead" | "tfoot" => self.close_in_scope(TABLE_SECTIONS, &["table"]),
            "tr" => self.close_in_scope(&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => self.close_in_scope(&["td", "th"], &["tr", "table"]),
            _ => {}
        }
        if CLOSES_PARAGRAPH.contains(&name) {
            self.close_in_scope(&["p"], BUTTON_SCOPE);
        }
        if HEADINGS.contains(&name) && self.current_is(HEADINGS) {
            self.stack.pop();
        }
        match name {
            "tr" => self.imply_parent(&["table"], "tbody"),
            "td" | "th" => {
                self.imply_parent(&["table"], "tbody");
                self.imply_parent(TABLE_SECTIONS, "tr");
            }
            _ => {}
        }

        let node = self.surface.create_element(name);
        if let Some(el) = self.surface.element_mut(node) {
            for (attr, value) in &tag.attrs {
                if !el.has_attr(attr) {
                    el.set_attr(attr, value.clone());
                }
            }
        }
        let parent = self.current();
        self.surface.append_child(parent, node);

        if is_void(name) || tag.self_closing {
            return false;
        }
        self.stack.push(node);
        true
    }

    fn end_tag(&mut self, name: &str) {
        if name == "p" {
            if self.find_open(&["p"], BUTTON_SCOPE).is_none() {
                let p = self.surface.create_element("p");
                let parent = self.current();
                self.surface.append_child(parent, p);
            } else {
                self.close_in_scope(&["p"], BUTTON_SCOPE);
            }
            return;
        }
        // Any heading end tag closes whichever heading is open.
        let targets: &[&str] = if HEADINGS.contains(&name) {
            HEADINGS
        } else {
            std::slice::from_ref(&name)
        };
        if let Some(index) = self.find_open(targets, &[]) {
            self.stack.truncate(index);
        }
    }

    fn current_is(&self, tags: &[&str]) -> bool {
        self.stack.len() > 1 && self.surface.tag(self.current()).is_some_and(|t| tags.contains(&t))
    }

    /// Stack index of the nearest open element in `targets`, unless one of
    /// `boundaries` is open above it.
    fn find_open(&self, targets: &[&str], boundaries: &[&str]) -> Option<usize> {
        for index in (1..self.stack.len()).rev() {
            let Some(tag) = self.surface.tag(self.stack[index]) else {
                continue;
            };
            if targets.contains(&tag) {
                return Some(index);
            }
            if boundaries.contains(&tag) {
                return None;
            }
        }
        None
    }

    fn close_in_scope(&mut self, targets: &[&str], boundaries: &[&str]) {
        if let Some(index) = self.find_open(targets, boundaries) {
            self.stack.truncate(index);
        }
    }

    /// Open an implied `tag` when the current element is one of `parents`.
    fn imply_parent(&mut self, parents: &[&str], tag: &str) {
        if !self.current_is(parents) {
            return;
        }
        let node = self.surface.create_element(tag);
        let parent = self.current();
        self.surface.append_child(parent, node);
        self.stack.push(node);
    }
}

struct StartTag {
    name: SmolStr,
    attrs: Vec<(SmolStr, String)>,
    self_closing: bool,
    /// Byte position just after the closing `>`.
    end: usize,
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/' || b == b'='
}

/// Read a tag or attribute name starting at `pos`; returns the lowercased
/// name and the position after it.
fn read_name(markup: &str, pos: usize) -> (SmolStr, usize) {
    let bytes = markup.as_bytes();
    let mut end = pos;
    while end < bytes.len() && !is_name_end(bytes[end]) {
        end += 1;
    }
    (SmolStr::new(markup[pos..end].to_ascii_lowercase()), end)
}

fn read_start_tag(markup: &str, pos: usize) -> StartTag {
    let bytes = markup.as_bytes();
    let (name, mut pos) = read_name(markup, pos);
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        match bytes[pos] {
            b'>' => {
                pos += 1;
                break;
            }
            b'/' => {
                if bytes.get(pos + 1) == Some(&b'>') {
                    self_closing = true;
                    pos += 2;
                    break;
                }
                pos += 1;
                continue;
            }
            b'=' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let (attr_name, after) = read_name(markup, pos);
        pos = after;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut value = String::new();
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let start = pos + 1;
                    let end = markup[start..]
                        .find(quote as char)
                        .map(|i| start + i)
                        .unwrap_or(bytes.len());
                    value = decode_entities(&markup[start..end]);
                    pos = (end + 1).min(bytes.len());
                }
                Some(_) => {
                    let start = pos;
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    value = decode_entities(&markup[start..pos]);
                }
                None => {}
            }
        }
        if !attr_name.is_empty() {
            attrs.push((attr_name, value));
        }
    }

    StartTag {
        name,
        attrs,
        self_closing,
        end: pos,
    }
}

/// Byte position of the `</name` that closes a raw text element.
/// `plaintext` is never closed.
fn find_raw_text_end(markup: &str, from: usize, name: &str) -> usize {
    if name == "plaintext" {
        return markup.len();
    }
    let needle = format!("</{name}");
    let haystack = markup[from..].to_ascii_lowercase();
    haystack
        .find(&needle)
        .map(|i| from + i)
        .unwrap_or(markup.len())
}

/// Decode character references. Unknown or unterminated references are kept
/// literally.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..1 + semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 2..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{A0}',
        "shy" => '\u{AD}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "bull" => '•',
        "middot" => '·',
        "deg" => '°',
        "times" => '×',
        "euro" => '€',
        "zwj" => '\u{200D}',
        "zwnj" => '\u{200C}',
        _ => return None,
    };
    Some(c)
}

fn strip_document_chrome(surface: &mut Surface, parent: NodeId) {
    for node in surface.descendants(parent) {
        if !surface.contains(node) {
            continue;
        }
        match surface.tag(node) {
            Some(tag) if CHROME_ELEMENTS.contains(&tag) => surface.remove(node),
            _ => {}
        }
    }
    for node in surface.descendants(parent) {
        if surface
            .tag(node)
            .is_some_and(|tag| UNWRAPPED_ELEMENTS.contains(&tag))
        {
            surface.unwrap(node);
        }
    }
    surface.normalize_text(parent);
}

#[cfg(test)]
mod tests {
    use crate::dom::Surface;

    use super::decode_entities;

    #[test]
    fn test_round_trip_of_serializer_output() {
        let markup = concat!(
            r#"<h2>Title</h2><p style="text-align: center;">a&amp;b &lt;c&gt;&nbsp;d<br>e</p>"#,
            r#"<table class="table"><thead><tr><th>H</th></tr></thead><tbody></tbody></table>"#,
            r#"<div contenteditable="false"><img src="x.png" alt=""></div>"#,
        );
        let surface = Surface::from_markup(markup);
        assert_eq!(surface.inner_html(), markup);
    }

    #[test]
    fn test_block_start_tags_close_paragraphs() {
        let surface = Surface::from_markup("<p>a<p>b</p>c</p>");
        assert_eq!(surface.inner_html(), "<p>a</p><p>b</p>c<p></p>");

        let surface = Surface::from_markup("<p>a<h2>b</h2><table><tbody><tr><td>c</td></tr></tbody></table>d</p>");
        assert_eq!(
            surface.inner_html(),
            "<p>a</p><h2>b</h2><table><tbody><tr><td>c</td></tr></tbody></table>d<p></p>"
        );
    }

    #[test]
    fn test_paragraph_close_stops_at_cells() {
        let markup = "<p>x</p><table><tbody><tr><td><p>a</p><div>b</div></td></tr></tbody></table>";
        assert_eq!(Surface::from_markup(markup).inner_html(), markup);
        assert_eq!(
            Surface::from_markup("<p>a<b>bold<div>block</div></b></p>").inner_html(),
            "<p>a<b>bold</b></p><div>block</div><p></p>"
        );
    }

    #[test]
    fn test_heading_closes_open_heading() {
        let surface = Surface::from_markup("<h1>a<h2>b</h1>c");
        assert_eq!(surface.inner_html(), "<h1>a</h1><h2>b</h2>c");
    }

    #[test]
    fn test_list_item_closes_through_paragraph() {
        let surface = Surface::from_markup("<ul><li><p>a<li>b</ul><dl><dt>t<dd>d</dl>");
        assert_eq!(
            surface.inner_html(),
            "<ul><li><p>a</p></li><li>b</li></ul><dl><dt>t</dt><dd>d</dd></dl>"
        );
    }

    #[test]
    fn test_table_parts_need_a_table() {
        assert_eq!(
            Surface::from_markup("<li>a</li><td>x</td><tr><th>y</th></tr>").inner_html(),
            "<li>a</li>xy"
        );
        assert_eq!(
            Surface::from_markup("<table><tr><td>a<td>b</table>").inner_html(),
            "<table><tbody><tr><td>a</td><td>b</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_nested_links_close() {
        let surface = Surface::from_markup("<a href=\"1\">one<a href=\"2\">two</a></a>");
        assert_eq!(surface.inner_html(), "<a href=\"1\">one</a><a href=\"2\">two</a>");
    }

    #[test]
    fn test_raw_and_escapable_text() {
        let surface = Surface::from_markup("<textarea>&lt;b&gt;</p></textarea><xmp><i>&amp;</i></xmp>");
        let root = surface.root();
        let textarea = surface.children(root)[0];
        assert_eq!(surface.text_content(textarea), "<b></p>");
        let xmp = surface.children(root)[1];
        assert_eq!(surface.text_content(xmp), "<i>&amp;</i>");
        let markup = surface.inner_html();
        assert_eq!(markup, "<textarea>&lt;b&gt;&lt;/p&gt;</textarea><xmp><i>&amp;</i></xmp>");
        assert_eq!(Surface::from_markup(&markup).inner_html(), markup);
    }

    #[test]
    fn test_word_clipboard_document() {
        let markup = "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\">\r\n<head><meta charset=utf-8><style><!-- p.MsoNormal {margin:0} --></style></head>\r\n<body lang=EN-US><!--StartFragment--><p class=MsoNormal>Hello<o:p></o:p></p><!--EndFragment--></body></html>";
        let surface = Surface::from_markup(markup);
        assert_eq!(
            surface.inner_html(),
            "\r\n\r\n<p class=\"MsoNormal\">Hello<o:p></o:p></p>"
        );
    }

    #[test]
    fn test_conditional_comments_and_self_closing() {
        let markup = "<p><![if !supportLists]><span>·</span><![endif]>Item<o:p/>x</p>";
        let surface = Surface::from_markup(markup);
        assert_eq!(surface.inner_html(), "<p><span>·</span>Item<o:p></o:p>x</p>");
    }

    #[test]
    fn test_unquoted_and_single_quoted_attributes() {
        let surface = Surface::from_markup("<a href=http://x.test/a?b=1 title='it\"s'>go</a>");
        assert_eq!(
            surface.inner_html(),
            "<a href=\"http://x.test/a?b=1\" title=\"it&quot;s\">go</a>"
        );
    }

    #[test]
    fn test_unmatched_end_tags_are_ignored() {
        let surface = Surface::from_markup("a</span>b<b>c</i>d");
        assert_eq!(surface.inner_html(), "ab<b>cd</b>");
    }

    #[test]
    fn test_implicit_list_item_close() {
        let surface = Surface::from_markup("<ul><li>one<li>two</ul>");
        assert_eq!(surface.inner_html(), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn test_nested_list_inside_item_is_not_closed() {
        let markup = "<ul><li>a<ul><li>b</li></ul></li></ul>";
        assert_eq!(Surface::from_markup(markup).inner_html(), markup);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let surface = Surface::from_markup("1 < 2");
        assert_eq!(surface.inner_html(), "1 &lt; 2");
    }

    proptest::proptest! {
        #[test]
        fn test_generated_markup_round_trips(fragment in crate::fragments::fragment()) {
            let markup = Surface::from_markup(&fragment).inner_html();
            proptest::prop_assert_eq!(Surface::from_markup(&markup).inner_html(), markup);
        }
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{A0}b");
        assert_eq!(decode_entities("&#2344;&#x928;"), "नन");
        assert_eq!(decode_entities("&unknown; & &amp"), "&unknown; & &amp");
    }
}
