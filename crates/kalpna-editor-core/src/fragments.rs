//! Mixed markup strategies for property tests.
//!
//! Fragments are random concatenations of tag soup, word-processor noise,
//! whitespace, invisible characters and Devanagari text. Tags are often left
//! unclosed or closed out of order on purpose.

use proptest::prelude::*;

const PIECES: &[&str] = &[
    "<p>", "</p>", "<p class=\"MsoNormal\">", "<b>", "</b>", "<i>", "</i>", "<span>", "</span>",
    "<span style=\"text-align:center\">", "<br>", "<div>", "</div>", "<h2>", "</h2>", "<h3>",
    "<ul>", "</ul>", "<li>", "</li>", "<table><tr><td>", "<td>", "</td>", "<tr>", "</table>",
    "<pre>", "</pre>", "<a href=\"/x\">", "</a>", "<o:p>", "</o:p>", "<st1:city>", "</st1:city>",
    "<w:sdt>", "</w:sdt>", "<img src=\"i.png\">", "<textarea>", "</textarea>", "text", "नम",
    "स्ते", " ", "  ", "\r\n", "&nbsp;", "\u{200B}", "\u{200C}", "&amp;", "1 < 2",
];

/// Between one and fourteen pieces joined together.
pub(crate) fn fragment() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(PIECES), 1..15).prop_map(|pieces| pieces.concat())
}
