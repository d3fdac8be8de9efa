//! Indented, line-wrapped markup for the source view.
//!
//! Block elements get their own lines and indent their children, unless the
//! whole element fits on one line and holds only inline content. Runs of
//! inline content are word-wrapped at spaces outside tags.

use crate::dom::{NodeId, Surface, is_block, is_void};
use crate::serialize::write_start_tag;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrettyOptions {
    pub indent: usize,
    pub wrap: usize,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            wrap: 80,
        }
    }
}

struct Printer<'a> {
    surface: &'a Surface,
    options: PrettyOptions,
    lines: Vec<String>,
}

/// Pretty-print the surface content.
pub fn pretty_print(surface: &Surface, options: PrettyOptions) -> String {
    let mut printer = Printer {
        surface,
        options,
        lines: Vec::new(),
    };
    printer.children(surface.root(), 0);
    printer.lines.join("\n")
}

/// Drop trailing whitespace and blank lines.
pub fn clean_artifacts(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Printer<'_> {
    fn pad(&self, depth: usize) -> String {
        " ".repeat(depth * self.options.indent)
    }

    fn is_block_node(&self, id: NodeId) -> bool {
        self.surface.tag(id).is_some_and(is_block)
    }

    fn children(&mut self, parent: NodeId, depth: usize) {
        let mut run = String::new();
        for child in self.surface.children(parent).to_vec() {
            if self.is_block_node(child) {
                self.inline_run(&run, depth);
                run.clear();
                self.block(child, depth);
            } else {
                run.push_str(&self.surface.outer_html(child));
            }
        }
        self.inline_run(&run, depth);
    }

    fn block(&mut self, id: NodeId, depth: usize) {
        let surface = self.surface;
        let pad = self.pad(depth);
        let Some(el) = surface.element(id) else {
            return;
        };
        let tag = el.tag.clone();
        if is_void(&tag) || tag == "pre" {
            let markup = surface.outer_html(id);
            self.lines.push(format!("{pad}{markup}"));
            return;
        }

        let inline_only = !surface.children(id).iter().any(|c| self.is_block_node(*c));
        let markup = surface.outer_html(id);
        if inline_only && pad.len() + markup.chars().count() <= self.options.wrap {
            self.lines.push(format!("{pad}{markup}"));
            return;
        }

        let mut open = String::new();
        write_start_tag(el, &mut open);
        self.lines.push(format!("{pad}{open}"));
        self.children(id, depth + 1);
        self.lines.push(format!("{pad}</{tag}>"));
    }

    fn inline_run(&mut self, run: &str, depth: usize) {
        let words = split_outside_tags(run);
        if words.is_empty() {
            return;
        }
        let pad = self.pad(depth);
        let width = self.options.wrap.saturating_sub(pad.len()).max(1);
        let mut line = String::new();
        let mut line_len = 0;
        for word in words {
            let word_len = word.chars().count();
            if line_len > 0 && line_len + 1 + word_len > width {
                self.lines.push(format!("{pad}{line}"));
                line.clear();
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.push_str(word);
            line_len += word_len;
        }
        if line_len > 0 {
            self.lines.push(format!("{pad}{line}"));
        }
    }
}

/// Split inline markup at whitespace that is not inside a tag.
fn split_outside_tags(markup: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut in_tag = false;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;
    for (i, c) in markup.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if in_tag && (c == '"' || c == '\'') => quote = Some(c),
            None if c == '<' => in_tag = true,
            None if c == '>' => in_tag = false,
            None => {}
        }
        if c.is_whitespace() && !in_tag && quote.is_none() {
            if let Some(s) = start.take() {
                words.push(&markup[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push(&markup[s..]);
    }
    words
}
