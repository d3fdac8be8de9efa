//! Rendered/source view toggle.
//!
//! Entering the source view captures the rendered markup verbatim and shows
//! a pretty-printed copy as plain text. Leaving restores the captured markup
//! exactly; edits made to the preview are discarded.

use serde::{Deserialize, Serialize};

use crate::dom::Surface;
use crate::pretty::{PrettyOptions, clean_artifacts, pretty_print};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Rendered,
    Source,
}

#[derive(Clone, Debug, Default)]
pub struct SourceView {
    mode: ViewMode,
    captured: Option<String>,
    options: PrettyOptions,
}

impl SourceView {
    pub fn new(options: PrettyOptions) -> Self {
        Self {
            mode: ViewMode::Rendered,
            captured: None,
            options,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_source(&self) -> bool {
        self.mode == ViewMode::Source
    }

    /// The rendered markup held while the preview is shown.
    pub fn captured(&self) -> Option<&str> {
        self.captured.as_deref()
    }

    /// Switch to the other view and return the new mode.
    pub fn toggle(&mut self, surface: &mut Surface) -> ViewMode {
        match self.mode {
            ViewMode::Rendered => self.enter(surface),
            ViewMode::Source => self.leave(surface),
        }
        self.mode
    }

    fn enter(&mut self, surface: &mut Surface) {
        let markup = surface.inner_html();
        let preview = clean_artifacts(&pretty_print(surface, self.options));
        surface.set_inner_text(&preview);
        self.captured = Some(markup);
        self.mode = ViewMode::Source;
        tracing::debug!(target: "kalpna::view", "entered source view");
    }

    fn leave(&mut self, surface: &mut Surface) {
        match self.captured.take() {
            Some(markup) => surface.set_inner_html(&markup),
            None => surface.set_inner_html(""),
        }
        self.mode = ViewMode::Rendered;
        tracing::debug!(target: "kalpna::view", "left source view, preview edits discarded");
    }
}
