//! The editor session: all editing state in one place.
//!
//! [`EditorSession::handle_event`] is the only entry point the platform needs.
//! It snapshots history around content changes, turns errors into notices
//! and reports what the platform has to do as [`Effect`]s.

use std::time::Duration;

use serde::Serialize;
use web_time::Instant;

use crate::blocks::{
    TableForm, build_document_link, build_image, insert_block_at_cursor, insert_heading,
    insert_markup_at_cursor, insert_paragraph, insert_table, insert_text_at_cursor,
};
use crate::config::EditorConfig;
use crate::dom::Surface;
use crate::error::EditorError;
use crate::events::{EditorEvent, Effect, Notice};
use crate::export::export_markup;
use crate::format::{FormatCommand, execute_format};
use crate::history::{History, UndoManager};
use crate::hooks::FileKind;
use crate::pretty::PrettyOptions;
use crate::sanitize::{PastePayload, choose_payload, sanitize};
use crate::selection::{SelectionManager, resolve_paths, to_path_range};
use crate::source_view::{SourceView, ViewMode};
use crate::style::{StyleOutcome, StyleProperty, apply_style};
use crate::types::{PathRange, Rect};

pub const DISABLED_NOTICE_CLASS: &str = "editor-disabled-notice";

/// Vertical gap between the selection and the floating toolbar.
const TOOLBAR_OFFSET: f64 = 40.0;

/// Floating inline toolbar placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Toolbar {
    pub visible: bool,
    pub top: f64,
    pub left: f64,
}

#[derive(Debug)]
pub struct EditorSession {
    surface: Surface,
    selection: SelectionManager,
    history: History,
    view: SourceView,
    table_form: TableForm,
    toolbar: Toolbar,
    link_selected: bool,
    font_size: String,
    last_paste: Option<Instant>,
    read_only: bool,
    config: EditorConfig,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_content(config, "")
    }

    /// A session starting from `markup`. A config with `editable: false`
    /// starts disabled.
    pub fn with_content(config: EditorConfig, markup: &str) -> Self {
        let options = PrettyOptions {
            indent: config.source_indent,
            wrap: config.source_wrap,
        };
        let mut session = Self {
            surface: Surface::from_markup(markup),
            selection: SelectionManager::new(),
            history: History::new(config.history_limit),
            view: SourceView::new(options),
            table_form: TableForm::default(),
            toolbar: Toolbar::default(),
            link_selected: false,
            font_size: config.default_font_size.clone(),
            last_paste: None,
            read_only: false,
            config,
        };
        if !session.config.editable {
            let notice = session.config.disabled_notice.clone();
            session.disable(&notice);
        }
        session
    }

    // === Accessors ===

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view.mode()
    }

    pub fn table_form(&self) -> &TableForm {
        &self.table_form
    }

    pub fn toolbar(&self) -> Toolbar {
        self.toolbar
    }

    pub fn link_selected(&self) -> bool {
        self.link_selected
    }

    /// Last font size picked in the toolbar.
    pub fn font_size(&self) -> &str {
        &self.font_size
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Current surface markup, exactly as rendered.
    pub fn markup(&self) -> String {
        self.surface.inner_html()
    }

    /// The rendered markup even while the source preview is shown.
    fn content_markup(&self) -> String {
        match self.view.captured() {
            Some(captured) if self.view.is_source() => captured.to_string(),
            _ => self.surface.inner_html(),
        }
    }

    /// Render-ready markup with empty wrappers stripped.
    pub fn export(&self) -> String {
        match self.view.captured() {
            Some(captured) if self.view.is_source() => {
                export_markup(&Surface::from_markup(captured))
            }
            _ => export_markup(&self.surface),
        }
    }

    /// The saved range as paths, if it is still valid.
    pub fn saved_paths(&mut self) -> Option<PathRange> {
        let range = self.selection.restore(&self.surface)?;
        to_path_range(&self.surface, &range)
    }

    // === Events ===

    pub fn handle_event(&mut self, event: EditorEvent) -> Vec<Effect> {
        if let Err(err) = self.check_allowed(&event) {
            tracing::debug!(target: "kalpna::session", ?event, %err, "event ignored");
            // Uploads land long after the click; say where the file went.
            if let EditorEvent::UploadFinished { name, .. } = &event {
                return vec![Effect::Notify(Notice::Error(format!(
                    "{name} was not inserted: {err}"
                )))];
            }
            return Vec::new();
        }

        let tracked = records_history(&event);
        let typed = matches!(event, EditorEvent::Input(_));
        let before = event.is_mutating().then(|| self.content_markup());
        let mut effects = match self.dispatch(event) {
            Ok(effects) => effects,
            Err(err) => {
                tracing::debug!(target: "kalpna::session", %err, "operation failed");
                vec![Effect::Notify(Notice::Error(err.to_string()))]
            }
        };

        if let Some(before) = before.filter(|before| *before != self.content_markup()) {
            if tracked {
                self.history.save_state(before);
            } else if typed {
                self.history.discard_redo();
            }
            if !typed {
                let selection = self.saved_paths();
                let mut changed = vec![self.render_effect(), Effect::SetSelection(selection)];
                changed.append(&mut effects);
                effects = changed;
            }
        }
        effects
    }

    fn check_allowed(&self, event: &EditorEvent) -> Result<(), EditorError> {
        if self.read_only && event.is_mutating() {
            return Err(EditorError::ReadOnly);
        }
        // The preview is plain text; only wholesale replacements reach it.
        if self.view.is_source()
            && event.is_mutating()
            && !matches!(event, EditorEvent::Load(_) | EditorEvent::ImportFinished { .. })
        {
            return Err(EditorError::SourceView);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: EditorEvent) -> Result<Vec<Effect>, EditorError> {
        match event {
            EditorEvent::SelectionChanged {
                range,
                rect,
                text,
                scroll_x,
                scroll_y,
            } => {
                self.selection_changed(range.as_ref(), rect, &text, scroll_x, scroll_y);
            }
            EditorEvent::Paste { html, text, at } => {
                self.paste(html.as_deref(), text.as_deref(), at);
            }
            EditorEvent::ApplyStyle { property, value } => {
                self.apply_style(property, &value);
            }
            EditorEvent::Format(command) => {
                self.format(&command);
            }
            EditorEvent::InsertHeading(level) => {
                insert_heading(&mut self.surface, &mut self.selection, level)?;
            }
            EditorEvent::InsertParagraph(text) => {
                insert_paragraph(&mut self.surface, &mut self.selection, &text);
            }
            EditorEvent::InsertTable { rows, cols } => self.insert_table(rows, cols)?,
            EditorEvent::ToggleTableForm => self.table_form.toggle(),
            EditorEvent::SetTableRows(rows) => self.table_form.rows = rows,
            EditorEvent::SetTableCols(cols) => self.table_form.cols = cols,
            EditorEvent::SubmitTableForm => {
                let (rows, cols) = self.table_form.take();
                self.insert_table(rows, cols)?;
            }
            EditorEvent::RequestFile(kind) => {
                return Ok(vec![Effect::OpenFilePicker {
                    kind,
                    accept: kind.accept(),
                }]);
            }
            EditorEvent::FileChosen { kind, file } => {
                let effect = match kind {
                    FileKind::LegacyDocument => Effect::StartImport { file },
                    _ => Effect::StartUpload { kind, file },
                };
                return Ok(vec![effect]);
            }
            EditorEvent::UploadFinished { kind, name, result } => {
                let address = result.map_err(|source| EditorError::Upload { kind, source })?;
                let node = match kind {
                    FileKind::Image => build_image(&mut self.surface, &address, &name),
                    FileKind::Pdf | FileKind::LegacyDocument => {
                        build_document_link(&mut self.surface, &address, &name)
                    }
                };
                insert_block_at_cursor(&mut self.surface, &mut self.selection, node);
            }
            EditorEvent::ImportFinished { result } => {
                let markup = result?;
                self.load(&markup);
            }
            EditorEvent::Undo => {
                UndoManager::undo(self);
            }
            EditorEvent::Redo => {
                UndoManager::redo(self);
            }
            EditorEvent::SaveState => self.save_state(),
            EditorEvent::Input(markup) => {
                self.surface.set_inner_html(&markup);
                self.selection.clear();
            }
            EditorEvent::ToggleSourceView => return Ok(self.toggle_source_view()),
            EditorEvent::Load(markup) => self.load(&markup),
            EditorEvent::Disable(notice) => return Ok(self.disable(&notice)),
        }
        Ok(Vec::new())
    }

    fn render_effect(&self) -> Effect {
        if self.view.is_source() {
            Effect::Render {
                markup: self.surface.text_content(self.surface.root()),
                source: true,
            }
        } else {
            Effect::Render {
                markup: self.surface.inner_html(),
                source: false,
            }
        }
    }

    // === Operations ===

    fn selection_changed(
        &mut self,
        range: Option<&PathRange>,
        rect: Option<Rect>,
        text: &str,
        scroll_x: f64,
        scroll_y: f64,
    ) {
        self.selection.capture_paths(&self.surface, range);

        self.link_selected = range
            .and_then(|paths| resolve_paths(&self.surface, paths))
            .and_then(|r| self.surface.closest_tag(r.start.node, &["a"]))
            .is_some();

        self.toolbar = match rect {
            Some(rect) if !text.trim().is_empty() => Toolbar {
                visible: true,
                top: rect.top + scroll_y - TOOLBAR_OFFSET,
                left: rect.left + scroll_x,
            },
            _ => Toolbar::default(),
        };
    }

    fn paste(&mut self, html: Option<&str>, text: Option<&str>, at: Instant) {
        let window = Duration::from_millis(self.config.paste_lock_ms);
        if let Some(last) = self.last_paste {
            if at.saturating_duration_since(last) < window {
                tracing::debug!(target: "kalpna::paste", "paste within lock window ignored");
                return;
            }
        }
        self.last_paste = Some(at);

        match choose_payload(html, text) {
            Some(PastePayload::Markup(markup)) => {
                let cleaned = sanitize(&markup);
                insert_markup_at_cursor(&mut self.surface, &mut self.selection, &cleaned);
            }
            Some(PastePayload::Text(text)) => {
                insert_text_at_cursor(&mut self.surface, &mut self.selection, &text);
            }
            None => tracing::debug!(target: "kalpna::paste", "empty clipboard"),
        }
    }

    fn apply_style(&mut self, property: StyleProperty, value: &str) -> StyleOutcome {
        if property == StyleProperty::FontSize {
            self.font_size = value.to_string();
        }
        apply_style(&mut self.surface, &mut self.selection, property, value)
    }

    fn format(&mut self, command: &FormatCommand) -> bool {
        self.toolbar.visible = false;
        execute_format(&mut self.surface, &mut self.selection, command)
    }

    /// The form is reset whether or not the dimensions were valid.
    fn insert_table(&mut self, rows: u32, cols: u32) -> Result<(), EditorError> {
        self.table_form = TableForm::default();
        insert_table(&mut self.surface, &mut self.selection, rows, cols)?;
        Ok(())
    }

    fn save_state(&mut self) {
        let markup = self.content_markup();
        self.history.save_state(markup);
    }

    fn toggle_source_view(&mut self) -> Vec<Effect> {
        self.selection.clear();
        self.view.toggle(&mut self.surface);
        vec![self.render_effect(), Effect::SetSelection(None)]
    }

    fn load(&mut self, markup: &str) {
        if self.view.is_source() {
            self.view = SourceView::new(PrettyOptions {
                indent: self.config.source_indent,
                wrap: self.config.source_wrap,
            });
        }
        self.surface.set_inner_html(markup);
        self.selection.clear();
    }

    fn disable(&mut self, notice: &str) -> Vec<Effect> {
        self.read_only = true;
        self.load("");
        let root = self.surface.root();
        let div = self
            .surface
            .create_element_with_text("div", &[("class", DISABLED_NOTICE_CLASS)], notice);
        self.surface.append_child(root, div);
        self.toolbar = Toolbar::default();
        tracing::debug!(target: "kalpna::session", "editing disabled");
        vec![Effect::SetEditable(false), self.render_effect()]
    }

    // === Named operations ===
    //
    // Each goes through `handle_event` so history and effects behave the
    // same as for platform events.

    pub fn apply_font_size(&mut self, size: &str) -> Vec<Effect> {
        self.handle_event(EditorEvent::ApplyStyle {
            property: StyleProperty::FontSize,
            value: size.to_string(),
        })
    }

    pub fn apply_line_height_value(&mut self, value: &str) -> Vec<Effect> {
        self.handle_event(EditorEvent::ApplyStyle {
            property: StyleProperty::LineHeight,
            value: value.to_string(),
        })
    }

    pub fn apply_color_live(&mut self, color: &str) -> Vec<Effect> {
        self.handle_event(EditorEvent::ApplyStyle {
            property: StyleProperty::Color,
            value: color.to_string(),
        })
    }

    pub fn apply_text_decoration(&mut self, token: &str) -> Vec<Effect> {
        self.handle_event(EditorEvent::ApplyStyle {
            property: StyleProperty::TextDecoration,
            value: token.to_string(),
        })
    }
}

/// Events whose content change gets an automatic undo point. Undo and redo
/// manage the stacks themselves and an explicit save already pushed one.
/// Typing is saved by the host when it sees fit, but still invalidates redo.
fn records_history(event: &EditorEvent) -> bool {
    !matches!(
        event,
        EditorEvent::Undo | EditorEvent::Redo | EditorEvent::SaveState | EditorEvent::Input(_)
    )
}

impl UndoManager for EditorSession {
    fn can_undo(&self) -> bool {
        !self.view.is_source() && self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        !self.view.is_source() && self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        if self.view.is_source() {
            return false;
        }
        match self.history.undo(self.surface.inner_html()) {
            Some(previous) => {
                self.surface.set_inner_html(&previous);
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        if self.view.is_source() {
            return false;
        }
        match self.history.redo(self.surface.inner_html()) {
            Some(next) => {
                self.surface.set_inner_html(&next);
                true
            }
            None => false,
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}
