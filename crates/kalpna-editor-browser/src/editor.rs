//! KalpnaEditor - the editor handle exposed to JavaScript.
//!
//! Owns the session behind `Rc<RefCell<_>>`. The session is borrowed only
//! while an event is handled; effects run afterwards, so callbacks fired by
//! an effect (file picker, upload completion) can dispatch again.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;
use web_time::Instant;

use kalpna_editor_core::{
    EditorConfig, EditorEvent, EditorSession, Effect, FileKind, FormatCommand, HostHooks, Notice,
    StyleProperty, UndoManager, ViewMode, run_import, run_upload,
};

use crate::clipboard::ClipboardPayload;
use crate::dom_sync::{apply_selection, read_selection};
use crate::upload::{hooks_from_js, open_file_picker};

/// Class set on the element while the source view is shown.
pub const SOURCE_VIEW_CLASS: &str = "source-view";

struct Inner {
    session: RefCell<EditorSession>,
    element: HtmlElement,
    hooks: HostHooks,
    on_change: RefCell<Option<js_sys::Function>>,
}

/// The editor instance exposed to JavaScript.
#[wasm_bindgen]
pub struct KalpnaEditor {
    inner: Rc<Inner>,
    _listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl KalpnaEditor {
    /// Attach an editor to `element`, taking its current markup as content.
    ///
    /// `config` is an optional `EditorConfig` object; `hooks` an optional
    /// object with `image`, `pdf` and `import` functions.
    #[wasm_bindgen(constructor)]
    pub fn new(element: HtmlElement, config: JsValue, hooks: JsValue) -> Result<KalpnaEditor, JsError> {
        let config: EditorConfig = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
        };
        let session = EditorSession::with_content(config, &element.inner_html());

        let inner = Rc::new(Inner {
            session: RefCell::new(session),
            element,
            hooks: hooks_from_js(&hooks),
            on_change: RefCell::new(None),
        });
        let listeners = attach_listeners(&inner)?;

        let editable = !inner.session.borrow().is_read_only();
        let markup = inner.session.borrow().markup();
        run_effects(
            &inner,
            vec![
                Effect::SetEditable(editable),
                Effect::Render {
                    markup,
                    source: false,
                },
            ],
        );

        Ok(Self {
            inner,
            _listeners: listeners,
        })
    }

    /// Called after every change to the rendered content.
    #[wasm_bindgen(js_name = setOnChange)]
    pub fn set_on_change(&self, callback: Option<js_sys::Function>) {
        *self.inner.on_change.borrow_mut() = callback;
    }

    // === Styling ===

    #[wasm_bindgen(js_name = applyFontSize)]
    pub fn apply_font_size(&self, size: &str) {
        self.style(StyleProperty::FontSize, size);
    }

    #[wasm_bindgen(js_name = applyLineHeightValue)]
    pub fn apply_line_height_value(&self, value: &str) {
        self.style(StyleProperty::LineHeight, value);
    }

    #[wasm_bindgen(js_name = applyColorLive)]
    pub fn apply_color_live(&self, color: &str) {
        self.style(StyleProperty::Color, color);
    }

    #[wasm_bindgen(js_name = applyTextDecoration)]
    pub fn apply_text_decoration(&self, token: &str) {
        self.style(StyleProperty::TextDecoration, token);
    }

    /// Run a named formatting command. `createLink` prompts for the URL and
    /// an optional target.
    #[wasm_bindgen]
    pub fn format(&self, command: &str) {
        let command = match command {
            "createLink" => match prompt_link() {
                Some(command) => command,
                None => return,
            },
            name => match FormatCommand::from_name(name) {
                Some(command) => command,
                None => {
                    tracing::debug!(target: "kalpna::format", command = name, "unknown format command");
                    return;
                }
            },
        };
        self.dispatch(EditorEvent::Format(command));
    }

    // === Blocks ===

    #[wasm_bindgen(js_name = insertHeading)]
    pub fn insert_heading(&self, level: u8) {
        self.dispatch(EditorEvent::InsertHeading(level));
    }

    #[wasm_bindgen(js_name = insertParagraph)]
    pub fn insert_paragraph(&self, text: &str) {
        self.dispatch(EditorEvent::InsertParagraph(text.to_string()));
    }

    #[wasm_bindgen(js_name = insertTable)]
    pub fn insert_table(&self, rows: u32, cols: u32) {
        self.dispatch(EditorEvent::InsertTable { rows, cols });
    }

    #[wasm_bindgen(js_name = toggleTableForm)]
    pub fn toggle_table_form(&self) {
        self.dispatch(EditorEvent::ToggleTableForm);
    }

    #[wasm_bindgen(js_name = setTableRows)]
    pub fn set_table_rows(&self, rows: Option<u32>) {
        self.dispatch(EditorEvent::SetTableRows(rows));
    }

    #[wasm_bindgen(js_name = setTableCols)]
    pub fn set_table_cols(&self, cols: Option<u32>) {
        self.dispatch(EditorEvent::SetTableCols(cols));
    }

    #[wasm_bindgen(js_name = submitTableForm)]
    pub fn submit_table_form(&self) {
        self.dispatch(EditorEvent::SubmitTableForm);
    }

    #[wasm_bindgen(js_name = isTableFormVisible)]
    pub fn is_table_form_visible(&self) -> bool {
        self.inner.session.borrow().table_form().visible
    }

    #[wasm_bindgen(js_name = insertImage)]
    pub fn insert_image(&self) {
        self.dispatch(EditorEvent::RequestFile(FileKind::Image));
    }

    #[wasm_bindgen(js_name = insertPdf)]
    pub fn insert_pdf(&self) {
        self.dispatch(EditorEvent::RequestFile(FileKind::Pdf));
    }

    #[wasm_bindgen(js_name = importDocument)]
    pub fn import_document(&self) {
        self.dispatch(EditorEvent::RequestFile(FileKind::LegacyDocument));
    }

    // === History ===

    #[wasm_bindgen]
    pub fn undo(&self) {
        self.dispatch(EditorEvent::Undo);
    }

    #[wasm_bindgen]
    pub fn redo(&self) {
        self.dispatch(EditorEvent::Redo);
    }

    #[wasm_bindgen(js_name = saveState)]
    pub fn save_state(&self) {
        self.dispatch(EditorEvent::SaveState);
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.session.borrow().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.session.borrow().can_redo()
    }

    // === Content ===

    #[wasm_bindgen(js_name = toggleSourceView)]
    pub fn toggle_source_view(&self) {
        self.dispatch(EditorEvent::ToggleSourceView);
    }

    #[wasm_bindgen(js_name = isSourceView)]
    pub fn is_source_view(&self) -> bool {
        self.inner.session.borrow().view_mode() == ViewMode::Source
    }

    /// Replace the whole content.
    #[wasm_bindgen]
    pub fn load(&self, markup: &str) {
        self.dispatch(EditorEvent::Load(markup.to_string()));
    }

    /// Make the editor read-only and show `notice` instead of the content.
    #[wasm_bindgen]
    pub fn disable(&self, notice: &str) {
        self.dispatch(EditorEvent::Disable(notice.to_string()));
    }

    #[wasm_bindgen(js_name = getMarkup)]
    pub fn get_markup(&self) -> String {
        self.inner.session.borrow().markup()
    }

    /// Markup for the PDF renderer, empty wrappers stripped.
    #[wasm_bindgen(js_name = exportMarkup)]
    pub fn export_markup(&self) -> String {
        self.inner.session.borrow().export()
    }

    /// Floating toolbar placement as `{ visible, top, left }`.
    #[wasm_bindgen]
    pub fn toolbar(&self) -> Result<JsValue, JsError> {
        let toolbar = self.inner.session.borrow().toolbar();
        serde_wasm_bindgen::to_value(&toolbar)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = isLinkSelected)]
    pub fn is_link_selected(&self) -> bool {
        self.inner.session.borrow().link_selected()
    }

    #[wasm_bindgen(js_name = fontSize)]
    pub fn font_size(&self) -> String {
        self.inner.session.borrow().font_size().to_string()
    }
}

impl KalpnaEditor {
    fn dispatch(&self, event: EditorEvent) {
        dispatch(&self.inner, event);
    }

    fn style(&self, property: StyleProperty, value: &str) {
        self.dispatch(EditorEvent::ApplyStyle {
            property,
            value: value.to_string(),
        });
    }
}

fn dispatch(inner: &Rc<Inner>, event: EditorEvent) {
    let effects = inner.session.borrow_mut().handle_event(event);
    run_effects(inner, effects);
}

fn run_effects(inner: &Rc<Inner>, effects: Vec<Effect>) {
    let mut changed = false;
    for effect in effects {
        match effect {
            Effect::Render { markup, source } => {
                let class_list = inner.element.class_list();
                let toggled = if source {
                    inner.element.set_text_content(Some(&markup));
                    class_list.add_1(SOURCE_VIEW_CLASS)
                } else {
                    inner.element.set_inner_html(&markup);
                    class_list.remove_1(SOURCE_VIEW_CLASS)
                };
                if let Err(e) = toggled {
                    tracing::warn!(target: "kalpna::browser", "toggling view class failed: {:?}", e);
                }
                changed = true;
            }
            Effect::SetSelection(range) => apply_selection(&inner.element, range.as_ref()),
            Effect::OpenFilePicker { kind, accept } => {
                let target = Rc::clone(inner);
                let opened = open_file_picker(kind, accept, move |file| {
                    dispatch(&target, EditorEvent::FileChosen { kind, file });
                });
                if let Err(e) = opened {
                    tracing::warn!(target: "kalpna::upload", "opening file picker failed: {:?}", e);
                }
            }
            Effect::StartUpload { kind, file } => {
                let upload = run_upload(&inner.hooks, kind, file);
                let target = Rc::clone(inner);
                wasm_bindgen_futures::spawn_local(async move {
                    let event = upload.await;
                    dispatch(&target, event);
                });
            }
            Effect::StartImport { file } => {
                let import = run_import(&inner.hooks, file);
                let target = Rc::clone(inner);
                wasm_bindgen_futures::spawn_local(async move {
                    let event = import.await;
                    dispatch(&target, event);
                });
            }
            Effect::Notify(notice) => notify(&notice),
            Effect::SetEditable(editable) => {
                let value = if editable { "true" } else { "false" };
                if let Err(e) = inner.element.set_attribute("contenteditable", value) {
                    tracing::warn!(target: "kalpna::browser", "setting contenteditable failed: {:?}", e);
                }
            }
        }
    }
    if changed {
        notify_change(inner);
    }
}

fn notify_change(inner: &Inner) {
    let callback = inner.on_change.borrow().clone();
    if let Some(callback) = callback {
        if let Err(e) = callback.call0(&JsValue::NULL) {
            tracing::warn!(target: "kalpna::browser", "onChange callback threw: {:?}", e);
        }
    }
}

fn notify(notice: &Notice) {
    let message = match notice {
        Notice::Error(message) => {
            tracing::info!(target: "kalpna::browser", %message, "reporting error");
            message
        }
        Notice::Info(message) => message,
    };
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.alert_with_message(message) {
            tracing::warn!(target: "kalpna::browser", "alert failed: {:?}", e);
        }
    }
}

fn prompt_link() -> Option<FormatCommand> {
    let window = web_sys::window()?;
    let url = window
        .prompt_with_message("Enter the URL")
        .ok()
        .flatten()
        .filter(|url| !url.trim().is_empty())?;
    let target = window
        .prompt_with_message_and_default("Open in (e.g. _blank), leave empty for the same tab", "")
        .ok()
        .flatten()
        .filter(|target| !target.trim().is_empty());
    Some(FormatCommand::CreateLink { url, target })
}

fn attach_listeners(inner: &Rc<Inner>) -> Result<Vec<EventListener>, JsError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsError::new("No document"))?;
    let mut listeners = Vec::new();

    let target = Rc::clone(inner);
    listeners.push(EventListener::new_with_options(
        &inner.element,
        "paste",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            let Some(evt) = event.dyn_ref::<web_sys::ClipboardEvent>() else {
                tracing::warn!(target: "kalpna::paste", "paste event is not a ClipboardEvent");
                return;
            };
            evt.prevent_default();
            let payload = ClipboardPayload::from_event(evt);
            dispatch(&target, payload.into_event(Instant::now()));
        },
    ));

    let target = Rc::clone(inner);
    listeners.push(EventListener::new(&inner.element, "input", move |_| {
        let markup = target.element.inner_html();
        dispatch(&target, EditorEvent::Input(markup));
    }));

    let target = Rc::clone(inner);
    listeners.push(EventListener::new(&document, "selectionchange", move |_| {
        let selection = read_selection(&target.element);
        let (scroll_x, scroll_y) = web_sys::window()
            .map(|w| (w.scroll_x().unwrap_or(0.0), w.scroll_y().unwrap_or(0.0)))
            .unwrap_or((0.0, 0.0));
        dispatch(
            &target,
            EditorEvent::SelectionChanged {
                range: selection.range,
                rect: selection.rect,
                text: selection.text,
                scroll_x,
                scroll_y,
            },
        );
    }));

    Ok(listeners)
}
