//! WASM browser tests for kalpna-editor-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use kalpna_editor_browser::dom_sync::{dom_point_to_path, path_to_dom_point};
use kalpna_editor_browser::upload::hooks_from_js;
use kalpna_editor_browser::{
    ClipboardPayload, EditorEvent, FileKind, KalpnaEditor, PathPoint, UploadFile, chars_to_utf16,
    run_upload, utf16_to_chars,
};
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

fn element(markup: &str) -> HtmlElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let el: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
    el.set_inner_html(markup);
    document.body().unwrap().append_child(&el).unwrap();
    el
}

// === Offset conversion ===

#[wasm_bindgen_test]
fn test_utf16_offsets() {
    let text = "a😀b";
    assert_eq!(chars_to_utf16(text, 2), 3);
    assert_eq!(utf16_to_chars(text, 3), 2);
    assert_eq!(utf16_to_chars(text, 99), 3);
    assert_eq!(chars_to_utf16("नमस्ते", 3), 3);
}

// === Path mapping ===

#[wasm_bindgen_test]
fn test_dom_point_round_trip() {
    let el = element("<p>x<b>a😀b</b></p>");
    let bold_text = el.first_child().unwrap().last_child().unwrap().first_child().unwrap();

    let point = dom_point_to_path(&el, &bold_text, 3).unwrap();
    assert_eq!(point, PathPoint::new(vec![0, 1, 0], 2));

    let (node, offset) = path_to_dom_point(&el, &point).unwrap();
    assert!(node.is_same_node(Some(&bold_text)));
    assert_eq!(offset, 3);
    el.remove();
}

#[wasm_bindgen_test]
fn test_missing_path_is_none() {
    let el = element("<p>x</p>");
    assert!(path_to_dom_point(&el, &PathPoint::new(vec![3], 0)).is_none());
    el.remove();
}

// === Editor handle ===

#[wasm_bindgen_test]
fn test_editor_renders_and_undoes() {
    let el = element("<p>hello</p>");
    let editor = KalpnaEditor::new(el.clone(), JsValue::UNDEFINED, JsValue::UNDEFINED).unwrap();
    assert_eq!(el.get_attribute("contenteditable").as_deref(), Some("true"));

    editor.insert_table(2, 1);
    assert!(el.inner_html().contains("<th style=\"width: 100%;\">Header 1</th>"));
    assert!(editor.can_undo());

    editor.undo();
    assert_eq!(el.inner_html(), "<p>hello</p>");
    el.remove();
}

#[wasm_bindgen_test]
fn test_source_view_class() {
    let el = element("<p>a</p>");
    let editor = KalpnaEditor::new(el.clone(), JsValue::UNDEFINED, JsValue::UNDEFINED).unwrap();
    editor.toggle_source_view();
    assert!(el.class_list().contains("source-view"));
    assert!(el.text_content().unwrap_or_default().contains("<p>a</p>"));

    editor.toggle_source_view();
    assert!(!el.class_list().contains("source-view"));
    assert_eq!(el.inner_html(), "<p>a</p>");
    el.remove();
}

#[wasm_bindgen_test]
fn test_disable() {
    let el = element("<p>a</p>");
    let editor = KalpnaEditor::new(el.clone(), JsValue::UNDEFINED, JsValue::UNDEFINED).unwrap();
    editor.disable("Licence expired.");
    assert_eq!(el.get_attribute("contenteditable").as_deref(), Some("false"));
    assert_eq!(
        el.inner_html(),
        "<div class=\"editor-disabled-notice\">Licence expired.</div>"
    );
    editor.insert_heading(1);
    assert_eq!(editor.get_markup(), el.inner_html());
    el.remove();
}

// === Clipboard and hooks ===

#[wasm_bindgen_test]
fn test_payload_into_event() {
    let at = web_time::Instant::now();
    let payload = ClipboardPayload {
        html: None,
        text: Some("x".into()),
    };
    assert_eq!(
        payload.into_event(at),
        EditorEvent::Paste {
            html: None,
            text: Some("x".into()),
            at,
        }
    );
}

#[wasm_bindgen_test]
async fn test_js_hook_resolves_address() {
    let hooks = js_sys::Object::new();
    let image = js_sys::Function::new_with_args("file", "return Promise.resolve('/media/' + file.name)");
    js_sys::Reflect::set(&hooks, &JsValue::from_str("image"), &image).unwrap();

    let hooks = hooks_from_js(&hooks);
    let event = run_upload(
        &hooks,
        FileKind::Image,
        UploadFile::new("cat.png", "image/png", vec![1, 2, 3]),
    )
    .await;
    assert_eq!(
        event,
        EditorEvent::UploadFinished {
            kind: FileKind::Image,
            name: "cat.png".into(),
            result: Ok("/media/cat.png".into()),
        }
    );
}
