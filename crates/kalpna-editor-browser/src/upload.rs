//! File picker and JavaScript hook bridging.
//!
//! The host passes an object whose `image`, `pdf` and `import` members are
//! functions taking a `File` and returning a promise. Each present member
//! becomes a [`HostHooks`] entry; a rejected promise or a non-string result
//! is an upload failure.

use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FilePropertyBag, HtmlInputElement};

use kalpna_editor_core::{FileKind, HostHooks, UploadFile};

/// Build hooks from a JS object. `undefined`/`null` gives no hooks.
pub fn hooks_from_js(value: &JsValue) -> HostHooks {
    let mut hooks = HostHooks::new();
    if value.is_undefined() || value.is_null() {
        return hooks;
    }
    if let Some(f) = member_fn(value, "image") {
        hooks = hooks.with_image(move |file| call_hook(f.clone(), file));
    }
    if let Some(f) = member_fn(value, "pdf") {
        hooks = hooks.with_pdf(move |file| call_hook(f.clone(), file));
    }
    if let Some(f) = member_fn(value, "import") {
        hooks = hooks.with_import(move |file| call_hook(f.clone(), file));
    }
    tracing::debug!(target: "kalpna::upload", ?hooks, "host hooks installed");
    hooks
}

fn member_fn(value: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
}

async fn call_hook(hook: Function, file: UploadFile) -> Result<String, String> {
    let js_file = to_js_file(&file).map_err(describe)?;
    let returned = hook.call1(&JsValue::NULL, &js_file).map_err(describe)?;
    let promise = returned
        .dyn_into::<Promise>()
        .unwrap_or_else(|value| Promise::resolve(&value));
    let resolved = JsFuture::from(promise).await.map_err(describe)?;
    resolved
        .as_string()
        .ok_or_else(|| "the handler did not return a string".to_string())
}

fn describe(value: JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

fn to_js_file(file: &UploadFile) -> Result<File, JsValue> {
    let parts = Array::new();
    parts.push(&Uint8Array::from(file.bytes.as_slice()));
    let options = FilePropertyBag::new();
    options.set_type(&file.mime);
    File::new_with_u8_array_sequence_and_options(&parts, &file.name, &options)
}

/// Read a picked file into memory.
pub async fn read_file(file: File) -> Result<UploadFile, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    Ok(UploadFile::new(file.name(), file.type_(), bytes))
}

/// Open a native file picker for `kind`. `on_file` runs once a file was
/// chosen and read; dismissing the picker does nothing.
pub fn open_file_picker(
    kind: FileKind,
    accept: &str,
    on_file: impl FnOnce(UploadFile) + 'static,
) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let input: HtmlInputElement = document.create_element("input")?.dyn_into()?;
    input.set_type("file");
    input.set_accept(accept);

    let picker = input.clone();
    let onchange = Closure::once_into_js(move || {
        let Some(file) = picker.files().and_then(|files| files.get(0)) else {
            tracing::debug!(target: "kalpna::upload", %kind, "picker closed without a file");
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            match read_file(file).await {
                Ok(file) => on_file(file),
                Err(e) => tracing::warn!(target: "kalpna::upload", "reading file failed: {:?}", e),
            }
        });
    });
    input.set_onchange(Some(onchange.unchecked_ref()));
    input.click();
    Ok(())
}
