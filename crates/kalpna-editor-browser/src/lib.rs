//! Browser DOM layer for the kalpna rich-text editor.
//!
//! Drives a `kalpna-editor-core` session from a contenteditable element. It
//! assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `dom_sync`: DOM selection <-> core path mapping
//! - `clipboard`: paste payload extraction
//! - `upload`: file picker and JavaScript upload/import hooks
//! - `editor`: the `KalpnaEditor` handle and the effect executor
//!
//! # Re-exports
//!
//! This crate re-exports `kalpna-editor-core` for convenience, so consumers
//! only need to depend on `kalpna-editor-browser`.

pub use kalpna_editor_core;
pub use kalpna_editor_core::*;

pub mod clipboard;
pub mod dom_sync;
pub mod editor;
pub mod upload;

pub use clipboard::ClipboardPayload;
pub use dom_sync::{DomSelection, chars_to_utf16, utf16_to_chars};
pub use editor::KalpnaEditor;

use tracing::Level;
use tracing::subscriber::set_global_default;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;
use wasm_bindgen::prelude::*;

/// Install the panic hook and route `tracing` output to the console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );
    let _ = set_global_default(Registry::default().with(wasm_layer));
}
