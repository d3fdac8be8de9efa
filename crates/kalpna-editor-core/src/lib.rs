//! kalpna-editor-core: rich-text editing logic without browser dependencies.
//!
//! This crate provides:
//! - `Surface` - arena document tree with a lenient markup parser/serializer
//! - `SelectionManager` - saved range persistence with stale-range checks
//! - Style application, block insertion and formatting commands
//! - `sanitize` - ordered cleanup passes for pasted word-processor markup
//! - `History` - snapshot undo/redo
//! - `EditorSession` - event in, effects out; the platform layer drives it

pub mod blocks;
pub mod config;
mod css;
pub mod dom;
pub mod error;
pub mod events;
pub mod export;
pub mod format;
#[cfg(test)]
mod fragments;
pub mod history;
pub mod hooks;
mod parse;
pub mod pretty;
mod range;
pub mod sanitize;
pub mod selection;
mod serialize;
pub mod session;
pub mod source_view;
pub mod style;
pub mod types;

pub use blocks::{Placement, TableForm, build_table, insert_block_at_cursor, insert_heading, insert_table};
pub use config::EditorConfig;
pub use dom::{Element, NodeId, NodeKind, Surface};
pub use error::{EditorError, ImportError, UploadError};
pub use events::{EditorEvent, Effect, Notice};
pub use export::export_markup;
pub use format::{FormatCommand, execute_format};
pub use history::{History, UndoManager};
pub use hooks::{FileKind, HookFn, HostHooks, UploadFile, run_import, run_upload};
pub use pretty::{PrettyOptions, pretty_print};
pub use sanitize::{PastePayload, choose_payload, sanitize};
pub use selection::SelectionManager;
pub use session::{EditorSession, Toolbar};
pub use smol_str::SmolStr;
pub use source_view::{SourceView, ViewMode};
pub use style::{StyleOutcome, StyleProperty, apply_style};
pub use types::{Anchor, PathPoint, PathRange, Rect, SelectionRange};
