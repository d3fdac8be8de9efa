//! Editor events and effects.
//!
//! The platform layer translates DOM callbacks (selection changes, paste,
//! toolbar clicks, file picker completions) into [`EditorEvent`]s and feeds
//! them to [`EditorSession::handle_event`](crate::session::EditorSession::handle_event).
//! The session answers with [`Effect`]s for the platform to execute.

use web_time::Instant;

use crate::error::{ImportError, UploadError};
use crate::format::FormatCommand;
use crate::hooks::{FileKind, UploadFile};
use crate::style::StyleProperty;
use crate::types::{PathRange, Rect};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    // === Selection ===
    /// The platform selection moved. `range` is `None` when it lies outside
    /// the surface.
    SelectionChanged {
        range: Option<PathRange>,
        /// Bounding rect of the selection in viewport coordinates.
        rect: Option<Rect>,
        /// Selected text, used to decide whether the toolbar shows.
        text: String,
        scroll_x: f64,
        scroll_y: f64,
    },

    // === Clipboard ===
    Paste {
        html: Option<String>,
        text: Option<String>,
        at: Instant,
    },

    // === Styling ===
    ApplyStyle { property: StyleProperty, value: String },
    Format(FormatCommand),

    // === Blocks ===
    InsertHeading(u8),
    InsertParagraph(String),
    InsertTable { rows: u32, cols: u32 },
    ToggleTableForm,
    SetTableRows(Option<u32>),
    SetTableCols(Option<u32>),
    SubmitTableForm,

    // === Files ===
    /// Toolbar asked for a file; the platform opens a picker.
    RequestFile(FileKind),
    /// The picker returned a file.
    FileChosen { kind: FileKind, file: UploadFile },
    UploadFinished {
        kind: FileKind,
        name: String,
        result: Result<String, UploadError>,
    },
    ImportFinished { result: Result<String, ImportError> },

    // === History ===
    Undo,
    Redo,
    SaveState,

    // === Surface ===
    /// The user typed into the live element; adopt its markup. No undo point
    /// is recorded and nothing is re-rendered.
    Input(String),
    ToggleSourceView,
    /// Replace the whole content.
    Load(String),
    /// Make the surface read-only, showing `notice` instead of the content.
    Disable(String),
}

impl EditorEvent {
    /// Whether handling this event may change the surface content.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::SelectionChanged { .. }
                | Self::ToggleTableForm
                | Self::SetTableRows(_)
                | Self::SetTableCols(_)
                | Self::RequestFile(_)
                | Self::ToggleSourceView
                | Self::Disable(_)
        )
    }
}

/// Something the platform must do after an event was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the live element's content. `source` marks the plain-text
    /// source view.
    Render { markup: String, source: bool },
    /// Apply this selection to the platform, or clear it.
    SetSelection(Option<PathRange>),
    OpenFilePicker { kind: FileKind, accept: &'static str },
    /// Hand `file` to the upload hook for `kind`, then feed the resulting
    /// [`EditorEvent::UploadFinished`] back.
    StartUpload { kind: FileKind, file: UploadFile },
    StartImport { file: UploadFile },
    Notify(Notice),
    SetEditable(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Info(String),
}
