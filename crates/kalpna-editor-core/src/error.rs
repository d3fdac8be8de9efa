use thiserror::Error;

use crate::hooks::FileKind;

/// Errors surfaced to the user. Selection problems never end up here; they
/// fall back to appending at the end of the surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditorError {
    #[error("please enter valid rows and columns (got {rows} x {cols})")]
    InvalidTableDimensions { rows: u32, cols: u32 },

    #[error("heading level must be between 1 and 6, got {0}")]
    InvalidHeadingLevel(u8),

    #[error("{kind} upload failed: {source}")]
    Upload {
        kind: FileKind,
        #[source]
        source: UploadError,
    },

    #[error("document import failed: {0}")]
    Import(#[from] ImportError),

    #[error("the editor is read-only")]
    ReadOnly,

    #[error("switch back to the rendered view to edit")]
    SourceView,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("no {0} upload handler is configured")]
    HookMissing(FileKind),

    #[error("{0}")]
    Rejected(String),

    #[error("the upload returned no address")]
    EmptyAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("no import handler is configured")]
    HookMissing,

    #[error("{0}")]
    Rejected(String),
}
