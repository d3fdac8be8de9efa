//! Host-supplied upload and import capabilities.
//!
//! The core never talks to the network. The host hands in async functions
//! that turn a file into a retrieval address (uploads) or into markup
//! (legacy document import). [`run_upload`] and [`run_import`] wrap a call to
//! one of them into a future that resolves to the [`EditorEvent`] the session
//! consumes, so the session is never borrowed across an await point.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, UploadError};
use crate::events::EditorEvent;

/// Binary payload handed to a hook.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// What the file picker is asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    Image,
    Pdf,
    LegacyDocument,
}

impl FileKind {
    /// Value for the picker's `accept` attribute.
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Image => "image/*",
            Self::Pdf => "application/pdf",
            Self::LegacyDocument => {
                ".doc,.docx,application/msword,application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Self::Image),
            "pdf" => Some(Self::Pdf),
            "document" | "legacyDocument" | "doc" => Some(Self::LegacyDocument),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::LegacyDocument => "document",
        })
    }
}

/// A host capability: file in, string out, or a rejection message.
pub type HookFn = Rc<dyn Fn(UploadFile) -> LocalBoxFuture<'static, Result<String, String>>>;

/// The optional capabilities supplied by the host.
#[derive(Clone, Default)]
pub struct HostHooks {
    pub image: Option<HookFn>,
    pub pdf: Option<HookFn>,
    pub import: Option<HookFn>,
}

fn boxed_hook<F, Fut>(hook: F) -> HookFn
where
    F: Fn(UploadFile) -> Fut + 'static,
    Fut: Future<Output = Result<String, String>> + 'static,
{
    Rc::new(move |file| hook(file).boxed_local())
}

impl HostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(UploadFile) -> Fut + 'static,
        Fut: Future<Output = Result<String, String>> + 'static,
    {
        self.image = Some(boxed_hook(hook));
        self
    }

    pub fn with_pdf<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(UploadFile) -> Fut + 'static,
        Fut: Future<Output = Result<String, String>> + 'static,
    {
        self.pdf = Some(boxed_hook(hook));
        self
    }

    pub fn with_import<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(UploadFile) -> Fut + 'static,
        Fut: Future<Output = Result<String, String>> + 'static,
    {
        self.import = Some(boxed_hook(hook));
        self
    }

    fn upload_hook(&self, kind: FileKind) -> Option<HookFn> {
        match kind {
            FileKind::Image => self.image.clone(),
            FileKind::Pdf => self.pdf.clone(),
            FileKind::LegacyDocument => None,
        }
    }
}

impl fmt::Debug for HostHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHooks")
            .field("image", &self.image.is_some())
            .field("pdf", &self.pdf.is_some())
            .field("import", &self.import.is_some())
            .finish()
    }
}

/// Upload `file` through the hook for `kind`.
///
/// The returned future owns everything it needs; completions of several
/// uploads may arrive in any order.
pub fn run_upload(
    hooks: &HostHooks,
    kind: FileKind,
    file: UploadFile,
) -> LocalBoxFuture<'static, EditorEvent> {
    let hook = hooks.upload_hook(kind);
    let name = file.name.clone();
    async move {
        let result = match hook {
            None => Err(UploadError::HookMissing(kind)),
            Some(hook) => match hook(file).await {
                Ok(address) if address.trim().is_empty() => Err(UploadError::EmptyAddress),
                Ok(address) => Ok(address),
                Err(message) => Err(UploadError::Rejected(message)),
            },
        };
        if let Err(err) = &result {
            tracing::debug!(target: "kalpna::upload", %kind, %err, "upload failed");
        }
        EditorEvent::UploadFinished { kind, name, result }
    }
    .boxed_local()
}

/// Convert a legacy document into markup through the import hook.
pub fn run_import(hooks: &HostHooks, file: UploadFile) -> LocalBoxFuture<'static, EditorEvent> {
    let hook = hooks.import.clone();
    async move {
        let result = match hook {
            None => Err(ImportError::HookMissing),
            Some(hook) => hook(file).await.map_err(ImportError::Rejected),
        };
        EditorEvent::ImportFinished { result }
    }
    .boxed_local()
}
