//! Clipboard payload extraction.
//!
//! Paste handling reads both flavors from the event's DataTransfer; the core
//! decides which one to use.

use web_time::Instant;

use kalpna_editor_core::EditorEvent;

/// Both flavors a paste event carries. Missing or empty flavors are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub text: Option<String>,
}

impl ClipboardPayload {
    /// Read the payload of a paste event.
    pub fn from_event(evt: &web_sys::ClipboardEvent) -> Self {
        let Some(dt) = evt.clipboard_data() else {
            tracing::debug!(target: "kalpna::paste", "paste event without clipboard data");
            return Self::default();
        };
        let read = |mime: &str| match dt.get_data(mime) {
            Ok(data) if !data.is_empty() => Some(data),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(target: "kalpna::paste", "reading {} failed: {:?}", mime, e);
                None
            }
        };
        Self {
            html: read("text/html"),
            text: read("text/plain"),
        }
    }

    pub fn into_event(self, at: Instant) -> EditorEvent {
        EditorEvent::Paste {
            html: self.html,
            text: self.text,
            at,
        }
    }
}
