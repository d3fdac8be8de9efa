use serde::{Deserialize, Serialize};

/// Host-provided editor settings. Every field is optional on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// When false the session starts disabled, showing `disabled_notice`.
    pub editable: bool,
    pub disabled_notice: String,
    /// Maximum number of undo snapshots kept.
    pub history_limit: usize,
    /// Window in which a second paste event is ignored.
    pub paste_lock_ms: u64,
    pub source_indent: usize,
    pub source_wrap: usize,
    pub default_font_size: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            editable: true,
            disabled_notice: "Editing is disabled.".to_string(),
            history_limit: 100,
            paste_lock_ms: 50,
            source_indent: 2,
            source_wrap: 80,
            default_font_size: "12px".to_string(),
        }
    }
}
