use serde::Serialize;

/// Something that went wrong without stopping the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionIssue {
    ThumbnailUnavailable { reason: String },
    /// The returned path may be incomplete or missing.
    CacheCopyFailed { reason: String },
}

/// The result record returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFile {
    pub path: String,
    pub thumbnail: Option<String>,
    /// Milliseconds. Only set for videos, as are the dimensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SelectionIssue>,
}

/// Terminal answer for one request. Every request gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SelectionOutcome {
    Selected(SelectedFile),
    NotImplemented { method: String },
    PermissionDenied { permission: String },
    Cancelled,
    Failed { reason: String },
    TimedOut,
}

impl SelectionOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        match self {
            Self::Selected(file) => Some(file),
            _ => None,
        }
    }
}
