//! Inbound request kinds and their MIME filters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker prefixing a file extension in a custom request, e.g. `__CUSTOM_csv`.
pub const CUSTOM_MARKER: &str = "__CUSTOM_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRequest {
    Pdf,
    Video,
    Any,
    /// Extension is stored lowercase, without the marker.
    Custom { extension: String },
}

impl SelectionRequest {
    /// Parses an inbound method name. Returns `None` for anything unsupported.
    pub fn from_method(method: &str) -> Option<Self> {
        if method.contains(CUSTOM_MARKER) {
            let extension = method.split(CUSTOM_MARKER).nth(1)?.trim().to_lowercase();
            if extension.is_empty() {
                return None;
            }
            return Some(Self::Custom { extension });
        }
        match method {
            "PDF" => Some(Self::Pdf),
            "VIDEO" => Some(Self::Video),
            "ANY" => Some(Self::Any),
            _ => None,
        }
    }

    /// Resolves the request to a MIME filter; custom kinds go through `lookup`
    /// (the host's extension table).
    pub fn mime_filter(&self, lookup: impl FnOnce(&str) -> Option<String>) -> Option<MimeFilter> {
        match self {
            Self::Pdf => Some(MimeFilter::new("application/pdf")),
            Self::Video => Some(MimeFilter::new("video/*")),
            Self::Any => Some(MimeFilter::new("*/*")),
            Self::Custom { extension } => lookup(extension).map(MimeFilter::new),
        }
    }
}

/// A MIME type or wildcard pattern handed to the OS picker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeFilter(String);

impl MimeFilter {
    pub fn new(mime: impl Into<String>) -> Self {
        Self(mime.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_video(&self) -> bool {
        crate::mime::is_video_mime(&self.0)
    }
}

impl fmt::Display for MimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `method` → MIME filter, or `None` when the request is unsupported.
pub fn resolve_type(method: &str, lookup: impl FnOnce(&str) -> Option<String>) -> Option<MimeFilter> {
    SelectionRequest::from_method(method)?.mime_filter(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::mime_from_extension;

    fn resolve(method: &str) -> Option<String> {
        resolve_type(method, mime_from_extension).map(|m| m.as_str().to_string())
    }

    #[test]
    fn test_builtin_kinds() {
        assert_eq!(resolve("PDF").as_deref(), Some("application/pdf"));
        assert_eq!(resolve("VIDEO").as_deref(), Some("video/*"));
        assert_eq!(resolve("ANY").as_deref(), Some("*/*"));
    }

    #[test]
    fn test_unknown_kinds_are_unsupported() {
        for method in ["XYZ", "pdf", "video", "", "IMAGE", "__CUSTOM"] {
            assert_eq!(resolve(method), None, "{method}");
        }
    }

    #[test]
    fn test_custom_kind_uses_extension_lookup() {
        assert_eq!(resolve("__CUSTOM_csv").as_deref(), Some("text/csv"));
        assert_eq!(resolve("__CUSTOM_CSV").as_deref(), Some("text/csv"));
        assert_eq!(resolve("__CUSTOM_"), None);
        assert_eq!(resolve("__CUSTOM_nosuchext"), None);
        assert_eq!(
            SelectionRequest::from_method("__CUSTOM_Mp4"),
            Some(SelectionRequest::Custom { extension: "mp4".into() })
        );
    }

    #[test]
    fn test_custom_lookup_receives_lowercase_extension() {
        let filter = resolve_type("__CUSTOM_XLSX", |ext| {
            assert_eq!(ext, "xlsx");
            Some("application/x-test".to_string())
        });
        assert_eq!(filter, Some(MimeFilter::new("application/x-test")));
    }
}
