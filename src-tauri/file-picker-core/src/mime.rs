//! Extension ↔ MIME lookups shared by request resolution, video detection and
//! the desktop dialog filters.

use std::path::Path;

/// Extensions offered for the `video/*` wildcard, lowercase without the dot.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "3gp", "3g2", "mkv", "webm", "avi", "ts"];

fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Looks up the MIME type registered for `ext`. Case and a leading dot are ignored.
pub fn mime_from_extension(ext: &str) -> Option<String> {
    let e = normalize_ext(ext);
    if e.is_empty() {
        return None;
    }
    mime_guess::from_ext(&e).first_raw().map(str::to_string)
}

#[inline]
pub fn mime_for_path(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(mime_from_extension)
}

#[inline]
pub fn is_video_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("video/")
}

/// Extensions matching a MIME filter, for dialogs that filter by extension.
/// An empty list means "no filter".
pub fn extensions_for_mime(mime: &str) -> Vec<&'static str> {
    let m = mime.trim().to_ascii_lowercase();
    match m.as_str() {
        "*/*" | "" => Vec::new(),
        "video/*" => VIDEO_EXTENSIONS.to_vec(),
        _ => mime_guess::get_mime_extensions_str(&m)
            .map(|exts| exts.to_vec())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        assert_eq!(mime_from_extension("CSV").as_deref(), Some("text/csv"));
        assert_eq!(mime_from_extension(".pdf").as_deref(), Some("application/pdf"));
        assert_eq!(mime_from_extension("Mp4").as_deref(), Some("video/mp4"));
        assert_eq!(mime_from_extension(""), None);
        assert_eq!(mime_from_extension("definitely-not-an-ext"), None);
    }

    #[test]
    fn test_video_detection() {
        assert!(is_video_mime("video/mp4"));
        assert!(is_video_mime("VIDEO/*"));
        assert!(!is_video_mime("text/csv"));
        assert_eq!(
            mime_for_path(Path::new("/sdcard/DCIM/clip.MOV")).as_deref(),
            Some("video/quicktime")
        );
        assert_eq!(mime_for_path(Path::new("/tmp/noext")), None);
    }

    #[test]
    fn test_extensions_for_filters() {
        assert!(extensions_for_mime("*/*").is_empty());
        assert!(extensions_for_mime("video/*").contains(&"mp4"));
        assert!(extensions_for_mime("application/pdf").contains(&"pdf"));
    }
}
