//! Maps an opaque resource handle to a local filesystem path.

use std::fmt;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::host::Host;

const EXTERNAL_STORAGE_DOCUMENTS: &str = "com.android.externalstorage.documents";
const DOWNLOADS_DOCUMENTS: &str = "com.android.providers.downloads.documents";
const MEDIA_DOCUMENTS: &str = "com.android.providers.media.documents";

pub const FALLBACK_DISPLAY_NAME: &str = "picked-file";

/// The URI the OS returned for the user's selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for ResourceHandle {
    fn from(path: &Path) -> Self {
        match Url::from_file_path(path) {
            Ok(url) => Self(url.to_string()),
            Err(()) => Self(path.to_string_lossy().into_owned()),
        }
    }
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Decoded id following the `document` path segment.
fn document_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "document")?;
    segments.next().filter(|s| !s.is_empty()).map(decode)
}

fn content_uri(s: &str) -> Option<Url> {
    Url::parse(s).ok()
}

fn resolve_document<H: Host + ?Sized>(host: &H, authority: &str, url: &Url) -> Option<PathBuf> {
    match authority {
        EXTERNAL_STORAGE_DOCUMENTS => {
            let id = document_id(url)?;
            let (volume, rel) = id.split_once(':')?;
            if volume.eq_ignore_ascii_case("primary") {
                Some(host.external_storage_dir()?.join(rel))
            } else {
                Some(PathBuf::from("/storage").join(volume).join(rel))
            }
        }
        DOWNLOADS_DOCUMENTS => {
            let id = document_id(url)?;
            if let Some(raw) = id.strip_prefix("raw:") {
                return Some(PathBuf::from(raw));
            }
            let n: u64 = id.parse().ok()?;
            host.query_data_column(&content_uri(&format!("content://downloads/public_downloads/{n}"))?)
        }
        MEDIA_DOCUMENTS => {
            let id = document_id(url)?;
            let (kind, n) = id.split_once(':')?;
            let table = match kind {
                "image" => "images",
                "video" => "video",
                "audio" => "audio",
                _ => return None,
            };
            host.query_data_column(&content_uri(&format!("content://media/external/{table}/media/{n}"))?)
        }
        _ => host.query_data_column(url),
    }
}

/// `None` means the content has no local path and must be materialized.
pub fn resolve<H: Host + ?Sized>(host: &H, handle: &ResourceHandle) -> Option<PathBuf> {
    let Some(url) = handle.url() else {
        let p = Path::new(handle.as_str());
        return p.is_absolute().then(|| p.to_path_buf());
    };
    let path = match url.scheme() {
        "file" => url.to_file_path().ok(),
        "content" => match url.host_str() {
            Some(authority) => resolve_document(host, authority, &url),
            None => None,
        },
        _ => None,
    };
    tracing::debug!(handle = %handle, path = ?path, "resolved resource handle");
    path
}

/// Provider display name, else the last decoded path segment. Never contains a separator.
pub fn display_name<H: Host + ?Sized>(host: &H, handle: &ResourceHandle) -> String {
    let raw = host.display_name(handle).or_else(|| {
        let s = handle.as_str();
        let tail = s.rsplit(|c| c == '/' || c == ':').next().unwrap_or(s);
        Some(decode(tail))
    });
    let name = raw
        .as_deref()
        .and_then(|n| n.rsplit(|c| c == '/' || c == '\\').next())
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}
