//! The seam between the picker logic and the operating system.

use std::io::Read;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;
use url::Url;

use crate::event::RequestCode;
use crate::media::{Mp4Retriever, MetadataRetriever};
use crate::permission::PermissionState;
use crate::request::MimeFilter;
use crate::resolver::ResourceHandle;
use crate::{Error, Result};

/// First SDK level where `GET_CONTENT` is used instead of `PICK`.
pub const GET_CONTENT_MIN_SDK: u32 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PickerAction {
    Pick,
    GetContent,
}

/// What the OS picker is asked to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerIntent {
    pub action: PickerAction,
    pub mime: MimeFilter,
    pub openable: bool,
    pub initial_dir: Option<PathBuf>,
}

impl PickerIntent {
    pub fn for_host<H: Host + ?Sized>(host: &H, mime: MimeFilter) -> Self {
        let action = match host.sdk_version() {
            Some(sdk) if sdk < GET_CONTENT_MIN_SDK => PickerAction::Pick,
            _ => PickerAction::GetContent,
        };
        Self {
            action,
            mime,
            openable: true,
            initial_dir: host.external_storage_dir(),
        }
    }
}

/// Platform services the picker needs.
///
/// `request_permission` and `launch_picker` only start the interaction; the
/// answer must come back through [`crate::PlatformEvents`] tagged with the same
/// [`RequestCode`]. Everything else is called from a blocking worker thread.
pub trait Host: Send + Sync + 'static {
    fn check_permission(&self, permission: &str) -> PermissionState;

    fn request_permission(&self, permission: &str, code: RequestCode) -> Result<()>;

    fn launch_picker(&self, intent: &PickerIntent, code: RequestCode) -> Result<()>;

    /// Provider `_data` column lookup for a content URI.
    fn query_data_column(&self, uri: &Url) -> Option<PathBuf>;

    fn display_name(&self, handle: &ResourceHandle) -> Option<String>;

    fn external_storage_dir(&self) -> Option<PathBuf>;

    fn open_input(&self, handle: &ResourceHandle) -> std::io::Result<Box<dyn Read + Send>>;

    fn cache_dir(&self) -> PathBuf;

    fn sdk_version(&self) -> Option<u32> {
        None
    }

    fn mime_type_from_extension(&self, ext: &str) -> Option<String> {
        crate::mime::mime_from_extension(ext)
    }

    /// The returned retriever is released when dropped.
    fn open_metadata(&self, path: &Path) -> Result<Box<dyn MetadataRetriever>> {
        Ok(Box::new(Mp4Retriever::open(path)?))
    }

    fn video_frame(&self, _path: &Path) -> Result<DynamicImage> {
        Err(Error::Unsupported("video frame extraction"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;

    #[test]
    fn test_picker_action_follows_sdk_level() {
        let legacy = FakeHost::new().with_sdk_version(GET_CONTENT_MIN_SDK - 1);
        let kitkat = FakeHost::new().with_sdk_version(GET_CONTENT_MIN_SDK);
        let unknown = FakeHost::new();

        let action = |host: &FakeHost| PickerIntent::for_host(host, MimeFilter::new("*/*")).action;
        assert_eq!(action(&legacy), PickerAction::Pick);
        assert_eq!(action(&kitkat), PickerAction::GetContent);
        assert_eq!(action(&unknown), PickerAction::GetContent);
    }

    #[test]
    fn test_intent_opens_in_external_storage() {
        let host = FakeHost::new()
            .with_sdk_version(30)
            .with_external_storage("/storage/emulated/0");
        let intent = PickerIntent::for_host(&host, MimeFilter::new("application/pdf"));
        assert_eq!(intent.initial_dir, host.external_storage_dir());
        assert_eq!(intent.initial_dir, Some(PathBuf::from("/storage/emulated/0")));
        assert_eq!(intent.mime.as_str(), "application/pdf");
        assert!(intent.openable);

        let bare = PickerIntent::for_host(&FakeHost::new(), MimeFilter::new("video/*"));
        assert_eq!(bare.initial_dir, None);
    }
}
