//! File picker bridge core.
//!
//! A caller asks for a file kind (`"PDF"`, `"VIDEO"`, `"ANY"` or `"__CUSTOM_<ext>"`);
//! the picker checks storage permission, shows the OS chooser through a [`Host`],
//! and turns the single selection into a [`SelectedFile`] with a local path and,
//! for videos, duration, display dimensions and a thumbnail.

pub mod cache;
pub mod config;
mod error;
pub mod event;
pub mod host;
pub mod media;
pub mod mime;
pub mod orchestrator;
pub mod outcome;
pub mod permission;
pub mod request;
pub mod resolver;
pub mod thumbnail;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use cache::RangedReader;
pub use config::PickerConfig;
pub use error::{Error, Result};
pub use event::{platform_channel, ActivityStatus, EventInbox, PlatformEvent, PlatformEvents, RequestCode};
pub use host::{Host, PickerAction, PickerIntent};
pub use media::{FieldRetriever, MediaInfo, MetadataKey, MetadataRetriever};
pub use orchestrator::{EventDriver, FilePicker, SelectionState};
pub use outcome::{SelectedFile, SelectionIssue, SelectionOutcome};
pub use permission::PermissionState;
pub use request::{resolve_type, MimeFilter, SelectionRequest, CUSTOM_MARKER};
pub use resolver::ResourceHandle;
