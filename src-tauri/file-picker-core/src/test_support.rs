//! In-memory [`Host`] for tests.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::DynamicImage;
use url::Url;

use crate::cache::RangedReader;
use crate::event::{PlatformEvents, RequestCode};
use crate::host::{Host, PickerIntent};
use crate::media::{FieldRetriever, MetadataKey, MetadataRetriever};
use crate::permission::PermissionState;
use crate::resolver::ResourceHandle;
use crate::{Error, Result};

/// What the fake "user" does when the picker or permission prompt shows.
/// Without a matching script the callback is left to the test.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer the permission prompt.
    Permission(PermissionState),
    /// Pick this handle as soon as the picker opens.
    Pick(ResourceHandle),
}

#[derive(Default)]
struct State {
    permission: Option<PermissionState>,
    permission_requests: Vec<(String, RequestCode)>,
    launches: Vec<(PickerIntent, RequestCode)>,
    data_columns: HashMap<String, PathBuf>,
    display_names: HashMap<ResourceHandle, String>,
    contents: HashMap<ResourceHandle, Arc<Vec<u8>>>,
    frame: Option<DynamicImage>,
    metadata: Option<FieldRetriever>,
    scripts: Vec<Script>,
}

pub struct FakeHost {
    state: Mutex<State>,
    cache_dir: PathBuf,
    external_storage: Option<PathBuf>,
    sdk_version: Option<u32>,
    input_delay: Mutex<Option<Duration>>,
    input_ranges: Arc<Mutex<Vec<(u64, usize)>>>,
    events: Mutex<Option<PlatformEvents>>,
    fail_launch: AtomicBool,
    metadata_opens: AtomicUsize,
    metadata_releases: Arc<AtomicUsize>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            cache_dir: std::env::temp_dir().join("file-picker-fake-host"),
            external_storage: None,
            sdk_version: None,
            input_delay: Mutex::new(None),
            input_ranges: Arc::new(Mutex::new(Vec::new())),
            events: Mutex::new(None),
            fail_launch: AtomicBool::new(false),
            metadata_opens: AtomicUsize::new(0),
            metadata_releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_external_storage(mut self, dir: impl Into<PathBuf>) -> Self {
        self.external_storage = Some(dir.into());
        self
    }

    pub fn with_sdk_version(mut self, sdk: u32) -> Self {
        self.sdk_version = Some(sdk);
        self
    }

    pub fn with_data_column(self, uri: &str, path: impl Into<PathBuf>) -> Self {
        self.state().data_columns.insert(uri.to_string(), path.into());
        self
    }

    /// Lets scripted answers be sent back through the event channel.
    pub fn attach(&self, events: PlatformEvents) {
        *self.events.lock().unwrap() = Some(events);
    }

    /// Queued answers, consumed one per prompt or picker launch.
    pub fn script(&self, steps: impl IntoIterator<Item = Script>) {
        self.state().scripts.extend(steps);
    }

    pub fn set_permission(&self, state: PermissionState) {
        self.state().permission = Some(state);
    }

    pub fn set_display_name(&self, handle: &ResourceHandle, name: &str) {
        self.state().display_names.insert(handle.clone(), name.to_string());
    }

    pub fn set_content(&self, handle: &ResourceHandle, bytes: Vec<u8>) {
        self.state().contents.insert(handle.clone(), Arc::new(bytes));
    }

    /// Makes every `open_input` block for `delay`, like a slow cloud provider.
    pub fn set_input_delay(&self, delay: Duration) {
        *self.input_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_frame(&self, frame: DynamicImage) {
        self.state().frame = Some(frame);
    }

    pub fn set_metadata(&self, fields: FieldRetriever) {
        self.state().metadata = Some(fields);
    }

    pub fn fail_launches(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    pub fn permission_requests(&self) -> Vec<(String, RequestCode)> {
        self.state().permission_requests.clone()
    }

    pub fn launches(&self) -> Vec<(PickerIntent, RequestCode)> {
        self.state().launches.clone()
    }

    /// `(offset, len)` of every range served through `open_input`.
    pub fn input_ranges(&self) -> Vec<(u64, usize)> {
        self.input_ranges.lock().unwrap().clone()
    }

    pub fn metadata_opens(&self) -> usize {
        self.metadata_opens.load(Ordering::SeqCst)
    }

    pub fn metadata_releases(&self) -> usize {
        self.metadata_releases.load(Ordering::SeqCst)
    }

    /// Polls until at least `n` pickers were launched. Panics after five seconds.
    pub async fn wait_for_launches(&self, n: usize) -> Vec<(PickerIntent, RequestCode)> {
        for _ in 0..500 {
            let launches = self.launches();
            if launches.len() >= n {
                return launches;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} picker launches, saw {}", self.launches().len());
    }

    /// Removes and returns the first queued answer accepted by `wanted`.
    fn next_script(&self, wanted: impl Fn(&Script) -> bool) -> Option<Script> {
        let mut state = self.state();
        let idx = state.scripts.iter().position(wanted)?;
        Some(state.scripts.remove(idx))
    }

    fn events(&self) -> Option<PlatformEvents> {
        self.events.lock().unwrap().clone()
    }
}

struct TrackedRetriever {
    fields: FieldRetriever,
    releases: Arc<AtomicUsize>,
}

impl MetadataRetriever for TrackedRetriever {
    fn extract(&self, key: MetadataKey) -> Option<String> {
        self.fields.extract(key)
    }
}

impl Drop for TrackedRetriever {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl Host for FakeHost {
    fn check_permission(&self, _permission: &str) -> PermissionState {
        self.state().permission.unwrap_or(PermissionState::Granted)
    }

    fn request_permission(&self, permission: &str, code: RequestCode) -> Result<()> {
        self.state()
            .permission_requests
            .push((permission.to_string(), code));
        let script = self.next_script(|s| matches!(s, Script::Permission(_)));
        if let (Some(Script::Permission(answer)), Some(events)) = (script, self.events()) {
            if answer == PermissionState::Granted {
                self.state().permission = Some(PermissionState::Granted);
            }
            events.permission_result(code, vec![answer]);
        }
        Ok(())
    }

    fn launch_picker(&self, intent: &PickerIntent, code: RequestCode) -> Result<()> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(Error::Host("no activity to handle picker intent".into()));
        }
        self.state().launches.push((intent.clone(), code));
        let script = self.next_script(|s| matches!(s, Script::Pick(_)));
        if let (Some(Script::Pick(handle)), Some(events)) = (script, self.events()) {
            events.activity_result(code, crate::event::ActivityStatus::Ok, Some(handle));
        }
        Ok(())
    }

    fn query_data_column(&self, uri: &Url) -> Option<PathBuf> {
        self.state().data_columns.get(uri.as_str()).cloned()
    }

    fn display_name(&self, handle: &ResourceHandle) -> Option<String> {
        self.state().display_names.get(handle).cloned()
    }

    fn external_storage_dir(&self) -> Option<PathBuf> {
        self.external_storage.clone()
    }

    fn open_input(&self, handle: &ResourceHandle) -> std::io::Result<Box<dyn Read + Send>> {
        let delay = *self.input_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let content = self.state().contents.get(handle).cloned();
        match content {
            Some(bytes) => {
                let ranges = self.input_ranges.clone();
                Ok(Box::new(RangedReader::new(move |offset: u64, len: usize| {
                    ranges.lock().unwrap().push((offset, len));
                    let start = (offset as usize).min(bytes.len());
                    let end = start.saturating_add(len).min(bytes.len());
                    Ok::<_, std::io::Error>(bytes[start..end].to_vec())
                })))
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no content behind {handle}"),
            )),
        }
    }

    fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    fn sdk_version(&self) -> Option<u32> {
        self.sdk_version
    }

    fn open_metadata(&self, _path: &Path) -> Result<Box<dyn MetadataRetriever>> {
        self.metadata_opens.fetch_add(1, Ordering::SeqCst);
        let fields = self
            .state()
            .metadata
            .clone()
            .ok_or(Error::Unsupported("metadata retrieval"))?;
        Ok(Box::new(TrackedRetriever {
            fields,
            releases: self.metadata_releases.clone(),
        }))
    }

    fn video_frame(&self, _path: &Path) -> Result<DynamicImage> {
        self.state()
            .frame
            .clone()
            .ok_or(Error::Unsupported("video frame extraction"))
    }
}
