//! Selection state machine: request → permission → picker → one callback → result.
//!
//! Each request gets its own [`RequestCode`]; OS callbacks arrive as
//! [`PlatformEvent`]s on the inbox consumed by [`EventDriver::run`], so any
//! number of selections can be in flight at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::PickerConfig;
use crate::event::{ActivityStatus, EventInbox, PlatformEvent, RequestCode};
use crate::host::{Host, PickerIntent};
use crate::outcome::{SelectedFile, SelectionIssue, SelectionOutcome};
use crate::permission::{self, GateDecision, PermissionState};
use crate::request::{resolve_type, MimeFilter};
use crate::resolver::{self, ResourceHandle};
use crate::{cache, media, mime, thumbnail};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionState {
    Idle,
    Resolving,
    AwaitingPermission,
    AwaitingUserSelection,
    /// A file was picked and the result record is being built.
    Assembling,
    Completed,
}

struct PendingSelection {
    filter: MimeFilter,
    state: SelectionState,
    reply: oneshot::Sender<SelectionOutcome>,
}

struct Shared<H: Host> {
    host: Arc<H>,
    config: PickerConfig,
    pending: Mutex<HashMap<RequestCode, PendingSelection>>,
    next_code: AtomicI32,
}

impl<H: Host> Shared<H> {
    fn pending(&self) -> MutexGuard<'_, HashMap<RequestCode, PendingSelection>> {
        // a poisoned map still holds valid entries
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self, code: RequestCode) -> Option<SelectionState> {
        self.pending().get(&code).map(|p| p.state)
    }

    fn set_state(&self, code: RequestCode, state: SelectionState) -> bool {
        match self.pending().get_mut(&code) {
            Some(p) => {
                p.state = state;
                true
            }
            None => false,
        }
    }

    fn take(&self, code: RequestCode) -> Option<PendingSelection> {
        self.pending().remove(&code)
    }

    /// Marks a waiting selection as assembling and hands back its filter.
    fn start_assembly(&self, code: RequestCode) -> Option<MimeFilter> {
        let mut pending = self.pending();
        let p = pending.get_mut(&code)?;
        if p.state != SelectionState::AwaitingUserSelection {
            return None;
        }
        p.state = SelectionState::Assembling;
        Some(p.filter.clone())
    }

    /// Drops a selection that ran out of time. One that is already assembling
    /// is left to finish and `false` is returned.
    fn expire(&self, code: RequestCode) -> bool {
        let mut pending = self.pending();
        match pending.get(&code) {
            Some(p) if p.state != SelectionState::Assembling => {
                pending.remove(&code);
                true
            }
            _ => false,
        }
    }

    fn finish(&self, code: RequestCode, outcome: SelectionOutcome) {
        match self.take(code) {
            Some(p) => {
                tracing::debug!(%code, ?outcome, "selection finished");
                let _ = p.reply.send(outcome);
            }
            None => tracing::warn!(%code, "no pending selection to finish"),
        }
    }

    fn launch(&self, code: RequestCode) {
        let filter = match self.pending().get_mut(&code) {
            Some(p) => {
                p.state = SelectionState::AwaitingUserSelection;
                p.filter.clone()
            }
            None => return,
        };
        let intent = PickerIntent::for_host(self.host.as_ref(), filter);
        tracing::debug!(%code, mime = %intent.mime, action = ?intent.action, "launching picker");
        if let Err(e) = self.host.launch_picker(&intent, code) {
            tracing::warn!(%code, error = %e, "failed to launch picker");
            self.finish(code, SelectionOutcome::failed(format!("failed to launch picker: {e}")));
        }
    }

    fn authorize_and_launch(&self, code: RequestCode) {
        self.set_state(code, SelectionState::AwaitingPermission);
        match permission::ensure(self.host.as_ref(), &self.config.permission, code) {
            Ok(GateDecision::Granted) => self.launch(code),
            Ok(GateDecision::RequestIssued) => {}
            Err(e) => self.finish(
                code,
                SelectionOutcome::failed(format!("failed to request permission: {e}")),
            ),
        }
    }
}

/// Front door for selection requests. Cheap to clone.
pub struct FilePicker<H: Host> {
    shared: Arc<Shared<H>>,
}

impl<H: Host> Clone for FilePicker<H> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Consumes platform events; run it on the async runtime for the picker's lifetime.
pub struct EventDriver<H: Host> {
    shared: Arc<Shared<H>>,
    inbox: EventInbox,
}

impl<H: Host> FilePicker<H> {
    pub fn new(host: Arc<H>, config: PickerConfig, inbox: EventInbox) -> (Self, EventDriver<H>) {
        let shared = Arc::new(Shared {
            host,
            next_code: AtomicI32::new(config.request_code_base),
            config,
            pending: Mutex::new(HashMap::new()),
        });
        (
            Self {
                shared: shared.clone(),
            },
            EventDriver { shared, inbox },
        )
    }

    pub fn config(&self) -> &PickerConfig {
        &self.shared.config
    }

    pub fn host(&self) -> &Arc<H> {
        &self.shared.host
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending().len()
    }

    /// Codes are handed out in increasing order, so a code below the next one
    /// that is no longer pending has completed.
    pub fn state(&self, code: RequestCode) -> SelectionState {
        if let Some(state) = self.shared.state(code) {
            return state;
        }
        let issued = self.shared.config.request_code_base..self.shared.next_code.load(Ordering::Relaxed);
        if issued.contains(&code.0) {
            SelectionState::Completed
        } else {
            SelectionState::Idle
        }
    }

    /// Runs one selection to its terminal outcome.
    pub async fn handle_request(&self, method: &str) -> SelectionOutcome {
        let host = self.shared.host.clone();
        let Some(filter) = resolve_type(method, |ext| host.mime_type_from_extension(ext)) else {
            tracing::info!(method, "unsupported selection request");
            return SelectionOutcome::NotImplemented {
                method: method.to_string(),
            };
        };
        let (code, mut rx) = self.begin(filter);
        self.shared.authorize_and_launch(code);

        let answer = match self.shared.config.selection_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
                Ok(answer) => answer,
                Err(_) if self.shared.expire(code) => {
                    tracing::warn!(%code, "selection timed out");
                    return SelectionOutcome::TimedOut;
                }
                Err(_) => {
                    tracing::debug!(%code, "timeout reached while assembling, waiting for the result");
                    rx.await
                }
            },
            None => rx.await,
        };
        answer.unwrap_or_else(|_| SelectionOutcome::failed("selection abandoned before completion"))
    }

    fn begin(&self, filter: MimeFilter) -> (RequestCode, oneshot::Receiver<SelectionOutcome>) {
        let code = RequestCode(self.shared.next_code.fetch_add(1, Ordering::Relaxed));
        let (reply, rx) = oneshot::channel();
        tracing::info!(%code, mime = %filter, "selection started");
        self.shared.pending().insert(
            code,
            PendingSelection {
                filter,
                state: SelectionState::Resolving,
                reply,
            },
        );
        (code, rx)
    }
}

impl<H: Host> EventDriver<H> {
    /// Returns when every [`crate::PlatformEvents`] sender is gone. Selections
    /// still waiting on the platform at that point are answered with `Failed`;
    /// ones already assembling finish on their own.
    pub async fn run(mut self) {
        while let Some(event) = self.inbox.0.recv().await {
            self.dispatch(event);
        }
        let abandoned: Vec<_> = {
            let mut pending = self.shared.pending();
            let codes: Vec<_> = pending
                .iter()
                .filter(|(_, p)| p.state != SelectionState::Assembling)
                .map(|(code, _)| *code)
                .collect();
            let taken: Vec<_> = codes
                .into_iter()
                .filter_map(|code| pending.remove(&code).map(|p| (code, p)))
                .collect();
            taken
        };
        for (code, p) in abandoned {
            tracing::warn!(%code, "platform events closed with selection pending");
            let _ = p.reply.send(SelectionOutcome::failed("platform event channel closed"));
        }
    }

    fn dispatch(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::PermissionResult {
                request_code,
                grants,
            } => self.on_permission_result(request_code, &grants),
            PlatformEvent::ActivityResult {
                request_code,
                status,
                data,
            } => self.on_activity_result(request_code, status, data),
            PlatformEvent::Failure {
                request_code,
                reason,
            } => self.on_failure(request_code, reason),
        }
    }

    fn on_permission_result(&self, code: RequestCode, grants: &[PermissionState]) {
        if self.shared.state(code) != Some(SelectionState::AwaitingPermission) {
            tracing::warn!(%code, "ignoring permission result for unknown request");
            return;
        }
        if permission::is_granted(grants) {
            tracing::info!(%code, "permission granted");
            self.shared.launch(code);
        } else {
            tracing::info!(%code, "permission denied");
            self.shared.finish(
                code,
                SelectionOutcome::PermissionDenied {
                    permission: self.shared.config.permission.clone(),
                },
            );
        }
    }

    fn on_activity_result(&self, code: RequestCode, status: ActivityStatus, data: Option<ResourceHandle>) {
        if self.shared.state(code) != Some(SelectionState::AwaitingUserSelection) {
            tracing::warn!(%code, ?status, "ignoring activity result for unknown request");
            return;
        }
        if status != ActivityStatus::Ok {
            tracing::info!(%code, ?status, "picker closed without a selection");
            self.shared.finish(code, SelectionOutcome::Cancelled);
            return;
        }
        let Some(handle) = data else {
            self.shared
                .finish(code, SelectionOutcome::failed("picker returned no data"));
            return;
        };
        let Some(filter) = self.shared.start_assembly(code) else {
            return;
        };
        tracing::info!(%code, uri = %handle, "picker returned");

        let shared = self.shared.clone();
        tokio::spawn(async move {
            let worker = shared.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                assemble(worker.host.as_ref(), &worker.config, &handle, &filter)
            })
            .await
            .unwrap_or_else(|e| SelectionOutcome::failed(format!("selection worker failed: {e}")));
            shared.finish(code, outcome);
        });
    }

    fn on_failure(&self, code: RequestCode, reason: String) {
        match self.shared.state(code) {
            Some(SelectionState::AwaitingPermission | SelectionState::AwaitingUserSelection) => {
                tracing::warn!(%code, %reason, "platform reported a failure");
                self.shared.finish(code, SelectionOutcome::failed(reason));
            }
            _ => tracing::warn!(%code, %reason, "ignoring failure for unknown request"),
        }
    }
}

fn is_video<H: Host + ?Sized>(host: &H, path: &Path, filter: &MimeFilter) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => host
            .mime_type_from_extension(ext)
            .map(|m| mime::is_video_mime(&m))
            .unwrap_or(false),
        None => filter.is_video(),
    }
}

/// Turns the picked handle into the result record. Blocking.
pub fn assemble<H: Host + ?Sized>(
    host: &H,
    config: &PickerConfig,
    handle: &ResourceHandle,
    filter: &MimeFilter,
) -> SelectionOutcome {
    let cache_dir = config.cache_dir_in(&host.cache_dir());
    let mut issues = Vec::new();

    let path: PathBuf = match resolver::resolve(host, handle) {
        Some(p) => p,
        None => {
            let name = resolver::display_name(host, handle);
            let dest = cache::destination(&cache_dir, &name);
            if let Err(e) = cache::materialize(host, handle, &dest, config.copy_chunk_size) {
                tracing::warn!(uri = %handle, path = %dest.display(), error = %e, "caching picked file failed");
                issues.push(SelectionIssue::CacheCopyFailed {
                    reason: e.to_string(),
                });
            }
            dest
        }
    };
    tracing::info!(path = %path.display(), "absolute file path");

    let mut file = SelectedFile {
        path: path.to_string_lossy().into_owned(),
        thumbnail: None,
        duration: None,
        width: None,
        height: None,
        issues,
    };
    if !is_video(host, &path, filter) {
        return SelectionOutcome::Selected(file);
    }

    let info = match media::inspect(host, &path) {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "reading video metadata failed");
            return SelectionOutcome::failed(format!("unreadable video metadata: {e}"));
        }
    };
    file.duration = Some(info.duration_ms);
    file.width = Some(info.width);
    file.height = Some(info.height);

    match thumbnail::generate(
        host,
        &path,
        &cache_dir,
        config.thumbnail_width,
        config.thumbnail_height,
    ) {
        Ok(t) => file.thumbnail = Some(t.to_string_lossy().into_owned()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "thumbnail generation failed");
            file.issues.push(SelectionIssue::ThumbnailUnavailable {
                reason: e.to_string(),
            });
        }
    }
    SelectionOutcome::Selected(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::platform_channel;
    use crate::media::{FieldRetriever, MetadataKey};
    use crate::test_support::FakeHost;

    fn video_fields() -> FieldRetriever {
        FieldRetriever::new()
            .with(MetadataKey::Duration, "3000")
            .with(MetadataKey::VideoWidth, "640")
            .with(MetadataKey::VideoHeight, "480")
    }

    #[test]
    fn test_assemble_non_video_skips_inspection() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new().with_cache_dir(dir.path());
        let handle = ResourceHandle::new("/sdcard/Download/report.pdf");
        let out = assemble(&host, &PickerConfig::default(), &handle, &MimeFilter::new("application/pdf"));
        let file = out.selected().unwrap();
        assert_eq!(file.path, "/sdcard/Download/report.pdf");
        assert_eq!((file.duration, file.thumbnail.as_deref()), (None, None));
        assert_eq!(host.metadata_opens(), 0);
    }

    #[test]
    fn test_assemble_cloud_copy_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new().with_cache_dir(dir.path());
        let handle = ResourceHandle::new("content://cloud.provider/document/missing.csv");
        let out = assemble(&host, &PickerConfig::default(), &handle, &MimeFilter::new("text/csv"));
        let file = out.selected().unwrap();
        assert_eq!(PathBuf::from(&file.path), dir.path().join("missing.csv"));
        assert!(matches!(file.issues[..], [SelectionIssue::CacheCopyFailed { .. }]));
    }

    #[test]
    fn test_assemble_video_without_frame_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new().with_cache_dir(dir.path());
        host.set_metadata(video_fields().with(MetadataKey::VideoRotation, "270"));
        let handle = ResourceHandle::new("/sdcard/DCIM/a.mp4");
        let out = assemble(&host, &PickerConfig::default(), &handle, &MimeFilter::new("video/*"));
        let file = out.selected().unwrap();
        assert_eq!((file.width, file.height, file.duration), (Some(480), Some(640), Some(3000)));
        assert!(file.thumbnail.is_none());
        assert!(matches!(file.issues[..], [SelectionIssue::ThumbnailUnavailable { .. }]));
        assert_eq!(host.metadata_releases(), 1);
    }

    #[test]
    fn test_assemble_bad_metadata_fails() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new().with_cache_dir(dir.path());
        host.set_metadata(FieldRetriever::new().with(MetadataKey::Duration, "n/a"));
        let handle = ResourceHandle::new("/sdcard/DCIM/a.mp4");
        let out = assemble(&host, &PickerConfig::default(), &handle, &MimeFilter::new("video/*"));
        assert!(matches!(out, SelectionOutcome::Failed { .. }));
        assert_eq!(host.metadata_releases(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_their_own_answers() {
        let (events, inbox) = platform_channel();
        let host = Arc::new(FakeHost::new());
        let (picker, driver) = FilePicker::new(host.clone(), PickerConfig::default(), inbox);
        tokio::spawn(driver.run());

        let a = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("PDF").await }
        });
        let b = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("ANY").await }
        });
        let launches = host.wait_for_launches(2).await;
        assert_eq!(picker.pending_count(), 2);

        let pdf = launches.iter().find(|(i, _)| i.mime.as_str() == "application/pdf").unwrap().1;
        let any = launches.iter().find(|(i, _)| i.mime.as_str() == "*/*").unwrap().1;
        assert_ne!(pdf, any);
        assert_eq!(picker.state(pdf), SelectionState::AwaitingUserSelection);
        assert_eq!(picker.state(RequestCode(pdf.0 + 100)), SelectionState::Idle);

        events.activity_result(any, ActivityStatus::Canceled, None);
        events.activity_result(pdf, ActivityStatus::Ok, Some(ResourceHandle::new("/sdcard/a.pdf")));

        let a = a.await.unwrap();
        assert_eq!(a.selected().unwrap().path, "/sdcard/a.pdf");
        assert_eq!(b.await.unwrap(), SelectionOutcome::Cancelled);
        assert_eq!(picker.pending_count(), 0);
        assert_eq!(picker.state(pdf), SelectionState::Completed);
    }

    #[tokio::test]
    async fn test_mismatched_code_is_ignored() {
        let (events, inbox) = platform_channel();
        let host = Arc::new(FakeHost::new());
        let config = PickerConfig {
            selection_timeout_secs: Some(1),
            ..PickerConfig::default()
        };
        let (picker, driver) = FilePicker::new(host.clone(), config, inbox);
        tokio::spawn(driver.run());

        let task = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("VIDEO").await }
        });
        let code = host.wait_for_launches(1).await[0].1;
        events.activity_result(RequestCode(code.0 + 1000), ActivityStatus::Ok, Some(ResourceHandle::new("/x.mp4")));
        events.permission_result(code, vec![PermissionState::Granted]);

        assert_eq!(task.await.unwrap(), SelectionOutcome::TimedOut);
        assert_eq!(picker.pending_count(), 0);
        assert_eq!(host.launches().len(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let (_events, inbox) = platform_channel();
        let host = Arc::new(FakeHost::new());
        host.fail_launches();
        let (picker, driver) = FilePicker::new(host, PickerConfig::default(), inbox);
        tokio::spawn(driver.run());
        assert!(matches!(picker.handle_request("ANY").await, SelectionOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_platform_failure_is_not_a_cancel() {
        let (events, inbox) = platform_channel();
        let host = Arc::new(FakeHost::new());
        let (picker, driver) = FilePicker::new(host.clone(), PickerConfig::default(), inbox);
        tokio::spawn(driver.run());

        let broken = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("PDF").await }
        });
        let code = host.wait_for_launches(1).await[0].1;
        events.failure(code, "launchPicker rejected: no activity");
        assert_eq!(
            broken.await.unwrap(),
            SelectionOutcome::failed("launchPicker rejected: no activity")
        );

        let closed = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("PDF").await }
        });
        let code = host.wait_for_launches(2).await[1].1;
        events.activity_result(code, ActivityStatus::Canceled, None);
        assert_eq!(closed.await.unwrap(), SelectionOutcome::Cancelled);
        assert_eq!(picker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_assembly_outlives_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let (events, inbox) = platform_channel();
        let host = Arc::new(FakeHost::new().with_cache_dir(dir.path()));
        let handle = ResourceHandle::new("content://cloud.provider/document/slow");
        host.set_display_name(&handle, "notes.txt");
        host.set_content(&handle, b"slow but complete".to_vec());
        host.set_input_delay(std::time::Duration::from_millis(1500));
        let config = PickerConfig {
            selection_timeout_secs: Some(1),
            ..PickerConfig::default()
        };
        let (picker, driver) = FilePicker::new(host.clone(), config, inbox);
        tokio::spawn(driver.run());

        let task = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("ANY").await }
        });
        let code = host.wait_for_launches(1).await[0].1;
        events.activity_result(code, ActivityStatus::Ok, Some(handle));
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(picker.state(code), SelectionState::Assembling);
        // a second answer for the same code is ignored
        events.activity_result(code, ActivityStatus::Canceled, None);

        let out = task.await.unwrap();
        let file = out.selected().unwrap();
        assert_eq!(PathBuf::from(&file.path), dir.path().join("notes.txt"));
        assert_eq!(std::fs::read(dir.path().join("notes.txt")).unwrap(), b"slow but complete");
        assert_eq!(picker.state(code), SelectionState::Completed);
        assert_eq!(picker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_driver_shutdown_answers_pending() {
        let (events, inbox) = platform_channel();
        let host = Arc::new(FakeHost::new());
        let (picker, driver) = FilePicker::new(host.clone(), PickerConfig::default(), inbox);
        let driver = tokio::spawn(driver.run());

        let task = tokio::spawn({
            let picker = picker.clone();
            async move { picker.handle_request("PDF").await }
        });
        host.wait_for_launches(1).await;
        drop(events);
        driver.await.unwrap();
        assert!(matches!(task.await.unwrap(), SelectionOutcome::Failed { .. }));
    }
}
