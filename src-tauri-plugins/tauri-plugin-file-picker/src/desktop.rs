use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use file_picker_core::{
  mime, ActivityStatus, Host, PermissionState, PickerIntent, PlatformEvents, RequestCode, ResourceHandle,
};
use serde::de::DeserializeOwned;
use tauri::{plugin::PluginApi, AppHandle, Manager, Runtime};
use tauri_plugin_dialog::DialogExt;
use url::Url;

/// Requires `tauri_plugin_dialog::init()` to be registered by the app.
pub fn init<R: Runtime, C: DeserializeOwned>(
  app: &AppHandle<R>,
  _api: PluginApi<R, C>,
  events: PlatformEvents,
) -> crate::Result<DesktopHost<R>> {
  let cache_dir = app.path().app_cache_dir()?;
  Ok(DesktopHost {
    app: app.clone(),
    events,
    cache_dir,
  })
}

/// [`Host`] over the native file dialog. Desktop has no storage permission to ask for.
pub struct DesktopHost<R: Runtime> {
  app: AppHandle<R>,
  events: PlatformEvents,
  cache_dir: PathBuf,
}

impl<R: Runtime> Host for DesktopHost<R> {
  fn check_permission(&self, _permission: &str) -> PermissionState {
    PermissionState::Granted
  }

  fn request_permission(&self, _permission: &str, code: RequestCode) -> file_picker_core::Result<()> {
    self.events.permission_result(code, vec![PermissionState::Granted]);
    Ok(())
  }

  fn launch_picker(&self, intent: &PickerIntent, code: RequestCode) -> file_picker_core::Result<()> {
    let mut dialog = self.app.dialog().file();
    let exts = mime::extensions_for_mime(intent.mime.as_str());
    if !exts.is_empty() {
      dialog = dialog.add_filter(intent.mime.as_str(), &exts);
    }
    if let Some(dir) = &intent.initial_dir {
      dialog = dialog.set_directory(dir);
    }
    let events = self.events.clone();
    dialog.pick_file(move |picked| {
      let handle = picked
        .and_then(|p| p.into_path().ok())
        .map(|p| ResourceHandle::from(p.as_path()));
      let status = if handle.is_some() {
        ActivityStatus::Ok
      } else {
        ActivityStatus::Canceled
      };
      events.activity_result(code, status, handle);
    });
    Ok(())
  }

  fn query_data_column(&self, _uri: &Url) -> Option<PathBuf> {
    None
  }

  fn display_name(&self, _handle: &ResourceHandle) -> Option<String> {
    None
  }

  fn external_storage_dir(&self) -> Option<PathBuf> {
    self.app.path().home_dir().ok()
  }

  fn open_input(&self, handle: &ResourceHandle) -> std::io::Result<Box<dyn Read + Send>> {
    let path = handle
      .url()
      .and_then(|u| u.to_file_path().ok())
      .unwrap_or_else(|| PathBuf::from(handle.as_str()));
    Ok(Box::new(File::open(path)?))
  }

  fn cache_dir(&self) -> PathBuf {
    self.cache_dir.clone()
  }
}
