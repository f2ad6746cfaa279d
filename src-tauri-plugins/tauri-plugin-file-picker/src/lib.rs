use std::sync::Arc;

use tauri::{
  plugin::{Builder, TauriPlugin},
  Manager, Runtime,
};

pub use file_picker_core::{PickerConfig, SelectedFile, SelectionIssue, SelectionOutcome};
use file_picker_core::{platform_channel, FilePicker};

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

mod commands;
mod error;
#[cfg(mobile)]
mod models;

pub use error::{Error, Result};

#[cfg(desktop)]
pub use desktop::DesktopHost as PlatformHost;
#[cfg(mobile)]
pub use mobile::MobileHost as PlatformHost;

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the file-picker APIs.
pub trait FilePickerExt<R: Runtime> {
  fn file_picker(&self) -> &FilePicker<PlatformHost<R>>;
  fn try_file_picker(&self) -> Option<FilePicker<PlatformHost<R>>>;
}

impl<R: Runtime, T: Manager<R>> crate::FilePickerExt<R> for T {
  fn file_picker(&self) -> &FilePicker<PlatformHost<R>> {
    self.state::<FilePicker<PlatformHost<R>>>().inner()
  }

  fn try_file_picker(&self) -> Option<FilePicker<PlatformHost<R>>> {
    self
      .try_state::<FilePicker<PlatformHost<R>>>()
      .map(|s| s.inner().clone())
  }
}

/// Initializes the plugin. The optional `plugins.file-picker` config block maps to [`PickerConfig`].
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<PickerConfig>> {
  Builder::<R, Option<PickerConfig>>::new("file-picker")
    .invoke_handler(tauri::generate_handler![commands::pick_file])
    .setup(|app, api| {
      let config = api.config().clone().unwrap_or_default();
      let (events, inbox) = platform_channel();
      #[cfg(mobile)]
      let host = mobile::init(app, api, events)?;
      #[cfg(desktop)]
      let host = desktop::init(app, api, events)?;
      let (picker, driver) = FilePicker::new(Arc::new(host), config, inbox);
      tauri::async_runtime::spawn(driver.run());
      app.manage(picker);
      Ok(())
    })
    .build()
}
