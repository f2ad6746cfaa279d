use file_picker_core::SelectionOutcome;
use tauri::{command, AppHandle, Runtime};

use crate::FilePickerExt;

/// `method` is `"PDF"`, `"VIDEO"`, `"ANY"` or `"__CUSTOM_<ext>"`.
#[command]
pub(crate) async fn pick_file<R: Runtime>(app: AppHandle<R>, method: String) -> Result<SelectionOutcome, String> {
  let picker = app
    .try_file_picker()
    .ok_or_else(|| "file picker is not initialized".to_string())?;
  Ok(picker.handle_request(&method).await)
}
