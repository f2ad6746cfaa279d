use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use file_picker_core::{
  ActivityStatus, FieldRetriever, Host, MetadataKey, MetadataRetriever, PermissionState, PickerAction,
  PickerIntent, PlatformEvents, RangedReader, RequestCode, ResourceHandle,
};
use image::DynamicImage;
use serde::de::DeserializeOwned;
use tauri::{
  plugin::{PluginApi, PluginHandle},
  AppHandle, Runtime,
};
use url::Url;

use crate::models::*;

#[cfg(target_os = "ios")]
tauri::ios_plugin_binding!(init_plugin_file_picker);

// initializes the Kotlin or Swift plugin classes
pub fn init<R: Runtime, C: DeserializeOwned>(
  _app: &AppHandle<R>,
  api: PluginApi<R, C>,
  events: PlatformEvents,
) -> crate::Result<MobileHost<R>> {
  #[cfg(target_os = "android")]
  let handle = api.register_android_plugin("app.filepicker.plugin", "FilePickerPlugin")?;
  #[cfg(target_os = "ios")]
  let handle = api.register_ios_plugin(init_plugin_file_picker)?;
  let env: EnvironmentResponse = handle.run_mobile_plugin("getEnvironment", ())?;
  Ok(MobileHost {
    handle: Arc::new(handle),
    events,
    env,
  })
}

/// [`Host`] backed by the native plugin class.
pub struct MobileHost<R: Runtime> {
  handle: Arc<PluginHandle<R>>,
  events: PlatformEvents,
  env: EnvironmentResponse,
}

impl<R: Runtime> MobileHost<R> {
  fn call<T: DeserializeOwned>(&self, command: &str, payload: impl serde::Serialize) -> crate::Result<T> {
    self
      .handle
      .run_mobile_plugin(command, payload)
      .map_err(crate::Error::from)
  }
}

fn decode_base64(data: &str) -> std::io::Result<Vec<u8>> {
  base64::engine::general_purpose::STANDARD
    .decode(data)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn host_error(e: crate::Error) -> file_picker_core::Error {
  file_picker_core::Error::Host(e.to_string())
}

impl<R: Runtime> Host for MobileHost<R> {
  fn check_permission(&self, permission: &str) -> PermissionState {
    let args = PermissionArgs {
      permission: permission.to_string(),
      request_code: None,
    };
    match self.call::<CheckPermissionResponse>("checkPermission", args) {
      Ok(r) => PermissionState::from_granted(r.granted),
      Err(e) => {
        tracing::warn!(permission, error = %e, "checkPermission failed, treating as denied");
        PermissionState::Denied
      }
    }
  }

  fn request_permission(&self, permission: &str, code: RequestCode) -> file_picker_core::Result<()> {
    let handle = self.handle.clone();
    let events = self.events.clone();
    let args = PermissionArgs {
      permission: permission.to_string(),
      request_code: Some(code.0),
    };
    tauri::async_runtime::spawn(async move {
      match handle
        .run_mobile_plugin_async::<RequestPermissionResponse>("requestPermission", args)
        .await
      {
        Ok(r) => {
          events.permission_result(code, r.grants.into_iter().map(PermissionState::from_granted).collect());
        }
        Err(e) => {
          tracing::warn!(%code, error = %e, "requestPermission failed");
          events.failure(code, format!("permission prompt failed: {e}"));
        }
      }
    });
    Ok(())
  }

  fn launch_picker(&self, intent: &PickerIntent, code: RequestCode) -> file_picker_core::Result<()> {
    let handle = self.handle.clone();
    let events = self.events.clone();
    let args = LaunchPickerArgs {
      action: match intent.action {
        PickerAction::Pick => "PICK",
        PickerAction::GetContent => "GET_CONTENT",
      },
      mime: intent.mime.as_str().to_string(),
      openable: intent.openable,
      initial_dir: intent.initial_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
      request_code: code.0,
    };
    tauri::async_runtime::spawn(async move {
      match handle
        .run_mobile_plugin_async::<LaunchPickerResponse>("launchPicker", args)
        .await
      {
        Ok(r) => {
          events.activity_result(code, ActivityStatus::from_code(r.result_code), r.uri.map(ResourceHandle::new));
        }
        Err(e) => {
          tracing::warn!(%code, error = %e, "launchPicker failed");
          events.failure(code, format!("failed to launch picker: {e}"));
        }
      }
    });
    Ok(())
  }

  fn query_data_column(&self, uri: &Url) -> Option<PathBuf> {
    let args = UriArgs {
      uri: uri.to_string(),
    };
    match self.call::<QueryDataColumnResponse>("queryDataColumn", args) {
      Ok(r) => r.path.filter(|p| !p.is_empty()).map(PathBuf::from),
      Err(e) => {
        tracing::debug!(%uri, error = %e, "queryDataColumn failed");
        None
      }
    }
  }

  fn display_name(&self, handle: &ResourceHandle) -> Option<String> {
    let args = UriArgs {
      uri: handle.as_str().to_string(),
    };
    self
      .call::<DisplayNameResponse>("getDisplayName", args)
      .ok()
      .and_then(|r| r.name)
  }

  fn external_storage_dir(&self) -> Option<PathBuf> {
    self.env.external_storage_dir.as_ref().map(PathBuf::from)
  }

  /// Pulls the content one copy chunk at a time through `readFileChunk`.
  fn open_input(&self, handle: &ResourceHandle) -> std::io::Result<Box<dyn Read + Send>> {
    let plugin = self.handle.clone();
    let uri = handle.as_str().to_string();
    Ok(Box::new(RangedReader::new(move |offset: u64, length: usize| {
      let args = ReadFileChunkArgs {
        uri: uri.clone(),
        offset,
        length,
      };
      let r: ReadFileChunkResponse = plugin
        .run_mobile_plugin("readFileChunk", args)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
      decode_base64(&r.data)
    })))
  }

  fn cache_dir(&self) -> PathBuf {
    PathBuf::from(&self.env.cache_dir)
  }

  fn sdk_version(&self) -> Option<u32> {
    self.env.sdk_int
  }

  fn open_metadata(&self, path: &Path) -> file_picker_core::Result<Box<dyn MetadataRetriever>> {
    let args = PathArgs {
      path: path.to_string_lossy().into_owned(),
    };
    let r: ExtractMetadataResponse = self.call("extractMetadata", args).map_err(host_error)?;
    let fields: FieldRetriever = [
      (MetadataKey::Duration, r.duration),
      (MetadataKey::VideoWidth, r.video_width),
      (MetadataKey::VideoHeight, r.video_height),
      (MetadataKey::VideoRotation, r.video_rotation),
    ]
    .into_iter()
    .filter_map(|(k, v)| v.map(|v| (k, v)))
    .collect();
    Ok(Box::new(fields))
  }

  fn video_frame(&self, path: &Path) -> file_picker_core::Result<DynamicImage> {
    let args = PathArgs {
      path: path.to_string_lossy().into_owned(),
    };
    let r: VideoThumbnailResponse = self.call("createVideoThumbnail", args).map_err(host_error)?;
    let data = r
      .data
      .ok_or_else(|| file_picker_core::Error::Host(format!("no frame for {}", path.display())))?;
    Ok(image::load_from_memory(&decode_base64(&data)?)?)
  }
}
