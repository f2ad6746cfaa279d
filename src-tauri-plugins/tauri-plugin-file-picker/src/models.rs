use serde::{Deserialize, Serialize};

/// Static facts about the device, fetched once at setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResponse {
  pub cache_dir: String,
  pub external_storage_dir: Option<String>,
  pub sdk_int: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionArgs {
  pub permission: String,
  pub request_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPermissionResponse {
  pub granted: bool,
}

/// One entry per requested permission, in request order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPermissionResponse {
  pub grants: Vec<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPickerArgs {
  /// `PICK` or `GET_CONTENT`.
  pub action: &'static str,
  pub mime: String,
  pub openable: bool,
  pub initial_dir: Option<String>,
  pub request_code: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPickerResponse {
  pub result_code: i32,
  pub uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UriArgs {
  pub uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDataColumnResponse {
  pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNameResponse {
  pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileChunkArgs {
  pub uri: String,
  pub offset: u64,
  pub length: usize,
}

/// At most `length` bytes from `offset`; empty at end of content.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileChunkResponse {
  /// base64
  pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathArgs {
  pub path: String,
}

/// Raw `MediaMetadataRetriever` fields, still textual.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractMetadataResponse {
  pub duration: Option<String>,
  pub video_width: Option<String>,
  pub video_height: Option<String>,
  pub video_rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoThumbnailResponse {
  /// base64-encoded PNG, absent when the platform could not grab a frame.
  pub data: Option<String>,
}
