//! Best-effort PNG preview for picked videos.

use std::path::{Path, PathBuf};

use image::{GenericImageView, ImageFormat};

use crate::host::Host;
use crate::Result;

/// `<stem>-<ext>-<random>.png`, so previews of `a.mp4` and `a.mov` never collide.
pub fn thumbnail_path(cache_dir: &Path, video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    let ext = video
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("bin")
        .to_lowercase();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    cache_dir.join(format!("{}-{}-{}.png", stem, ext, &suffix[..12]))
}

/// Grabs a frame from the host, bounds it to `max_width`×`max_height` and writes
/// a PNG into `cache_dir`. A partially written file is removed on failure.
pub fn generate<H: Host + ?Sized>(
    host: &H,
    video: &Path,
    cache_dir: &Path,
    max_width: u32,
    max_height: u32,
) -> Result<PathBuf> {
    let frame = host.video_frame(video)?;
    let (w, h) = frame.dimensions();
    let thumb = if w > max_width || h > max_height {
        frame.thumbnail(max_width, max_height)
    } else {
        frame
    };
    std::fs::create_dir_all(cache_dir)?;
    let out = thumbnail_path(cache_dir, video);
    if let Err(e) = thumb.save_with_format(&out, ImageFormat::Png) {
        let _ = std::fs::remove_file(&out);
        return Err(e.into());
    }
    tracing::info!(video = %video.display(), thumbnail = %out.display(), "thumbnail written");
    Ok(out)
}
