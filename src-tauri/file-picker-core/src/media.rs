//! Video metadata: duration and orientation-corrected dimensions.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataKey {
    Duration,
    VideoWidth,
    VideoHeight,
    VideoRotation,
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Duration => "duration",
            Self::VideoWidth => "videoWidth",
            Self::VideoHeight => "videoHeight",
            Self::VideoRotation => "videoRotation",
        })
    }
}

/// Textual metadata fields of one media file. Dropping it releases the source.
pub trait MetadataRetriever {
    fn extract(&self, key: MetadataKey) -> Option<String>;
}

/// Retriever over fields a platform already extracted.
#[derive(Debug, Clone, Default)]
pub struct FieldRetriever(HashMap<MetadataKey, String>);

impl FieldRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }
}

impl FromIterator<(MetadataKey, String)> for FieldRetriever {
    fn from_iter<T: IntoIterator<Item = (MetadataKey, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl MetadataRetriever for FieldRetriever {
    fn extract(&self, key: MetadataKey) -> Option<String> {
        self.0.get(&key).cloned()
    }
}

/// Reads ISO-BMFF (mp4/mov/3gp) headers.
#[derive(Debug)]
pub struct Mp4Retriever {
    fields: FieldRetriever,
}

impl Mp4Retriever {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path)?;
        let size = f.metadata()?.len();
        let mp4 = mp4::Mp4Reader::read_header(BufReader::new(f), size)?;

        let mut fields = FieldRetriever::new().with(
            MetadataKey::Duration,
            mp4.duration().as_millis().to_string(),
        );
        let mut tracks: Vec<_> = mp4.tracks().iter().collect();
        tracks.sort_by_key(|(id, _)| **id);
        let video = tracks
            .into_iter()
            .map(|(_, t)| t)
            .find(|t| matches!(t.track_type(), Ok(mp4::TrackType::Video)));
        if let Some(track) = video {
            let m = &track.trak.tkhd.matrix;
            fields = fields
                .with(MetadataKey::VideoWidth, track.width().to_string())
                .with(MetadataKey::VideoHeight, track.height().to_string())
                .with(MetadataKey::VideoRotation, rotation_from_matrix(m.a, m.b).to_string());
        }
        Ok(Self { fields })
    }
}

impl MetadataRetriever for Mp4Retriever {
    fn extract(&self, key: MetadataKey) -> Option<String> {
        self.fields.extract(key)
    }
}

/// Display rotation in degrees from the first row of a track matrix, snapped to a quarter turn.
pub fn rotation_from_matrix(a: i32, b: i32) -> u32 {
    if a == 0 && b == 0 {
        return 0;
    }
    let deg = f64::from(b).atan2(f64::from(a)).to_degrees();
    let quarter = (deg / 90.0).round() as i32;
    (quarter * 90).rem_euclid(360) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub duration_ms: u64,
    /// Displayed width, after rotation.
    pub width: u32,
    pub height: u32,
    pub rotation: u32,
}

/// Swaps dimensions for quarter-turn rotations.
#[inline]
pub fn normalize_dimensions(width: u32, height: u32, rotation: u32) -> (u32, u32) {
    match rotation % 360 {
        90 | 270 => (height, width),
        _ => (width, height),
    }
}

fn required<T: std::str::FromStr>(retriever: &dyn MetadataRetriever, key: MetadataKey) -> Result<T> {
    let raw = retriever.extract(key).ok_or(Error::MissingMetadata(key))?;
    raw.trim().parse().map_err(|_| Error::Metadata { key, value: raw })
}

pub fn read_info(retriever: &dyn MetadataRetriever) -> Result<MediaInfo> {
    let duration_ms: u64 = required(retriever, MetadataKey::Duration)?;
    let width: u32 = required(retriever, MetadataKey::VideoWidth)?;
    let height: u32 = required(retriever, MetadataKey::VideoHeight)?;
    let rotation = match retriever.extract(MetadataKey::VideoRotation) {
        Some(raw) => raw
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Metadata {
                key: MetadataKey::VideoRotation,
                value: raw.clone(),
            })?
            .rem_euclid(360) as u32,
        None => 0,
    };
    let (width, height) = normalize_dimensions(width, height, rotation);
    Ok(MediaInfo {
        duration_ms,
        width,
        height,
        rotation,
    })
}

/// Opens the host's retriever for `path`; it is released before returning.
pub fn inspect<H: Host + ?Sized>(host: &H, path: &Path) -> Result<MediaInfo> {
    let retriever = host.open_metadata(path)?;
    let info = read_info(retriever.as_ref());
    drop(retriever);
    if let Ok(info) = &info {
        tracing::debug!(path = %path.display(), ?info, "video metadata");
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(d: &str, w: &str, h: &str, r: Option<&str>) -> FieldRetriever {
        let f = FieldRetriever::new()
            .with(MetadataKey::Duration, d)
            .with(MetadataKey::VideoWidth, w)
            .with(MetadataKey::VideoHeight, h);
        match r {
            Some(r) => f.with(MetadataKey::VideoRotation, r),
            None => f,
        }
    }

    #[test]
    fn test_quarter_turns_swap_dimensions() {
        for r in ["90", "270", "-90"] {
            let info = read_info(&fields("1500", "1080", "1920", Some(r))).unwrap();
            assert_eq!((info.width, info.height), (1920, 1080), "rotation {r}");
        }
        for r in ["0", "180"] {
            let info = read_info(&fields("1500", "1080", "1920", Some(r))).unwrap();
            assert_eq!((info.width, info.height), (1080, 1920), "rotation {r}");
        }
        let info = read_info(&fields("1500", "640", "480", None)).unwrap();
        assert_eq!((info.duration_ms, info.width, info.height, info.rotation), (1500, 640, 480, 0));
    }

    #[test]
    fn test_unparsable_duration_is_an_error() {
        let err = read_info(&fields("12.5s", "640", "480", None)).unwrap_err();
        assert!(matches!(err, Error::Metadata { key: MetadataKey::Duration, .. }));

        let err = read_info(&FieldRetriever::new()).unwrap_err();
        assert!(matches!(err, Error::MissingMetadata(MetadataKey::Duration)));
    }

    #[test]
    fn test_rotation_from_matrix() {
        const ONE: i32 = 0x0001_0000;
        assert_eq!(rotation_from_matrix(ONE, 0), 0);
        assert_eq!(rotation_from_matrix(0, ONE), 90);
        assert_eq!(rotation_from_matrix(-ONE, 0), 180);
        assert_eq!(rotation_from_matrix(0, -ONE), 270);
        assert_eq!(rotation_from_matrix(0, 0), 0);
    }

    #[test]
    fn test_mp4_retriever_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_mp4(&path, 320, 240);

        let retriever = Mp4Retriever::open(&path).unwrap();
        assert_eq!(retriever.extract(MetadataKey::VideoWidth).as_deref(), Some("320"));
        assert_eq!(retriever.extract(MetadataKey::VideoHeight).as_deref(), Some("240"));
        assert_eq!(retriever.extract(MetadataKey::VideoRotation).as_deref(), Some("0"));
        let duration: u64 = retriever.extract(MetadataKey::Duration).unwrap().parse().unwrap();
        assert!(duration <= 1000);
    }

    #[test]
    fn test_mp4_retriever_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        std::fs::write(&path, b"a,b\n1,2\n").unwrap();
        assert!(Mp4Retriever::open(&path).is_err());
    }

    fn write_test_mp4(path: &Path, width: u16, height: u16) {
        use mp4::{AvcConfig, MediaConfig, Mp4Config, Mp4Sample, Mp4Writer, TrackConfig, TrackType};

        let config = Mp4Config {
            major_brand: str::parse("isom").unwrap(),
            minor_version: 512,
            compatible_brands: vec![
                str::parse("isom").unwrap(),
                str::parse("iso2").unwrap(),
                str::parse("avc1").unwrap(),
                str::parse("mp41").unwrap(),
            ],
            timescale: 1000,
        };
        let file = std::fs::File::create(path).unwrap();
        let mut writer = Mp4Writer::write_start(std::io::BufWriter::new(file), &config).unwrap();
        writer
            .add_track(&TrackConfig {
                track_type: TrackType::Video,
                timescale: 1000,
                language: "und".to_string(),
                media_conf: MediaConfig::AvcConfig(AvcConfig {
                    width,
                    height,
                    seq_param_set: vec![0x67, 0x64, 0x00, 0x1f, 0xac, 0xd9],
                    pic_param_set: vec![0x68, 0xeb, 0xe3, 0xcb],
                }),
            })
            .unwrap();
        writer
            .write_sample(
                1,
                &Mp4Sample {
                    start_time: 0,
                    duration: 1000,
                    rendering_offset: 0,
                    is_sync: true,
                    bytes: bytes::Bytes::from_static(&[0, 0, 0, 2, 0x65, 0x88]),
                },
            )
            .unwrap();
        writer.write_end().unwrap();
    }
}
