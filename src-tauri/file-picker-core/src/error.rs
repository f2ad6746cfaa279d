use crate::media::MetadataKey;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("metadata field {0} is missing")]
    MissingMetadata(MetadataKey),
    #[error("metadata field {key} has unparsable value {value:?}")]
    Metadata { key: MetadataKey, value: String },
    #[error("mp4: {0}")]
    Mp4(#[from] mp4::Error),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),
    #[error("host: {0}")]
    Host(String),
}
