use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Search endpoint unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Search query rejected: {0}")]
    SearchQueryRejected(String),

    #[error("Download failed for {granule}: {reason}")]
    DownloadFailed { granule: String, reason: String },

    #[error("Unpack failed for {granule}: {reason}")]
    UnpackFailed { granule: String, reason: String },
}
