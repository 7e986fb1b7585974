/// Result alias that carries the custom [`BeatSyncError`] type.
pub type Result<T> = std::result::Result<T, BeatSyncError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BeatSyncError {
    /// Track data failed validation while loading. The session never
    /// activates a track that produced this error.
    #[error("malformed track: {0}")]
    MalformedTrack(String),
    /// A caller handed the session or a loader something it cannot use.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Configuration values that parsed but do not make sense together.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A configuration file that is not valid JSON.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl BeatSyncError {
    pub(crate) fn malformed<T: Into<String>>(msg: T) -> Self {
        Self::MalformedTrack(msg.into())
    }
}
