use notifeed_types::CodecError;

/// Errors surfaced by the feed layer. Nothing here is retried internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    /// The backing store failed, timed out, or could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored payload could not be turned back into a notification.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Retention options were empty or named more than one strategy.
    #[error("invalid retention config: {0}")]
    InvalidRetentionConfig(String),

    /// Tried to save a notification whose `user_id` was never set.
    #[error("notification has no owner")]
    MissingOwner,

    /// Scores and watermarks must be finite.
    #[error("invalid score: {0}")]
    InvalidScore(f64),
}

pub type Result<T> = std::result::Result<T, FeedError>;

impl From<rusqlite::Error> for FeedError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

pub(crate) fn ensure_finite(score: f64) -> Result<f64> {
    if score.is_finite() {
        Ok(score)
    } else {
        Err(FeedError::InvalidScore(score))
    }
}
