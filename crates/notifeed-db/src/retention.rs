use std::fmt;

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{FeedError, Result};
use crate::feed::FeedStore;
use crate::keys::UserKeys;
use crate::store::OrderedStore;

/// Caller-defined cleanup with full access to the store.
pub type CustomCleanup = Box<dyn Fn(&dyn OrderedStore, &UserKeys) -> Result<()> + Send + Sync>;

/// How a feed is trimmed when a read asks for cleanup.
pub enum RetentionPolicy {
    /// Keep only the newest N entries.
    MaxNum(usize),
    /// Drop entries older than this Unix timestamp (the timestamp itself is kept).
    MaxTime(f64),
    Custom(CustomCleanup),
}

impl RetentionPolicy {
    pub fn custom<F>(cleanup: F) -> Self
    where
        F: Fn(&dyn OrderedStore, &UserKeys) -> Result<()> + Send + Sync + 'static,
    {
        Self::Custom(Box::new(cleanup))
    }

    pub fn apply(&self, feed: &FeedStore, user_id: Uuid) -> Result<()> {
        match self {
            Self::MaxNum(max) => {
                feed.trim_by_rank(user_id, *max)?;
            }
            Self::MaxTime(boundary) => {
                feed.trim_by_score(user_id, *boundary)?;
            }
            Self::Custom(cleanup) => {
                debug!(%user_id, "running custom feed cleanup");
                cleanup(feed.backend(), &UserKeys::for_user(user_id))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxNum(max) => f.debug_tuple("MaxNum").field(max).finish(),
            Self::MaxTime(time) => f.debug_tuple("MaxTime").field(time).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Declarative retention options, e.g. `{"max_num": 30}` or `{"max_time": 1700000000.0}`.
/// Exactly one key must be present.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionOptions {
    #[serde(default)]
    pub max_num: Option<usize>,
    #[serde(default)]
    pub max_time: Option<f64>,
}

impl RetentionOptions {
    pub fn validate(&self) -> Result<RetentionPolicy> {
        match (self.max_num, self.max_time) {
            (Some(max), None) => Ok(RetentionPolicy::MaxNum(max)),
            (None, Some(time)) if time.is_finite() => Ok(RetentionPolicy::MaxTime(time)),
            (None, Some(time)) => Err(FeedError::InvalidRetentionConfig(format!(
                "max_time must be finite, got {}",
                time
            ))),
            (Some(_), Some(_)) => Err(FeedError::InvalidRetentionConfig(
                "max_num and max_time are mutually exclusive".into(),
            )),
            (None, None) => Err(FeedError::InvalidRetentionConfig(
                "no retention strategy given".into(),
            )),
        }
    }
}

impl TryFrom<RetentionOptions> for RetentionPolicy {
    type Error = FeedError;

    fn try_from(options: RetentionOptions) -> Result<Self> {
        options.validate()
    }
}
