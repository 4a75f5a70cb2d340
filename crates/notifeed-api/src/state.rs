use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::task::JoinError;
use tracing::{error, warn};

use notifeed_db::{FeedError, FeedStore, RetentionOptions, RetentionPolicy};
use notifeed_types::DispatchError;

use crate::render::Renderers;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub feed: FeedStore,
    pub renderers: Renderers,
    /// Applied every time the feed index is read.
    pub retention: RetentionRule,
    pub badge_cap: usize,
}

impl AppStateInner {
    /// Fails if a notification kind has no renderer.
    pub fn new(
        feed: FeedStore,
        retention: RetentionRule,
        badge_cap: usize,
    ) -> Result<Self, DispatchError> {
        Ok(Self {
            feed,
            renderers: Renderers::new()?,
            retention,
            badge_cap,
        })
    }
}

/// Retention as configured. An age limit turns into a fixed timestamp per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetentionRule {
    MaxNum(usize),
    MaxAge(Duration),
}

impl Default for RetentionRule {
    fn default() -> Self {
        Self::MaxNum(30)
    }
}

impl RetentionRule {
    /// Validates configured limits with the same rules as [`RetentionOptions`]: exactly one
    /// must be given. The age limit is checked as a cutoff before the epoch and kept relative.
    pub fn from_limits(
        max_num: Option<usize>,
        max_age: Option<Duration>,
    ) -> notifeed_db::Result<Self> {
        let options = RetentionOptions {
            max_num,
            max_time: max_age.map(|age| -age.as_secs_f64()),
        };
        Ok(match (options.validate()?, max_age) {
            (RetentionPolicy::MaxTime(_), Some(age)) => Self::MaxAge(age),
            (RetentionPolicy::MaxNum(max), _) => Self::MaxNum(max),
            (policy, _) => {
                return Err(FeedError::InvalidRetentionConfig(format!(
                    "unsupported configured policy {:?}",
                    policy
                )));
            }
        })
    }

    pub fn policy(&self, now: f64) -> RetentionPolicy {
        match *self {
            Self::MaxNum(max) => RetentionPolicy::MaxNum(max),
            Self::MaxAge(age) => RetentionPolicy::MaxTime(now - age.as_secs_f64()),
        }
    }
}

pub(crate) fn status_for(e: FeedError) -> StatusCode {
    match e {
        FeedError::StoreUnavailable(reason) => {
            warn!("store unavailable: {}", reason);
            StatusCode::SERVICE_UNAVAILABLE
        }
        FeedError::InvalidRetentionConfig(_) | FeedError::MissingOwner | FeedError::InvalidScore(_) => {
            warn!("rejected: {}", e);
            StatusCode::BAD_REQUEST
        }
        FeedError::Codec(_) => {
            error!("feed codec failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn join_error(e: JoinError) -> StatusCode {
    error!("spawn_blocking join error: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_age_becomes_cutoff() {
        let rule = RetentionRule::MaxAge(Duration::from_secs(3600));
        assert!(matches!(
            rule.policy(10_000.0),
            RetentionPolicy::MaxTime(t) if t == 6_400.0
        ));
        assert!(matches!(
            RetentionRule::default().policy(10_000.0),
            RetentionPolicy::MaxNum(30)
        ));
    }

    #[test]
    fn test_limits_share_option_validation() {
        assert_eq!(
            RetentionRule::from_limits(Some(10), None),
            Ok(RetentionRule::MaxNum(10))
        );
        assert_eq!(
            RetentionRule::from_limits(None, Some(Duration::from_secs(60))),
            Ok(RetentionRule::MaxAge(Duration::from_secs(60)))
        );
        assert!(matches!(
            RetentionRule::from_limits(Some(10), Some(Duration::from_secs(60))),
            Err(FeedError::InvalidRetentionConfig(_))
        ));
        assert!(matches!(
            RetentionRule::from_limits(None, None),
            Err(FeedError::InvalidRetentionConfig(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(FeedError::StoreUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(FeedError::MissingOwner), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(FeedError::Codec(notifeed_types::CodecError::MalformedPayload(
                "x".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
