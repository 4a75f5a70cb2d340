use tracing::debug;
use uuid::Uuid;

use notifeed_types::{Notification, unix_now};

use crate::counters::CounterSnapshot;
use crate::error::{FeedError, Result};
use crate::feed::{DecodeFailure, FeedStore};
use crate::lifecycle;
use crate::retention::RetentionPolicy;
use crate::store::ScoreBound;
use crate::watermark::ReadWatermark;

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOptions<'a> {
    /// Only entries newer than the confirmed watermark.
    pub unread_only: bool,
    /// Trim the feed with this policy before reading.
    pub cleanup: Option<&'a RetentionPolicy>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub notification: Notification,
    pub is_new: bool,
}

#[derive(Debug, Default)]
pub struct FeedPage {
    /// Newest first.
    pub entries: Vec<FeedEntry>,
    pub failures: Vec<DecodeFailure>,
}

impl FeedPage {
    /// Fails on the first undecodable entry instead of skipping it.
    pub fn into_strict(self) -> Result<Vec<FeedEntry>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(FeedError::Codec(failure.error)),
            None => Ok(self.entries),
        }
    }
}

/// One user's view of their notifications for the duration of a request.
///
/// Watermarks and counters are cached on first use and never refreshed, so build a new
/// session per request and never share one between requests.
pub struct FeedSession {
    feed: FeedStore,
    user_id: Uuid,
    watermark: ReadWatermark,
    counters: CounterSnapshot,
}

impl FeedSession {
    pub fn new(feed: FeedStore, user_id: Uuid) -> Self {
        Self {
            feed,
            user_id,
            watermark: ReadWatermark::new(user_id),
            counters: CounterSnapshot::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn last_read(&self) -> Result<f64> {
        self.watermark.last_read(self.feed.backend())
    }

    pub fn set_last_read(&self, time: f64) -> Result<()> {
        self.watermark.set_last_read(self.feed.backend(), time)
    }

    pub fn pending_last_read(&self) -> Result<f64> {
        self.watermark.pending_last_read(self.feed.backend())
    }

    pub fn set_pending_last_read(&self, time: f64) -> Result<()> {
        self.watermark
            .set_pending_last_read(self.feed.backend(), time)
    }

    pub fn confirm_last_read(&self) -> Result<Option<f64>> {
        self.watermark.confirm_last_read(self.feed.backend())
    }

    /// Marks the feed as rendered: everything up to now becomes pending-read.
    pub fn mark_viewed(&self) -> Result<f64> {
        let now = unix_now();
        self.set_pending_last_read(now)?;
        Ok(now)
    }

    pub fn is_new(&self, notification: &Notification) -> Result<bool> {
        Ok(notification.is_new(self.last_read()?))
    }

    pub fn count_notifications(&self) -> Result<usize> {
        self.counters.total(|| {
            self.feed
                .count(self.user_id, ScoreBound::NegInf, ScoreBound::PosInf)
        })
    }

    /// Entries strictly newer than the confirmed watermark.
    pub fn count_new_notifications(&self) -> Result<usize> {
        self.counters.new_since_last_read(|| {
            let last_read = self.last_read()?;
            self.feed.count(
                self.user_id,
                ScoreBound::Exclusive(last_read),
                ScoreBound::PosInf,
            )
        })
    }

    pub fn has_new_notifications(&self) -> Result<bool> {
        Ok(self.count_new_notifications()? > 0)
    }

    /// Reads the feed newest first, trimming it first when `options.cleanup` is set.
    pub fn notifications(&self, options: ReadOptions<'_>) -> Result<FeedPage> {
        if let Some(policy) = options.cleanup {
            policy.apply(&self.feed, self.user_id)?;
        }

        let last_read = self.last_read()?;
        let min = if options.unread_only {
            ScoreBound::Exclusive(last_read)
        } else {
            ScoreBound::NegInf
        };

        let window = self.feed.load(self.user_id, min)?;
        debug!(
            user_id = %self.user_id,
            loaded = window.notifications.len(),
            failed = window.failures.len(),
            "feed read"
        );

        Ok(FeedPage {
            entries: window
                .notifications
                .into_iter()
                .map(|notification| FeedEntry {
                    is_new: notification.is_new(last_read),
                    notification,
                })
                .collect(),
            failures: window.failures,
        })
    }

    /// Removes every notification, keeping the watermarks.
    pub fn flush_notifications(&self) -> Result<usize> {
        self.feed.flush(self.user_id)
    }

    /// Deletes the feed and both watermarks. Used when the user is removed.
    pub fn purge(&self) -> Result<()> {
        lifecycle::purge_user(self.feed.backend(), self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use notifeed_types::{FollowerNotification, UserRef};
    use std::sync::Arc;

    fn user() -> UserRef {
        UserRef {
            id: Uuid::new_v4(),
            first_name: "Stefano".into(),
            last_name: "Uli".into(),
            photo_url: None,
        }
    }

    fn setup(times: &[f64]) -> (FeedStore, Uuid) {
        let feed = FeedStore::new(Arc::new(MemoryStore::new()));
        let owner = user();
        let fan = user();
        for time in times {
            let n: Notification = FollowerNotification::new(&fan, &owner).into();
            feed.save(&n.at(*time)).unwrap();
        }
        (feed, owner.id)
    }

    #[test]
    fn test_counts_are_snapshotted() {
        let (feed, owner) = setup(&[10.0, 20.0]);
        let session = FeedSession::new(feed.clone(), owner);
        session.set_last_read(15.0).unwrap();

        assert_eq!(session.count_notifications().unwrap(), 2);
        assert_eq!(session.count_new_notifications().unwrap(), 1);

        feed.append(owner, "{}", 30.0).unwrap();
        assert_eq!(session.count_notifications().unwrap(), 2);
        assert_eq!(session.count_new_notifications().unwrap(), 1);

        let next = FeedSession::new(feed, owner);
        assert_eq!(next.count_notifications().unwrap(), 3);
        assert_eq!(next.count_new_notifications().unwrap(), 2);
    }

    #[test]
    fn test_unread_only_and_is_new() {
        let (feed, owner) = setup(&[10.0, 20.0, 30.0]);
        let session = FeedSession::new(feed, owner);
        session.set_last_read(20.0).unwrap();

        let all = session.notifications(ReadOptions::default()).unwrap();
        let flags: Vec<bool> = all.entries.iter().map(|e| e.is_new).collect();
        assert_eq!(flags, vec![true, false, false]);

        let unread = session
            .notifications(ReadOptions {
                unread_only: true,
                cleanup: None,
            })
            .unwrap();
        assert_eq!(unread.entries.len(), 1);
        assert_eq!(unread.entries[0].notification.time(), 30.0);
        assert!(session.has_new_notifications().unwrap());
    }

    #[test]
    fn test_invalid_cleanup_never_reaches_the_store() {
        let (feed, owner) = setup(&[10.0, 20.0]);
        let options = crate::retention::RetentionOptions {
            max_num: Some(1),
            max_time: Some(15.0),
        };
        assert!(matches!(
            options.validate(),
            Err(FeedError::InvalidRetentionConfig(_))
        ));
        assert_eq!(FeedSession::new(feed, owner).count_notifications().unwrap(), 2);
    }

    #[test]
    fn test_into_strict_surfaces_codec_error() {
        let (feed, owner) = setup(&[10.0]);
        feed.append(owner, r#"{"time": 5.0}"#, 5.0).unwrap();
        let page = FeedSession::new(feed, owner)
            .notifications(ReadOptions::default())
            .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(matches!(page.into_strict(), Err(FeedError::Codec(_))));
    }

    #[test]
    fn test_flush_keeps_watermarks() {
        let (feed, owner) = setup(&[10.0, 20.0, 30.0]);
        let session = FeedSession::new(feed.clone(), owner);
        session.set_last_read(15.0).unwrap();

        assert_eq!(session.flush_notifications().unwrap(), 3);

        let after = FeedSession::new(feed, owner);
        assert_eq!(after.count_notifications().unwrap(), 0);
        assert_eq!(after.last_read().unwrap(), 15.0);
    }

    #[test]
    fn test_mark_viewed_then_confirm() {
        let (feed, owner) = setup(&[10.0]);
        let session = FeedSession::new(feed.clone(), owner);
        let viewed_at = session.mark_viewed().unwrap();
        assert_eq!(session.last_read().unwrap(), 0.0);

        let later = FeedSession::new(feed, owner);
        assert_eq!(later.confirm_last_read().unwrap(), Some(viewed_at));
        assert_eq!(later.last_read().unwrap(), viewed_at);
        assert!(!later.has_new_notifications().unwrap());
    }
}
