use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use notifeed_types::{CodecError, Notification, codec};

use crate::error::{FeedError, Result, ensure_finite};
use crate::keys::UserKeys;
use crate::store::{Order, OrderedStore, ScoreBound};

/// A stored entry that failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    pub payload: String,
    pub error: CodecError,
}

/// Decoded window of a feed, newest first. Entries that did not decode are kept aside
/// so the caller can choose between skipping them and failing the read.
#[derive(Debug, Default)]
pub struct DecodedWindow {
    pub notifications: Vec<Notification>,
    pub failures: Vec<DecodeFailure>,
}

/// Per-user feeds on top of an [`OrderedStore`]. Entries are encoded notifications scored
/// by their timestamp.
#[derive(Clone)]
pub struct FeedStore {
    store: Arc<dyn OrderedStore>,
}

impl FeedStore {
    pub fn new(store: Arc<dyn OrderedStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for custom retention routines and the lifecycle hook.
    pub fn backend(&self) -> &dyn OrderedStore {
        self.store.as_ref()
    }

    pub fn append(&self, user_id: Uuid, payload: &str, score: f64) -> Result<()> {
        let score = ensure_finite(score)?;
        self.store
            .insert(&UserKeys::for_user(user_id).feed, score, payload)
    }

    /// Payloads scored within `min..max`, newest first.
    pub fn read(&self, user_id: Uuid, min: ScoreBound, max: ScoreBound) -> Result<Vec<String>> {
        self.store.range_by_score(
            &UserKeys::for_user(user_id).feed,
            min,
            max,
            Order::Descending,
        )
    }

    pub fn count(&self, user_id: Uuid, min: ScoreBound, max: ScoreBound) -> Result<usize> {
        self.store
            .count_by_score(&UserKeys::for_user(user_id).feed, min, max)
    }

    /// Keeps only the `keep_newest` highest-scored entries. Returns how many were removed.
    pub fn trim_by_rank(&self, user_id: Uuid, keep_newest: usize) -> Result<usize> {
        // No feed can hold more than i64::MAX entries, so a larger limit keeps everything.
        let Ok(keep) = i64::try_from(keep_newest) else {
            return Ok(0);
        };
        let stop = -keep - 1;
        let removed = self
            .store
            .remove_by_rank(&UserKeys::for_user(user_id).feed, 0, stop)?;
        debug!(%user_id, keep_newest, removed, "trimmed feed by rank");
        Ok(removed)
    }

    /// Removes every entry scored strictly below `boundary`, and every entry sharing such a score.
    pub fn trim_by_score(&self, user_id: Uuid, boundary: f64) -> Result<usize> {
        let boundary = ensure_finite(boundary)?;
        let removed = self.store.remove_by_score(
            &UserKeys::for_user(user_id).feed,
            ScoreBound::NegInf,
            ScoreBound::Exclusive(boundary),
        )?;
        debug!(%user_id, boundary, removed, "trimmed feed by score");
        Ok(removed)
    }

    /// Empties the feed. Watermarks are left alone.
    pub fn flush(&self, user_id: Uuid) -> Result<usize> {
        self.store
            .remove_by_rank(&UserKeys::for_user(user_id).feed, 0, -1)
    }

    /// Drops the feed key. Returns whether it existed.
    pub fn delete_all(&self, user_id: Uuid) -> Result<bool> {
        self.store.delete(&UserKeys::for_user(user_id).feed)
    }

    /// Appends `notification` to its owner's feed, scored by its time. Not retried on failure.
    pub fn save(&self, notification: &Notification) -> Result<()> {
        let owner = notification.user_id().ok_or(FeedError::MissingOwner)?;
        let payload = codec::encode(notification)?;
        self.append(owner, &payload, notification.time())
    }

    /// Builds and saves in one step, handing back the saved notification.
    pub fn create(&self, notification: impl Into<Notification>) -> Result<Notification> {
        let notification = notification.into();
        self.save(&notification)?;
        Ok(notification)
    }

    /// Reads and decodes entries scored above `min`, newest first.
    pub fn load(&self, user_id: Uuid, min: ScoreBound) -> Result<DecodedWindow> {
        let mut window = DecodedWindow::default();
        for payload in self.read(user_id, min, ScoreBound::PosInf)? {
            match codec::decode(&payload) {
                Ok(notification) => window.notifications.push(notification),
                Err(error) => {
                    warn!(%user_id, "undecodable feed entry: {}", error);
                    window.failures.push(DecodeFailure { payload, error });
                }
            }
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use notifeed_types::{FollowerNotification, UserRef};

    fn user(first: &str) -> UserRef {
        UserRef {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: "Test".into(),
            photo_url: None,
        }
    }

    fn feed() -> (FeedStore, MemoryStore) {
        let mem = MemoryStore::new();
        (FeedStore::new(Arc::new(mem.clone())), mem)
    }

    #[test]
    fn test_save_scores_by_time() {
        let (feed, _) = feed();
        let owner = user("owner");
        let n: Notification = FollowerNotification::new(&user("fan"), &owner).into();
        let n = n.at(1234.5);
        feed.save(&n).unwrap();

        let exact = feed
            .count(owner.id, ScoreBound::Inclusive(1234.5), ScoreBound::Inclusive(1234.5))
            .unwrap();
        assert_eq!(exact, 1);
        let window = feed.load(owner.id, ScoreBound::NegInf).unwrap();
        assert_eq!(window.notifications, vec![n]);
    }

    #[test]
    fn test_save_without_owner_fails_before_store() {
        let (feed, mem) = feed();
        let mut n = FollowerNotification::new(&user("fan"), &user("owner"));
        n.envelope.user_id = None;
        mem.set_available(false);
        assert_eq!(feed.save(&n.into()), Err(FeedError::MissingOwner));
    }

    #[test]
    fn test_non_finite_score_rejected() {
        let (feed, _) = feed();
        assert_eq!(
            feed.append(Uuid::new_v4(), "{}", f64::INFINITY),
            Err(FeedError::InvalidScore(f64::INFINITY))
        );
    }

    #[test]
    fn test_load_reports_bad_entries_and_keeps_the_rest() {
        let (feed, _) = feed();
        let owner = user("owner");
        let good = feed
            .create(FollowerNotification::new(&user("fan"), &owner))
            .unwrap();
        feed.append(owner.id, r#"{"type":"Poke","time":1.0}"#, 1.0)
            .unwrap();
        feed.append(owner.id, "garbage", 2.0).unwrap();

        let window = feed.load(owner.id, ScoreBound::NegInf).unwrap();
        assert_eq!(window.notifications, vec![good]);
        assert_eq!(window.failures.len(), 2);
        assert_eq!(window.failures[0].payload, "garbage");
        assert!(matches!(
            window.failures[1].error,
            CodecError::UnknownVariant(ref tag) if tag == "Poke"
        ));
    }

    #[test]
    fn test_trim_by_rank_and_score() {
        let (feed, _) = feed();
        let owner = Uuid::new_v4();
        for i in 1..=6 {
            feed.append(owner, &format!("p{}", i), i as f64).unwrap();
        }

        assert_eq!(feed.trim_by_rank(owner, 10).unwrap(), 0);
        assert_eq!(feed.trim_by_rank(owner, 4).unwrap(), 2);
        assert_eq!(
            feed.read(owner, ScoreBound::NegInf, ScoreBound::PosInf).unwrap(),
            vec!["p6", "p5", "p4", "p3"]
        );

        assert_eq!(feed.trim_by_score(owner, 5.0).unwrap(), 2);
        assert_eq!(
            feed.read(owner, ScoreBound::NegInf, ScoreBound::PosInf).unwrap(),
            vec!["p6", "p5"]
        );
    }

    #[test]
    fn test_flush_vs_delete_all() {
        let (feed, mem) = feed();
        let owner = Uuid::new_v4();
        feed.append(owner, "a", 1.0).unwrap();
        feed.append(owner, "b", 2.0).unwrap();

        assert_eq!(feed.flush(owner).unwrap(), 2);
        assert_eq!(feed.count(owner, ScoreBound::NegInf, ScoreBound::PosInf).unwrap(), 0);

        feed.append(owner, "c", 3.0).unwrap();
        assert!(feed.delete_all(owner).unwrap());
        assert!(!mem.exists(&UserKeys::for_user(owner).feed).unwrap());
        assert!(!feed.delete_all(owner).unwrap());
    }
}
