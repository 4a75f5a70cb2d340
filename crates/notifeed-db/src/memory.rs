//! MemoryStore - HashMap-backed ordered store for tests and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{FeedError, Result};
use crate::store::{Order, OrderedStore, ScoreBound, resolve_rank_range};

struct Entry {
    score: f64,
    seq: u64,
    member: String,
}

/// Sorted collections and scalars are separate namespaces; one key may name one of each.
#[derive(Default)]
struct Keyspace {
    /// Each collection kept sorted by `(score, seq)` ascending.
    sorted: HashMap<String, Vec<Entry>>,
    scalars: HashMap<String, f64>,
}

/// In-memory ordered store. Clone-friendly via Arc; clones share data.
///
/// `set_available(false)` makes every operation fail with `StoreUnavailable`, which is how
/// tests exercise outage paths.
#[derive(Clone)]
pub struct MemoryStore {
    keyspace: Arc<RwLock<Keyspace>>,
    next_seq: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            keyspace: Arc::new(RwLock::new(Keyspace::default())),
            next_seq: Arc::new(AtomicU64::new(0)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Keyspace>> {
        self.check_available()?;
        self.keyspace
            .read()
            .map_err(|_| FeedError::StoreUnavailable("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Keyspace>> {
        self.check_available()?;
        self.keyspace
            .write()
            .map_err(|_| FeedError::StoreUnavailable("lock poisoned".into()))
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FeedError::StoreUnavailable("memory store marked unavailable".into()))
        }
    }
}

fn in_range(entry: &Entry, min: ScoreBound, max: ScoreBound) -> bool {
    min.admits_from_below(entry.score) && max.admits_from_above(entry.score)
}

fn sorted<'a>(keyspace: &'a Keyspace, key: &str) -> &'a [Entry] {
    keyspace.sorted.get(key).map_or(&[], Vec::as_slice)
}

/// Drops the key once its last entry is gone, the way an empty sorted set ceases to exist.
fn prune_empty(keyspace: &mut Keyspace, key: &str) {
    if keyspace.sorted.get(key).is_some_and(Vec::is_empty) {
        keyspace.sorted.remove(key);
    }
}

impl OrderedStore for MemoryStore {
    fn insert(&self, key: &str, score: f64, member: &str) -> Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let mut keyspace = self.write()?;

        let entries = keyspace.sorted.entry(key.to_string()).or_default();
        let at = entries.partition_point(|e| (e.score, e.seq) <= (score, seq));
        entries.insert(
            at,
            Entry {
                score,
                seq,
                member: member.to_string(),
            },
        );
        Ok(())
    }

    fn range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        order: Order,
    ) -> Result<Vec<String>> {
        let keyspace = self.read()?;
        let matching = sorted(&keyspace, key).iter().filter(|e| in_range(e, min, max));
        let members = match order {
            Order::Ascending => matching.map(|e| e.member.clone()).collect(),
            Order::Descending => matching.rev().map(|e| e.member.clone()).collect(),
        };
        Ok(members)
    }

    fn count_by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Result<usize> {
        let keyspace = self.read()?;
        Ok(sorted(&keyspace, key)
            .iter()
            .filter(|e| in_range(e, min, max))
            .count())
    }

    fn remove_by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Result<usize> {
        let mut keyspace = self.write()?;
        let removed = match keyspace.sorted.get_mut(key) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|e| !in_range(e, min, max));
                before - entries.len()
            }
            None => 0,
        };
        prune_empty(&mut keyspace, key);
        Ok(removed)
    }

    fn remove_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<usize> {
        let mut keyspace = self.write()?;
        let removed = match keyspace.sorted.get_mut(key) {
            Some(entries) => match resolve_rank_range(start, stop, entries.len()) {
                Some((first, last)) => entries.drain(first..=last).count(),
                None => 0,
            },
            None => 0,
        };
        prune_empty(&mut keyspace, key);
        Ok(removed)
    }

    fn get_scalar(&self, key: &str) -> Result<Option<f64>> {
        let keyspace = self.read()?;
        Ok(keyspace.scalars.get(key).copied())
    }

    fn set_scalar(&self, key: &str, value: f64) -> Result<()> {
        let mut keyspace = self.write()?;
        keyspace.scalars.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut keyspace = self.write()?;
        let entries = keyspace.sorted.remove(key).is_some();
        let scalar = keyspace.scalars.remove(key).is_some();
        Ok(entries || scalar)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let keyspace = self.read()?;
        Ok(keyspace.sorted.contains_key(key) || keyspace.scalars.contains_key(key))
    }
}
