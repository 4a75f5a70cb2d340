//! The ordered key-value store the feed is built on.
//!
//! Two kinds of keys live in it: sorted collections of string members scored by `f64`,
//! and scalar `f64` values. Any backend offering these primitives can hold feeds.

use crate::error::Result;

/// One end of a score range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    NegInf,
    PosInf,
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    /// Whether `score` satisfies this bound used as the lower end of a range.
    pub fn admits_from_below(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => true,
            Self::PosInf => false,
            Self::Inclusive(min) => score >= min,
            Self::Exclusive(min) => score > min,
        }
    }

    /// Whether `score` satisfies this bound used as the upper end of a range.
    pub fn admits_from_above(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => false,
            Self::PosInf => true,
            Self::Inclusive(max) => score <= max,
            Self::Exclusive(max) => score < max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Primitives every feed backend provides. Ranks are 0-based in ascending score order;
/// negative ranks count back from the highest score (-1 is the last entry).
///
/// Entries sharing a score are ordered by insertion. Each call is one round trip.
///
/// Sorted collections and scalars live in separate namespaces: a key may hold one of each
/// without either disturbing the other. `delete` and `exists` cover both.
pub trait OrderedStore: Send + Sync {
    /// Adds `member` under `score`. Never replaces an existing entry.
    fn insert(&self, key: &str, score: f64, member: &str) -> Result<()>;

    fn range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        order: Order,
    ) -> Result<Vec<String>>;

    fn count_by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Result<usize>;

    /// Removes every entry in the range, all same-score entries included. Returns the count removed.
    fn remove_by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Result<usize>;

    /// Removes entries ranked `start..=stop`. Returns the count removed.
    fn remove_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<usize>;

    fn get_scalar(&self, key: &str) -> Result<Option<f64>>;

    fn set_scalar(&self, key: &str, value: f64) -> Result<()>;

    /// Drops the key, whatever it holds. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    fn exists(&self, key: &str) -> Result<bool>;
}

/// Resolves a possibly negative `start..=stop` rank range against `len` entries.
/// Returns `None` when the range selects nothing.
pub fn resolve_rank_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { start + len } else { start }.max(0);
    let stop = if stop < 0 { stop + len } else { stop }.min(len - 1);
    if len == 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}
