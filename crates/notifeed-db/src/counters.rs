use std::cell::Cell;

use crate::error::Result;

/// Total and new counts memoized for one request.
///
/// The first value computed is kept for the life of the snapshot, even if the feed changes
/// underneath. Take a new snapshot to see fresh numbers.
#[derive(Debug, Default)]
pub struct CounterSnapshot {
    total: Cell<Option<usize>>,
    new: Cell<Option<usize>>,
}

impl CounterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self, compute: impl FnOnce() -> Result<usize>) -> Result<usize> {
        memoize(&self.total, compute)
    }

    pub fn new_since_last_read(&self, compute: impl FnOnce() -> Result<usize>) -> Result<usize> {
        memoize(&self.new, compute)
    }
}

fn memoize(cell: &Cell<Option<usize>>, compute: impl FnOnce() -> Result<usize>) -> Result<usize> {
    if let Some(count) = cell.get() {
        return Ok(count);
    }
    let count = compute()?;
    cell.set(Some(count));
    Ok(count)
}
