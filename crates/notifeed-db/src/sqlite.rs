use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::error::{FeedError, Result};
use crate::migrations;
use crate::store::{Order, OrderedStore, ScoreBound, resolve_rank_range};

/// SQLite-backed ordered store. Sorted collections live in `sorted_entries`, scalars in `scalars`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`. `timeout` bounds how long a single
    /// statement waits on a locked database before failing with `StoreUnavailable`.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self::init(conn, timeout)?;
        info!("Store opened at {} (busy timeout {:?})", path.display(), timeout);
        Ok(store)
    }

    pub fn open_in_memory(timeout: Duration) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, timeout)
    }

    fn init(conn: Connection, timeout: Duration) -> Result<Self> {
        conn.busy_timeout(timeout)?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FeedError::StoreUnavailable(format!("connection lock poisoned: {}", e)))?;
        f(&conn)
    }
}

/// `WHERE` clause selecting one key's entries within a score range.
struct ScoreFilter {
    sql: String,
    params: Vec<Value>,
}

fn score_filter(key: &str, min: ScoreBound, max: ScoreBound) -> ScoreFilter {
    let mut sql = String::from("key = ?");
    let mut params = vec![Value::Text(key.to_string())];

    match min {
        ScoreBound::NegInf => {}
        ScoreBound::PosInf => sql.push_str(" AND 0"),
        ScoreBound::Inclusive(v) => {
            sql.push_str(" AND score >= ?");
            params.push(Value::Real(v));
        }
        ScoreBound::Exclusive(v) => {
            sql.push_str(" AND score > ?");
            params.push(Value::Real(v));
        }
    }
    match max {
        ScoreBound::PosInf => {}
        ScoreBound::NegInf => sql.push_str(" AND 0"),
        ScoreBound::Inclusive(v) => {
            sql.push_str(" AND score <= ?");
            params.push(Value::Real(v));
        }
        ScoreBound::Exclusive(v) => {
            sql.push_str(" AND score < ?");
            params.push(Value::Real(v));
        }
    }

    ScoreFilter { sql, params }
}

fn count_entries(conn: &Connection, key: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sorted_entries WHERE key = ?1",
        [key],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

impl OrderedStore for SqliteStore {
    fn insert(&self, key: &str, score: f64, member: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sorted_entries (key, score, member) VALUES (?1, ?2, ?3)",
                params![key, score, member],
            )?;
            Ok(())
        })
    }

    fn range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        order: Order,
    ) -> Result<Vec<String>> {
        let filter = score_filter(key, min, max);
        let dir = match order {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        };
        let sql = format!(
            "SELECT member FROM sorted_entries WHERE {} ORDER BY score {dir}, seq {dir}",
            filter.sql
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let members = stmt
                .query_map(params_from_iter(filter.params.iter()), |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(members)
        })
    }

    fn count_by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Result<usize> {
        let filter = score_filter(key, min, max);
        let sql = format!("SELECT COUNT(*) FROM sorted_entries WHERE {}", filter.sql);

        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn remove_by_score(&self, key: &str, min: ScoreBound, max: ScoreBound) -> Result<usize> {
        let filter = score_filter(key, min, max);
        let sql = format!("DELETE FROM sorted_entries WHERE {}", filter.sql);

        self.with_conn(|conn| {
            let removed = conn.execute(&sql, params_from_iter(filter.params.iter()))?;
            debug!("{}: removed {} entries by score", key, removed);
            Ok(removed)
        })
    }

    fn remove_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let len = count_entries(conn, key)?;
            let Some((first, last)) = resolve_rank_range(start, stop, len) else {
                return Ok(0);
            };

            let removed = conn.execute(
                "DELETE FROM sorted_entries WHERE seq IN (
                    SELECT seq FROM sorted_entries
                    WHERE key = ?1
                    ORDER BY score ASC, seq ASC
                    LIMIT ?2 OFFSET ?3
                 )",
                params![key, (last - first + 1) as i64, first as i64],
            )?;
            debug!("{}: removed {} entries by rank {}..={}", key, removed, first, last);
            Ok(removed)
        })
    }

    fn get_scalar(&self, key: &str) -> Result<Option<f64>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM scalars WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn set_scalar(&self, key: &str, value: f64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO scalars (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let entries = conn.execute("DELETE FROM sorted_entries WHERE key = ?1", [key])?;
            let scalars = conn.execute("DELETE FROM scalars WHERE key = ?1", [key])?;
            Ok(entries + scalars > 0)
        })
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sorted_entries WHERE key = ?1)
                     OR EXISTS(SELECT 1 FROM scalars WHERE key = ?1)",
                [key],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn test_range_orders_and_bounds() {
        let s = store();
        s.insert("k", 2.0, "b").unwrap();
        s.insert("k", 1.0, "a").unwrap();
        s.insert("k", 3.0, "c").unwrap();
        s.insert("other", 2.5, "x").unwrap();

        let all = s
            .range_by_score("k", ScoreBound::NegInf, ScoreBound::PosInf, Order::Descending)
            .unwrap();
        assert_eq!(all, vec!["c", "b", "a"]);

        let asc = s
            .range_by_score("k", ScoreBound::Exclusive(1.0), ScoreBound::PosInf, Order::Ascending)
            .unwrap();
        assert_eq!(asc, vec!["b", "c"]);

        assert_eq!(
            s.count_by_score("k", ScoreBound::Inclusive(2.0), ScoreBound::Inclusive(3.0))
                .unwrap(),
            2
        );
        assert_eq!(
            s.count_by_score("k", ScoreBound::PosInf, ScoreBound::PosInf).unwrap(),
            0
        );
    }

    #[test]
    fn test_duplicate_members_kept() {
        let s = store();
        s.insert("k", 1.0, "same").unwrap();
        s.insert("k", 1.0, "same").unwrap();
        assert_eq!(
            s.count_by_score("k", ScoreBound::NegInf, ScoreBound::PosInf).unwrap(),
            2
        );
    }

    #[test]
    fn test_remove_by_rank_keeps_newest() {
        let s = store();
        for i in 0..10 {
            s.insert("k", i as f64, &i.to_string()).unwrap();
        }
        assert_eq!(s.remove_by_rank("k", 0, -4).unwrap(), 7);
        let left = s
            .range_by_score("k", ScoreBound::NegInf, ScoreBound::PosInf, Order::Ascending)
            .unwrap();
        assert_eq!(left, vec!["7", "8", "9"]);
        assert_eq!(s.remove_by_rank("k", 0, -4).unwrap(), 0);
    }

    #[test]
    fn test_remove_by_score_takes_all_ties() {
        let s = store();
        s.insert("k", 1.0, "a").unwrap();
        s.insert("k", 2.0, "b1").unwrap();
        s.insert("k", 2.0, "b2").unwrap();
        s.insert("k", 3.0, "c").unwrap();

        let removed = s
            .remove_by_score("k", ScoreBound::Inclusive(2.0), ScoreBound::Inclusive(2.0))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            s.range_by_score("k", ScoreBound::NegInf, ScoreBound::PosInf, Order::Ascending)
                .unwrap(),
            vec!["a", "c"]
        );
    }

    #[test]
    fn test_scalars_delete_and_exists() {
        let s = store();
        assert_eq!(s.get_scalar("w").unwrap(), None);
        assert!(!s.exists("w").unwrap());

        s.set_scalar("w", 12.5).unwrap();
        s.set_scalar("w", 13.25).unwrap();
        assert_eq!(s.get_scalar("w").unwrap(), Some(13.25));
        assert!(s.exists("w").unwrap());

        assert!(s.delete("w").unwrap());
        assert!(!s.delete("w").unwrap());
        assert!(!s.exists("w").unwrap());
    }

    #[test]
    fn test_locked_database_times_out_as_unavailable() {
        let dir = std::env::temp_dir().join(format!("notifeed_busy_{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("feed.db");
        let _ = std::fs::remove_file(&path);

        let timeout = Duration::from_millis(200);
        let s = SqliteStore::open(&path, timeout).unwrap();

        let other = Connection::open(&path).unwrap();
        other.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let started = std::time::Instant::now();
        let result = s.insert("k", 1.0, "a");
        let elapsed = started.elapsed();

        assert!(
            matches!(result, Err(FeedError::StoreUnavailable(_))),
            "{:?}",
            result
        );
        assert!(elapsed >= timeout / 2, "gave up after {:?}", elapsed);
        assert!(elapsed < timeout * 10, "waited {:?}", elapsed);

        other.execute_batch("ROLLBACK").unwrap();
        s.insert("k", 1.0, "a").unwrap();

        drop(other);
        drop(s);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = std::env::temp_dir().join(format!("notifeed_sqlite_{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("feed.db");
        let _ = std::fs::remove_file(&path);

        {
            let s = SqliteStore::open(&path, Duration::from_millis(500)).unwrap();
            s.insert("k", 1.5, "a").unwrap();
            s.set_scalar("w", 9.0).unwrap();
        }
        let s = SqliteStore::open(&path, Duration::from_millis(500)).unwrap();
        assert_eq!(
            s.count_by_score("k", ScoreBound::NegInf, ScoreBound::PosInf).unwrap(),
            1
        );
        assert_eq!(s.get_scalar("w").unwrap(), Some(9.0));

        drop(s);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
