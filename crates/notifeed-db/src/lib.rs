pub mod counters;
pub mod error;
pub mod feed;
pub mod keys;
pub mod lifecycle;
pub mod memory;
pub mod migrations;
pub mod retention;
pub mod session;
pub mod sqlite;
pub mod store;
pub mod watermark;

pub use counters::CounterSnapshot;
pub use error::{FeedError, Result};
pub use feed::{DecodeFailure, DecodedWindow, FeedStore};
pub use keys::UserKeys;
pub use lifecycle::purge_user;
pub use memory::MemoryStore;
pub use retention::{RetentionOptions, RetentionPolicy};
pub use session::{FeedEntry, FeedPage, FeedSession, ReadOptions};
pub use sqlite::SqliteStore;
pub use store::{Order, OrderedStore, ScoreBound};
pub use watermark::ReadWatermark;
