//! Ticker ingestion for pulse.
//!
//! Turns raw ticker frames from the connector into rounded price records,
//! keeps a bounded history per tracked symbol and publishes one ordered
//! snapshot per accepted frame.

pub mod error;
pub mod feed;
pub mod history;
pub mod normalizer;
pub mod publisher;

pub use error::{FeedError, FeedResult};
pub use feed::{FeedConfig, TickerFeed, DEFAULT_SYMBOLS};
pub use history::{HistoryBuffer, HistoryStore, HistoryTrend, CHART_WINDOW, DEFAULT_HISTORY_CAPACITY};
pub use normalizer::Normalizer;
pub use publisher::{SnapshotObserver, SnapshotPublisher};
