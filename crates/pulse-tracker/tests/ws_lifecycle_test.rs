//! Ticker feed lifecycle integration tests.
//!
//! Tests the feed against a local server:
//! - Connection establishment and snapshot delivery
//! - Reconnection after a server close
//! - Retry exhaustion
//! - Disconnect cancelling a pending reconnect
//! - Disconnect while connected

mod integration;
use integration::common::mock_ws::MockWsServer;

use parking_lot::Mutex;
use pulse_core::Snapshot;
use pulse_feed::{FeedConfig, SnapshotObserver, TickerFeed};
use pulse_ws::{ConnectionConfig, ConnectionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const BTC_FRAME: &str = r#"[{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","p":"100.5","P":"0.2","c":"50000.1234"}]"#;

#[derive(Default)]
struct RecordingObserver {
    snapshots: Mutex<Vec<Snapshot>>,
    states: Mutex<Vec<ConnectionState>>,
}

impl RecordingObserver {
    fn snapshot_count(&self) -> usize {
        self.snapshots.lock().len()
    }

    fn saw_state(&self, state: ConnectionState) -> bool {
        self.states.lock().contains(&state)
    }
}

impl SnapshotObserver for RecordingObserver {
    fn on_snapshot(&self, snapshot: &Snapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }

    fn on_state_change(&self, state: ConnectionState) {
        self.states.lock().push(state);
    }
}

fn feed_for(url: String, max_reconnect_attempts: u32, base_delay_ms: u64) -> TickerFeed {
    TickerFeed::new(FeedConfig {
        symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
        connection: ConnectionConfig {
            url,
            max_reconnect_attempts,
            reconnect_base_delay_ms: base_delay_ms,
        },
        ..Default::default()
    })
    .unwrap()
}

/// Poll `check` until it holds or two seconds pass.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    timeout(Duration::from_secs(2), async {
        loop {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

async fn wait_for_connections(server: &MockWsServer, n: u32) -> bool {
    timeout(Duration::from_secs(2), async {
        loop {
            if server.connection_count().await >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}

/// Frames from the server end up as ordered snapshots with placeholders.
#[tokio::test]
async fn test_feed_publishes_snapshots() {
    let server = MockWsServer::start_with_frames(vec![BTC_FRAME.to_string()]).await;
    let feed = feed_for(server.url(), 3, 20);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());

    assert!(eventually(|| observer.snapshot_count() >= 1).await);
    assert_eq!(feed.state(), ConnectionState::Connected);
    assert!(observer.saw_state(ConnectionState::Connecting));
    assert!(observer.saw_state(ConnectionState::Connected));

    let snapshot = observer.snapshots.lock()[0].clone();
    assert_eq!(snapshot.sequence, 1);
    assert_eq!(snapshot.symbols(), vec!["BTCUSDT", "ETHUSDT"]);

    let btc = &snapshot.records[0];
    assert_eq!(btc.price.to_string(), "50000.123");
    assert_eq!(btc.price_change.to_string(), "100.500");
    assert_eq!(btc.price_change_percent.to_string(), "0.20");
    assert!(btc.is_positive);
    assert_eq!(btc.timestamp, 1_700_000_000_000);

    let eth = &snapshot.records[1];
    assert_eq!(eth.price.to_string(), "0.000");
    assert!(!eth.is_positive);

    assert_eq!(feed.history("BTCUSDT").len(), 1);
    assert!(feed.history("ETHUSDT").is_empty());

    feed.shutdown().await;
    server.shutdown().await;
}

/// Malformed and control frames are skipped without dropping the connection.
#[tokio::test]
async fn test_bad_frames_keep_connection() {
    let server = MockWsServer::start_with_frames(vec![
        "not json".to_string(),
        r#"{"result":null,"id":1}"#.to_string(),
        r#"[{"s":"DOGEUSDT","c":"0.1"}, 42]"#.to_string(),
        BTC_FRAME.to_string(),
    ])
    .await;
    let feed = feed_for(server.url(), 3, 20);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());

    assert!(eventually(|| observer.snapshot_count() >= 2).await);
    let stats = feed.connection_stats();
    assert_eq!(stats.frames_received(), 4);
    assert_eq!(stats.frames_dropped(), 1);
    assert_eq!(stats.connections_opened(), 1);
    assert_eq!(server.connection_count().await, 1);

    // Untracked symbols are queryable but never shown.
    let snapshots = observer.snapshots.lock().clone();
    assert!(snapshots.iter().all(|s| s.get("DOGEUSDT").is_none()));
    assert!(feed.latest("DOGEUSDT").is_some());
    assert!(feed.history("DOGEUSDT").is_empty());

    feed.shutdown().await;
    server.shutdown().await;
}

/// A server close triggers a reconnect that resets the retry counter.
#[tokio::test]
async fn test_reconnects_after_server_close() {
    let server = MockWsServer::start_with_frames(vec![BTC_FRAME.to_string()]).await;
    let feed = feed_for(server.url(), 3, 20);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());
    assert!(wait_for_connections(&server, 1).await);
    assert!(eventually(|| feed.state() == ConnectionState::Connected).await);

    server.close_connections();

    assert!(wait_for_connections(&server, 2).await);
    assert!(eventually(|| observer.snapshot_count() >= 2).await);
    assert!(eventually(|| feed.state() == ConnectionState::Connected).await);
    assert!(observer.saw_state(ConnectionState::Reconnecting));
    assert_eq!(feed.reconnect_attempts(), 0);
    assert_eq!(feed.connection_stats().reconnect_attempts(), 1);
    assert_eq!(feed.connection_stats().connections_opened(), 2);

    // Same record twice: history keeps both arrivals.
    assert_eq!(feed.history("BTCUSDT").len(), 2);

    feed.shutdown().await;
    server.shutdown().await;
}

/// With the server gone, the connector gives up after the retry ceiling.
#[tokio::test]
async fn test_retry_exhaustion() {
    let server = MockWsServer::start().await;
    let feed = feed_for(server.url(), 2, 10);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());
    assert!(wait_for_connections(&server, 1).await);
    assert!(eventually(|| feed.state() == ConnectionState::Connected).await);

    server.shutdown().await;

    assert!(eventually(|| feed.state() == ConnectionState::MaxRetriesExhausted).await);
    assert!(observer.saw_state(ConnectionState::MaxRetriesExhausted));
    assert_eq!(feed.reconnect_attempts(), 2);
    assert_eq!(feed.connection_stats().reconnect_attempts(), 2);

    // Terminal: nothing else happens without a new connect().
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(feed.state(), ConnectionState::MaxRetriesExhausted);
    assert_eq!(feed.connection_stats().reconnect_attempts(), 2);
}

/// Disconnect during backoff cancels the pending reconnect.
#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect() {
    let server = MockWsServer::start_with_frames(vec![BTC_FRAME.to_string()]).await;
    let feed = feed_for(server.url(), 5, 60_000);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());
    assert!(eventually(|| observer.snapshot_count() >= 1).await);

    server.close_connections();
    assert!(eventually(|| feed.state() == ConnectionState::Reconnecting).await);

    feed.disconnect();
    assert_eq!(feed.state(), ConnectionState::Disconnected);
    let seen = observer.snapshot_count();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(feed.state(), ConnectionState::Disconnected);
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(observer.snapshot_count(), seen);
    assert_eq!(feed.connection_stats().reconnect_attempts(), 1);

    server.shutdown().await;
}

/// Connect during backoff replaces the pending retry with an immediate one.
#[tokio::test]
async fn test_connect_during_backoff_reconnects_immediately() {
    let server = MockWsServer::start_with_frames(vec![BTC_FRAME.to_string()]).await;
    let feed = feed_for(server.url(), 5, 60_000);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());
    assert!(eventually(|| feed.state() == ConnectionState::Connected).await);

    server.close_connections();
    assert!(eventually(|| feed.state() == ConnectionState::Reconnecting).await);

    feed.connect(observer.clone());
    assert!(wait_for_connections(&server, 2).await);
    assert!(eventually(|| feed.state() == ConnectionState::Connected).await);
    assert_eq!(feed.reconnect_attempts(), 0);

    feed.shutdown().await;
    server.shutdown().await;
}

/// Repeated connect while connected opens no second transport and keeps
/// one notification per frame.
#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = MockWsServer::start_with_frames(vec![BTC_FRAME.to_string()]).await;
    let feed = feed_for(server.url(), 3, 20);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());
    assert!(eventually(|| observer.snapshot_count() >= 1).await);
    assert_eq!(feed.state(), ConnectionState::Connected);

    feed.connect(observer.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(feed.state(), ConnectionState::Connected);
    assert_eq!(feed.publisher().observer_count(), 1);

    let seen = observer.snapshot_count();
    feed.publisher().publish(&[]);
    assert_eq!(observer.snapshot_count(), seen + 1);

    feed.shutdown().await;
    server.shutdown().await;
}

/// Disconnect while connected closes the transport without reconnecting.
#[tokio::test]
async fn test_disconnect_while_connected() {
    let server = MockWsServer::start_with_frames(vec![BTC_FRAME.to_string()]).await;
    let feed = feed_for(server.url(), 5, 20);
    let observer = Arc::new(RecordingObserver::default());

    feed.connect(observer.clone());
    assert!(eventually(|| observer.snapshot_count() >= 1).await);
    assert_eq!(feed.state(), ConnectionState::Connected);

    feed.disconnect();
    assert_eq!(feed.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(feed.state(), ConnectionState::Disconnected);
    assert_eq!(server.connection_count().await, 1);
    assert!(!observer.saw_state(ConnectionState::Reconnecting));
    assert_eq!(feed.reconnect_attempts(), 0);
    assert_eq!(feed.connection_stats().reconnect_attempts(), 0);
    assert_eq!(feed.connection_stats().connections_opened(), 1);

    server.shutdown().await;
}
