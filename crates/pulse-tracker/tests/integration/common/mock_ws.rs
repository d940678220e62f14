//! Mock ticker server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Accept connections and count them
//! - Send a fixed list of frames to every new connection
//! - Close all open connections on demand
//! - Stop listening so reconnects are refused

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// A mock ticker server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    close_tx: broadcast::Sender<()>,
    connections: Arc<Mutex<u32>>,
    accept_handle: JoinHandle<()>,
}

impl MockWsServer {
    /// Start a server that sends nothing.
    pub async fn start() -> Self {
        Self::start_with_frames(Vec::new()).await
    }

    /// Start a server that sends `frames` to each new connection, in order.
    pub async fn start_with_frames(frames: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (close_tx, _) = broadcast::channel::<()>(4);
        let frames = Arc::new(frames);

        let connections_clone = connections.clone();
        let close_tx_clone = close_tx.clone();

        let accept_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            frames.clone(),
                            connections_clone.clone(),
                            close_tx_clone.subscribe(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            close_tx,
            connections,
            accept_handle,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Send a close frame on every open connection.
    pub fn close_connections(&self) {
        let _ = self.close_tx.send(());
    }

    /// Stop accepting, then close every open connection.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.accept_handle.await;
        let _ = self.close_tx.send(());
    }
}

async fn handle_connection(
    stream: TcpStream,
    frames: Arc<Vec<String>>,
    connections: Arc<Mutex<u32>>,
    mut close_rx: broadcast::Receiver<()>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let (mut write, mut read) = ws_stream.split();

    for frame in frames.iter() {
        if write.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            _ = close_rx.recv() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "server closing".into(),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
