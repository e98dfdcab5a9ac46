// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport built on tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use courier_core::CourierError;

use crate::connection::{ConnectError, Connector, RealtimeConnection};

/// Production [`Connector`] speaking WebSocket (ws:// or wss://).
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeConnection>, ConnectError> {
        match connect_async(url).await {
            Ok((stream, response)) => {
                debug!(status = %response.status(), "websocket handshake complete");
                Ok(Box::new(WsConnection { stream }))
            }
            Err(tungstenite::Error::Http(response)) => {
                let status = response.status().as_u16();
                if matches!(status, 401 | 403) {
                    Err(ConnectError::AuthRejected { status })
                } else {
                    Err(ConnectError::Failed(format!(
                        "handshake returned HTTP {status}"
                    )))
                }
            }
            Err(e) => Err(ConnectError::Failed(e.to_string())),
        }
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl RealtimeConnection for WsConnection {
    async fn recv(&mut self) -> Option<Result<String, CourierError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(CourierError::Realtime(e.to_string()))),
            };
            match message {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => trace!(len = bytes.len(), "ignoring non-UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    debug!(?frame, "server closed websocket");
                    return None;
                }
                // Pongs are queued by tungstenite; nothing to dispatch.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), CourierError> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| CourierError::Realtime(format!("send failed: {e}")))
    }

    async fn ping(&mut self) -> Result<(), CourierError> {
        self.stream
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(|e| CourierError::Realtime(format!("ping failed: {e}")))
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!(error = %e, "websocket close failed");
        }
    }
}
