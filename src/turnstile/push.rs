//! WebSocket push channel.
//!
//! The server pushes one JSON text frame per turnstile change. [`PushChannel::connect`]
//! opens the socket once and splits it:
//!
//! - a reader task decodes frames and forwards them, in arrival order, to an
//!   [`UpdateStream`]
//! - a writer task drains frames queued with [`PushChannel::send`]
//!
//! # Lifecycle
//!
//! 1. Created via [`PushChannel::connect`]
//! 2. Updates arrive through [`UpdateStream::next`] or the `Stream` impl
//! 3. The stream ends when the server closes the socket or the connection fails
//!
//! A frame that does not decode is yielded as [`HalError::Decode`] and the stream
//! carries on; one bad frame never ends the session.
//!
//! ```ignore
//! use futures::StreamExt;
//! use turnstile_hal::turnstile::PushChannel;
//!
//! let (channel, mut updates) = PushChannel::connect("ws://localhost:8080/ws").await?;
//! while let Some(update) = updates.next().await {
//!     match update {
//!         Ok(turnstile) => println!("{} is {}", turnstile.id, turnstile.current_state),
//!         Err(e) => eprintln!("bad frame: {}", e),
//!     }
//! }
//! ```

use crate::error::{HalError, Result};
use crate::turnstile::types::TurnstileResource;
use futures::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const UPDATE_BUFFER: usize = 100;

/// Outbound half of the push socket.
///
/// Dropping every clone closes the socket.
#[derive(Clone, Debug)]
pub struct PushChannel {
    outbound: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
    url: Arc<str>,
}

impl PushChannel {
    /// Open the socket at `url` and start its reader and writer tasks.
    pub async fn connect(url: &str) -> Result<(PushChannel, UpdateStream)> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| HalError::Push(format!("WebSocket connect to {} failed: {}", url, e)))?;
        tracing::info!("WebSocket connected to {}", url);

        let (mut write, mut read) = ws_stream.split();
        let open = Arc::new(AtomicBool::new(true));
        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let reader_open = open.clone();
        let reader_url = url.to_string();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let update = match frame {
                    Ok(Message::Text(text)) => decode_frame(text.as_bytes()),
                    Ok(Message::Binary(data)) => decode_frame(&data),
                    Ok(Message::Close(_)) => {
                        tracing::info!("Push channel {} closed by server", reader_url);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Push channel {} failed: {}", reader_url, e);
                        break;
                    }
                };
                if let Err(e) = &update {
                    tracing::warn!("Dropping undecodable push frame: {}", e);
                }
                if update_tx.send(update).await.is_err() {
                    // receiver dropped
                    break;
                }
            }
            reader_open.store(false, Ordering::SeqCst);
        });

        let writer_open = open.clone();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if !writer_open.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = write.send(message).await {
                    tracing::warn!("Push channel send failed: {}", e);
                    break;
                }
            }
            writer_open.store(false, Ordering::SeqCst);
            let _ = write.close().await;
        });

        Ok((
            PushChannel {
                outbound,
                open,
                url: Arc::from(url),
            },
            UpdateStream::new(update_rx),
        ))
    }

    /// Whether the socket is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    /// Endpoint the channel connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue `payload` as a JSON text frame.
    ///
    /// Returns `Ok(false)` without sending when the socket is no longer open.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool> {
        if !self.is_open() {
            tracing::debug!("Push channel {} closed, dropping outbound frame", self.url);
            return Ok(false);
        }
        let text = serde_json::to_string(payload)?;
        Ok(self.outbound.send(Message::Text(text)).is_ok())
    }

    /// Ask the server to close the socket.
    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}

fn decode_frame(data: &[u8]) -> Result<TurnstileResource> {
    serde_json::from_slice(data).map_err(|e| HalError::Decode(format!("push frame: {}", e)))
}

/// Turnstile updates received on the push channel, in arrival order.
#[derive(Debug)]
pub struct UpdateStream {
    receiver: ReceiverStream<Result<TurnstileResource>>,
}

impl UpdateStream {
    /// Wrap a receiver. Useful for feeding updates from somewhere other than a socket.
    pub fn new(receiver: mpsc::Receiver<Result<TurnstileResource>>) -> Self {
        UpdateStream {
            receiver: ReceiverStream::new(receiver),
        }
    }

    /// Receive the next update; `None` once the socket is gone.
    pub async fn next(&mut self) -> Option<Result<TurnstileResource>> {
        StreamExt::next(&mut self.receiver).await
    }
}

impl Stream for UpdateStream {
    type Item = Result<TurnstileResource>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
