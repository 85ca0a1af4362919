use crate::error::{Result, SyncError};
use crate::lock::lock;
use crate::protocol::{decode_inbound, InboundMessage, OutboundMessage};
use crate::store::ChannelWriter;
use crate::subscription::{ListenerRegistry, Subscription};
use crate::types::{ChannelLevel, ChannelValue, ConnectionStatus, WireId};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Shared transport state
struct TransportState {
    url: String,
    heartbeat: Duration,
    status: Mutex<ConnectionStatus>,
    status_listeners: ListenerRegistry<(), ConnectionStatus>,
    /// Channel for sending outgoing messages while a socket is up
    ws_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    /// Requests a graceful close of the current connection
    close_tx: Mutex<Option<oneshot::Sender<()>>>,
    /// Decoded channel levels, in arrival order
    levels_tx: mpsc::UnboundedSender<Vec<ChannelLevel>>,
}

/// Owner of the single push connection to the lighting server
///
/// Connection loss only shows up as a [`ConnectionStatus`] change. There is
/// no automatic reconnect; call [`Transport::reconnect`] once the status is
/// `Closed`.
#[derive(Clone)]
pub struct Transport {
    state: Arc<TransportState>,
}

impl Transport {
    /// Start connecting to `url`
    ///
    /// Returns immediately with status `Connecting`. Channel levels decoded
    /// from the socket are sent to `levels_tx`. Must be called inside a
    /// tokio runtime.
    pub fn connect(
        url: impl Into<String>,
        heartbeat: Duration,
        levels_tx: mpsc::UnboundedSender<Vec<ChannelLevel>>,
    ) -> Self {
        let transport = Self {
            state: Arc::new(TransportState {
                url: url.into(),
                heartbeat,
                status: Mutex::new(ConnectionStatus::Closed),
                status_listeners: ListenerRegistry::new(),
                ws_tx: Mutex::new(None),
                close_tx: Mutex::new(None),
                levels_tx,
            }),
        };
        transport.start();
        transport
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *lock(&self.state.status)
    }

    /// Watch status transitions
    pub fn subscribe_status(
        &self,
        listener: impl Fn(ConnectionStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.state.status_listeners.subscribe((), listener)
    }

    /// Send a message; dropped silently unless the connection is open
    pub fn send(&self, message: &OutboundMessage) {
        if let Err(e) = self.state.try_send(message) {
            tracing::debug!("Dropping {:?}: {}", message, e);
        }
    }

    /// Open a new connection if the previous one is closed
    ///
    /// Does nothing while connecting, open or closing.
    pub fn reconnect(&self) {
        if self.status() != ConnectionStatus::Closed {
            tracing::debug!("Ignoring reconnect while {}", self.status());
            return;
        }
        self.start();
    }

    /// Close the connection gracefully
    pub fn close(&self) {
        let close_tx = lock(&self.state.close_tx).take();
        if let Some(tx) = close_tx {
            let _ = tx.send(());
        }
    }

    /// Endpoint this transport connects to
    pub fn url(&self) -> &str {
        &self.state.url
    }

    fn start(&self) {
        {
            let mut status = lock(&self.state.status);
            if *status != ConnectionStatus::Closed {
                return;
            }
            *status = ConnectionStatus::Connecting;
        }
        tracing::info!("Connection to {} is {}", self.state.url, ConnectionStatus::Connecting);
        self.state.status_listeners.notify((), ConnectionStatus::Connecting);

        let (close_tx, close_rx) = oneshot::channel();
        *lock(&self.state.close_tx) = Some(close_tx);

        let state = self.state.clone();
        tokio::spawn(async move {
            state.run(close_rx).await;
        });
    }
}

impl ChannelWriter for Transport {
    fn write_channel(&self, id: WireId, level: ChannelValue) {
        self.send(&OutboundMessage::update_channel(id, level));
    }
}

impl TransportState {
    fn status(&self) -> ConnectionStatus {
        *lock(&self.status)
    }

    fn set_status(&self, status: ConnectionStatus) {
        {
            let mut current = lock(&self.status);
            if *current == status {
                return;
            }
            *current = status;
        }
        tracing::info!("Connection to {} is {}", self.url, status);
        self.status_listeners.notify((), status);
    }

    fn try_send(&self, message: &OutboundMessage) -> Result<()> {
        if self.status() != ConnectionStatus::Open {
            return Err(SyncError::ConnectionClosed);
        }
        let json = message.to_json()?;
        tracing::debug!("Sending: {}", json);

        lock(&self.ws_tx)
            .as_ref()
            .ok_or(SyncError::ConnectionClosed)?
            .send(Message::Text(json))
            .map_err(|_| SyncError::ConnectionClosed)
    }

    /// Drive one connection from connect to close
    async fn run(self: Arc<Self>, mut close_rx: oneshot::Receiver<()>) {
        tracing::info!("Connecting to {}", self.url);

        let connected = tokio::select! {
            result = connect_async(self.url.as_str()) => result,
            _ = &mut close_rx => {
                tracing::info!("Connection to {} abandoned", self.url);
                self.set_status(ConnectionStatus::Closed);
                return;
            }
        };
        let ws_stream = match connected {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", self.url, e);
                self.set_status(ConnectionStatus::Closed);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();

        // Forward outgoing messages to the socket
        let write_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    tracing::error!("Failed to send message: {}", e);
                    break;
                }
            }
        });

        *lock(&self.ws_tx) = Some(ws_tx.clone());
        self.set_status(ConnectionStatus::Open);
        self.send_or_log(&OutboundMessage::ChannelStateRequest);

        let mut heartbeat = interval_at(Instant::now() + self.heartbeat, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let close_grace = sleep(CLOSE_GRACE);
        tokio::pin!(close_grace);
        let mut closing = false;

        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("WebSocket connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                },
                _ = heartbeat.tick() => self.heartbeat(),
                _ = &mut close_rx, if !closing => {
                    closing = true;
                    self.set_status(ConnectionStatus::Closing);
                    let _ = ws_tx.send(Message::Close(None));
                    close_grace.as_mut().reset(Instant::now() + CLOSE_GRACE);
                }
                _ = &mut close_grace, if closing => {
                    tracing::warn!("Server did not acknowledge close within {:?}", CLOSE_GRACE);
                    break;
                }
            }
        }

        // Dropping the last sender lets the writer task finish
        lock(&self.ws_tx).take();
        drop(ws_tx);
        drop(write_handle);
        self.set_status(ConnectionStatus::Closed);
    }

    /// Ping the server; skipped once the connection is closing
    fn heartbeat(&self) {
        if self.status() == ConnectionStatus::Open {
            self.send_or_log(&OutboundMessage::Ping);
        }
    }

    fn send_or_log(&self, message: &OutboundMessage) {
        if let Err(e) = self.try_send(message) {
            tracing::warn!("Failed to send {:?}: {}", message, e);
        }
    }

    /// Decode a text frame and forward any channel levels
    fn handle_frame(&self, text: &str) {
        tracing::trace!("Received: {}", text);

        let levels = match decode_inbound(text) {
            Ok(InboundMessage::ChannelUpdate(level)) => vec![level],
            Ok(InboundMessage::ChannelState(levels)) => {
                tracing::debug!("Received snapshot of {} channel(s)", levels.len());
                levels
            }
            Ok(InboundMessage::Pong) => return,
            Ok(InboundMessage::Other(kind)) => {
                tracing::debug!("Ignoring message of type {}", kind);
                return;
            }
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {}", e);
                return;
            }
        };

        if self.levels_tx.send(levels).is_err() {
            tracing::debug!("Channel levels receiver is gone");
        }
    }
}
