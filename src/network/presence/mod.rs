pub mod events;

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::core::graph::SocialGraphStore;
use crate::core::session::SessionContext;
use crate::utils::error::{EngineError, Result};
use events::{ClientFrame, PresenceEvent, ServerFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Long-lived push connection reporting the online set. Constructed once per
/// session and owned by the engine; there is no autonomous reconnect, the
/// owner connects again on the next session-active transition.
pub struct PresenceChannel {
    url: String,
    connect_timeout: Duration,
    session: Arc<SessionContext>,
    events: mpsc::UnboundedSender<PresenceEvent>,
    state: Arc<RwLock<ChannelState>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceChannel {
    pub fn new(
        url: String,
        connect_timeout: Duration,
        session: Arc<SessionContext>,
        events: mpsc::UnboundedSender<PresenceEvent>,
    ) -> Self {
        Self {
            url,
            connect_timeout,
            session,
            events,
            state: Arc::new(RwLock::new(ChannelState::Disconnected)),
            shutdown: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Handshake, announce the local identity, then hand the socket to a
    /// reader task that forwards typed events until the connection drops.
    pub async fn connect(&self) -> Result<()> {
        if self.state() != ChannelState::Disconnected {
            debug!("Presence channel already connecting or connected");
            return Ok(());
        }
        let token = self
            .session
            .token()
            .ok_or_else(|| EngineError::Presence("no active session".into()))?;
        let user_id = self
            .session
            .user_id()
            .ok_or_else(|| EngineError::Presence("no active session".into()))?;

        *self.state.write() = ChannelState::Connecting;

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| self.fail_connect(format!("invalid endpoint: {e}")))?;
        let bearer = format!("Bearer {token}")
            .parse()
            .map_err(|_| self.fail_connect("token is not a valid header value".into()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (socket, _) = match timeout(self.connect_timeout, connect_async(request)).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => return Err(self.fail_connect(format!("handshake failed: {e}"))),
            Err(_) => return Err(self.fail_connect("connection timeout".into())),
        };

        let (mut write, mut read) = socket.split();

        // Join so the server's online set includes this client.
        let join = serde_json::to_string(&ClientFrame::Join(user_id))
            .map_err(|e| self.fail_connect(e.to_string()))?;
        if let Err(e) = write.send(Message::Text(join)).await {
            return Err(self.fail_connect(format!("join announcement failed: {e}")));
        }

        *self.state.write() = ChannelState::Connected;
        let _ = self.events.send(PresenceEvent::Connected);
        info!(url = %self.url, "Presence channel connected");

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let state = self.state.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        let _ = write.close().await;
                        debug!("Presence channel closed by owner");
                        break;
                    }
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerFrame>(&text) {
                                Ok(frame) => {
                                    if events.send(frame.into_event()).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => debug!("Ignoring unrecognized presence frame: {}", e),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Presence channel closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Presence channel read failed: {}", e);
                            break;
                        }
                    }
                }
            }
            *state.write() = ChannelState::Disconnected;
            let _ = events.send(PresenceEvent::Dropped);
        });

        *self.shutdown.lock() = Some(shutdown_tx);
        *self.reader.lock() = Some(handle);
        Ok(())
    }

    /// Explicit teardown. Waits for the reader to finish so the Dropped
    /// event is queued before this returns.
    pub async fn disconnect(&self) {
        let shutdown = self.shutdown.lock().take();
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
        let reader = self.reader.lock().take();
        if let Some(handle) = reader {
            let _ = handle.await;
        }
        *self.state.write() = ChannelState::Disconnected;
    }

    fn fail_connect(&self, message: String) -> EngineError {
        *self.state.write() = ChannelState::Disconnected;
        EngineError::Presence(message)
    }
}

/// The single consumer loop: applies typed presence events to the store in
/// arrival order. Runs until every sender is gone.
pub async fn apply_events(
    mut events: mpsc::UnboundedReceiver<PresenceEvent>,
    store: Arc<SocialGraphStore>,
) {
    while let Some(event) = events.recv().await {
        match event {
            PresenceEvent::Connected => store.set_channel_connected(true),
            PresenceEvent::Dropped => store.set_channel_connected(false),
            PresenceEvent::Snapshot(ids) => store.replace_online(ids),
            PresenceEvent::Invite(invite) => {
                debug!(invite_id = %invite.id, "Game invite received");
                store.add_game_invite(invite);
            }
        }
    }
    debug!("Presence event loop ended");
}
