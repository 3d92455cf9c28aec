pub mod api;
pub mod core;
pub mod network;
pub mod utils;
pub mod workflow;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::client::RestClient;
use crate::api::SocialApi;
use crate::core::graph::types::Operation;
use crate::core::graph::SocialGraphStore;
use crate::core::session::{SessionContext, TokenStore};
use crate::network::presence::events::PresenceEvent;
use crate::network::presence::{apply_events, PresenceChannel};
use crate::network::reconcile::ReconciliationScheduler;
use crate::utils::config::Config;
use crate::utils::error::Result;
use crate::workflow::RequestWorkflow;

/// Composition root: owns the store, the session, the REST client, the
/// presence channel and the reconciliation scheduler, and ties their
/// lifetimes to one authenticated session.
pub struct SyncEngine {
    api: Arc<dyn SocialApi>,
    session: Arc<SessionContext>,
    store: Arc<SocialGraphStore>,
    workflow: RequestWorkflow,
    scheduler: ReconciliationScheduler,
    presence: PresenceChannel,
    presence_rx: Mutex<Option<mpsc::UnboundedReceiver<PresenceEvent>>>,
}

impl SyncEngine {
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(RestClient::new(&config.api.base_url, config.request_timeout())?);
        Self::with_api(config, api)
    }

    /// Build the engine over any `SocialApi` implementation. The seam the
    /// tests use; production goes through [`SyncEngine::new`].
    pub fn with_api(config: Config, api: Arc<dyn SocialApi>) -> Result<Self> {
        let session = Arc::new(SessionContext::new(TokenStore::new(
            config.session.token_path.clone(),
        )));
        let store = Arc::new(SocialGraphStore::new());
        let workflow = RequestWorkflow::new(api.clone(), session.clone(), store.clone());
        let scheduler = ReconciliationScheduler::new(
            config.poll_interval(),
            api.clone(),
            session.clone(),
            store.clone(),
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let presence = PresenceChannel::new(
            config.presence_url(),
            config.connect_timeout(),
            session.clone(),
            events_tx,
        );

        Ok(Self {
            api,
            session,
            store,
            workflow,
            scheduler,
            presence,
            presence_rx: Mutex::new(Some(events_rx)),
        })
    }

    pub fn store(&self) -> &Arc<SocialGraphStore> {
        &self.store
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn workflow(&self) -> &RequestWorkflow {
        &self.workflow
    }

    pub fn scheduler(&self) -> &ReconciliationScheduler {
        &self.scheduler
    }

    pub fn is_presence_connected(&self) -> bool {
        self.presence.is_connected()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        self.store.mark_loading(Operation::Login);
        match self.api.login(email, password).await {
            Ok(auth) => {
                self.session.establish(auth.token, auth.user);
                self.store.mark_succeeded(Operation::Login);
                Ok(())
            }
            Err(e) => {
                self.store.mark_failed(Operation::Login, e.to_string());
                Err(e)
            }
        }
    }

    /// Registration lands in the same place as login: a fresh token and an
    /// established session.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        self.store.mark_loading(Operation::Login);
        match self.api.register(username, email, password).await {
            Ok(auth) => {
                self.session.establish(auth.token, auth.user);
                self.store.mark_succeeded(Operation::Login);
                Ok(())
            }
            Err(e) => {
                self.store.mark_failed(Operation::Login, e.to_string());
                Err(e)
            }
        }
    }

    /// Pick up a token persisted by a previous run. A rejected token is
    /// discarded, not retried; the caller stays unauthenticated.
    pub async fn restore_session(&self) -> Result<bool> {
        let Some(token) = self.session.stored_token() else {
            debug!("No stored token; session not restored");
            return Ok(false);
        };
        match self.api.current_user(&token).await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored from stored token");
                self.session.establish(token, user);
                Ok(true)
            }
            Err(e) => {
                warn!("Stored token rejected: {}", e);
                self.session.discard_stored_token();
                Ok(false)
            }
        }
    }

    /// Begin synchronizing: reconciliation polling plus the presence
    /// channel. Without an active session this does nothing: no fetch is
    /// issued and no connection is attempted.
    pub async fn start(&self) -> Result<()> {
        if !self.session.is_active() {
            debug!("Start requested without an active session");
            return Ok(());
        }

        let consumer_rx = self.presence_rx.lock().take();
        if let Some(events_rx) = consumer_rx {
            let store = self.store.clone();
            tokio::spawn(apply_events(events_rx, store));
        }

        self.scheduler.start();

        // A failed handshake degrades presence to polled data only; the
        // channel stays down until the next start.
        if let Err(e) = self.presence.connect().await {
            warn!("Presence channel unavailable: {}", e);
        }
        Ok(())
    }

    /// Lifecycle hook for the embedding shell: regained focus re-pulls both
    /// collections immediately instead of waiting for the next tick.
    pub async fn on_focus_regained(&self) -> Result<()> {
        if !self.session.is_active() {
            return Ok(());
        }
        self.scheduler.refresh_now().await
    }

    /// End the session: best-effort server notification, teardown, then
    /// local state is discarded.
    pub async fn logout(&self) -> Result<()> {
        if let (Some(token), Some(user_id)) = (self.session.token(), self.session.user_id()) {
            if let Err(e) = self.api.logout(&token, &user_id).await {
                warn!("Server logout failed: {}", e);
            }
        }
        self.shutdown().await;
        self.session.clear();
        self.store.reset();
        info!("Logged out");
        Ok(())
    }

    /// Stop polling and close the channel without ending the session. Fires
    /// the best-effort presence teardown beacon, as a page unload would.
    pub async fn shutdown(&self) {
        if let Some(user_id) = self.session.user_id() {
            if let Err(e) = self.api.presence_teardown(&user_id).await {
                warn!("Presence teardown beacon failed: {}", e);
            }
        }
        self.scheduler.stop();
        self.presence.disconnect().await;
        self.store.set_channel_connected(false);
    }
}
