// src/workflow/mod.rs
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::SocialApi;
use crate::core::graph::types::{Operation, RequestAction};
use crate::core::graph::SocialGraphStore;
use crate::core::session::SessionContext;
use crate::network::reconcile;
use crate::utils::error::{EngineError, Result};

/// Drives the multi-step friend-request protocol: search, send, respond.
/// Every user-initiated action owns its status machine in the store; the
/// workflow only sequences calls and cache transitions.
pub struct RequestWorkflow {
    api: Arc<dyn SocialApi>,
    session: Arc<SessionContext>,
    store: Arc<SocialGraphStore>,
}

impl RequestWorkflow {
    pub fn new(
        api: Arc<dyn SocialApi>,
        session: Arc<SessionContext>,
        store: Arc<SocialGraphStore>,
    ) -> Self {
        Self {
            api,
            session,
            store,
        }
    }

    /// An empty query clears results without touching the network. A new
    /// search supersedes the previous result set atomically.
    pub async fn search(&self, query: &str) -> Result<()> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.store.clear_search_results();
            return Ok(());
        }
        let Some(token) = self.session.token() else {
            debug!("Skipping search: no active session");
            return Ok(());
        };

        self.store.mark_loading(Operation::Search);
        match self.api.search_users(&token, trimmed).await {
            Ok(results) => {
                self.store.replace_search_results(trimmed, results);
                self.store.mark_succeeded(Operation::Search);
                Ok(())
            }
            Err(e) => {
                self.store.mark_failed(Operation::Search, e.to_string());
                self.clear_on_unauthorized(&e);
                Err(e)
            }
        }
    }

    /// Send a friend request to a user from the current result set. Success
    /// marks the entry sent for the lifetime of this result set; failure
    /// leaves it actionable.
    pub async fn send_request(&self, user_id: &str) -> Result<()> {
        let Some(token) = self.session.token() else {
            debug!("Skipping friend request: no active session");
            return Ok(());
        };
        if self.store.request_already_sent(user_id) {
            debug!(user_id, "Friend request already sent for this result set");
            return Ok(());
        }

        self.store.mark_loading(Operation::SendRequest);
        match self.api.send_friend_request(&token, user_id).await {
            Ok(()) => {
                self.store.mark_request_sent(user_id);
                self.store.mark_succeeded(Operation::SendRequest);
                info!(user_id, "Friend request sent");
                Ok(())
            }
            Err(e) => {
                self.store.mark_failed(Operation::SendRequest, e.to_string());
                self.clear_on_unauthorized(&e);
                Err(e)
            }
        }
    }

    /// Accept or reject an incoming request. Confirmation removes it from
    /// the incoming collection (a no-op if a concurrent poll already did),
    /// then both collections are re-pulled so an accepted edge shows up
    /// without waiting for the next tick.
    pub async fn respond(&self, request_id: &str, action: RequestAction) -> Result<()> {
        let Some(token) = self.session.token() else {
            debug!("Skipping request response: no active session");
            return Ok(());
        };

        self.store.mark_loading(Operation::Respond);
        match self
            .api
            .respond_to_request(&token, request_id, action)
            .await
        {
            Ok(()) => {
                self.store.remove_incoming_request(request_id);
                self.store.mark_succeeded(Operation::Respond);
                info!(request_id, ?action, "Responded to friend request");
                if let Err(e) =
                    reconcile::refresh_all(self.api.as_ref(), &self.session, &self.store).await
                {
                    warn!("Post-respond refresh failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                self.store.mark_failed(Operation::Respond, e.to_string());
                self.clear_on_unauthorized(&e);
                Err(e)
            }
        }
    }

    fn clear_on_unauthorized(&self, error: &EngineError) {
        if matches!(error, EngineError::Unauthorized) {
            self.session.clear();
        }
    }
}
