// src/network/reconcile.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::SocialApi;
use crate::core::graph::types::Operation;
use crate::core::graph::SocialGraphStore;
use crate::core::session::SessionContext;
use crate::utils::error::{EngineError, Result};

/// Pull the authoritative friends list and overwrite the local collection.
/// No-ops without a token; a result that lands after the session ended is
/// discarded rather than applied.
pub async fn refresh_friends(
    api: &dyn SocialApi,
    session: &SessionContext,
    store: &SocialGraphStore,
) -> Result<()> {
    let Some(token) = session.token() else {
        debug!("Skipping friends refresh: no active session");
        return Ok(());
    };
    store.mark_loading(Operation::FriendsFetch);
    match api.fetch_friends(&token).await {
        Ok(friends) => {
            if !session.is_active() {
                debug!("Discarding friends refresh result: session ended");
                return Ok(());
            }
            store.replace_friends(friends);
            store.mark_succeeded(Operation::FriendsFetch);
            Ok(())
        }
        Err(e) => {
            store.mark_failed(Operation::FriendsFetch, e.to_string());
            if matches!(e, EngineError::Unauthorized) {
                session.clear();
            }
            Err(e)
        }
    }
}

pub async fn refresh_requests(
    api: &dyn SocialApi,
    session: &SessionContext,
    store: &SocialGraphStore,
) -> Result<()> {
    let Some(token) = session.token() else {
        debug!("Skipping requests refresh: no active session");
        return Ok(());
    };
    store.mark_loading(Operation::RequestsFetch);
    match api.fetch_friend_requests(&token).await {
        Ok(requests) => {
            if !session.is_active() {
                debug!("Discarding requests refresh result: session ended");
                return Ok(());
            }
            store.replace_incoming_requests(requests);
            store.mark_succeeded(Operation::RequestsFetch);
            Ok(())
        }
        Err(e) => {
            store.mark_failed(Operation::RequestsFetch, e.to_string());
            if matches!(e, EngineError::Unauthorized) {
                session.clear();
            }
            Err(e)
        }
    }
}

/// Refresh both collections; both are attempted even if the first fails.
pub async fn refresh_all(
    api: &dyn SocialApi,
    session: &SessionContext,
    store: &SocialGraphStore,
) -> Result<()> {
    let friends = refresh_friends(api, session, store).await;
    let requests = refresh_requests(api, session, store).await;
    friends.and(requests)
}

/// Re-fetches the friends collection on a fixed cadence for the lifetime of
/// an active session, so missed push events are corrected eventually. A
/// failed tick leaves the previous snapshot untouched; the next tick retries
/// unconditionally.
pub struct ReconciliationScheduler {
    interval: Duration,
    api: Arc<dyn SocialApi>,
    session: Arc<SessionContext>,
    store: Arc<SocialGraphStore>,
    active: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReconciliationScheduler {
    pub fn new(
        interval: Duration,
        api: Arc<dyn SocialApi>,
        session: Arc<SessionContext>,
        store: Arc<SocialGraphStore>,
    ) -> Self {
        Self {
            interval,
            api,
            session,
            store,
            active: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Immediate full refresh, then friends on every tick. Overlapping
    /// fetches are tolerated because replacement is idempotent-by-overwrite.
    pub fn start(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("Reconciliation already running");
            return;
        }

        let interval = self.interval;
        let api = self.api.clone();
        let session = self.session.clone();
        let store = self.store.clone();
        let active = self.active.clone();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Reconciliation started");
            if let Err(e) = refresh_all(api.as_ref(), &session, &store).await {
                warn!("Initial reconciliation failed: {}", e);
            }

            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately and the initial pass just
            // ran; consume it.
            ticker.tick().await;

            #[cfg(feature = "backoff")]
            let mut consecutive_failures: u32 = 0;

            loop {
                ticker.tick().await;
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                match refresh_friends(api.as_ref(), &session, &store).await {
                    Ok(()) => {
                        #[cfg(feature = "backoff")]
                        {
                            consecutive_failures = 0;
                        }
                    }
                    Err(e) => {
                        warn!("Friends reconciliation failed: {}", e);
                        #[cfg(feature = "backoff")]
                        {
                            consecutive_failures += 1;
                            let delay = backoff_delay(interval, consecutive_failures);
                            if delay > Duration::ZERO {
                                tokio::time::sleep(delay).await;
                            }
                        }
                    }
                }
            }
            debug!("Reconciliation loop ended");
        });

        *self.worker.lock() = Some(handle);
    }

    /// Cancel the timer. In-flight fetches are not interrupted; their results
    /// are discarded by the session-active guard in the refresh functions.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// On-demand full refresh for lifecycle events (e.g. focus regained).
    pub async fn refresh_now(&self) -> Result<()> {
        refresh_all(self.api.as_ref(), &self.session, &self.store).await
    }
}

impl Drop for ReconciliationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Extra delay after `failures` consecutive failed ticks, capped at seven
/// intervals so a long outage polls roughly every eight.
#[cfg(feature = "backoff")]
fn backoff_delay(interval: Duration, failures: u32) -> Duration {
    let factor = 2u32.saturating_pow(failures.min(3)) - 1;
    interval.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockSocialApi;
    use crate::core::graph::types::{OperationStatus, User};
    use crate::core::session::TokenStore;
    use std::sync::atomic::AtomicUsize;

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            username: format!("user-{id}"),
        }
    }

    fn active_session(dir: &tempfile::TempDir) -> Arc<SessionContext> {
        let session = SessionContext::new(TokenStore::new(dir.path().join("token")));
        session.establish("tok".into(), user("me"));
        Arc::new(session)
    }

    #[tokio::test]
    async fn refresh_without_session_makes_no_call() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionContext::new(TokenStore::new(dir.path().join("token"))));
        let store = SocialGraphStore::new();
        // No expectations set: any call would panic the mock.
        let api = MockSocialApi::new();

        tokio_test::assert_ok!(refresh_all(&api, &session, &store).await);
        assert_eq!(
            store.operation(Operation::FriendsFetch).status,
            OperationStatus::Idle
        );
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let session = active_session(&dir);
        let store = SocialGraphStore::new();
        store.replace_friends(vec![user("a")]);

        let mut api = MockSocialApi::new();
        api.expect_fetch_friends()
            .returning(|_| Err(EngineError::Api("server exploded".into())));

        assert!(refresh_friends(&api, &session, &store).await.is_err());
        assert_eq!(store.friends(), vec![user("a")]);
        let op = store.operation(Operation::FriendsFetch);
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.error.as_deref(), Some("API error: server exploded"));
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn unauthorized_fetch_clears_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = active_session(&dir);
        let store = SocialGraphStore::new();

        let mut api = MockSocialApi::new();
        api.expect_fetch_friends()
            .returning(|_| Err(EngineError::Unauthorized));

        assert!(refresh_friends(&api, &session, &store).await.is_err());
        assert!(!session.is_active());
        assert_eq!(session.stored_token(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_the_configured_cadence_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let session = active_session(&dir);
        let store = Arc::new(SocialGraphStore::new());

        let friend_fetches = Arc::new(AtomicUsize::new(0));
        let request_fetches = Arc::new(AtomicUsize::new(0));

        let mut api = MockSocialApi::new();
        let friends_counter = friend_fetches.clone();
        api.expect_fetch_friends().returning(move |_| {
            friends_counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });
        let requests_counter = request_fetches.clone();
        api.expect_fetch_friend_requests().returning(move |_| {
            requests_counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });

        let scheduler = ReconciliationScheduler::new(
            Duration::from_secs(10),
            Arc::new(api),
            session,
            store,
        );
        scheduler.start();

        // Initial pass fetches both collections once.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(friend_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(request_fetches.load(Ordering::SeqCst), 1);

        // Three ticks: friends only.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(friend_fetches.load(Ordering::SeqCst), 4);
        assert_eq!(request_fetches.load(Ordering::SeqCst), 1);

        scheduler.stop();
        assert!(!scheduler.is_running());
        let settled = friend_fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(friend_fetches.load(Ordering::SeqCst), settled);
    }
}
