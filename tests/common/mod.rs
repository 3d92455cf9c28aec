// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use gamezone::api::types::AuthResponse;
use gamezone::api::SocialApi;
use gamezone::core::graph::types::{FriendRequest, RequestAction, User};
use gamezone::core::graph::SocialGraphStore;
use gamezone::core::session::{SessionContext, TokenStore};
use gamezone::utils::error::{EngineError, Result};
use gamezone::workflow::RequestWorkflow;

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.into(),
        username: username.into(),
    }
}

pub fn request(id: &str, from: User) -> FriendRequest {
    FriendRequest { id: id.into(), from }
}

/// Scripted stand-in for the remote API: every endpoint pops the next
/// queued response and records the call. An empty queue answers with the
/// benign default for that endpoint.
#[derive(Default)]
pub struct ScriptedApi {
    pub calls: Mutex<Vec<String>>,
    pub login_responses: Mutex<VecDeque<Result<AuthResponse>>>,
    pub me_responses: Mutex<VecDeque<Result<User>>>,
    pub friends_responses: Mutex<VecDeque<Result<Vec<User>>>>,
    pub requests_responses: Mutex<VecDeque<Result<Vec<FriendRequest>>>>,
    pub search_responses: Mutex<VecDeque<Result<Vec<User>>>>,
    pub send_responses: Mutex<VecDeque<Result<()>>>,
    pub respond_responses: Mutex<VecDeque<Result<()>>>,
    pub logout_responses: Mutex<VecDeque<Result<()>>>,
    pub teardown_responses: Mutex<VecDeque<Result<()>>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>, default: impl FnOnce() -> T) -> Result<T> {
        queue.lock().pop_front().unwrap_or_else(|| Ok(default()))
    }
}

#[async_trait]
impl SocialApi for ScriptedApi {
    async fn login(&self, _email: &str, _password: &str) -> Result<AuthResponse> {
        self.record("login");
        self.login_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Api("no scripted login response".into())))
    }

    async fn register(&self, _username: &str, _email: &str, _password: &str) -> Result<AuthResponse> {
        self.record("register");
        self.login_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Api("no scripted register response".into())))
    }

    async fn current_user(&self, _token: &str) -> Result<User> {
        self.record("current_user");
        self.me_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Unauthorized))
    }

    async fn logout(&self, _token: &str, _user_id: &str) -> Result<()> {
        self.record("logout");
        Self::pop(&self.logout_responses, || ())
    }

    async fn fetch_friends(&self, _token: &str) -> Result<Vec<User>> {
        self.record("fetch_friends");
        Self::pop(&self.friends_responses, Vec::new)
    }

    async fn fetch_friend_requests(&self, _token: &str) -> Result<Vec<FriendRequest>> {
        self.record("fetch_friend_requests");
        Self::pop(&self.requests_responses, Vec::new)
    }

    async fn respond_to_request(
        &self,
        _token: &str,
        request_id: &str,
        action: RequestAction,
    ) -> Result<()> {
        self.record(&format!("respond:{request_id}:{action:?}"));
        Self::pop(&self.respond_responses, || ())
    }

    async fn search_users(&self, _token: &str, query: &str) -> Result<Vec<User>> {
        self.record(&format!("search:{query}"));
        Self::pop(&self.search_responses, Vec::new)
    }

    async fn send_friend_request(&self, _token: &str, user_id: &str) -> Result<()> {
        self.record(&format!("send:{user_id}"));
        Self::pop(&self.send_responses, || ())
    }

    async fn presence_teardown(&self, _user_id: &str) -> Result<()> {
        self.record("presence_teardown");
        Self::pop(&self.teardown_responses, || ())
    }
}

pub struct TestContext {
    pub api: Arc<ScriptedApi>,
    pub session: Arc<SessionContext>,
    pub store: Arc<SocialGraphStore>,
    pub workflow: RequestWorkflow,
    _token_dir: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let token_dir = tempfile::tempdir().expect("temp dir");
        let api = Arc::new(ScriptedApi::new());
        let session = Arc::new(SessionContext::new(TokenStore::new(
            token_dir.path().join("token"),
        )));
        let store = Arc::new(SocialGraphStore::new());
        let workflow = RequestWorkflow::new(api.clone(), session.clone(), store.clone());

        Self {
            api,
            session,
            store,
            workflow,
            _token_dir: token_dir,
        }
    }

    /// A context with an established session, as after a successful login.
    pub fn authenticated() -> Self {
        let context = Self::new();
        context
            .session
            .establish("test-token".into(), user("me", "myself"));
        context
    }
}
