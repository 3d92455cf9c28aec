pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::core::graph::types::{FriendRequest, RequestAction, User};
use crate::utils::error::Result;
use types::AuthResponse;

/// The remote surface the engine talks to. Every authenticated call takes
/// the bearer token explicitly; the session context is the only place it
/// comes from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;
    async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse>;
    async fn current_user(&self, token: &str) -> Result<User>;
    async fn logout(&self, token: &str, user_id: &str) -> Result<()>;
    async fn fetch_friends(&self, token: &str) -> Result<Vec<User>>;
    async fn fetch_friend_requests(&self, token: &str) -> Result<Vec<FriendRequest>>;
    async fn respond_to_request(
        &self,
        token: &str,
        request_id: &str,
        action: RequestAction,
    ) -> Result<()>;
    async fn search_users(&self, token: &str, query: &str) -> Result<Vec<User>>;
    async fn send_friend_request(&self, token: &str, user_id: &str) -> Result<()>;
    /// Best-effort presence teardown fired on shutdown; no token, no retry.
    async fn presence_teardown(&self, user_id: &str) -> Result<()>;
}
