// src/api/client.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tracing::{debug, warn};

use super::types::{
    AuthResponse, ErrorBody, FriendsPayload, LoginPayload, LogoutPayload, RegisterPayload,
    RespondPayload, SearchPayload,
};
use super::SocialApi;
use crate::core::graph::types::{FriendRequest, RequestAction, User};
use crate::utils::error::{EngineError, Result};

/// REST client for the Game Zone API.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::Api(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map HTTP-level failure onto the engine taxonomy: 401-class responses
    /// become `Unauthorized` (the caller clears the session), everything else
    /// carries the server's message when one is present.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EngineError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| status.to_string());
            return Err(EngineError::Api(message));
        }
        Ok(response)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Api(e.to_string()))?;
        Self::check(response).await
    }
}

#[async_trait]
impl SocialApi for RestClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let payload = LoginPayload {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .send(self.http.post(self.url("/api/auth/login")).json(&payload))
            .await?;
        response
            .json()
            .await
            .map_err(|e| EngineError::Api(e.to_string()))
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let payload = RegisterPayload {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .send(self.http.post(self.url("/api/auth/register")).json(&payload))
            .await?;
        response
            .json()
            .await
            .map_err(|e| EngineError::Api(e.to_string()))
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        let response = self
            .send(self.http.get(self.url("/api/auth/me")).bearer_auth(token))
            .await?;
        response
            .json()
            .await
            .map_err(|e| EngineError::Api(e.to_string()))
    }

    async fn logout(&self, token: &str, user_id: &str) -> Result<()> {
        let payload = LogoutPayload {
            user_id: user_id.to_string(),
        };
        self.send(
            self.http
                .post(self.url("/api/auth/logout"))
                .bearer_auth(token)
                .json(&payload),
        )
        .await?;
        Ok(())
    }

    async fn fetch_friends(&self, token: &str) -> Result<Vec<User>> {
        let response = self
            .send(self.http.get(self.url("/api/friends")).bearer_auth(token))
            .await?;
        // A payload matching neither accepted shape degrades to an empty
        // collection rather than a decode error.
        match response.json::<FriendsPayload>().await {
            Ok(payload) => Ok(payload.into_friends()),
            Err(e) => {
                warn!("Friends response did not match either accepted shape: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_friend_requests(&self, token: &str) -> Result<Vec<FriendRequest>> {
        let response = self
            .send(
                self.http
                    .get(self.url("/api/friend-requests"))
                    .bearer_auth(token),
            )
            .await?;
        match response.json::<Vec<FriendRequest>>().await {
            Ok(requests) => Ok(requests),
            Err(e) => {
                warn!("Malformed friend-requests response: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn respond_to_request(
        &self,
        token: &str,
        request_id: &str,
        action: RequestAction,
    ) -> Result<()> {
        let payload = RespondPayload {
            request_id: request_id.to_string(),
            action,
        };
        self.send(
            self.http
                .post(self.url("/api/friend-requests/respond"))
                .bearer_auth(token)
                .json(&payload),
        )
        .await?;
        Ok(())
    }

    async fn search_users(&self, token: &str, query: &str) -> Result<Vec<User>> {
        let response = self
            .send(
                self.http
                    .get(self.url("/api/users/search"))
                    .query(&[("username", query)])
                    .bearer_auth(token),
            )
            .await?;
        let payload: SearchPayload = response
            .json()
            .await
            .map_err(|e| EngineError::Api(e.to_string()))?;
        Ok(payload.results)
    }

    async fn send_friend_request(&self, token: &str, user_id: &str) -> Result<()> {
        self.send(
            self.http
                .post(self.url(&format!("/api/friends/request/{user_id}")))
                .bearer_auth(token),
        )
        .await?;
        Ok(())
    }

    async fn presence_teardown(&self, user_id: &str) -> Result<()> {
        let payload = LogoutPayload {
            user_id: user_id.to_string(),
        };
        // Fire-and-forget beacon; the response body is irrelevant.
        self.http
            .post(self.url("/api/users/logout"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| EngineError::Api(e.to_string()))?;
        debug!("Presence teardown beacon sent");
        Ok(())
    }
}
