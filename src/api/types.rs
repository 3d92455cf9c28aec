// src/api/types.rs
use serde::{Deserialize, Serialize};

use crate::core::graph::types::{FriendRequest, RequestAction, User};

#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// The friends endpoint is tolerated in two shapes: a bare array or an
/// object wrapping it under `friends`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FriendsPayload {
    Bare(Vec<User>),
    Wrapped { friends: Vec<User> },
}

impl FriendsPayload {
    pub fn into_friends(self) -> Vec<User> {
        match self {
            FriendsPayload::Bare(friends) => friends,
            FriendsPayload::Wrapped { friends } => friends,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondPayload {
    pub request_id: String,
    pub action: RequestAction,
}

#[derive(Debug, Deserialize)]
pub struct SearchPayload {
    pub results: Vec<User>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutPayload {
    pub user_id: String,
}

/// Error body shapes the server is known to produce.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friends_payload_accepts_both_shapes() {
        let bare: FriendsPayload =
            serde_json::from_str(r#"[{"_id": "a", "username": "anna"}]"#).unwrap();
        assert_eq!(bare.into_friends()[0].id, "a");

        let wrapped: FriendsPayload =
            serde_json::from_str(r#"{"friends": [{"_id": "a", "username": "anna"}]}"#).unwrap();
        assert_eq!(wrapped.into_friends()[0].username, "anna");
    }

    #[test]
    fn respond_payload_wire_shape() {
        let payload = RespondPayload {
            request_id: "r1".into(),
            action: RequestAction::Accept,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"requestId":"r1","action":"accept"}"#
        );
    }

    #[test]
    fn friend_request_accepts_sender_alias() {
        let request: FriendRequest = serde_json::from_str(
            r#"{"_id": "r1", "sender": {"_id": "a", "username": "anna"}}"#,
        )
        .unwrap();
        assert_eq!(request.id, "r1");
        assert_eq!(request.from.username, "anna");
    }
}
