// src/core/graph/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as reported by the server. Immutable once fetched; a re-fetch
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
}

/// Read projection of a friend edge. `online` is computed from the presence
/// set at read time and is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Friend {
    pub user: User,
    pub online: bool,
}

/// A pending friend request sent by another user to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "sender")]
    pub from: User,
}

/// Ephemeral, query-scoped projection of a search hit joined against the
/// friends collection and the locally-recorded sent markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub user: User,
    pub is_friend: bool,
    pub request_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInvite {
    #[serde(alias = "_id")]
    pub id: String,
    pub from: User,
    #[serde(default = "Utc::now", skip_serializing)]
    pub received_at: DateTime<Utc>,
}

/// Action taken on an incoming friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Accept,
    Reject,
}

/// Status of one logical async operation. Each transition is caused by
/// exactly one in-flight call's start, resolve, or reject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// The operations the store tracks a status for. Statuses are never shared
/// across operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    FriendsFetch,
    RequestsFetch,
    Search,
    SendRequest,
    Respond,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpState {
    pub status: OperationStatus,
    pub error: Option<String>,
}
