// src/network/presence/events.rs
use serde::{Deserialize, Serialize};

use crate::core::graph::types::GameInvite;

/// Typed events flowing from the channel reader to the single consumer loop
/// that applies them to the store. Producing and applying are decoupled so
/// ordering is explicit and the apply path is testable without a socket.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    Connected,
    Dropped,
    /// Full replacement set of online user ids, never a delta.
    Snapshot(Vec<String>),
    Invite(GameInvite),
}

/// Outbound frames.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    Join(String),
}

/// Inbound frames. Unknown events fail to parse and are ignored by the
/// reader.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerFrame {
    OnlineUsers(Vec<String>),
    GameInvite(GameInvite),
}

impl ServerFrame {
    pub fn into_event(self) -> PresenceEvent {
        match self {
            ServerFrame::OnlineUsers(ids) => PresenceEvent::Snapshot(ids),
            ServerFrame::GameInvite(invite) => PresenceEvent::Invite(invite),
        }
    }
}
