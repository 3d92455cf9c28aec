pub mod types;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use self::types::{
    Friend, FriendRequest, GameInvite, OpState, Operation, OperationStatus, SearchEntry, User,
};

#[derive(Debug, Default)]
struct GraphState {
    friends: Vec<User>,
    incoming_requests: Vec<FriendRequest>,
    online: HashSet<String>,
    channel_connected: bool,
    last_snapshot_at: Option<DateTime<Utc>>,
    search_query: String,
    search_results: Vec<User>,
    sent_markers: HashSet<String>,
    game_invites: Vec<GameInvite>,
    ops: HashMap<Operation, OpState>,
}

/// Single mutable source of truth for friends, incoming requests, presence
/// and search results. Every operation is a pure cache transition: no I/O,
/// and no lock held across a suspension point.
pub struct SocialGraphStore {
    state: RwLock<GraphState>,
}

impl Default for SocialGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialGraphStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
        }
    }

    /// Overwrite the friends collection wholesale. The server response is
    /// authoritative; duplicate identifiers collapse to the last occurrence.
    pub fn replace_friends(&self, list: Vec<User>) {
        let deduped = dedupe_by_id(list, |user| &user.id);
        let mut state = self.state.write();
        debug!(count = deduped.len(), "Replacing friends collection");
        state.friends = deduped;
    }

    pub fn friends(&self) -> Vec<User> {
        self.state.read().friends.clone()
    }

    /// Friends annotated with the online flag, computed from the current
    /// presence set at read time.
    pub fn friends_with_presence(&self) -> Vec<Friend> {
        let state = self.state.read();
        state
            .friends
            .iter()
            .map(|user| Friend {
                online: state.online.contains(&user.id),
                user: user.clone(),
            })
            .collect()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.state.read().online.contains(user_id)
    }

    pub fn replace_incoming_requests(&self, list: Vec<FriendRequest>) {
        let deduped = dedupe_by_id(list, |request| &request.id);
        let mut state = self.state.write();
        debug!(count = deduped.len(), "Replacing incoming requests");
        state.incoming_requests = deduped;
    }

    pub fn incoming_requests(&self) -> Vec<FriendRequest> {
        self.state.read().incoming_requests.clone()
    }

    /// Idempotent removal; a request already gone (e.g. superseded by a
    /// concurrent poll) is a no-op, not an error.
    pub fn remove_incoming_request(&self, request_id: &str) {
        let mut state = self.state.write();
        let before = state.incoming_requests.len();
        state.incoming_requests.retain(|request| request.id != request_id);
        if state.incoming_requests.len() == before {
            debug!(request_id, "Incoming request already absent");
        }
    }

    /// A new search supersedes the previous result set atomically; the
    /// locally-recorded sent markers are scoped to one result set and are
    /// cleared here, never by a timer.
    pub fn replace_search_results(&self, query: &str, results: Vec<User>) {
        let mut state = self.state.write();
        state.search_query = query.to_string();
        state.search_results = results;
        state.sent_markers.clear();
    }

    pub fn clear_search_results(&self) {
        let mut state = self.state.write();
        state.search_query.clear();
        state.search_results.clear();
        state.sent_markers.clear();
    }

    pub fn search_query(&self) -> String {
        self.state.read().search_query.clone()
    }

    /// Optimistic flag preventing a repeat send before the server round-trip
    /// completes. Reverted only by a fresh search.
    pub fn mark_request_sent(&self, user_id: &str) {
        self.state.write().sent_markers.insert(user_id.to_string());
    }

    pub fn request_already_sent(&self, user_id: &str) -> bool {
        self.state.read().sent_markers.contains(user_id)
    }

    /// Join raw results against the current friends collection and sent
    /// markers. Returns a new ephemeral projection; mutates nothing.
    pub fn annotate_search_results(&self, results: &[User]) -> Vec<SearchEntry> {
        let state = self.state.read();
        results
            .iter()
            .map(|user| SearchEntry {
                is_friend: state.friends.iter().any(|friend| friend.id == user.id),
                request_sent: state.sent_markers.contains(&user.id),
                user: user.clone(),
            })
            .collect()
    }

    /// The stored result set, annotated at read time.
    pub fn search_results(&self) -> Vec<SearchEntry> {
        let raw = self.state.read().search_results.clone();
        self.annotate_search_results(&raw)
    }

    /// Wholesale presence replacement: the server sends full snapshots, not
    /// deltas. A user absent from the new snapshot is offline, whatever the
    /// previous snapshot said.
    pub fn replace_online(&self, user_ids: Vec<String>) {
        let mut state = self.state.write();
        debug!(count = user_ids.len(), "Applying presence snapshot");
        state.online = user_ids.into_iter().collect();
        state.last_snapshot_at = Some(Utc::now());
    }

    pub fn set_channel_connected(&self, connected: bool) {
        self.state.write().channel_connected = connected;
    }

    pub fn channel_connected(&self) -> bool {
        self.state.read().channel_connected
    }

    /// When the last presence snapshot arrived, if any. Stale snapshots are
    /// kept through channel drops so the UI can degrade to last-known.
    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_snapshot_at
    }

    pub fn add_game_invite(&self, invite: GameInvite) {
        let mut state = self.state.write();
        if state.game_invites.iter().any(|known| known.id == invite.id) {
            return;
        }
        state.game_invites.push(invite);
    }

    pub fn remove_game_invite(&self, invite_id: &str) {
        self.state
            .write()
            .game_invites
            .retain(|invite| invite.id != invite_id);
    }

    pub fn game_invites(&self) -> Vec<GameInvite> {
        self.state.read().game_invites.clone()
    }

    pub fn operation(&self, op: Operation) -> OpState {
        self.state.read().ops.get(&op).cloned().unwrap_or_default()
    }

    pub fn mark_loading(&self, op: Operation) {
        self.state.write().ops.insert(
            op,
            OpState {
                status: OperationStatus::Loading,
                error: None,
            },
        );
    }

    pub fn mark_succeeded(&self, op: Operation) {
        self.state.write().ops.insert(
            op,
            OpState {
                status: OperationStatus::Succeeded,
                error: None,
            },
        );
    }

    pub fn mark_failed(&self, op: Operation, error: impl Into<String>) {
        self.state.write().ops.insert(
            op,
            OpState {
                status: OperationStatus::Failed,
                error: Some(error.into()),
            },
        );
    }

    /// Discard everything. The store is not persisted; logout recreates the
    /// session from an empty cache.
    pub fn reset(&self) {
        *self.state.write() = GraphState::default();
    }
}

fn dedupe_by_id<T, F>(list: Vec<T>, id: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut index: HashMap<String, usize> = HashMap::with_capacity(list.len());
    let mut out: Vec<T> = Vec::with_capacity(list.len());
    for item in list {
        let key = id(&item).to_string();
        if let Some(&slot) = index.get(&key) {
            out[slot] = item;
        } else {
            index.insert(key, out.len());
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.into(),
            username: username.into(),
        }
    }

    fn request(id: &str, from: User) -> FriendRequest {
        FriendRequest {
            id: id.into(),
            from,
        }
    }

    #[test]
    fn replace_friends_never_leaves_duplicates() {
        let store = SocialGraphStore::new();
        store.replace_friends(vec![
            user("a", "anna"),
            user("b", "ben"),
            user("a", "anna-renamed"),
        ]);

        let friends = store.friends();
        assert_eq!(friends.len(), 2);
        // Last write wins per identifier.
        assert_eq!(friends[0].username, "anna-renamed");
        assert_eq!(friends[1].id, "b");
    }

    #[test]
    fn remove_incoming_request_is_idempotent() {
        let store = SocialGraphStore::new();
        store.replace_incoming_requests(vec![
            request("r1", user("a", "anna")),
            request("r2", user("b", "ben")),
        ]);

        store.remove_incoming_request("r1");
        let once = store.incoming_requests();
        store.remove_incoming_request("r1");
        let twice = store.incoming_requests();

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
        assert_eq!(twice[0].id, "r2");
    }

    #[test]
    fn presence_replacement_is_total() {
        let store = SocialGraphStore::new();
        store.replace_online(vec!["a".into(), "c".into()]);
        assert!(store.is_online("c"));

        store.replace_online(vec!["a".into(), "b".into()]);
        assert!(store.is_online("a"));
        assert!(store.is_online("b"));
        assert!(!store.is_online("c"));
    }

    #[test]
    fn online_flag_is_derived_at_read_time() {
        let store = SocialGraphStore::new();
        store.replace_friends(vec![user("a", "anna")]);
        assert!(!store.friends_with_presence()[0].online);

        store.replace_online(vec!["a".into()]);
        assert!(store.friends_with_presence()[0].online);

        store.replace_online(vec![]);
        assert!(!store.friends_with_presence()[0].online);
    }

    #[test]
    fn annotation_joins_friends_without_mutating_them() {
        let store = SocialGraphStore::new();
        store.replace_friends(vec![user("1", "anna")]);

        let raw = vec![user("1", "anna"), user("2", "ben")];
        let annotated = store.annotate_search_results(&raw);

        assert!(annotated[0].is_friend);
        assert!(!annotated[0].request_sent);
        assert!(!annotated[1].is_friend);
        assert_eq!(store.friends(), vec![user("1", "anna")]);

        // Same inputs, same output.
        assert_eq!(annotated, store.annotate_search_results(&raw));
    }

    #[test]
    fn sent_marker_cleared_by_fresh_search_only() {
        let store = SocialGraphStore::new();
        store.replace_search_results("fi", vec![user("5", "fiona")]);
        store.mark_request_sent("5");
        assert!(store.search_results()[0].request_sent);

        // A fresh search for a different query drops the marker.
        store.replace_search_results("ge", vec![user("5", "fiona"), user("6", "george")]);
        let results = store.search_results();
        assert!(!results[0].request_sent);
        assert!(!results[1].request_sent);
    }

    #[test]
    fn game_invites_dedupe_and_remove_by_id() {
        let store = SocialGraphStore::new();
        let invite = GameInvite {
            id: "g1".into(),
            from: user("a", "anna"),
            received_at: Utc::now(),
        };
        store.add_game_invite(invite.clone());
        store.add_game_invite(invite);
        assert_eq!(store.game_invites().len(), 1);

        store.remove_game_invite("g1");
        assert!(store.game_invites().is_empty());
    }

    #[test]
    fn operation_statuses_are_independent() {
        let store = SocialGraphStore::new();
        store.mark_loading(Operation::Search);
        store.mark_failed(Operation::SendRequest, "boom");

        assert_eq!(store.operation(Operation::Search).status, OperationStatus::Loading);
        assert_eq!(
            store.operation(Operation::SendRequest).status,
            OperationStatus::Failed
        );
        assert_eq!(store.operation(Operation::Login).status, OperationStatus::Idle);
    }

    #[test]
    fn reset_discards_everything() {
        let store = SocialGraphStore::new();
        store.replace_friends(vec![user("a", "anna")]);
        store.replace_online(vec!["a".into()]);
        store.set_channel_connected(true);
        store.mark_succeeded(Operation::FriendsFetch);

        store.reset();

        assert!(store.friends().is_empty());
        assert!(!store.is_online("a"));
        assert!(!store.channel_connected());
        assert_eq!(
            store.operation(Operation::FriendsFetch).status,
            OperationStatus::Idle
        );
    }
}
