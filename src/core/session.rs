// src/core/session.rs
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::core::graph::types::User;

/// On-disk home of the credential token, keyed by a single path. Failures
/// are logged and swallowed: a missing or unreadable token is simply an
/// unauthenticated session.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() {
                    None
                } else {
                    Some(token)
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read token at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create token directory {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = fs::write(&self.path, token) {
            warn!("Failed to persist token at {}: {}", self.path.display(), e);
        }
    }

    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear token at {}: {}", self.path.display(), e),
        }
    }
}

struct ActiveSession {
    token: String,
    user: User,
}

/// Current authenticated identity and credential token. The token here is
/// the single source of authorization for every outbound call; while it is
/// absent, all social-graph operations no-op.
pub struct SessionContext {
    tokens: TokenStore,
    inner: RwLock<Option<ActiveSession>>,
}

impl SessionContext {
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            inner: RwLock::new(None),
        }
    }

    /// Activate the session and persist the token for the next start.
    pub fn establish(&self, token: String, user: User) {
        debug!(user_id = %user.id, "Session established");
        self.tokens.save(&token);
        *self.inner.write() = Some(ActiveSession { token, user });
    }

    /// Deactivate the session and drop the persisted token.
    pub fn clear(&self) {
        self.tokens.clear();
        *self.inner.write() = None;
    }

    pub fn is_active(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|session| session.token.clone())
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.read().as_ref().map(|session| session.user.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.read().as_ref().map(|session| session.user.id.clone())
    }

    /// Token left behind by a previous run, if any. Only meaningful before
    /// the session is established.
    pub fn stored_token(&self) -> Option<String> {
        self.tokens.load()
    }

    /// Drop a stored token that the server rejected.
    pub fn discard_stored_token(&self) {
        self.tokens.clear();
    }
}
