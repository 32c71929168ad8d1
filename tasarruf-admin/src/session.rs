use std::sync::RwLock;

use tasarruf_types::Admin;

use crate::storage::StorageAdapter;

/// What this process knows about the token.
#[derive(Debug, Clone, PartialEq)]
enum TokenState {
    /// Nothing in memory yet; durable storage decides.
    Unknown,
    Set(String),
    /// Logged out or rejected. Durable storage is not consulted again until
    /// a new token is established.
    Cleared,
}

/// Authentication state shared by every request-issuing component.
///
/// Owned by the application root and handed out as `Arc<SessionContext>`.
/// The token may be present before the admin profile has been fetched; an
/// admin profile is only ever cached alongside a token.
pub struct SessionContext {
    token: RwLock<TokenState>,
    admin: RwLock<Option<Admin>>,
    storage: Box<dyn StorageAdapter>,
}

impl SessionContext {
    pub fn new(storage: Box<dyn StorageAdapter>) -> Self {
        Self {
            token: RwLock::new(TokenState::Unknown),
            admin: RwLock::new(None),
            storage,
        }
    }

    /// Returns the in-memory token if set, else whatever durable storage holds.
    /// After `invalidate` this is `None` until the next `establish`, even if
    /// the stored copy could not be removed. Never touches the network.
    pub fn token(&self) -> Option<String> {
        match &*self.token.read().unwrap_or_else(|e| e.into_inner()) {
            TokenState::Set(token) => return Some(token.clone()),
            TokenState::Cleared => return None,
            TokenState::Unknown => {}
        }

        match self.storage.load_credentials() {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Failed to read stored session token: {:#}", e);
                None
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Records a freshly issued token and the identity it belongs to.
    ///
    /// A durable write failure is logged and the session stays usable for the
    /// lifetime of this process.
    pub fn establish(&self, token: String, admin: Admin) {
        if let Err(e) = self.storage.store_credentials(&token) {
            log::warn!("Failed to persist session token: {:#}", e);
        }
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = TokenState::Set(token);
        *self.admin.write().unwrap_or_else(|e| e.into_inner()) = Some(admin);
        log_session!("Session established");
    }

    pub fn admin(&self) -> Option<Admin> {
        self.admin.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn cache_admin(&self, admin: Admin) {
        *self.admin.write().unwrap_or_else(|e| e.into_inner()) = Some(admin);
    }

    /// Drops the token and cached identity from memory and durable storage.
    pub fn invalidate(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = TokenState::Cleared;
        *self.admin.write().unwrap_or_else(|e| e.into_inner()) = None;
        if let Err(e) = self.storage.clear_credentials() {
            log::warn!("Failed to clear stored session token: {:#}", e);
        }
        log_session!("Session invalidated");
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("has_token", &self.has_token())
            .field("admin", &self.admin().map(|a| a.email))
            .finish()
    }
}
