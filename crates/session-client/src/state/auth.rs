use std::sync::Arc;

use session_shared::User;
use tokio::sync::watch;

use crate::api::TokenStore;
use crate::store::{Store, Subscription};

/// Identity known to the client.
///
/// `is_authenticated` is true only when both `user` and `token` are present.
/// After [`AuthStore::initialize`] the token may be present on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl AuthState {
    /// No user and no token.
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.token.is_none()
    }
}

/// Auth state container backed by a durable [`TokenStore`].
///
/// The state only changes through [`set_auth`](Self::set_auth),
/// [`clear_auth`](Self::clear_auth) and [`initialize`](Self::initialize).
/// Token store failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct AuthStore {
    state: Store<AuthState>,
    tokens: Arc<dyn TokenStore>,
}

impl AuthStore {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            state: Store::default(),
            tokens,
        }
    }

    pub fn get(&self) -> AuthState {
        self.state.get()
    }

    /// Current bearer token, read fresh on every call.
    pub fn token(&self) -> Option<String> {
        self.state.get().token
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        self.state.subscribe(observer)
    }

    pub fn watch(&self) -> (watch::Receiver<AuthState>, Subscription) {
        self.state.watch()
    }

    /// Record a signed-in user and persist the token.
    ///
    /// An empty token cannot authenticate anyone; such calls are ignored.
    pub fn set_auth(&self, user: User, token: String) {
        if token.is_empty() {
            tracing::warn!(user_id = %user.id, "Ignoring set_auth with an empty token");
            return;
        }

        tracing::info!(user_id = %user.id, username = %user.username, "Authenticated");
        self.state.set(AuthState {
            user: Some(user),
            token: Some(token.clone()),
            is_authenticated: true,
        });

        if let Err(e) = self.tokens.set(&token) {
            tracing::warn!("Could not persist auth token: {}", e);
        }
    }

    /// Forget the user and token, in memory and on disk.
    pub fn clear_auth(&self) {
        tracing::info!("Clearing auth state");
        self.state.set(AuthState::default());

        if let Err(e) = self.tokens.delete() {
            tracing::warn!("Could not delete stored auth token: {}", e);
        }
    }

    /// Restore the remembered token, if any.
    ///
    /// Only the token is restored: `user` stays absent and
    /// `is_authenticated` is not touched, so a rehydrated token is not proof
    /// of a valid session. See [`Session::verify_auth`](crate::Session::verify_auth).
    pub fn initialize(&self) {
        let stored = match self.tokens.get() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Could not read stored auth token: {}", e);
                None
            }
        };

        if let Some(token) = stored.filter(|token| !token.is_empty()) {
            tracing::debug!("Rehydrated auth token from storage");
            self.state.update(|current| AuthState {
                token: Some(token),
                ..current.clone()
            });
        }
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.get();
        f.debug_struct("AuthStore")
            .field("user", &state.user.as_ref().map(|u| u.id))
            .field("has_token", &state.token.is_some())
            .field("is_authenticated", &state.is_authenticated)
            .finish()
    }
}
