//! Application-level composition of the state containers.
//!
//! A [`Session`] is built once at startup and handed to every consumer. It
//! owns the only link between the auth and profile containers: whenever auth
//! state becomes empty the profile container is reset.

use std::sync::Arc;

use session_shared::api::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest};

use crate::api::{ApiClient, ApiError, AuthApi, ProfileApi, TokenStore, TokenStoreError};
use crate::config::Config;
use crate::forms::{FormState, LOGIN_FAILED, REGISTER_FAILED};
use crate::state::{Attempt, AuthStore, ProfileStore};
use crate::store::{Store, Subscription};

pub struct Session {
    auth: AuthStore,
    profile: ProfileStore,
    auth_api: Arc<dyn AuthApi>,
    login_form: Store<FormState>,
    register_form: Store<FormState>,
    _reset_profile: Subscription,
}

impl Session {
    pub fn new(
        auth_api: Arc<dyn AuthApi>,
        profile_api: Arc<dyn ProfileApi>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let auth = AuthStore::new(tokens);
        let profile = ProfileStore::new(auth.clone(), profile_api);

        let target = profile.clone();
        let reset_profile = auth.subscribe(move |state| {
            if state.is_empty() {
                target.reset();
            }
        });

        Self {
            auth,
            profile,
            auth_api,
            login_form: Store::default(),
            register_form: Store::default(),
            _reset_profile: reset_profile,
        }
    }

    pub fn with_client(client: ApiClient, tokens: Arc<dyn TokenStore>) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client, tokens)
    }

    pub fn from_config(config: &Config) -> Result<Self, TokenStoreError> {
        let tokens = config.token_store()?;
        Ok(Self::with_client(
            ApiClient::new(&config.api_url),
            Arc::new(tokens),
        ))
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    pub fn login_form(&self) -> &Store<FormState> {
        &self.login_form
    }

    pub fn register_form(&self) -> &Store<FormState> {
        &self.register_form
    }

    /// Restore the remembered token. Does not contact the server.
    pub fn initialize(&self) {
        self.auth.initialize();
    }

    pub async fn login(&self, username: &str, password: &str) {
        self.login_form.set(FormState::submitting());

        let req = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        match self.auth_api.login(&req).await {
            Ok(AuthResponse { user, token }) => {
                self.auth.set_auth(user, token);
                self.login_form.set(FormState::default());
            }
            Err(e) => {
                tracing::warn!(username, "Login failed: {}", e);
                self.login_form.set(FormState::failed(LOGIN_FAILED));
            }
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) {
        self.register_form.set(FormState::submitting());

        let req = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.auth_api.register(&req).await {
            Ok(AuthResponse { user, token }) => {
                self.auth.set_auth(user, token);
                self.register_form.set(FormState::default());
            }
            Err(e) => {
                tracing::warn!(username, "Registration failed: {}", e);
                self.register_form
                    .set(FormState::failed(e.user_message(REGISTER_FAILED)));
            }
        }
    }

    pub fn logout(&self) {
        self.auth.clear_auth();
    }

    /// Resolve the user behind the current token and mark the session
    /// authenticated. A rejected token clears auth; any other failure leaves
    /// state as it was.
    ///
    /// [`initialize`](Self::initialize) never does this on its own.
    pub async fn verify_auth(&self) {
        let Some(token) = self.auth.token() else {
            return;
        };

        match self.auth_api.current_user(&token).await {
            Ok(user) if self.auth.token().as_deref() == Some(token.as_str()) => {
                self.auth.set_auth(user, token)
            }
            Ok(_) => tracing::debug!("Token changed while it was being verified"),
            Err(ApiError::Unauthorized) => self.clear_if_current(&token),
            Err(e) => tracing::warn!("Could not verify stored token: {}", e),
        }
    }

    pub async fn fetch_profile(&self) {
        let attempt = self.profile.fetch().await;
        self.expire_rejected_token(&attempt);
    }

    pub async fn update_profile(&self, patch: UpdateProfileRequest) {
        let attempt = self.profile.update(&patch).await;
        self.expire_rejected_token(&attempt);
    }

    /// A 401 means the server no longer accepts the token the request carried.
    /// Auth is cleared only if that token is still the one held.
    fn expire_rejected_token(&self, attempt: &Attempt) {
        if let (Err(ApiError::Unauthorized), Some(token)) = (&attempt.result, &attempt.token) {
            self.clear_if_current(token);
        }
    }

    fn clear_if_current(&self, rejected: &str) {
        if self.auth.token().as_deref() == Some(rejected) {
            tracing::info!("Server rejected the auth token");
            self.auth.clear_auth();
        } else {
            tracing::debug!("Ignoring rejection of a token that was already replaced");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth", &self.auth)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
