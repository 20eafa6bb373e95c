use std::sync::Arc;

use session_shared::{api::UpdateProfileRequest, Profile};
use tokio::sync::watch;

use super::auth::AuthStore;
use crate::api::{ApiError, ProfileApi};
use crate::store::{Store, Subscription};

const FETCH_FAILED: &str = "Failed to load profile";
const UPDATE_FAILED: &str = "Failed to update profile";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    pub profile: Option<Profile>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Typed outcome of one profile request.
#[derive(Debug)]
pub(crate) struct Attempt {
    /// Token the request was authenticated with, `None` if it was never sent.
    pub token: Option<String>,
    pub result: Result<Profile, ApiError>,
}

/// Profile state container.
///
/// Requests are authenticated with whatever token the [`AuthStore`] holds
/// when the operation starts. There is no request sequencing: when calls
/// overlap, the response that resolves last is the one left in state, and a
/// response arriving after [`reset`](Self::reset) still lands.
#[derive(Clone)]
pub struct ProfileStore {
    state: Store<ProfileState>,
    auth: AuthStore,
    api: Arc<dyn ProfileApi>,
}

impl ProfileStore {
    pub fn new(auth: AuthStore, api: Arc<dyn ProfileApi>) -> Self {
        Self {
            state: Store::default(),
            auth,
            api,
        }
    }

    pub fn get(&self) -> ProfileState {
        self.state.get()
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ProfileState) + Send + Sync + 'static,
    {
        self.state.subscribe(observer)
    }

    pub fn watch(&self) -> (watch::Receiver<ProfileState>, Subscription) {
        self.state.watch()
    }

    /// Load the signed-in user's profile. Failures end up in `error`.
    pub async fn fetch_profile(&self) {
        let _ = self.fetch().await;
    }

    /// Send `patch` and adopt the profile the server returns.
    pub async fn update_profile(&self, patch: UpdateProfileRequest) {
        let _ = self.update(&patch).await;
    }

    pub fn reset(&self) {
        self.state.set(ProfileState::default());
    }

    /// Like [`fetch_profile`](Self::fetch_profile), but also hands the typed
    /// outcome and the token it was sent with back to the orchestrator.
    pub(crate) async fn fetch(&self) -> Attempt {
        self.begin();
        let token = self.auth.token();
        let result = match &token {
            Some(token) => self.api.fetch_profile(token).await,
            None => Err(ApiError::Unauthorized),
        };
        Attempt {
            token,
            result: self.finish(result, FETCH_FAILED),
        }
    }

    pub(crate) async fn update(&self, patch: &UpdateProfileRequest) -> Attempt {
        self.begin();
        let token = self.auth.token();
        let result = match &token {
            Some(token) => self.api.update_profile(token, patch).await,
            None => Err(ApiError::Unauthorized),
        };
        Attempt {
            token,
            result: self.finish(result, UPDATE_FAILED),
        }
    }

    fn begin(&self) {
        self.state.update(|current| ProfileState {
            profile: current.profile.clone(),
            loading: true,
            error: None,
        });
    }

    fn finish(
        &self,
        result: Result<Profile, ApiError>,
        fallback: &str,
    ) -> Result<Profile, ApiError> {
        match &result {
            Ok(profile) => self.state.set(ProfileState {
                profile: Some(profile.clone()),
                loading: false,
                error: None,
            }),
            Err(e) => {
                tracing::warn!("Profile request failed: {}", e);
                let message = e.user_message(fallback);
                self.state.update(|current| ProfileState {
                    profile: current.profile.clone(),
                    loading: false,
                    error: Some(message),
                });
            }
        }
        result
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}
