//! Fixtures and scripted API fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use session_shared::{
    api::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest},
    Profile, User,
};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::{ApiError, AuthApi, ProfileApi};

pub fn sample_user(username: &str) -> User {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        created_at: at,
        updated_at: at,
    }
}

pub fn sample_profile(display_name: &str) -> Profile {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Profile {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        display_name: display_name.to_string(),
        bio: None,
        avatar_url: None,
        created_at: at,
        updated_at: at,
    }
}

pub fn server_error(status: u16, message: Option<&str>) -> ApiError {
    ApiError::Server {
        status: StatusCode::from_u16(status).unwrap(),
        message: message.map(str::to_string),
    }
}

pub fn parse_error() -> ApiError {
    ApiError::Parse(serde_json::from_str::<Profile>("{}").unwrap_err())
}

type ProfileResult = Result<Profile, ApiError>;

enum Reply {
    Ready(ProfileResult),
    Pending(oneshot::Receiver<ProfileResult>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCall {
    Fetch { token: String },
    Update { token: String, patch: UpdateProfileRequest },
}

/// Profile API answering from a script. Pending replies let a test decide
/// when, and in which order, in-flight requests resolve.
#[derive(Default)]
pub struct ScriptedProfileApi {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<ProfileCall>>,
}

impl ScriptedProfileApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, result: ProfileResult) {
        self.replies.lock().unwrap().push_back(Reply::Ready(result));
    }

    pub fn pending(&self) -> oneshot::Sender<ProfileResult> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply::Pending(rx));
        tx
    }

    pub fn calls(&self) -> Vec<ProfileCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, call: ProfileCall) -> ProfileResult {
        self.calls.lock().unwrap().push(call);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted profile request");
        match reply {
            Reply::Ready(result) => result,
            Reply::Pending(rx) => rx.await.expect("pending reply dropped"),
        }
    }
}

#[async_trait]
impl ProfileApi for ScriptedProfileApi {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ApiError> {
        self.answer(ProfileCall::Fetch {
            token: token.to_string(),
        })
        .await
    }

    async fn update_profile(
        &self,
        token: &str,
        patch: &UpdateProfileRequest,
    ) -> Result<Profile, ApiError> {
        self.answer(ProfileCall::Update {
            token: token.to_string(),
            patch: patch.clone(),
        })
        .await
    }
}

/// Auth API with one queue of canned replies per endpoint.
#[derive(Default)]
pub struct StubAuthApi {
    login: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
    register: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
    current_user: Mutex<VecDeque<Result<User, ApiError>>>,
    tokens_seen: Mutex<Vec<String>>,
}

impl StubAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login_reply(&self, result: Result<AuthResponse, ApiError>) {
        self.login.lock().unwrap().push_back(result);
    }

    pub fn register_reply(&self, result: Result<AuthResponse, ApiError>) {
        self.register.lock().unwrap().push_back(result);
    }

    pub fn current_user_reply(&self, result: Result<User, ApiError>) {
        self.current_user.lock().unwrap().push_back(result);
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn login(&self, _req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.login
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted login")
    }

    async fn register(&self, _req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.register
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted register")
    }

    async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        self.tokens_seen.lock().unwrap().push(token.to_string());
        self.current_user
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted current_user")
    }
}
