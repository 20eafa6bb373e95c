//! In-process stand-in for the remote API, served with axum on a random port.

#![allow(dead_code)] // each test binary uses a different subset

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use session_client::ApiClient;
use session_shared::{
    api::{AuthResponse, LoginRequest, RegisterRequest},
    Profile, User,
};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse";

pub struct StubState {
    pub user: User,
    pub token: String,
    pub profile: Profile,
    pub patches: Vec<Value>,
}

#[derive(Clone)]
pub struct StubApi {
    pub state: Arc<Mutex<StubState>>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

impl StubApi {
    pub fn new(username: &str, token: &str) -> Self {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            id: Uuid::new_v4(),
            user_id: user.id,
            display_name: username.to_string(),
            bio: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        Self {
            state: Arc::new(Mutex::new(StubState {
                user,
                token: token.to_string(),
                profile,
                patches: Vec::new(),
            })),
        }
    }

    /// Invalidate the current token server-side.
    pub fn rotate_token(&self, token: &str) {
        self.state.lock().unwrap().token = token.to_string();
    }

    pub fn patches(&self) -> Vec<Value> {
        self.state.lock().unwrap().patches.clone()
    }

    pub fn user(&self) -> User {
        self.state.lock().unwrap().user.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/me", get(me))
            .route("/api/profile", get(get_profile).patch(patch_profile))
            .with_state(self.clone())
    }
}

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Client for a local stub, bypassing any proxy configured in the environment.
pub fn client(base_url: &str) -> ApiClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    ApiClient::with_client(http, base_url)
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn check_bearer(headers: &HeaderMap, state: &StubState) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {}", state.token);
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(|value| value == expected)
        .unwrap_or(false);

    if authorized {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "Invalid token"))
    }
}

async fn login(State(api): State<StubApi>, Json(req): Json<LoginRequest>) -> ApiResult<AuthResponse> {
    let state = api.state.lock().unwrap();
    if req.username != state.user.username || req.password != PASSWORD {
        return Err(error(StatusCode::UNAUTHORIZED, "Invalid username or password"));
    }
    Ok(Json(AuthResponse {
        user: state.user.clone(),
        token: state.token.clone(),
    }))
}

async fn register(
    State(api): State<StubApi>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let mut state = api.state.lock().unwrap();
    if req.username == state.user.username {
        return Err(error(StatusCode::CONFLICT, "Username already exists"));
    }
    if req.password.len() < 8 {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters long",
        ));
    }

    let now = Utc::now();
    state.user = User {
        id: Uuid::new_v4(),
        username: req.username.clone(),
        email: req.email,
        created_at: now,
        updated_at: now,
    };
    let user_id = state.user.id;
    state.profile.user_id = user_id;
    state.profile.display_name = req.username;
    Ok(Json(AuthResponse {
        user: state.user.clone(),
        token: state.token.clone(),
    }))
}

async fn me(State(api): State<StubApi>, headers: HeaderMap) -> ApiResult<User> {
    let state = api.state.lock().unwrap();
    check_bearer(&headers, &state)?;
    Ok(Json(state.user.clone()))
}

async fn get_profile(State(api): State<StubApi>, headers: HeaderMap) -> ApiResult<Profile> {
    let state = api.state.lock().unwrap();
    check_bearer(&headers, &state)?;
    Ok(Json(state.profile.clone()))
}

async fn patch_profile(
    State(api): State<StubApi>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> ApiResult<Profile> {
    let mut state = api.state.lock().unwrap();
    check_bearer(&headers, &state)?;

    if let Some(name) = patch.get("display_name").and_then(Value::as_str) {
        let name = name.trim();
        if name.is_empty() {
            return Err(error(StatusCode::BAD_REQUEST, "Display name cannot be empty"));
        }
        state.profile.display_name = name.to_string();
    }
    if let Some(bio) = patch.get("bio").and_then(Value::as_str) {
        state.profile.bio = Some(bio.to_string());
    }
    if let Some(avatar_url) = patch.get("avatar_url").and_then(Value::as_str) {
        state.profile.avatar_url = Some(avatar_url.to_string());
    }
    state.profile.updated_at = Utc::now();
    state.patches.push(patch);

    Ok(Json(state.profile.clone()))
}
