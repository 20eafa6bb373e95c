use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use session_shared::{
    api::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest, UpdateProfileRequest},
    Profile, User,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("{}", server_message(.status, .message))]
    Server {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("Unexpected response from server")]
    Parse(#[source] serde_json::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

fn server_message(status: &StatusCode, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}

impl ApiError {
    /// Message the server put in its JSON error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// Server-provided message, or `fallback` for every other failure.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

/// Requests that establish or confirm an identity.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError>;
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    /// Resolve the user a bearer token belongs to.
    async fn current_user(&self, token: &str) -> Result<User, ApiError>;
}

/// Requests against the signed-in user's profile.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ApiError>;
    async fn update_profile(
        &self,
        token: &str,
        patch: &UpdateProfileRequest,
    ) -> Result<Profile, ApiError>;
}

/// HTTP implementation of [`AuthApi`] and [`ProfileApi`].
///
/// Holds no credentials of its own; every authenticated call takes the token
/// explicitly so the caller decides which token is current.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build URL for endpoint
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Handle API response
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        match status {
            status if status.is_success() => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body).map_err(ApiError::Parse)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            _ => {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .ok()
                    .map(|body| body.message().to_string())
                    .filter(|message| !message.is_empty());
                Err(ApiError::Server { status, message })
            }
        }
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        tracing::debug!(username = %req.username, "POST /auth/login");
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        tracing::debug!(username = %req.username, "POST /auth/register");
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        tracing::debug!("GET /auth/me");
        let response = self
            .client
            .get(self.url("/auth/me"))
            .header("Authorization", Self::bearer(token))
            .send()
            .await?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, ApiError> {
        tracing::debug!("GET /profile");
        let response = self
            .client
            .get(self.url("/profile"))
            .header("Authorization", Self::bearer(token))
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn update_profile(
        &self,
        token: &str,
        patch: &UpdateProfileRequest,
    ) -> Result<Profile, ApiError> {
        tracing::debug!("PATCH /profile");
        let response = self
            .client
            .patch(self.url("/profile"))
            .header("Authorization", Self::bearer(token))
            .json(patch)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
