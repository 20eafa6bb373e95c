//! Submission state for the login and registration forms.

/// Shown for every failed login, whatever the server said.
pub const LOGIN_FAILED: &str = "Invalid username or password";
/// Used when a failed registration carries no server message.
pub const REGISTER_FAILED: &str = "Registration failed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub submitting: bool,
    pub error: Option<String>,
}

impl FormState {
    pub fn submitting() -> Self {
        Self {
            submitting: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            submitting: false,
            error: Some(message.into()),
        }
    }
}
