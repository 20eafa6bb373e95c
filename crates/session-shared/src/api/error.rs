use serde::{Deserialize, Serialize};

/// Error payload returned by the API on non-2xx responses.
///
/// Accepts both `{"error": "msg"}` and `{"error": {"message": "msg", ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Object { message: String },
}

impl ErrorBody {
    pub fn message(&self) -> &str {
        match &self.error {
            ErrorDetail::Message(msg) => msg,
            ErrorDetail::Object { message } => message,
        }
    }
}
