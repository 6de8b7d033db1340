use crate::api::{ApiError, BackendClient};
use serde::{Deserialize, Serialize};

/// Credentials for `/auth/login`. The backend accepts either an email or a
/// username; exactly one of the two is sent.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
}

impl LoginRequest {
    /// Treats an identifier containing `@` as an email, anything else as a
    /// username.
    pub fn with_identifier(identifier: &str, password: impl Into<String>) -> Self {
        let (email, username) = if identifier.contains('@') {
            (Some(identifier.to_string()), None)
        } else {
            (None, Some(identifier.to_string()))
        };
        Self {
            email,
            username,
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl BackendClient {
    /// Logs in and lets the agent's cookie store capture the session cookie,
    /// so later calls through this client are authenticated.
    pub fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post_json("/auth/login", request)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.post_empty("/auth/logout")
    }

    /// Resolves the current session. A 401 surfaces as
    /// [`ApiError::Unauthorized`].
    pub fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("/auth/me", &[])
    }
}
