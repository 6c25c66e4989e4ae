//! Types for authentication

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// The expiry timestamp, when the provider sends one
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// The user data
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// User record as issued by the auth provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// Metadata the user controls (names, role claim)
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,

    /// Metadata only the provider can write
    #[serde(default)]
    pub app_metadata: HashMap<String, serde_json::Value>,

    /// The provider-side role (usually "authenticated")
    #[serde(default)]
    pub role: Option<String>,

    /// The last sign-in time
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
}

impl AuthUser {
    /// A string metadata value, trying each key in turn
    pub fn metadata_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.user_metadata.get(*key))
            .filter_map(|value| value.as_str())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

/// Email and password pair submitted by the sign-in form
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Email address
    pub email: String,

    /// Password
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }
}

/// What happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    /// A session was created by signing in (or restored)
    SignedIn,

    /// The session was destroyed by signing out or by expiry
    SignedOut,

    /// The session was replaced by a refreshed one
    TokenRefreshed,
}
