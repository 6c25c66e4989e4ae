//! Authentication against the Supabase auth provider

mod session;
mod store;
mod types;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::{Error, Result};
use crate::fetch::Fetch;

pub use session::*;
pub use store::*;
pub use types::*;

/// The operations the dashboard needs from an auth provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange email and password for a session
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;

    /// Exchange a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Revoke the session behind an access token
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Ask the provider to send a password reset email
    async fn reset_password_for_email(&self, email: &str) -> Result<()>;
}

/// Client for Supabase Authentication
#[derive(Debug, Clone)]
pub struct AuthClient {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// HTTP client used for requests
    client: Client,
}

impl AuthClient {
    /// Create a new AuthClient
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Get the user data behind an access token
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let url = self.get_auth_url("/user");

        let user = Fetch::get(&self.client, &url)
            .api_key(&self.key, access_token)
            .execute::<AuthUser>()
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl AuthProvider for AuthClient {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let url = self.get_auth_url("/token");

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key, &self.key)
            .query([("grant_type", "password")])
            .json(credentials)?
            .execute::<TokenResponse>()
            .await?;

        log::info!("Signed in user {}", response.user.id);
        Ok(Session::from_response(response))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let url = self.get_auth_url("/token");

        let response = Fetch::post(&self.client, &url)
            .api_key(&self.key, &self.key)
            .query([("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))?
            .execute::<TokenResponse>()
            .await?;

        log::debug!("Refreshed session for user {}", response.user.id);
        Ok(Session::from_response(response))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.get_auth_url("/logout");

        Fetch::post(&self.client, &url)
            .api_key(&self.key, access_token)
            .execute_checked()
            .await?;

        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(Error::auth("email is required"));
        }
        let url = self.get_auth_url("/recover");

        Fetch::post(&self.client, &url)
            .api_key(&self.key, &self.key)
            .json(&json!({ "email": email.trim() }))?
            .execute_checked()
            .await?;

        Ok(())
    }
}
