//! Session data issued by the auth provider

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::{AuthUser, TokenResponse};

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    pub token_type: String,

    /// The expiry time in seconds
    pub expires_in: i64,

    /// The expiry timestamp
    pub expires_at: Option<i64>,

    /// The user the session belongs to
    pub user: AuthUser,
}

/// The only access-token claim the client reads
#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

impl Session {
    /// Build a session from a token endpoint response.
    ///
    /// The expiry comes from `expires_at` when present, then from the access
    /// token's `exp` claim, then from `expires_in` counted from now.
    pub fn from_response(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_at
            .or_else(|| token_expiry(&response.access_token))
            .unwrap_or_else(|| now_secs() + response.expires_in);

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            expires_at: Some(expires_at),
            user: response.user,
        }
    }

    /// The user ID
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::from_secs(0))
    }

    /// Check if the session expires within the given margin
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs() + margin.as_secs() as i64 >= expires_at,
            None => false,
        }
    }
}

/// Read the `exp` claim of an access token. The signature is not verified.
fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims.exp),
        Err(e) => {
            log::debug!("Access token carries no readable exp claim: {}", e);
            None
        }
    }
}
