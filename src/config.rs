//! Configuration for the school dashboard client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::role::RolePolicy;

/// Environment variables holding the project URL, in lookup order
pub const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];

/// Environment variables holding the public API key, in lookup order
pub const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

/// Bucket used for assignment attachments and corrections
pub const DEFAULT_ATTACHMENTS_BUCKET: &str = "assignmentsattachments";

/// Configuration options for the client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whether an expired session is refreshed when it is read
    pub auto_refresh_token: bool,

    /// The request timeout
    pub request_timeout: Duration,

    /// Storage bucket for assignment files
    pub attachments_bucket: String,

    /// What to do with unrecognised role claims
    pub role_policy: RolePolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            request_timeout: Duration::from_secs(30),
            attachments_bucket: DEFAULT_ATTACHMENTS_BUCKET.to_string(),
            role_policy: RolePolicy::default(),
        }
    }
}

impl ClientOptions {
    /// Set whether to automatically refresh the token
    pub fn with_auto_refresh_token(mut self, value: bool) -> Self {
        self.auto_refresh_token = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the attachments bucket
    pub fn with_attachments_bucket(mut self, value: &str) -> Self {
        self.attachments_bucket = value.to_string();
        self
    }

    /// Set the role policy
    pub fn with_role_policy(mut self, value: RolePolicy) -> Self {
        self.role_policy = value;
        self
    }
}

/// Start-up configuration: where the backend lives and how to talk to it
#[derive(Debug, Clone)]
pub struct Config {
    /// The base URL for the Supabase project, without trailing slash
    pub url: String,

    /// The public (anon) API key
    pub anon_key: String,

    /// Client options
    pub options: ClientOptions,
}

impl Config {
    /// Create a configuration from explicit values
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        Self::with_options(url, anon_key, ClientOptions::default())
    }

    /// Create a configuration with custom options
    pub fn with_options(url: &str, anon_key: &str, options: ClientOptions) -> Result<Self> {
        let url = url.trim();
        let anon_key = anon_key.trim();
        if url.is_empty() || anon_key.is_empty() {
            return Err(Error::config(
                "Supabase URL and anon key must both be provided",
            ));
        }

        let parsed = Url::parse(url)
            .map_err(|e| Error::config(format!("invalid Supabase URL {:?}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Supabase URL must be http or https, got {}",
                parsed.scheme()
            )));
        }

        if options.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than zero"));
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            options,
        })
    }

    /// Load the configuration from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        let url = first(&URL_VARS).ok_or_else(|| {
            Error::config(format!("missing {} (or {})", URL_VARS[0], URL_VARS[1]))
        })?;
        let key = first(&KEY_VARS).ok_or_else(|| {
            Error::config(format!("missing {} (or {})", KEY_VARS[0], KEY_VARS[1]))
        })?;

        let mut options = ClientOptions::default();

        if let Some(policy) = lookup("SCHOOL_ROLE_POLICY") {
            options.role_policy = policy.parse()?;
        }
        if let Some(secs) = lookup("SCHOOL_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::config(format!("SCHOOL_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            options.request_timeout = Duration::from_secs(secs);
        }
        if let Some(bucket) = lookup("SCHOOL_ATTACHMENTS_BUCKET") {
            options.attachments_bucket = bucket.trim().to_string();
        }

        Self::with_options(&url, &key, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_values_are_fatal() {
        let err = Config::from_lookup(lookup(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fatal);

        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn test_vite_names_are_accepted() {
        let config = Config::from_lookup(lookup(&[
            ("VITE_SUPABASE_URL", "https://x.supabase.co/"),
            ("VITE_SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://x.supabase.co");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.options.attachments_bucket, DEFAULT_ATTACHMENTS_BUCKET);
    }

    #[test]
    fn test_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "http://localhost:54321"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SCHOOL_ROLE_POLICY", "deny"),
            ("SCHOOL_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.options.role_policy, RolePolicy::Deny);
        assert_eq!(config.options.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "http://localhost:54321"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SCHOOL_REQUEST_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fatal);
        assert!(err.to_string().contains("timeout"));

        let options = ClientOptions::default().with_request_timeout(Duration::ZERO);
        assert!(Config::with_options("https://x.supabase.co", "anon", options).is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        assert!(Config::new("ftp://x", "anon").is_err());
        assert!(Config::new("not a url", "anon").is_err());
        assert!(Config::new("https://x.supabase.co", "  ").is_err());
    }
}
