//! Sign-in and password reset forms

use crate::auth::{Credentials, Session, SessionStore};
use crate::error::{Error, Result};
use crate::pages::Notice;
use crate::validation::{has_min_chars, is_valid_email, ValidationErrors};

pub const INVALID_EMAIL: &str = "Invalid email address";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials. Please try again.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again later.";

const MIN_PASSWORD_CHARS: usize = 8;

/// Values typed into the sign-in form
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    /// Check the fields and build the credentials to submit
    pub fn validate(&self) -> std::result::Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !is_valid_email(self.email.trim()) {
            errors.add("email", INVALID_EMAIL);
        }
        if !has_min_chars(&self.password, MIN_PASSWORD_CHARS) {
            errors.add("password", PASSWORD_TOO_SHORT);
        }
        errors.into_result()?;
        Ok(Credentials::new(&self.email, &self.password))
    }
}

/// Validate and submit the form.
///
/// Every failure comes back as `Error::Validation`: field errors when the
/// form is invalid, a form-wide error when the provider refused or could not
/// be reached. Redirection after success follows from the session change.
pub async fn sign_in(sessions: &SessionStore, form: &SignInForm) -> Result<Session> {
    let credentials = form.validate()?;

    match sessions.sign_in(&credentials).await {
        Ok(session) => Ok(session),
        Err(e) => {
            let mut errors = ValidationErrors::new();
            if e.is_rejected_credentials() {
                log::info!("Sign in refused for {}: {}", credentials.email, e);
                errors.set_root(INVALID_CREDENTIALS);
            } else {
                log::error!("Unexpected sign in error: {}", e);
                errors.set_root(UNEXPECTED_ERROR);
            }
            Err(Error::Validation(errors))
        }
    }
}

/// Ask for a password reset email
pub async fn request_password_reset(sessions: &SessionStore, email: &str) -> Result<Notice> {
    let email = email.trim();
    if !is_valid_email(email) {
        let mut errors = ValidationErrors::new();
        errors.add("email", INVALID_EMAIL);
        return Err(errors.into());
    }

    match sessions.reset_password_for_email(email).await {
        Ok(()) => Ok(Notice::success(format!(
            "If an account exists for {}, a reset link is on its way.",
            email
        ))),
        Err(e) => Ok(Notice::failure("Could not send the reset email: ", &e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthProvider, AuthUser};
    use crate::config::ClientOptions;
    use crate::pages::NoticeLevel;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Provider;

    #[async_trait]
    impl AuthProvider for Provider {
        async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
            match credentials.password.as_str() {
                "correct-horse" => Ok(Session {
                    access_token: "token".to_string(),
                    refresh_token: "refresh".to_string(),
                    token_type: "bearer".to_string(),
                    expires_in: 3600,
                    expires_at: Some(i64::MAX),
                    user: AuthUser {
                        id: "u-1".to_string(),
                        ..Default::default()
                    },
                }),
                "network-down" => Err(Error::general("connection reset")),
                _ => Err(Error::Api {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                }),
            }
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session> {
            Err(Error::auth("unsupported"))
        }

        async fn sign_out(&self, _access_token: &str) -> Result<()> {
            Ok(())
        }

        async fn reset_password_for_email(&self, email: &str) -> Result<()> {
            if email.ends_with("@down.fr") {
                return Err(Error::Api {
                    status: 503,
                    message: "Service unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    fn sessions() -> SessionStore {
        SessionStore::new(Arc::new(Provider), &ClientOptions::default())
    }

    fn validation(err: Error) -> ValidationErrors {
        match err {
            Error::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_form_validation_messages() {
        let errors = SignInForm::new("not-an-email", "short").validate().unwrap_err();
        assert_eq!(errors.field("email"), Some(INVALID_EMAIL));
        assert_eq!(errors.field("password"), Some(PASSWORD_TOO_SHORT));

        let credentials = SignInForm::new(" ada@school.fr ", "12345678").validate().unwrap();
        assert_eq!(credentials.email, "ada@school.fr");
    }

    #[tokio::test]
    async fn test_sign_in_success_stores_session() {
        let sessions = sessions();
        let session = sign_in(&sessions, &SignInForm::new("ada@school.fr", "correct-horse"))
            .await
            .unwrap();
        assert_eq!(session.user_id(), "u-1");
        assert!(sessions.peek_session().await.is_some());
    }

    #[tokio::test]
    async fn test_rejected_credentials_root_error() {
        let err = sign_in(&sessions(), &SignInForm::new("ada@school.fr", "wrong-horse"))
            .await
            .unwrap_err();
        assert_eq!(validation(err).root(), Some(INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_unexpected_failure_root_error() {
        let err = sign_in(&sessions(), &SignInForm::new("ada@school.fr", "network-down"))
            .await
            .unwrap_err();
        assert_eq!(validation(err).root(), Some(UNEXPECTED_ERROR));
    }

    #[tokio::test]
    async fn test_invalid_form_is_not_submitted() {
        let sessions = sessions();
        let err = sign_in(&sessions, &SignInForm::new("ada", "correct-horse"))
            .await
            .unwrap_err();
        assert_eq!(validation(err).field("email"), Some(INVALID_EMAIL));
        assert!(sessions.peek_session().await.is_none());
    }

    #[tokio::test]
    async fn test_password_reset() {
        let sessions = sessions();

        let notice = request_password_reset(&sessions, "ada@school.fr").await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);

        let notice = request_password_reset(&sessions, "ada@down.fr").await.unwrap();
        assert!(notice.is_error());

        let err = request_password_reset(&sessions, "nope").await.unwrap_err();
        assert_eq!(validation(err).field("email"), Some(INVALID_EMAIL));
    }
}
