//! School dashboard client library
//!
//! The client side of a role-based school dashboard backed by Supabase:
//! session handling against the auth provider, resolution of the signed-in
//! user's role, guarded routing, the dashboard shell and the feature pages
//! for administrators, teachers, students and parents.

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod models;
pub mod pages;
pub mod postgrest;
pub mod role;
pub mod routing;
pub mod shell;
pub mod storage;
pub mod validation;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use reqwest::Client;

use crate::auth::{AuthClient, AuthProvider, Session, SessionStore, Subscription};
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{DataGateway, SupabaseGateway};
use crate::role::{AppUser, RoleResolver};
use crate::routing::{decide, Decision};
use crate::shell::DashboardShell;

/// Process-wide application context.
///
/// Owns the session store and the data gateway, and keeps the resolved user
/// in step with every session change until [`SchoolDashboard::shutdown`].
pub struct SchoolDashboard {
    config: Config,
    sessions: Arc<SessionStore>,
    gateway: Arc<dyn DataGateway>,
    user: Arc<RwLock<Option<AppUser>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SchoolDashboard {
    /// Start against the Supabase project named in `config`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use school_dashboard::{config::Config, SchoolDashboard};
    ///
    /// let config = Config::from_env().expect("SUPABASE_URL and SUPABASE_ANON_KEY must be set");
    /// let app = SchoolDashboard::start(config).unwrap();
    /// assert!(app.current_user().is_none());
    /// ```
    pub fn start(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.options.request_timeout)
            .build()?;

        let provider = Arc::new(AuthClient::new(&config.url, &config.anon_key, client.clone()));
        let sessions = Arc::new(SessionStore::new(provider, &config.options));
        let gateway = Arc::new(SupabaseGateway::new(&config, client, sessions.clone()));

        log::info!("School dashboard started against {}", config.url);
        Ok(Self::assemble(config, sessions, gateway))
    }

    /// Start with an explicit auth provider and data gateway
    pub fn from_parts(
        config: Config,
        provider: Arc<dyn AuthProvider>,
        gateway: Arc<dyn DataGateway>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(provider, &config.options));
        Self::assemble(config, sessions, gateway)
    }

    fn assemble(config: Config, sessions: Arc<SessionStore>, gateway: Arc<dyn DataGateway>) -> Self {
        let user = Arc::new(RwLock::new(None));
        let resolver = RoleResolver::new(config.options.role_policy);

        let sink = user.clone();
        let subscription = sessions.subscribe(move |event, session| {
            let resolved = resolver.resolve(session);
            log::debug!(
                "{:?}: current user is now {:?}",
                event,
                resolved.as_ref().map(|u| (&u.id, u.role))
            );
            *sink.write().unwrap_or_else(PoisonError::into_inner) = resolved;
        });

        Self {
            config,
            sessions,
            gateway,
            user,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn gateway(&self) -> &dyn DataGateway {
        self.gateway.as_ref()
    }

    /// The signed-in user, `None` when anonymous
    pub fn current_user(&self) -> Option<AppUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a session kept from an earlier run
    pub async fn restore_session(&self, session: Session) {
        self.sessions.set_session(session).await;
    }

    /// What to do when the current user opens `path`.
    ///
    /// Decides on the user resolved at the last session change. A session
    /// that has since expired is only noticed once something reads it
    /// through the store; [`SchoolDashboard::open`] does that first.
    pub fn navigate(&self, path: &str) -> Decision {
        decide(self.current_user().as_ref(), path)
    }

    /// Revalidate the session, then decide on `path`.
    ///
    /// An expired session is refreshed, or ended when it cannot be, before
    /// the route guard runs.
    pub async fn open(&self, path: &str) -> Decision {
        self.sessions.current_session().await;
        self.navigate(path)
    }

    /// The dashboard frame for `path`, when someone is signed in
    pub fn shell(&self, path: &str) -> Option<DashboardShell> {
        self.current_user().map(|user| DashboardShell::new(user, path))
    }

    /// Whether the context still follows session changes
    pub fn is_running(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop following session changes. Calling it again does nothing.
    pub fn shutdown(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            log::info!("School dashboard shut down");
        }
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{AuthChangeEvent, Credentials, Session, SessionStore};
    pub use crate::config::{ClientOptions, Config};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::gateway::DataGateway;
    pub use crate::role::{AppUser, Role, RolePolicy};
    pub use crate::routing::Decision;
    pub use crate::SchoolDashboard;
}
