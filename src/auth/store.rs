//! Session store: the single owner of the current session

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use super::{AuthChangeEvent, AuthProvider, Credentials, Session};
use crate::config::ClientOptions;
use crate::error::{Error, Result};

/// Callback invoked on every session change
pub type AuthCallback = Arc<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, AuthCallback>>,
}

impl Listeners {
    fn insert(&self, callback: AuthCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        id
    }

    fn remove(&self, id: u64) -> bool {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    fn snapshot(&self) -> Vec<AuthCallback> {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A registered session-change callback.
///
/// `unsubscribe` consumes the handle; dropping it unregisters as well.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    id: u64,
    listeners: Option<Weak<Listeners>>,
}

impl Subscription {
    /// Stop receiving session changes
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(listeners) = self.listeners.take().and_then(|weak| weak.upgrade()) {
            if listeners.remove(self.id) {
                log::debug!("Auth subscription {} removed", self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Holds the current session and broadcasts its changes
pub struct SessionStore {
    /// The auth provider behind the store
    provider: Arc<dyn AuthProvider>,

    /// The current session
    session: RwLock<Option<Session>>,

    /// Serialises every change to the session, so at most one refresh is outstanding
    change_lock: AsyncMutex<()>,

    /// Registered callbacks
    listeners: Arc<Listeners>,

    /// Upper bound for every provider call
    request_timeout: Duration,

    /// Whether an expired session is refreshed on read
    auto_refresh_token: bool,
}

impl SessionStore {
    /// Create an empty store over a provider
    pub fn new(provider: Arc<dyn AuthProvider>, options: &ClientOptions) -> Self {
        Self {
            provider,
            session: RwLock::new(None),
            change_lock: AsyncMutex::new(()),
            listeners: Arc::new(Listeners::default()),
            request_timeout: options.request_timeout,
            auto_refresh_token: options.auto_refresh_token,
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| Error::Timeout)?
    }

    fn notify(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let callbacks = self.listeners.snapshot();
        log::debug!("Auth change {:?} to {} listener(s)", event, callbacks.len());
        for callback in callbacks {
            callback(event, session);
        }
    }

    /// Register a callback for sign-in, sign-out and token refresh
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthChangeEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let id = self.listeners.insert(Arc::new(callback));
        log::debug!("Auth subscription {} registered", id);
        Subscription {
            id,
            listeners: Some(Arc::downgrade(&self.listeners)),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// The present session, refreshing it first when it has expired.
    ///
    /// A refresh that fails or times out ends the session.
    pub async fn current_session(&self) -> Option<Session> {
        let session = self.session.read().await.clone()?;
        if !session.is_expired() {
            return Some(session);
        }
        self.renew_expired().await
    }

    /// The session as stored, without refreshing
    pub async fn peek_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Access token of the current session
    pub async fn access_token(&self) -> Option<String> {
        self.current_session().await.map(|s| s.access_token)
    }

    async fn renew_expired(&self) -> Option<Session> {
        let _guard = self.change_lock.lock().await;

        // Another caller may have refreshed or signed out while we waited.
        let refresh_token = match self.session.read().await.as_ref() {
            None => return None,
            Some(session) if !session.is_expired() => return Some(session.clone()),
            Some(session) => session.refresh_token.clone(),
        };

        if !self.auto_refresh_token {
            self.clear("session expired").await;
            return None;
        }

        match self
            .bounded(self.provider.refresh_session(&refresh_token))
            .await
        {
            Ok(session) => {
                self.store(session.clone()).await;
                self.notify(AuthChangeEvent::TokenRefreshed, Some(&session));
                Some(session)
            }
            Err(e) => {
                log::warn!("Session refresh failed: {}", e);
                self.clear("refresh failed").await;
                None
            }
        }
    }

    async fn store(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Drop the session and emit `SignedOut`. Callers hold `change_lock`.
    async fn clear(&self, reason: &str) -> Option<Session> {
        let ended = self.session.write().await.take();
        if let Some(ref session) = ended {
            log::info!("Session of user {} ended: {}", session.user_id(), reason);
            self.notify(AuthChangeEvent::SignedOut, None);
        }
        ended
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let _guard = self.change_lock.lock().await;

        let session = self
            .bounded(self.provider.sign_in_with_password(credentials))
            .await?;
        self.store(session.clone()).await;
        self.notify(AuthChangeEvent::SignedIn, Some(&session));
        Ok(session)
    }

    /// Refresh the current session now
    pub async fn refresh(&self) -> Result<Session> {
        let _guard = self.change_lock.lock().await;

        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| Error::auth("Not logged in"))?;

        let session = self
            .bounded(self.provider.refresh_session(&refresh_token))
            .await?;
        self.store(session.clone()).await;
        self.notify(AuthChangeEvent::TokenRefreshed, Some(&session));
        Ok(session)
    }

    /// Install a session obtained elsewhere (e.g. restored from disk)
    pub async fn set_session(&self, session: Session) {
        let _guard = self.change_lock.lock().await;

        self.store(session.clone()).await;
        self.notify(AuthChangeEvent::SignedIn, Some(&session));
    }

    /// Sign out.
    ///
    /// The local session is cleared and `SignedOut` emitted before the
    /// provider is told; an error from the provider is returned afterwards.
    /// Signing out without a session is a no-op.
    pub async fn sign_out(&self) -> Result<()> {
        let ended = {
            let _guard = self.change_lock.lock().await;
            self.clear("signed out").await
        };
        let session = match ended {
            Some(session) => session,
            None => return Ok(()),
        };

        let revoked = self
            .bounded(self.provider.sign_out(&session.access_token))
            .await;
        if let Err(ref e) = revoked {
            log::warn!("Provider sign-out failed: {}", e);
        }
        revoked
    }

    /// Ask the provider to send a password reset email
    pub async fn reset_password_for_email(&self, email: &str) -> Result<()> {
        self.bounded(self.provider.reset_password_for_email(email))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FakeProvider {
        refreshes: AtomicUsize,
        fail_refresh: bool,
        fail_sign_out: bool,
        expires_at: i64,
        refresh_delay: Duration,
        sign_out_delay: Duration,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                fail_refresh: false,
                fail_sign_out: false,
                expires_at: i64::MAX,
                refresh_delay: Duration::ZERO,
                sign_out_delay: Duration::ZERO,
            }
        }

        fn session(&self, token: &str) -> Session {
            Session {
                access_token: token.to_string(),
                refresh_token: format!("{}-refresh", token),
                token_type: "bearer".to_string(),
                expires_in: 3600,
                expires_at: Some(self.expires_at),
                user: AuthUser {
                    id: "user-1".to_string(),
                    ..Default::default()
                },
            }
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
            if credentials.password == "wrong-password" {
                return Err(Error::Api {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                });
            }
            Ok(self.session("access"))
        }

        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.refresh_delay).await;
            if self.fail_refresh {
                return Err(Error::auth("refresh token revoked"));
            }
            let mut session = self.session("refreshed");
            session.expires_at = Some(i64::MAX);
            Ok(session)
        }

        async fn sign_out(&self, _access_token: &str) -> Result<()> {
            tokio::time::sleep(self.sign_out_delay).await;
            if self.fail_sign_out {
                return Err(Error::general("offline"));
            }
            Ok(())
        }

        async fn reset_password_for_email(&self, _email: &str) -> Result<()> {
            Ok(())
        }
    }

    fn store(provider: FakeProvider) -> SessionStore {
        SessionStore::new(Arc::new(provider), &ClientOptions::default())
    }

    fn recorder(store: &SessionStore) -> (Subscription, Arc<Mutex<Vec<AuthChangeEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let subscription = store.subscribe(move |event, _| sink.lock().unwrap().push(event));
        (subscription, events)
    }

    #[tokio::test]
    async fn test_sign_in_notifies_after_storing() {
        let store = Arc::new(store(FakeProvider::new()));
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let _sub = store.subscribe(move |event, session| {
            *sink.lock().unwrap() = Some((event, session.map(|s| s.access_token.clone())));
        });

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            Some((AuthChangeEvent::SignedIn, Some("access".to_string())))
        );
        assert!(store.peek_session().await.is_some());
    }

    #[tokio::test]
    async fn test_failed_sign_in_emits_nothing() {
        let store = store(FakeProvider::new());
        let (_sub, events) = recorder(&store);

        let err = store
            .sign_in(&Credentials::new("a@b.fr", "wrong-password"))
            .await
            .unwrap_err();

        assert!(err.is_rejected_credentials());
        assert!(events.lock().unwrap().is_empty());
        assert!(store.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_callbacks() {
        let store = store(FakeProvider::new());
        let (sub, events) = recorder(&store);

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();
        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);

        store.sign_out().await.unwrap();
        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();

        assert_eq!(*events.lock().unwrap(), vec![AuthChangeEvent::SignedIn]);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let store = store(FakeProvider::new());
        {
            let _sub = store.subscribe(|_, _| {});
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed_once() {
        let mut provider = FakeProvider::new();
        provider.expires_at = 0;
        let store = store(provider);
        let (_sub, events) = recorder(&store);

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();

        let (a, b) = tokio::join!(store.current_session(), store.current_session());
        assert_eq!(a.unwrap().access_token, "refreshed");
        assert_eq!(b.unwrap().access_token, "refreshed");

        assert_eq!(
            *events.lock().unwrap(),
            vec![AuthChangeEvent::SignedIn, AuthChangeEvent::TokenRefreshed]
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_signs_out() {
        let mut provider = FakeProvider::new();
        provider.expires_at = 0;
        provider.fail_refresh = true;
        let store = store(provider);
        let (_sub, events) = recorder(&store);

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();

        assert!(store.current_session().await.is_none());
        assert_eq!(
            *events.lock().unwrap(),
            vec![AuthChangeEvent::SignedIn, AuthChangeEvent::SignedOut]
        );
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_when_provider_fails() {
        let mut provider = FakeProvider::new();
        provider.fail_sign_out = true;
        let store = store(provider);
        let (_sub, events) = recorder(&store);

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();
        assert!(store.sign_out().await.is_err());

        assert!(store.peek_session().await.is_none());
        assert_eq!(
            *events.lock().unwrap(),
            vec![AuthChangeEvent::SignedIn, AuthChangeEvent::SignedOut]
        );

        // A second sign-out has nothing to do.
        assert!(store.sign_out().await.is_ok());
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let store = store(FakeProvider::new());
        assert!(matches!(store.refresh().await, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_sign_out_during_refresh_stays_signed_out() {
        let mut provider = FakeProvider::new();
        provider.expires_at = 0;
        provider.refresh_delay = Duration::from_millis(200);
        let store = Arc::new(store(provider));
        let (_sub, events) = recorder(&store);

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();

        let reader = {
            let store = store.clone();
            tokio::spawn(async move { store.current_session().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.sign_out().await.unwrap();

        assert!(store.peek_session().await.is_none());
        reader.await.unwrap();
        assert!(store.peek_session().await.is_none());
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&AuthChangeEvent::SignedOut)
        );
    }

    #[tokio::test]
    async fn test_sign_in_during_provider_sign_out_is_kept() {
        let mut provider = FakeProvider::new();
        provider.sign_out_delay = Duration::from_millis(200);
        let store = Arc::new(store(provider));
        let (_sub, events) = recorder(&store);

        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();

        let leaving = {
            let store = store.clone();
            tokio::spawn(async move { store.sign_out().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        store
            .sign_in(&Credentials::new("a@b.fr", "password123"))
            .await
            .unwrap();
        leaving.await.unwrap().unwrap();

        assert!(store.peek_session().await.is_some());
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                AuthChangeEvent::SignedIn,
                AuthChangeEvent::SignedOut,
                AuthChangeEvent::SignedIn
            ]
        );
    }
}
