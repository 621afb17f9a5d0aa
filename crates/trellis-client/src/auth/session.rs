use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use trellis_model::TokenPair;

use crate::error::ClientError;
use crate::routes::RoutePolicy;

use super::error::AuthError;
use super::refresh::RefreshGate;
use super::store::{ACCESS_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY};

/// Exchanges a renewal credential for a fresh token pair.
///
/// The HTTP implementation lives in the transport; tests script their
/// own.
#[async_trait]
pub trait TokenRenewer: Send + Sync + 'static {
    async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}

/// Owns the credential pair and applies the expired-credential policy
/// around requests.
pub struct AuthSession {
    store: Arc<dyn CredentialStore>,
    renewer: Arc<dyn TokenRenewer>,
    gate: RefreshGate,
    signed_out: watch::Sender<bool>,
}

impl AuthSession {
    pub fn new(store: Arc<dyn CredentialStore>, renewer: Arc<dyn TokenRenewer>) -> Self {
        let (signed_out, _) = watch::channel(false);
        Self {
            store,
            renewer,
            gate: RefreshGate::new(),
            signed_out,
        }
    }

    /// Current access credential, if any.
    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    /// Install a pair obtained from login or registration.
    pub fn install(&self, pair: &TokenPair) {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token);
        if let Some(refresh) = &pair.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh);
        }
        self.signed_out.send_replace(false);
    }

    /// Clear both credentials and raise the forced-logout signal.
    pub fn sign_out(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
        self.signed_out.send_replace(true);
    }

    /// Observe forced logouts: the value flips to `true` when the session
    /// dies and the app shell must navigate to the unauthenticated entry
    /// point.
    pub fn signed_out(&self) -> watch::Receiver<bool> {
        self.signed_out.subscribe()
    }

    /// Run a request with the current credential, refreshing and retrying
    /// once on an expired-credential failure.
    ///
    /// Authentication routes never enter the refresh gate: a 401 there
    /// cannot be healed by a fresh credential, so it signs the session
    /// out directly. After a successful refresh the request is re-issued
    /// a single time; another 401 surfaces as a normal error instead of
    /// re-entering the cycle.
    pub async fn authorized<T, F, Fut>(
        &self,
        policy: RoutePolicy,
        call: F,
    ) -> Result<T, ClientError>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        match call(self.access_token()).await {
            Err(err) if err.status() == Some(401) => {
                if policy == RoutePolicy::Exempt {
                    warn!("authentication route rejected the credential, signing out");
                    self.sign_out();
                    return Err(ClientError::Unauthorized);
                }

                let fresh = match self.refresh().await {
                    Ok(token) => token,
                    Err(err) => {
                        debug!(error = %err, "renewal failed, session is gone");
                        return Err(ClientError::Unauthorized);
                    }
                };
                call(Some(fresh)).await
            }
            other => other,
        }
    }

    /// Renew the access credential through the single-flight gate. Any
    /// failure, including a missing renewal credential, tears the session
    /// down.
    async fn refresh(&self) -> Result<String, AuthError> {
        let outcome = self
            .gate
            .renew(|| async {
                let refresh_token = self
                    .store
                    .get(REFRESH_TOKEN_KEY)
                    .ok_or(AuthError::MissingRefreshToken)?;
                let pair = self.renewer.exchange(&refresh_token).await?;

                self.store.set(ACCESS_TOKEN_KEY, &pair.access_token);
                if let Some(rotated) = &pair.refresh_token {
                    self.store.set(REFRESH_TOKEN_KEY, rotated);
                }
                debug!("access credential renewed");
                Ok(pair.access_token)
            })
            .await;

        if outcome.is_err() {
            self.sign_out();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::super::store::MemoryStore;
    use super::*;

    /// Scripted renewal backend: counts exchanges, optionally parks until
    /// released, optionally rejects.
    #[derive(Default)]
    struct FakeRenewer {
        exchanges: AtomicUsize,
        hold: Option<Arc<Notify>>,
        reject: bool,
        rotate_to: Option<String>,
    }

    #[async_trait]
    impl TokenRenewer for FakeRenewer {
        async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            if self.reject {
                return Err(AuthError::Rejected("refresh token expired".to_string()));
            }
            assert_eq!(refresh_token, "r1");
            Ok(TokenPair {
                access_token: "fresh".to_string(),
                refresh_token: self.rotate_to.clone(),
            })
        }
    }

    fn session_with(
        renewer: FakeRenewer,
    ) -> (Arc<AuthSession>, Arc<MemoryStore>, Arc<FakeRenewer>) {
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "stale");
        store.set(REFRESH_TOKEN_KEY, "r1");
        let renewer = Arc::new(renewer);
        let session = Arc::new(AuthSession::new(store.clone(), renewer.clone()));
        (session, store, renewer)
    }

    fn expired(token: Option<String>) -> Result<String, ClientError> {
        match token.as_deref() {
            Some("fresh") => Ok("ok".to_string()),
            _ => Err(ClientError::Api {
                status: 401,
                message: "token expired".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn guarded_request_is_retried_once_with_fresh_credential() {
        let (session, store, renewer) = session_with(FakeRenewer::default());
        let attempts = AtomicUsize::new(0);

        let result = session
            .authorized(RoutePolicy::Guarded, |token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { expired(token) }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(renewer.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
        assert!(!*session.signed_out().borrow());
    }

    #[tokio::test]
    async fn second_rejection_surfaces_as_plain_error() {
        let (session, _store, renewer) = session_with(FakeRenewer::default());
        let attempts = AtomicUsize::new(0);

        let result: Result<String, _> = session
            .authorized(RoutePolicy::Guarded, |_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ClientError::Api {
                        status: 401,
                        message: "still expired".to_string(),
                    })
                }
            })
            .await;

        // Retried exactly once, then surfaced; no second renewal cycle.
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(renewer.exchanges.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ClientError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn exempt_route_never_triggers_renewal() {
        let (session, store, renewer) = session_with(FakeRenewer::default());
        let mut signed_out = session.signed_out();

        let result: Result<String, _> = session
            .authorized(RoutePolicy::Exempt, |token| async move { expired(token) })
            .await;

        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert_eq!(renewer.exchanges.load(Ordering::SeqCst), 0);
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).is_none());
        assert!(signed_out.has_changed().unwrap());
        assert!(*signed_out.borrow_and_update());
    }

    #[tokio::test]
    async fn missing_renewal_credential_forces_logout() {
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "stale");
        let session = Arc::new(AuthSession::new(
            store.clone(),
            Arc::new(FakeRenewer::default()),
        ));

        let result: Result<String, _> = session
            .authorized(RoutePolicy::Guarded, |token| async move { expired(token) })
            .await;

        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        assert!(*session.signed_out().borrow());
    }

    #[tokio::test]
    async fn renewal_failure_rejects_and_clears_credentials() {
        let (session, store, _renewer) = session_with(FakeRenewer {
            reject: true,
            ..FakeRenewer::default()
        });

        let result: Result<String, _> = session
            .authorized(RoutePolicy::Guarded, |token| async move { expired(token) })
            .await;

        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).is_none());
        assert!(*session.signed_out().borrow());
    }

    #[tokio::test]
    async fn concurrent_expiries_share_one_exchange() {
        let release = Arc::new(Notify::new());
        let (session, store, renewer) = session_with(FakeRenewer {
            hold: Some(release.clone()),
            ..FakeRenewer::default()
        });

        let mut handles = Vec::new();
        for _ in 0..2 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                session
                    .authorized(RoutePolicy::Guarded, |token| async move { expired(token) })
                    .await
            }));
        }

        // Both requests fail with 401 in the same tick and pile into the
        // gate while the driver's exchange is parked.
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "ok");
        }
        assert_eq!(renewer.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn rotated_renewal_credential_is_stored() {
        let (session, store, _renewer) = session_with(FakeRenewer {
            rotate_to: Some("r2".to_string()),
            ..FakeRenewer::default()
        });

        let result = session
            .authorized(RoutePolicy::Guarded, |token| async move { expired(token) })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn unrotated_renewal_credential_is_kept() {
        let (session, store, _renewer) = session_with(FakeRenewer::default());

        session
            .authorized(RoutePolicy::Guarded, |token| async move { expired(token) })
            .await
            .unwrap();

        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    }
}
