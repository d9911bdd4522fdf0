//! Admin access checks.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identity::{IdentityProvider, User};

/// Gate in front of admin-only operations.
///
/// Every check goes back to the provider with a forced claim refresh.
/// Nothing is cached here, so a revoked claim takes effect on the next call.
#[derive(Debug, Clone)]
pub struct AccessGuard<P> {
    provider: P,
}

impl<P: IdentityProvider> AccessGuard<P> {
    /// Wraps a provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// True only for a signed-in user whose verified claims carry
    /// `admin: true`. Any failure answers false.
    pub async fn is_admin(&self) -> bool {
        if self.provider.current_user().is_none() {
            return false;
        }
        match self.provider.claims(true).await {
            Ok(claims) => claims.is_admin(),
            Err(err) => {
                warn!(error = %err, "admin claim check failed, denying access");
                false
            }
        }
    }

    /// The current user, if they are an admin.
    ///
    /// # Errors
    ///
    /// [`Error::NotSignedIn`] without a user, [`Error::Forbidden`] when the
    /// claim is missing or cannot be verified.
    pub async fn require_admin(&self) -> Result<User> {
        let user = self.provider.current_user().ok_or(Error::NotSignedIn)?;
        if self.is_admin().await {
            debug!(uid = %user.uid, "admin verified");
            Ok(user)
        } else {
            Err(Error::Forbidden)
        }
    }
}

/// Who is signed in and whether they may use the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Current user.
    pub user: Option<User>,
    /// Result of the last admin check.
    pub is_admin: bool,
    /// True until the first change notification is handled.
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            is_admin: false,
            loading: true,
        }
    }
}

impl AuthState {
    /// Applies a current-user change, re-running the admin check.
    pub async fn on_user_changed<P: IdentityProvider>(
        &mut self,
        user: Option<User>,
        guard: &AccessGuard<P>,
    ) {
        self.loading = true;
        self.is_admin = match &user {
            Some(_) => guard.is_admin().await,
            None => false,
        };
        self.user = user;
        self.loading = false;
    }

    /// True once loaded with a signed-in admin.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        !self.loading && self.user.is_some() && self.is_admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::Claims;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::watch;

    #[derive(Clone, Copy)]
    enum Answer {
        Admin,
        Plain,
        Fail,
    }

    struct FakeProvider {
        user: watch::Sender<Option<User>>,
        answer: Mutex<Answer>,
        forced: AtomicUsize,
    }

    impl FakeProvider {
        fn new(answer: Answer) -> Arc<Self> {
            Arc::new(Self {
                user: watch::channel(Some(User::new("uid-1", Some("a@b.c".into())))).0,
                answer: Mutex::new(answer),
                forced: AtomicUsize::new(0),
            })
        }

        fn set_answer(&self, answer: Answer) {
            *self.answer.lock().unwrap() = answer;
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_in(&self, email: &str, _password: &str) -> Result<User> {
            let user = User::new("uid-1", Some(email.to_string()));
            self.user.send_replace(Some(user.clone()));
            Ok(user)
        }

        async fn sign_out(&self) -> Result<()> {
            self.user.send_replace(None);
            Ok(())
        }

        fn current_user(&self) -> Option<User> {
            self.user.borrow().clone()
        }

        fn subscribe(&self) -> watch::Receiver<Option<User>> {
            self.user.subscribe()
        }

        async fn claims(&self, force_refresh: bool) -> Result<Claims> {
            if force_refresh {
                self.forced.fetch_add(1, Ordering::SeqCst);
            }
            let answer = *self.answer.lock().unwrap();
            match answer {
                Answer::Admin => Claims::from_custom_attributes(Some(r#"{"admin":true}"#)),
                Answer::Plain => Ok(Claims::default()),
                Answer::Fail => Err(Error::InvalidResponse("boom".into())),
            }
        }
    }

    #[tokio::test]
    async fn admin_check_forces_refresh_every_time() {
        let provider = FakeProvider::new(Answer::Admin);
        let guard = AccessGuard::new(Arc::clone(&provider));

        assert!(guard.is_admin().await);
        assert!(guard.is_admin().await);
        assert_eq!(provider.forced.load(Ordering::SeqCst), 2);
        assert_eq!(guard.require_admin().await.unwrap().uid, "uid-1");
    }

    #[tokio::test]
    async fn revoked_claim_takes_effect_immediately() {
        let provider = FakeProvider::new(Answer::Admin);
        let guard = AccessGuard::new(Arc::clone(&provider));
        assert!(guard.is_admin().await);

        provider.set_answer(Answer::Plain);
        assert!(!guard.is_admin().await);
        assert!(matches!(guard.require_admin().await, Err(Error::Forbidden)));
    }

    #[tokio::test]
    async fn failures_close_the_gate() {
        let provider = FakeProvider::new(Answer::Fail);
        let guard = AccessGuard::new(Arc::clone(&provider));
        assert!(!guard.is_admin().await);
        assert!(matches!(guard.require_admin().await, Err(Error::Forbidden)));
    }

    #[tokio::test]
    async fn signed_out_user_is_never_admin() {
        let provider = FakeProvider::new(Answer::Admin);
        provider.sign_out().await.unwrap();
        let guard = AccessGuard::new(Arc::clone(&provider));

        assert!(!guard.is_admin().await);
        assert_eq!(provider.forced.load(Ordering::SeqCst), 0);
        assert!(matches!(guard.require_admin().await, Err(Error::NotSignedIn)));
    }

    #[test]
    fn auth_state_follows_user_changes() {
        tokio_test::block_on(async {
            let provider = FakeProvider::new(Answer::Admin);
            let guard = AccessGuard::new(Arc::clone(&provider));
            let mut state = AuthState::default();
            assert!(state.loading);
            assert!(!state.is_authorized());

            state
                .on_user_changed(provider.current_user(), &guard)
                .await;
            assert!(!state.loading);
            assert!(state.is_admin);
            assert!(state.is_authorized());

            provider.set_answer(Answer::Plain);
            state.on_user_changed(provider.current_user(), &guard).await;
            assert!(!state.is_authorized());

            state.on_user_changed(None, &guard).await;
            assert_eq!(state.user, None);
            assert!(!state.is_admin);
        });
    }
}
