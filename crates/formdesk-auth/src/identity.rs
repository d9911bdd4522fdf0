//! The identity provider interface.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{Error, Result};

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider user id.
    pub uid: String,
    /// Email address, when the provider reports one.
    pub email: Option<String>,
}

impl User {
    /// Creates a user.
    #[must_use]
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }

    /// Email if known, otherwise the uid.
    #[must_use]
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.uid)
    }
}

/// Verified custom claims of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims {
    values: Map<String, Value>,
}

impl Claims {
    /// Parses the provider's `customAttributes` JSON object string.
    ///
    /// A missing or empty string means no claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a JSON object.
    pub fn from_custom_attributes(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };
        match serde_json::from_str(raw)? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(Error::InvalidResponse(format!(
                "custom attributes are not an object: {other}"
            ))),
        }
    }

    /// True only when `admin` is the JSON boolean `true`.
    ///
    /// Strings like `"true"` or numbers do not count.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.values.get("admin"), Some(Value::Bool(true)))
    }
}

/// Email/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in and makes the user current.
    async fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Clears the current user.
    async fn sign_out(&self) -> Result<()>;

    /// The current user, if any.
    fn current_user(&self) -> Option<User>;

    /// Notifies on every current-user change.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    /// Verified claims of the current user.
    ///
    /// With `force_refresh` the provider must re-verify with the server
    /// rather than answer from a cached token.
    async fn claims(&self, force_refresh: bool) -> Result<Claims>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        (**self).sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<()> {
        (**self).sign_out().await
    }

    fn current_user(&self) -> Option<User> {
        (**self).current_user()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        (**self).subscribe()
    }

    async fn claims(&self, force_refresh: bool) -> Result<Claims> {
        (**self).claims(force_refresh).await
    }
}
