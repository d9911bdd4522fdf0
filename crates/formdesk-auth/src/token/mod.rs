//! Session token types and provider payloads.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An ID token with its refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Signed ID token presented to the provider.
    pub id_token: String,
    /// Expiration time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for obtaining new ID tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Token {
    /// Creates a token from a password sign-in response.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry is not a number of seconds.
    pub fn from_sign_in(response: &SignInResponse) -> Result<Self> {
        Ok(Self {
            id_token: response.id_token.clone(),
            expires_at: Some(expiry(&response.expires_in)?),
            refresh_token: Some(response.refresh_token.clone()),
        })
    }

    /// Creates a token from a refresh-token exchange response.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiry is not a number of seconds.
    pub fn from_refresh(response: &RefreshResponse) -> Result<Self> {
        Ok(Self {
            id_token: response.id_token.clone(),
            expires_at: Some(expiry(&response.expires_in)?),
            refresh_token: Some(response.refresh_token.clone()),
        })
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }

    /// Returns true if the token is valid (not expired).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Returns the refresh token if available.
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is available.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token.as_deref().ok_or(Error::NoRefreshToken)
    }
}

/// The provider reports lifetimes as decimal strings of seconds.
fn expiry(expires_in: &str) -> Result<DateTime<Utc>> {
    let seconds: i64 = expires_in
        .trim()
        .parse()
        .map_err(|_| Error::InvalidResponse(format!("bad expiresIn: {expires_in:?}")))?;
    Ok(Utc::now() + Duration::seconds(seconds))
}

/// Response to a password sign-in.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    /// User id.
    pub local_id: String,
    /// Email the user signed in with.
    #[serde(default)]
    pub email: Option<String>,
    /// ID token.
    pub id_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: String,
}

/// Response to a refresh-token exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshResponse {
    /// New ID token.
    pub id_token: String,
    /// Refresh token (possibly rotated).
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: String,
    /// User id.
    pub user_id: String,
}

/// Response to an account lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupResponse {
    /// Matching accounts; one for a valid ID token.
    #[serde(default)]
    pub users: Vec<LookupUser>,
}

/// One account from a lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupUser {
    /// User id.
    pub local_id: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Server-held custom claims as a JSON object string.
    #[serde(default)]
    pub custom_attributes: Option<String>,
}

/// Error envelope returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error body.
    pub error: ErrorBody,
}

/// Provider error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::provider_error(self.error.code, self.error.message)
    }

    /// Turns a failed response body into an Error, falling back to the raw
    /// body when it isn't a provider envelope.
    #[must_use]
    pub fn parse(status: u16, body: &str) -> Error {
        serde_json::from_str::<Self>(body).map_or_else(
            |_| Error::InvalidResponse(format!("HTTP {status}: {body}")),
            |envelope| {
                let mut err = envelope.into_error();
                if let Error::Provider { code, .. } = &mut err
                    && *code == 0
                {
                    *code = status;
                }
                err
            },
        )
    }
}
