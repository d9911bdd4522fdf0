//! Error types for authentication operations.

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Error reported by the identity provider.
    #[error("Identity provider error {code}: {message}")]
    Provider {
        /// HTTP status code.
        code: u16,
        /// Provider error message (e.g., `INVALID_PASSWORD`).
        message: String,
    },

    /// No user is signed in.
    #[error("Not signed in")]
    NotSignedIn,

    /// The signed-in user lacks the admin claim.
    #[error("Admin access required")]
    Forbidden,

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Invalid response payload.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Creates a provider error from status code and message.
    #[must_use]
    pub fn provider_error(code: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            code,
            message: message.into(),
        }
    }

    /// Whether the provider rejected the email/password pair.
    #[must_use]
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            Self::Provider { message, .. }
                if message.starts_with("INVALID_PASSWORD")
                    || message.starts_with("EMAIL_NOT_FOUND")
                    || message.starts_with("INVALID_LOGIN_CREDENTIALS")
                    || message.starts_with("INVALID_EMAIL")
        )
    }
}
