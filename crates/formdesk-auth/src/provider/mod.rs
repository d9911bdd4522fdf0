//! Identity provider endpoint configuration.

use url::Url;

use crate::error::{Error, Result};

/// Base URLs of an Identity-Toolkit compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Accounts API base; `accounts:*` methods are resolved against it.
    pub accounts_url: Url,
    /// Refresh-token exchange endpoint.
    pub token_url: Url,
}

impl Endpoints {
    /// Creates an endpoint configuration.
    ///
    /// A trailing slash is added to the accounts URL so that relative
    /// method names resolve beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid.
    pub fn new(accounts_url: impl AsRef<str>, token_url: impl AsRef<str>) -> Result<Self> {
        let mut accounts = accounts_url.as_ref().to_string();
        if !accounts.ends_with('/') {
            accounts.push('/');
        }
        Ok(Self {
            accounts_url: Url::parse(&accounts)?,
            token_url: Url::parse(token_url.as_ref())?,
        })
    }

    /// Google Identity Toolkit endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Self::new(
            "https://identitytoolkit.googleapis.com/v1/",
            "https://securetoken.googleapis.com/v1/token",
        )
    }

    /// URL of an `accounts:<method>` call, keyed with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the method name does not form a valid URL.
    pub fn accounts_method(&self, method: &str, api_key: &str) -> Result<Url> {
        // "./" keeps "accounts:" from being read as a URL scheme.
        let mut url = self.accounts_url.join(&format!("./accounts:{method}"))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    /// URL of the refresh-token exchange, keyed with `api_key`.
    #[must_use]
    pub fn token_endpoint(&self, api_key: &str) -> Url {
        let mut url = self.token_url.clone();
        url.query_pairs_mut().append_pair("key", api_key);
        url
    }

    /// Validates that both URLs are usable over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL has a non-HTTP scheme.
    pub fn validate(&self) -> Result<()> {
        for url in [&self.accounts_url, &self.token_url] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidResponse(format!(
                    "unsupported endpoint scheme: {url}"
                )));
            }
        }
        Ok(())
    }
}
