//! Identity Toolkit REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::identity::{Claims, IdentityProvider, User};
use crate::provider::Endpoints;
use crate::token::{ErrorResponse, LookupResponse, RefreshResponse, SignInResponse, Token};

/// Bound on a single provider request unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct Session {
    token: Token,
    claims: Option<Claims>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

/// [`IdentityProvider`] backed by the Identity Toolkit REST API.
#[derive(Debug)]
pub struct IdentityToolkit {
    api_key: String,
    endpoints: Endpoints,
    http_client: Client,
    session: Mutex<Option<Session>>,
    user_tx: watch::Sender<Option<User>>,
}

impl IdentityToolkit {
    /// Creates a client for the given project API key.
    ///
    /// Requests time out after [`DEFAULT_REQUEST_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, endpoints: Endpoints) -> Result<Self> {
        let (user_tx, _) = watch::channel(None);
        Ok(Self {
            api_key: api_key.into(),
            endpoints,
            http_client: http_client(DEFAULT_REQUEST_TIMEOUT)?,
            session: Mutex::new(None),
            user_tx,
        })
    }

    /// Replaces the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = http_client(timeout)?;
        Ok(self)
    }

    async fn post_json<B, R>(&self, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoints.accounts_method(method, &self.api_key)?;
        let response = self.http_client.post(url).json(body).send().await?;
        decode(response).await
    }

    /// Exchanges the refresh token for a new ID token.
    async fn refresh(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response = self
            .http_client
            .post(self.endpoints.token_endpoint(&self.api_key))
            .form(&params)
            .send()
            .await?;
        let refreshed: RefreshResponse = decode(response).await?;
        debug!(uid = %refreshed.user_id, "ID token refreshed");
        Token::from_refresh(&refreshed)
    }

    async fn lookup_claims(&self, token: &Token) -> Result<Claims> {
        let lookup: LookupResponse = self
            .post_json(
                "lookup",
                &LookupRequest {
                    id_token: &token.id_token,
                },
            )
            .await?;
        let account = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("lookup returned no account".into()))?;
        Claims::from_custom_attributes(account.custom_attributes.as_deref())
    }
}

fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ErrorResponse::parse(status.as_u16(), &body));
    }
    Ok(response.json().await?)
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let response: SignInResponse = self
            .post_json(
                "signInWithPassword",
                &SignInRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        let token = Token::from_sign_in(&response)?;
        let user = User::new(
            response.local_id,
            response.email.or_else(|| Some(email.to_string())),
        );
        *self.session.lock().await = Some(Session {
            token,
            claims: None,
        });
        self.user_tx.send_replace(Some(user.clone()));
        info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.session.lock().await.take();
        if self.user_tx.send_replace(None).is_some() {
            info!("signed out");
        }
        Ok(())
    }

    fn current_user(&self) -> Option<User> {
        self.user_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user_tx.subscribe()
    }

    async fn claims(&self, force_refresh: bool) -> Result<Claims> {
        let (mut token, cached) = {
            let session = self.session.lock().await;
            let session = session.as_ref().ok_or(Error::NotSignedIn)?;
            (session.token.clone(), session.claims.clone())
        };

        if !force_refresh
            && token.is_valid()
            && let Some(claims) = cached
        {
            return Ok(claims);
        }

        if force_refresh || token.is_expired() {
            token = self.refresh(&token).await?;
        }
        let claims = self.lookup_claims(&token).await?;

        // A sign-out while the lookup was in flight wins.
        if let Some(session) = self.session.lock().await.as_mut() {
            session.token = token;
            session.claims = Some(claims.clone());
        } else {
            return Err(Error::NotSignedIn);
        }
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers `(status, body)` for a request line and body.
    type Route = dyn Fn(&str, &str) -> (u16, String) + Send + Sync;

    /// Minimal one-request-per-connection HTTP server.
    async fn serve(route: Arc<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let route = Arc::clone(&route);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    let header_end = loop {
                        let n = socket.read(&mut chunk).await.unwrap();
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            break pos + 4;
                        }
                    };
                    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                    let length = head
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    while buf.len() < header_end + length {
                        let n = socket.read(&mut chunk).await.unwrap();
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
                    let request_line = head.lines().next().unwrap_or_default().to_string();

                    let (status, payload) = route(&request_line, &body);
                    let response = format!(
                        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                        payload.len()
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                });
            }
        });
        format!("http://{addr}")
    }

    fn toolkit(base: &str) -> IdentityToolkit {
        let endpoints = Endpoints::new(format!("{base}/v1/"), format!("{base}/token")).unwrap();
        IdentityToolkit::new("test-key", endpoints).unwrap()
    }

    fn sign_in_ok() -> (u16, String) {
        (
            200,
            r#"{"localId":"uid-1","email":"admin@example.com","idToken":"id-1","refreshToken":"rt-1","expiresIn":"3600"}"#.into(),
        )
    }

    fn lookup(attrs: &str) -> (u16, String) {
        let users = serde_json::json!({
            "users": [{"localId": "uid-1", "email": "admin@example.com", "customAttributes": attrs}]
        });
        (200, users.to_string())
    }

    #[tokio::test]
    async fn sign_in_then_forced_claims() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&refreshes);
        let base = serve(Arc::new(move |line: &str, body: &str| -> (u16, String) {
            if line.contains("accounts:signInWithPassword?key=test-key") {
                assert!(body.contains(r#""returnSecureToken":true"#));
                sign_in_ok()
            } else if line.starts_with("POST /token?key=test-key") {
                assert!(body.contains("grant_type=refresh_token"));
                assert!(body.contains("refresh_token=rt-1"));
                counter.fetch_add(1, Ordering::SeqCst);
                (
                    200,
                    r#"{"id_token":"id-2","refresh_token":"rt-1","expires_in":"3600","user_id":"uid-1"}"#.into(),
                )
            } else if line.contains("accounts:lookup") {
                assert!(body.contains(r#""idToken":"id-2""#));
                lookup(r#"{"admin":true}"#)
            } else {
                (404, String::new())
            }
        }))
        .await;

        let toolkit = toolkit(&base);
        let mut changes = toolkit.subscribe();

        let user = toolkit.sign_in("admin@example.com", "pw").await.unwrap();
        assert_eq!(user.uid, "uid-1");
        assert_eq!(toolkit.current_user(), Some(user.clone()));
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), Some(user));

        let claims = toolkit.claims(true).await.unwrap();
        assert!(claims.is_admin());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        // Cached claims answer an unforced request.
        assert!(toolkit.claims(false).await.unwrap().is_admin());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        toolkit.sign_out().await.unwrap();
        assert_eq!(toolkit.current_user(), None);
        assert!(changes.has_changed().unwrap());
        assert!(matches!(toolkit.claims(true).await, Err(Error::NotSignedIn)));
    }

    #[tokio::test]
    async fn wrong_password_is_provider_error() {
        let base = serve(Arc::new(|_: &str, _: &str| -> (u16, String) {
            (
                400,
                r#"{"error":{"code":400,"message":"INVALID_LOGIN_CREDENTIALS","errors":[]}}"#
                    .into(),
            )
        }))
        .await;

        let toolkit = toolkit(&base);
        let err = toolkit.sign_in("admin@example.com", "nope").await.unwrap_err();
        assert!(err.is_invalid_credentials());
        assert_eq!(toolkit.current_user(), None);
    }

    #[tokio::test]
    async fn claims_without_admin_attribute() {
        let base = serve(Arc::new(|line: &str, _: &str| -> (u16, String) {
            if line.contains("signInWithPassword") {
                sign_in_ok()
            } else if line.contains("accounts:lookup") {
                (
                    200,
                    r#"{"users":[{"localId":"uid-1","email":"admin@example.com"}]}"#.into(),
                )
            } else {
                (
                    200,
                    r#"{"id_token":"id-2","refresh_token":"rt-2","expires_in":"3600","user_id":"uid-1"}"#.into(),
                )
            }
        }))
        .await;

        let toolkit = toolkit(&base);
        toolkit.sign_in("admin@example.com", "pw").await.unwrap();
        assert!(!toolkit.claims(true).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn silent_provider_times_out() {
        // Accepts connections and reads requests but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let toolkit = toolkit(&format!("http://{addr}"))
            .with_timeout(Duration::from_millis(200))
            .unwrap();
        let result =
            tokio::time::timeout(Duration::from_secs(5), toolkit.sign_in("a@b.c", "pw")).await;

        let err = result.expect("sign-in should give up on its own");
        assert!(matches!(err, Err(Error::Http(e)) if e.is_timeout()));
        assert_eq!(toolkit.current_user(), None);
    }

    #[tokio::test]
    async fn claims_before_sign_in() {
        let toolkit = toolkit("http://127.0.0.1:9");
        assert!(matches!(toolkit.claims(false).await, Err(Error::NotSignedIn)));
        assert_eq!(toolkit.current_user(), None);
    }
}
