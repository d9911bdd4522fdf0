//! Interactive console: login prompt and the submissions command loop.

use std::path::PathBuf;

use formdesk_auth::{AccessGuard, AuthState, IdentityProvider, User};
use formdesk_core::{
    CSV_CONTENT_TYPE, DEFAULT_EXPORT_FILE, LoadState, SubmissionBrowser, SubmissionId,
    SubmissionStore,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::command::{Command, HELP, ParseError};
use crate::view;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Logout,
    Quit,
}

/// The admin console over a line-oriented input and output.
pub struct Console<P, S, R, W> {
    guard: AccessGuard<P>,
    auth: AuthState,
    users: watch::Receiver<Option<User>>,
    browser: SubmissionBrowser<S>,
    input: Lines<R>,
    output: W,
    export_path: PathBuf,
}

impl<P, S, R, W> Console<P, S, R, W>
where
    P: IdentityProvider,
    S: SubmissionStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a console; nothing is read until [`Console::run`].
    pub fn new(guard: AccessGuard<P>, browser: SubmissionBrowser<S>, input: R, output: W) -> Self {
        let users = guard.provider().subscribe();
        Self {
            guard,
            auth: AuthState::default(),
            users,
            browser,
            input: input.lines(),
            output,
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
        }
    }

    /// Sets the default `export` target.
    #[must_use]
    pub fn with_export_path(mut self, path: PathBuf) -> Self {
        self.export_path = path;
        self
    }

    /// Runs login and sessions until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            if !self.login().await? {
                return Ok(());
            }
            if self.session().await? == SessionEnd::Quit {
                self.guard.provider().sign_out().await.ok();
                return Ok(());
            }
        }
    }

    /// Prompts until an admin signs in. Returns false at end of input.
    async fn login(&mut self) -> anyhow::Result<bool> {
        loop {
            let Some(email) = self.prompt("Email: ").await? else {
                return Ok(false);
            };
            if email.is_empty() {
                continue;
            }
            let Some(password) = self.prompt("Password: ").await? else {
                return Ok(false);
            };

            if let Err(err) = self.guard.provider().sign_in(&email, &password).await {
                warn!("Sign-in failed for {email}: {err}");
                let message = if err.is_invalid_credentials() {
                    "Invalid email or password.".to_string()
                } else {
                    format!("Sign-in failed: {err}")
                };
                self.say(&message).await?;
                continue;
            }

            let user = self.users.borrow_and_update().clone();
            self.auth.on_user_changed(user, &self.guard).await;
            if self.auth.is_authorized() {
                let label = self
                    .auth
                    .user
                    .as_ref()
                    .map_or_else(String::new, |u| u.label().to_string());
                info!("Admin {label} signed in");
                self.say(&format!("Signed in as {label}.")).await?;
                return Ok(true);
            }

            self.guard.provider().sign_out().await.ok();
            self.say("Not authorized: this account is not an admin.")
                .await?;
        }
    }

    async fn session(&mut self) -> anyhow::Result<SessionEnd> {
        self.say(view::LOADING).await?;
        if let Err(err) = self.browser.load_page(0).await {
            debug!("Initial load failed: {err}");
        }
        self.draw().await?;

        loop {
            let Some(line) = self.prompt("> ").await? else {
                return Ok(SessionEnd::Quit);
            };

            if self.users.has_changed().unwrap_or(true) {
                let user = self.users.borrow_and_update().clone();
                self.auth.on_user_changed(user, &self.guard).await;
                if !self.auth.is_authorized() {
                    self.say("Session ended.").await?;
                    return Ok(SessionEnd::Logout);
                }
            }

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(ParseError::Empty) => continue,
                Err(err) => {
                    self.say(&err.to_string()).await?;
                    continue;
                }
            };

            if command.is_sensitive() && self.guard.require_admin().await.is_err() {
                warn!("Admin claim no longer valid, signing out");
                self.guard.provider().sign_out().await.ok();
                self.say("Admin access revoked. Signed out.").await?;
                return Ok(SessionEnd::Logout);
            }

            match self.execute(command).await? {
                Some(end) => {
                    if end == SessionEnd::Logout {
                        self.guard.provider().sign_out().await.ok();
                        self.say("Signed out.").await?;
                    }
                    return Ok(end);
                }
                None => self.draw().await?,
            }
        }
    }

    /// Runs one command. Store failures surface through the browser's state
    /// and notice, so they are only logged here.
    async fn execute(&mut self, command: Command) -> anyhow::Result<Option<SessionEnd>> {
        if self.will_fetch(&command) {
            self.say(view::LOADING).await?;
        }
        let result = match command {
            Command::Next => self.browser.go_next().await,
            Command::Prev => self.browser.go_prev().await,
            Command::Sort(field) => self.browser.set_sort_field(field).await,
            Command::Order(direction) => self.browser.set_sort_direction(direction).await,
            Command::Latest(on) => self.browser.set_latest_only(on).await,
            Command::Search(text) => {
                self.browser.set_search(text);
                Ok(())
            }
            Command::Read(row) => {
                let Some(id) = self.row_id(row).await? else {
                    return Ok(None);
                };
                self.browser.toggle_read(&id).await.map(|_| ())
            }
            Command::Delete(row) => {
                let Some(id) = self.row_id(row).await? else {
                    return Ok(None);
                };
                let confirmed = self.confirm_delete(&id).await?;
                if confirmed {
                    self.say(view::LOADING).await?;
                }
                self.browser.delete(&id, |_| confirmed).await.map(|_| ())
            }
            Command::Export(path) => {
                let path = path.unwrap_or_else(|| self.export_path.clone());
                self.export(path).await?;
                Ok(())
            }
            Command::Retry => self.browser.retry().await,
            Command::Dismiss => {
                self.browser.dismiss_notice();
                Ok(())
            }
            Command::Refresh => self.browser.refresh().await,
            Command::Logout => return Ok(Some(SessionEnd::Logout)),
            Command::Quit => return Ok(Some(SessionEnd::Quit)),
            Command::Help => {
                self.say(HELP).await?;
                return Ok(None);
            }
        };
        if let Err(err) = result {
            debug!("Command failed: {err}");
        }
        Ok(None)
    }

    /// Whether `command` will wait on a page fetch. Deletes decide after the
    /// confirmation prompt.
    fn will_fetch(&self, command: &Command) -> bool {
        match command {
            Command::Next => self.browser.has_next(),
            Command::Prev => self.browser.has_prev(),
            Command::Retry => matches!(self.browser.state(), LoadState::Failed(_)),
            Command::Sort(field) => *field != self.browser.options().field,
            Command::Order(direction) => *direction != self.browser.options().direction,
            Command::Latest(on) => *on != self.browser.options().latest_only,
            Command::Refresh => true,
            _ => false,
        }
    }

    async fn row_id(&mut self, row: usize) -> anyhow::Result<Option<SubmissionId>> {
        let id = self
            .browser
            .visible()
            .get(row - 1)
            .map(|submission| submission.id.clone());
        if id.is_none() {
            self.say(&format!("No row {row} on this page.")).await?;
        }
        Ok(id)
    }

    async fn confirm_delete(&mut self, id: &SubmissionId) -> anyhow::Result<bool> {
        let who = self
            .browser
            .items()
            .iter()
            .find(|s| &s.id == id)
            .and_then(|s| s.name.clone().or_else(|| s.email.clone()))
            .unwrap_or_else(|| id.to_string());
        let answer = self
            .prompt(&format!("Delete submission from {who}? [y/N] "))
            .await?
            .unwrap_or_default();
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    async fn export(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let csv = match self.browser.export_csv() {
            Ok(Some(csv)) => csv,
            Ok(None) => return self.say("Nothing to export.").await,
            Err(err) => return self.say(&format!("Export failed: {err}")).await,
        };
        let rows = self.browser.visible().len();
        match tokio::fs::write(&path, &csv).await {
            Ok(()) => {
                info!("Exported {rows} rows ({CSV_CONTENT_TYPE}) to {}", path.display());
                self.say(&format!("Exported {rows} rows to {}.", path.display()))
                    .await
            }
            Err(err) => {
                warn!("Failed to write {}: {err}", path.display());
                self.say(&format!("Export failed: {err}")).await
            }
        }
    }

    async fn draw(&mut self) -> anyhow::Result<()> {
        let screen = view::screen(&self.browser);
        self.output.write_all(screen.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn say(&mut self, message: &str) -> anyhow::Result<()> {
        self.output.write_all(message.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        self.output.write_all(label.as_bytes()).await?;
        self.output.flush().await?;
        Ok(self
            .input
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use formdesk_auth::Claims;
    use formdesk_core::{BrowserConfig, MemoryStore, Submission, Timestamp};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Accepts password "pw"; admin flag and claim failures are switchable.
    struct FakeIdentity {
        user: watch::Sender<Option<User>>,
        admin: AtomicBool,
        revoke_after: AtomicUsize,
    }

    impl FakeIdentity {
        fn new(admin: bool) -> Arc<Self> {
            Arc::new(Self {
                user: watch::channel(None).0,
                admin: AtomicBool::new(admin),
                revoke_after: AtomicUsize::new(usize::MAX),
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn sign_in(&self, email: &str, password: &str) -> formdesk_auth::Result<User> {
            if password != "pw" {
                return Err(formdesk_auth::Error::provider_error(
                    400,
                    "INVALID_LOGIN_CREDENTIALS",
                ));
            }
            let user = User::new("uid", Some(email.to_string()));
            self.user.send_replace(Some(user.clone()));
            Ok(user)
        }

        async fn sign_out(&self) -> formdesk_auth::Result<()> {
            self.user.send_replace(None);
            Ok(())
        }

        fn current_user(&self) -> Option<User> {
            self.user.borrow().clone()
        }

        fn subscribe(&self) -> watch::Receiver<Option<User>> {
            self.user.subscribe()
        }

        async fn claims(&self, _force_refresh: bool) -> formdesk_auth::Result<Claims> {
            let remaining = self.revoke_after.load(Ordering::SeqCst);
            if remaining == 0 {
                return Ok(Claims::default());
            }
            self.revoke_after.store(remaining.saturating_sub(1), Ordering::SeqCst);
            let admin = self.admin.load(Ordering::SeqCst);
            Claims::from_custom_attributes(Some(&format!(r#"{{"admin":{admin}}}"#)))
        }
    }

    fn submissions(count: usize) -> Vec<Submission> {
        (1..=count)
            .map(|n| Submission {
                name: Some(format!("Sender {n}")),
                email: Some(format!("sender{n}@example.com")),
                message: Some(format!("Message {n}")),
                created_at: Some(Timestamp::from_millis(
                    1_700_000_000_000 - i64::try_from(n).unwrap() * 60_000,
                )),
                ..Submission::new(SubmissionId::new(format!("s{n:02}")))
            })
            .collect()
    }

    async fn run(
        identity: &Arc<FakeIdentity>,
        store: &Arc<MemoryStore>,
        script: &str,
    ) -> String {
        let browser = SubmissionBrowser::new(Arc::clone(store), BrowserConfig::default());
        let mut output = Vec::new();
        let mut console = Console::new(
            AccessGuard::new(Arc::clone(identity)),
            browser,
            script.as_bytes(),
            &mut output,
        );
        console.run().await.unwrap();
        drop(console);
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn admin_sees_first_page_and_pages_forward() {
        let identity = FakeIdentity::new(true);
        let store = Arc::new(MemoryStore::with_submissions(submissions(10)));

        let out = run(
            &identity,
            &store,
            "admin@example.com\npw\nnext\nnext\nprev\nprev\nquit\n",
        )
        .await;
        // Initial load, one real `next`, one real `prev`; the others are no-ops.
        assert_eq!(out.matches("Loading...").count(), 3);
        assert!(out.contains("Signed in as admin@example.com."));
        assert!(out.contains("1 | Sender 1"));
        assert!(out.contains("Page 1 - showing 8 of 8  [next]"));
        assert!(out.contains("1 | Sender 9"));
        assert!(out.contains("Page 2 - showing 2 of 8  [prev]"));
        assert_eq!(identity.current_user(), None);
    }

    #[tokio::test]
    async fn wrong_password_then_success() {
        let identity = FakeIdentity::new(true);
        let store = Arc::new(MemoryStore::with_submissions(submissions(1)));

        let out = run(&identity, &store, "a@b.c\nnope\na@b.c\npw\nquit\n").await;
        assert!(out.contains("Invalid email or password."));
        assert!(out.contains("Signed in as a@b.c."));
    }

    #[tokio::test]
    async fn non_admin_is_turned_away() {
        let identity = FakeIdentity::new(false);
        let store = Arc::new(MemoryStore::with_submissions(submissions(3)));

        let out = run(&identity, &store, "user@example.com\npw\n").await;
        assert!(out.contains("Not authorized: this account is not an admin."));
        assert!(!out.contains("Sender 1"));
        assert_eq!(identity.current_user(), None);
    }

    #[tokio::test]
    async fn read_toggles_and_delete_asks_first() {
        let identity = FakeIdentity::new(true);
        let store = Arc::new(MemoryStore::with_submissions(submissions(3)));

        let out = run(
            &identity,
            &store,
            "admin@example.com\npw\nread 1\ndelete 2\nn\ndelete 2\ny\nread 9\nquit\n",
        )
        .await;

        let first = store.get(&SubmissionId::new("s01")).await.unwrap();
        assert!(first.read);
        assert!(out.contains("Delete submission from Sender 2? [y/N] "));
        assert_eq!(store.get(&SubmissionId::new("s02")).await, None);
        assert_eq!(store.len().await, 2);
        assert!(out.contains("No row 9 on this page."));
        assert!(out.contains("Page 1 - showing 2 of 8"));
    }

    #[tokio::test]
    async fn revoked_claim_signs_out_before_acting() {
        let identity = FakeIdentity::new(true);
        // One check for login, then claims come back without admin.
        identity.revoke_after.store(1, Ordering::SeqCst);
        let store = Arc::new(MemoryStore::with_submissions(submissions(3)));

        let out = run(&identity, &store, "admin@example.com\npw\ndelete 1\ny\n").await;
        assert!(out.contains("Admin access revoked. Signed out."));
        assert_eq!(store.len().await, 3);
        assert_eq!(identity.current_user(), None);
    }

    #[tokio::test]
    async fn search_export_and_logout() {
        let identity = FakeIdentity::new(true);
        let store = Arc::new(MemoryStore::with_submissions(submissions(4)));
        let path = std::env::temp_dir().join(format!("formdesk-export-{}.csv", std::process::id()));

        let script = format!(
            "admin@example.com\npw\nsearch sender3\nexport {}\nsearch zzz\nexport\nlogout\n",
            path.display()
        );
        let out = run(&identity, &store, &script).await;

        assert!(out.contains("Exported 1 rows to"));
        assert!(out.contains("Nothing to export."));
        assert!(out.contains("Signed out."));

        let csv = tokio::fs::read_to_string(&path).await.unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,name,email,message,date,read"));
        assert!(lines.next().unwrap().starts_with("\"s03\",\"Sender 3\""));
        assert_eq!(lines.next(), None);
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn bad_commands_are_reported() {
        let identity = FakeIdentity::new(true);
        let store = Arc::new(MemoryStore::new());

        let out = run(&identity, &store, "admin@example.com\npw\nwat\nsort size\n\nhelp\n").await;
        assert!(out.contains("No submissions"));
        assert!(out.contains("unknown command 'wat' (type 'help')"));
        assert!(out.contains("usage: sort <date|timestamp|name|email>"));
        assert!(out.contains("Commands:"));
    }
}
