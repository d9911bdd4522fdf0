//! # formdesk-auth
//!
//! Email/password sign-in and admin claim verification.
//!
//! ## Features
//!
//! - **Identity provider interface**: sign-in, sign-out, "current user changed"
//!   notifications and verified custom claims with forced refresh
//! - **Identity Toolkit client**: REST implementation of the interface
//!   (password sign-in, refresh-token exchange, account lookup)
//! - **Access guard**: fail-closed admin check, re-verified on every call
//! - **Auth state**: the signed-in user and admin flag for display
//!
//! ## Quick Start
//!
//! ```ignore
//! use formdesk_auth::{AccessGuard, Endpoints, IdentityProvider, IdentityToolkit};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let toolkit = IdentityToolkit::new("your_api_key", Endpoints::google()?)?;
//!     toolkit.sign_in("admin@example.com", "password").await?;
//!
//!     let guard = AccessGuard::new(toolkit);
//!     // Forces a fresh claim lookup; any failure counts as "not admin"
//!     if guard.is_admin().await {
//!         println!("Welcome, admin");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod guard;
pub mod identity;
pub mod provider;
pub mod token;
pub mod toolkit;

pub use error::{Error, Result};
pub use guard::{AccessGuard, AuthState};
pub use identity::{Claims, IdentityProvider, User};
pub use provider::Endpoints;
pub use token::Token;
pub use toolkit::IdentityToolkit;
