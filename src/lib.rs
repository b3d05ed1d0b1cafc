//! # Lingo (Language-Learning Client Session Core)
//!
//! `lingo` is the client-side authentication core of the Lingo language-learning
//! application. It owns the lifecycle of the signed-in session and decides which
//! views a user may reach; vocabulary, image and chat resources are served by the
//! backend and are out of scope here.
//!
//! ## Session Bootstrap
//!
//! On start the [`auth::SessionManager`] reads the persisted token from the
//! [`auth::CredentialStore`] and validates it with `GET /api/auth/me`:
//!
//! 1. **No token:** the session resolves to anonymous without a network call.
//! 2. **Valid token:** the session becomes `{user, token}`.
//! 3. **Invalid token or transport failure:** the token is purged and the
//!    session resolves to anonymous. The failure is logged, never returned.
//!
//! While the validation call is in flight the session reports `is_loading`, and
//! guards render a loading placeholder instead of redirecting.
//!
//! ## Route Guards
//!
//! Guard decisions are a pure function of the session and the requested
//! location (see [`auth::guards::decide`]). `PrivateRoute` admits any signed-in
//! user and remembers the attempted path for the login flow. `AdminRoute`
//! additionally requires the `ADMIN` role and answers with a 403 view, not a
//! redirect, when the role does not match.
//!
//! Guards are UX only; the backend remains the access-control authority.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;

pub use errors::AppError;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
