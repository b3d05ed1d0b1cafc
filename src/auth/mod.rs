//! Auth feature covering credential persistence, session bootstrap, and route
//! guards. It keeps authentication logic out of the views and must stay aligned
//! with the backend's token contract. Token material must never be logged.
//!
//! Flow overview: boot calls `SessionManager::init_auth`, which validates the
//! stored token via `GET /api/auth/me`. Login and registration return a
//! `{user, token}` pair that `SessionManager::complete_login` applies before
//! sending the user back to the path a `PrivateRoute` recorded.

pub mod client;
pub mod guards;
pub mod state;
pub mod storage;
pub mod types;

pub use client::{AuthApi, AuthClient};
pub use guards::{Decision, GuardedRoute, Location, RouteGuard, View, decide};
pub use state::{Session, SessionManager};
pub use storage::{CredentialStore, FileStorage, KeyValueStore, MemoryStorage, RedirectTargetStore};
pub use types::{Role, Token, User, UserId};
