//! Auth session state for the client. One `SessionManager` exists per running
//! client and is passed to whoever needs it; observers subscribe to a watch
//! channel and re-evaluate on every change. Only the token is persisted; the
//! user record is an in-memory copy of what the backend returned.

use crate::auth::{
    client::AuthApi,
    storage::{CredentialStore, KeyValueStore, RedirectTargetStore},
    types::{AuthResponse, Token, User},
};
use tokio::sync::watch;
use tracing::{Span, debug, field, info, instrument, warn};

/// Where the login flow lands when no redirect target was recorded.
pub const DEFAULT_LANDING_PATH: &str = "/";

/// Current authentication outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<Token>,
    pub is_loading: bool,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

pub struct SessionManager<K, A> {
    credentials: CredentialStore<K>,
    api: A,
    state: watch::Sender<Session>,
}

impl<K: KeyValueStore, A: AuthApi> SessionManager<K, A> {
    /// Starts with an anonymous, non-loading session.
    pub fn new(credentials: CredentialStore<K>, api: A) -> Self {
        let (state, _) = watch::channel(Session::anonymous());
        Self {
            credentials,
            api,
            state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn credentials(&self) -> &CredentialStore<K> {
        &self.credentials
    }

    /// Persists the token and replaces the session, typically after login.
    pub fn set_auth(&self, user: User, token: Token) {
        if let Err(err) = self.credentials.set(&token) {
            warn!("failed to persist auth token: {err}");
        }

        info!("signed in as user {}", user.id);

        self.state.send_replace(Session {
            user: Some(user),
            token: Some(token),
            is_loading: false,
        });
    }

    /// Drops the stored token and resets to anonymous. Safe without a session.
    pub fn logout(&self) {
        if let Err(err) = self.credentials.remove() {
            warn!("failed to remove auth token: {err}");
        }

        debug!("session cleared");

        self.state.send_replace(Session::anonymous());
    }

    /// Reconciles the stored token with the server once at boot.
    ///
    /// Always resolves to either `{user, token}` or anonymous, with
    /// `is_loading` false. Failures purge the token and are only logged.
    #[instrument(name = "lingo.session.init", skip_all, fields(outcome = field::Empty))]
    pub async fn init_auth(&self) {
        let stored = match self.credentials.get() {
            Ok(token) => token,
            Err(err) => {
                warn!("failed to read auth token, continuing signed out: {err}");
                None
            }
        };

        let Some(token) = stored else {
            debug!("no stored token, session is anonymous");
            Span::current().record("outcome", "anonymous");
            self.state.send_replace(Session::anonymous());
            return;
        };

        self.state.send_modify(|session| {
            session.token = Some(token.clone());
            session.is_loading = true;
        });

        match self.api.get_me(&token).await {
            Ok(user) => {
                info!("restored session for user {}", user.id);
                Span::current().record("outcome", "restored");
                self.state.send_replace(Session {
                    user: Some(user),
                    token: Some(token),
                    is_loading: false,
                });
            }
            Err(err) => {
                if err.is_transport() {
                    warn!("could not validate stored token, signing out: {err}");
                    Span::current().record("outcome", "unreachable");
                } else {
                    warn!("stored token rejected, signing out: {err}");
                    Span::current().record("outcome", "rejected");
                }
                if let Err(err) = self.credentials.remove() {
                    warn!("failed to remove rejected auth token: {err}");
                }
                self.state.send_replace(Session::anonymous());
            }
        }
    }

    /// Applies a successful login and returns the path to navigate to next:
    /// the recorded redirect target if there is one, else [`DEFAULT_LANDING_PATH`].
    pub fn complete_login<R: KeyValueStore>(
        &self,
        response: AuthResponse,
        redirects: &RedirectTargetStore<R>,
    ) -> String {
        self.set_auth(response.user, response.token);

        match redirects.take() {
            Ok(Some(path)) if is_local_path(&path) => path,
            Ok(_) => DEFAULT_LANDING_PATH.to_string(),
            Err(err) => {
                warn!("failed to read login redirect target: {err}");
                DEFAULT_LANDING_PATH.to_string()
            }
        }
    }
}

/// Only same-origin paths are followed; `//host` is protocol-relative.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}
