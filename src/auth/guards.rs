//! Route guards. `decide` is a pure function of the session and the requested
//! location; `GuardedRoute` is the thin shell that performs the side effects
//! (remembering the attempted path, navigating). Guards are UX only; real
//! access control lives on the API.

use crate::{
    auth::{
        state::Session,
        storage::{KeyValueStore, RedirectTargetStore},
        types::Role,
    },
    errors::AppError,
};
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

pub const LOGIN_ROUTE: &str = "/login";

/// Origin used only to resolve relative paths; it never leaves this module.
const PARSE_ORIGIN: &str = "http://localhost/";

/// Path, query, and fragment of a client-side route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    /// # Errors
    /// Returns `AppError::Validation` if the value is not a parsable path.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        if !raw.starts_with('/') || raw.starts_with("//") {
            return Err(AppError::Validation(format!(
                "'{raw}' is not an absolute path"
            )));
        }

        let url = Url::parse(PARSE_ORIGIN)
            .and_then(|origin| origin.join(raw))
            .map_err(|err| AppError::Validation(format!("invalid path '{raw}': {err}")))?;

        Ok(Self {
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

/// Admission predicate of a protected route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteGuard {
    /// Any signed-in user.
    Private,
    /// Signed-in users whose role is exactly `ADMIN`.
    Admin,
}

impl RouteGuard {
    #[must_use]
    pub const fn required_role(self) -> Option<Role> {
        match self {
            Self::Private => None,
            Self::Admin => Some(Role::Admin),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Session is still bootstrapping; show a neutral placeholder.
    Loading,
    Render,
    /// `from` is the attempted location to hand to the login flow, if kept.
    Redirect { to: String, from: Option<String> },
    Forbidden,
}

#[must_use]
pub fn decide(session: &Session, guard: RouteGuard, location: &Location) -> Decision {
    if session.is_loading {
        return Decision::Loading;
    }

    match guard.required_role() {
        None => {
            if session.token.is_none() {
                return Decision::Redirect {
                    to: LOGIN_ROUTE.to_string(),
                    from: Some(location.href()),
                };
            }
            Decision::Render
        }
        Some(role) => {
            // The attempted admin path is not preserved across login.
            let Some(user) = session.user.as_ref().filter(|_| session.token.is_some()) else {
                return Decision::Redirect {
                    to: LOGIN_ROUTE.to_string(),
                    from: None,
                };
            };
            if user.role == role {
                Decision::Render
            } else {
                Decision::Forbidden
            }
        }
    }
}

/// Router state attached to a navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationState {
    pub from: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    pub replace: bool,
    pub state: Option<NavigationState>,
}

/// Client-side history.
pub trait Navigator {
    fn navigate(&mut self, to: &str, options: NavigateOptions);
    fn back(&mut self);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub href: String,
    pub state: Option<NavigationState>,
}

/// In-process history stack, used by the CLI and tests. Never empty: it
/// starts with the initial entry and `replace` overwrites in place.
#[derive(Clone, Debug)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![HistoryEntry {
                href: initial.into(),
                state: None,
            }],
            index: 0,
        }
    }

    #[must_use]
    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }
}

impl Navigator for MemoryHistory {
    fn navigate(&mut self, to: &str, options: NavigateOptions) {
        let entry = HistoryEntry {
            href: to.to_string(),
            state: options.state,
        };
        self.entries.truncate(self.index + 1);
        if options.replace {
            self.entries[self.index] = entry;
        } else {
            self.entries.push(entry);
            self.index += 1;
        }
    }

    fn back(&mut self) {
        self.index = self.index.saturating_sub(1);
    }
}

/// The 403 view shown to signed-in users without the required role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForbiddenView;

impl ForbiddenView {
    pub const STATUS: u16 = 403;
    pub const MESSAGE: &'static str = "Sorry, you are not authorized to access this page.";

    /// The view's only action: step back in history.
    pub fn go_back(self, navigator: &mut impl Navigator) {
        navigator.back();
    }
}

/// What the shell ended up showing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    Loading,
    Content,
    Forbidden(ForbiddenView),
    Redirected { to: String },
}

pub struct GuardedRoute<'a, K> {
    guard: RouteGuard,
    redirects: &'a RedirectTargetStore<K>,
}

impl<'a, K: KeyValueStore> GuardedRoute<'a, K> {
    pub const fn new(guard: RouteGuard, redirects: &'a RedirectTargetStore<K>) -> Self {
        Self { guard, redirects }
    }

    /// Renders once for the given session. A `Loading` result is re-evaluated
    /// by calling again on the next session change.
    pub fn render(
        &self,
        session: &Session,
        location: &Location,
        navigator: &mut impl Navigator,
    ) -> View {
        match decide(session, self.guard, location) {
            Decision::Loading => View::Loading,
            Decision::Render => View::Content,
            Decision::Forbidden => {
                debug!("{:?} route {} forbidden for current role", self.guard, location);
                View::Forbidden(ForbiddenView)
            }
            Decision::Redirect { to, from } => {
                if let Some(from) = &from
                    && let Err(err) = self.redirects.record(from)
                {
                    warn!("failed to record login redirect target: {err}");
                }
                debug!("redirecting {} to {}", location, to);
                navigator.navigate(
                    &to,
                    NavigateOptions {
                        replace: true,
                        state: from.map(|from| NavigationState { from }),
                    },
                );
                View::Redirected { to }
            }
        }
    }

    /// Waits until the session has left the loading state, then renders.
    pub async fn settle(
        &self,
        receiver: &mut watch::Receiver<Session>,
        location: &Location,
        navigator: &mut impl Navigator,
    ) -> View {
        let settled = receiver
            .wait_for(|session| !session.is_loading)
            .await
            .map(|session| (*session).clone());
        let session = match settled {
            Ok(session) => session,
            // Sender gone: the last value is final.
            Err(_) => receiver.borrow().clone(),
        };
        self.render(&session, location, navigator)
    }
}
