use crate::{
    auth::{
        client::AuthClient,
        guards::{
            ForbiddenView, GuardedRoute, LOGIN_ROUTE, Location, MemoryHistory, NavigateOptions,
            Navigator, RouteGuard, View,
        },
        state::SessionManager,
        storage::{KeyValueStore, MemoryStorage, RedirectTargetStore},
        types::LoginRequest,
    },
    cli::actions::session,
    config::AppConfig,
};
use anyhow::{Context, Result};
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct Args {
    pub config: AppConfig,
    pub location: Location,
    pub guard: RouteGuard,
    /// Used only if the route sends the visitor to the login page.
    pub login: Option<LoginRequest>,
}

/// Where a visit ended and what was shown along the way.
#[derive(Debug)]
pub struct Outcome {
    pub view: View,
    pub href: String,
    pub transcript: Vec<String>,
}

/// # Errors
/// Returns an error if the client cannot be built or a requested sign-in fails.
pub async fn execute(args: Args) -> Result<()> {
    let (manager, client) = session::open(&args.config)?;
    // One process is one tab: the redirect target lives only as long as the visit.
    let redirects = RedirectTargetStore::new(MemoryStorage::new());

    let outcome = visit(&manager, &client, &redirects, &args).await?;
    for line in &outcome.transcript {
        println!("{line}");
    }
    Ok(())
}

/// Bootstraps the session, renders the guarded route, and follows the login
/// redirect when credentials were supplied.
///
/// # Errors
/// Returns an error if a requested sign-in fails.
#[instrument(name = "lingo.visit", skip_all, fields(route = %args.location, guard = ?args.guard))]
pub async fn visit<K: KeyValueStore, R: KeyValueStore>(
    manager: &SessionManager<K, AuthClient>,
    client: &AuthClient,
    redirects: &RedirectTargetStore<R>,
    args: &Args,
) -> Result<Outcome> {
    let mut history = MemoryHistory::new(args.location.href());
    let mut transcript = Vec::new();
    let route = GuardedRoute::new(args.guard, redirects);

    manager.init_auth().await;
    transcript.push(session::describe(&manager.snapshot()));

    let mut location = args.location.clone();
    let mut view = route.render(&manager.snapshot(), &location, &mut history);
    transcript.push(line(&location, &view));

    if let View::Redirected { to } = &view
        && to == LOGIN_ROUTE
        && let Some(request) = &args.login
    {
        let response = client.login(request).await.context("login failed")?;
        let next = manager.complete_login(response, redirects);
        debug!("login complete, continuing to {next}");
        history.navigate(
            &next,
            NavigateOptions {
                replace: true,
                state: None,
            },
        );
        transcript.push(session::describe(&manager.snapshot()));

        let next = Location::parse(&next).context("invalid redirect target")?;
        if next == args.location {
            view = route.render(&manager.snapshot(), &next, &mut history);
            transcript.push(line(&next, &view));
        } else {
            // Not the guarded route any more; nothing left to evaluate here.
            transcript.push(format!("{next}: landed"));
            view = View::Content;
        }
        location = next;
    }

    if let View::Forbidden(forbidden) = &view {
        forbidden.go_back(&mut history);
    }

    debug!("visit of {} ended at {}", location, history.current().href);

    Ok(Outcome {
        view,
        href: history.current().href.clone(),
        transcript,
    })
}

fn line(location: &Location, view: &View) -> String {
    match view {
        View::Loading => format!("{location}: loading"),
        View::Content => format!("{location}: rendered"),
        View::Forbidden(_) => format!(
            "{location}: {} {}",
            ForbiddenView::STATUS,
            ForbiddenView::MESSAGE
        ),
        View::Redirected { to } => format!("{location}: redirected to {to}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::ApiClient,
        auth::{
            client::{LOGIN_PATH, ME_PATH},
            storage::{AUTH_TOKEN_KEY, CredentialStore},
        },
        config::Locale,
    };
    use serde_json::json;
    use std::{net::TcpListener, path::PathBuf, sync::Arc};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn setup(
        uri: &str,
        raw: &str,
        guard: RouteGuard,
        login: Option<LoginRequest>,
    ) -> (
        SessionManager<Arc<MemoryStorage>, AuthClient>,
        AuthClient,
        Arc<MemoryStorage>,
        Args,
    ) {
        let config = AppConfig::new(uri, PathBuf::from("/tmp/lingo"), Locale::EnUs, None).unwrap();
        let client = AuthClient::new(ApiClient::new(&config).unwrap());
        let storage = Arc::new(MemoryStorage::new());
        let manager = SessionManager::new(CredentialStore::new(storage.clone()), client.clone());
        let args = Args {
            config,
            location: Location::parse(raw).unwrap(),
            guard,
            login,
        };
        (manager, client, storage, args)
    }

    #[tokio::test]
    async fn anonymous_visit_redirects_and_login_returns_to_route() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": 3, "email": "a@b.com", "role": "USER" },
                "token": "fresh"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let login = LoginRequest {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
        };
        let (manager, client, storage, args) = setup(
            &server.uri(),
            "/vocab?page=2#w",
            RouteGuard::Private,
            Some(login),
        );
        let redirects = RedirectTargetStore::new(MemoryStorage::new());

        let outcome = visit(&manager, &client, &redirects, &args).await.unwrap();

        assert_eq!(outcome.view, View::Content);
        assert_eq!(outcome.href, "/vocab?page=2#w");
        assert_eq!(
            outcome.transcript[1],
            "/vocab?page=2#w: redirected to /login"
        );
        assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), Some("fresh".to_string()));
        assert_eq!(redirects.peek().unwrap(), None);
    }

    #[tokio::test]
    async fn signed_in_user_is_forbidden_from_admin_route() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "email": "a@b.com", "role": "USER"
            })))
            .mount(&server)
            .await;

        let (manager, client, storage, args) =
            setup(&server.uri(), "/admin", RouteGuard::Admin, None);
        storage.set(AUTH_TOKEN_KEY, "abc").unwrap();
        let redirects = RedirectTargetStore::new(MemoryStorage::new());

        let outcome = visit(&manager, &client, &redirects, &args).await.unwrap();

        assert!(matches!(outcome.view, View::Forbidden(_)));
        assert!(outcome.transcript[1].contains("403"));
        assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn admin_login_lands_on_default_path() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": 1, "email": "root@b.com", "role": "ADMIN" },
                "token": "T"
            })))
            .mount(&server)
            .await;

        let login = LoginRequest {
            email: "root@b.com".to_string(),
            password: "secret1".to_string(),
        };
        let (manager, client, _storage, args) =
            setup(&server.uri(), "/admin/images", RouteGuard::Admin, Some(login));
        let redirects = RedirectTargetStore::new(MemoryStorage::new());

        let outcome = visit(&manager, &client, &redirects, &args).await.unwrap();

        assert_eq!(outcome.href, "/");
        assert_eq!(outcome.transcript.last().map(String::as_str), Some("/: landed"));
    }
}
