//! Client wrappers for the backend auth endpoints. Validation of stored tokens
//! goes through [`AuthApi`] so the session manager can be driven by a fake in
//! tests; login and registration are plain methods on [`AuthClient`].

use crate::{
    api::ApiClient,
    auth::types::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, Token, User},
    errors::AppError,
};
use std::future::Future;
use tracing::debug;

pub const ME_PATH: &str = "/api/auth/me";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Server-side validation of a token.
pub trait AuthApi: Send + Sync {
    /// Fetches the user the token belongs to.
    ///
    /// # Errors
    /// `AppError::Unauthorized` for an invalid or expired token, `Network` or
    /// `Timeout` when the server cannot be reached.
    fn get_me(&self, token: &Token) -> impl Future<Output = Result<User, AppError>> + Send;
}

#[derive(Clone, Debug)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Exchanges credentials for a user and token.
    /// The request is validated locally first and never logged.
    ///
    /// # Errors
    /// `AppError::Validation` before any network call, otherwise the API error.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AppError> {
        let request = request.normalized();
        request.validate()?;
        self.api.post_json(LOGIN_PATH, &request).await
    }

    /// Creates an account and returns its first session.
    ///
    /// # Errors
    /// `AppError::Validation` before any network call, otherwise the API error.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
        let request = request.normalized();
        request.validate()?;
        self.api.post_json(REGISTER_PATH, &request).await
    }
}

impl AuthApi for AuthClient {
    async fn get_me(&self, token: &Token) -> Result<User, AppError> {
        let response: MeResponse = self
            .api
            .get_json_with_bearer(ME_PATH, token.expose())
            .await?;
        let user = User::from(response);
        debug!("token belongs to user {}", user.id);
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::types::{Role, UserId};
    use crate::config::{AppConfig, Locale};
    use serde_json::json;
    use std::{net::TcpListener, path::PathBuf};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client_for(uri: &str) -> AuthClient {
        let config =
            AppConfig::new(uri, PathBuf::from("/tmp/lingo"), Locale::EnUs, None).unwrap();
        AuthClient::new(ApiClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn get_me_returns_user() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": 1, "email": "a@b.com", "role": "ADMIN" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server.uri())
            .get_me(&Token::new("abc"))
            .await
            .unwrap();
        assert_eq!(user.id, UserId::Number(1));
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn get_me_rejects_expired_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "Token expired" })),
            )
            .mount(&server)
            .await;

        let result = client_for(&server.uri()).get_me(&Token::new("old")).await;
        assert_eq!(result.unwrap_err(), AppError::Unauthorized);
    }

    #[tokio::test]
    async fn login_posts_credentials() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({ "email": "a@b.com", "password": "secret1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": 7, "email": "a@b.com", "role": "USER" },
                "token": "fresh"
            })))
            .mount(&server)
            .await;

        let response = client_for(&server.uri())
            .login(&LoginRequest {
                email: " a@b.com ".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.token, Token::new("fresh"));
        assert_eq!(response.user.id, UserId::Number(7));
    }

    #[tokio::test]
    async fn register_sends_trimmed_email_and_name() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .and(body_json(json!({
                "email": "a@b.com",
                "password": "secret1",
                "name": "Ada"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": "u-1", "email": "a@b.com", "name": "Ada", "role": "USER" },
                "token": "first"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server.uri())
            .register(&RegisterRequest {
                email: "  a@b.com \n".to_string(),
                password: "secret1".to_string(),
                name: Some(" Ada ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(response.user.id, UserId::Text("u-1".to_string()));
    }

    #[tokio::test]
    async fn register_skips_network_on_invalid_input() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server.uri())
            .register(&RegisterRequest {
                email: "a@b.com".to_string(),
                password: "123".to_string(),
                name: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
