//! HTTP helpers for the backend JSON API with consistent error mapping. Feature
//! clients use these helpers so request setup, language negotiation, and error
//! sanitizing live in one place. The helpers never store tokens; callers pass a
//! bearer value per request and must not log it.

use crate::{APP_USER_AGENT, config::AppConfig, config::Locale, errors::AppError};
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT_LANGUAGE, AUTHORIZATION},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{Instrument, debug, info_span};
use url::Url;

/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    locale: Locale,
}

impl ApiClient {
    /// # Errors
    /// Returns `AppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let mut builder = Client::builder().user_agent(APP_USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            locale: config.locale,
        })
    }

    /// Fetches JSON from an endpoint that authenticates with a bearer token.
    ///
    /// # Errors
    /// Returns `AppError::Unauthorized` on 401/403, a transport kind when the
    /// server cannot be reached, and `Http`/`Parse` for other failures.
    pub async fn get_json_with_bearer<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: &str,
    ) -> Result<T, AppError> {
        let url = build_url(&self.base_url, path);
        let span = info_span!("api.get", http.method = "GET", url = %url);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT_LANGUAGE, self.locale.as_str())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        handle_json_response(response).await
    }

    /// Posts JSON and parses a JSON response.
    ///
    /// # Errors
    /// Same mapping as [`ApiClient::get_json_with_bearer`], plus `Parse` when the
    /// request body cannot be encoded.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let url = build_url(&self.base_url, path);
        let span = info_span!("api.post", http.method = "POST", url = %url);

        let response = self
            .http
            .post(&url)
            .header(ACCEPT_LANGUAGE, self.locale.as_str())
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        handle_json_response(response).await
    }
}

/// Joins the base URL and path without doubling or dropping slashes.
fn build_url(base_url: &Url, path: &str) -> String {
    let base = base_url.as_str().trim().trim_end_matches('/');
    let path = path.trim();

    format!("{}/{}", base, path.trim_start_matches('/'))
}

fn map_request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_decode() {
        AppError::Parse(format!("Failed to decode response: {err}"))
    } else if err.is_builder() {
        AppError::Parse(format!("Failed to build request: {err}"))
    } else {
        AppError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")));
    }

    debug!("request failed with status {}", status);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AppError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::Http {
        status: status.as_u16(),
        message: sanitize_body(&body),
    })
}

/// Trims and truncates error bodies before they reach the user.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
