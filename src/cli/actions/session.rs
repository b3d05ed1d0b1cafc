use crate::{
    api::ApiClient,
    auth::{
        client::AuthClient,
        state::{Session, SessionManager},
        storage::{CredentialStore, FileStorage},
        types::{LoginRequest, RegisterRequest},
    },
    config::AppConfig,
};
use anyhow::{Context, Result};
use tracing::debug;

pub type Manager = SessionManager<FileStorage, AuthClient>;

/// Builds the session manager over the durable credential file, plus a
/// client for the login and registration endpoints.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn open(config: &AppConfig) -> Result<(Manager, AuthClient)> {
    let api = ApiClient::new(config).context("failed to build API client")?;
    let client = AuthClient::new(api);
    let storage = FileStorage::new(config.storage_path());
    debug!("credential file: {}", storage.path().display());

    let manager = SessionManager::new(CredentialStore::new(storage), client.clone());
    Ok((manager, client))
}

#[must_use]
pub fn describe(session: &Session) -> String {
    match (&session.user, &session.token) {
        (Some(user), Some(_)) => {
            let name = user.name.as_deref().unwrap_or(&user.email);
            format!("signed in as {name} <{}> ({})", user.email, user.role)
        }
        (None, Some(_)) => "signed in, profile not loaded".to_string(),
        _ => "not signed in".to_string(),
    }
}

/// # Errors
/// Returns an error if the client cannot be built. Rejected credentials are
/// not an error; they end in the signed-out state.
pub async fn status(config: &AppConfig) -> Result<()> {
    let (manager, _) = open(config)?;
    manager.init_auth().await;
    println!("{}", describe(&manager.snapshot()));
    Ok(())
}

/// # Errors
/// Returns an error if the credentials are rejected or the server is unreachable.
pub async fn login(config: &AppConfig, request: &LoginRequest) -> Result<()> {
    let (manager, client) = open(config)?;
    let response = client.login(request).await.context("login failed")?;
    manager.set_auth(response.user, response.token);
    println!("{}", describe(&manager.snapshot()));
    Ok(())
}

/// # Errors
/// Returns an error if the account cannot be created.
pub async fn register(config: &AppConfig, request: &RegisterRequest) -> Result<()> {
    let (manager, client) = open(config)?;
    let response = client
        .register(request)
        .await
        .context("registration failed")?;
    manager.set_auth(response.user, response.token);
    println!("{}", describe(&manager.snapshot()));
    Ok(())
}

/// # Errors
/// Returns an error if the client cannot be built.
pub fn logout(config: &AppConfig) -> Result<()> {
    let (manager, _) = open(config)?;
    manager.logout();
    println!("{}", describe(&manager.snapshot()));
    Ok(())
}
