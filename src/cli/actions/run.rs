use crate::cli::actions::{Action, session, visit};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Status(config) => session::status(&config).await,
        Action::Login { config, request } => session::login(&config, &request).await,
        Action::Register { config, request } => session::register(&config, &request).await,
        Action::Logout(config) => session::logout(&config),
        Action::Visit(args) => visit::execute(args).await,
    }
}
