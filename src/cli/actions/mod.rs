pub mod session;
pub mod visit;

// Internal "interpreter" for `Action`, kept apart so this file stays a list of variants.
mod run;

use crate::{
    auth::types::{LoginRequest, RegisterRequest},
    config::AppConfig,
};

#[derive(Debug)]
pub enum Action {
    Status(AppConfig),
    Login {
        config: AppConfig,
        request: LoginRequest,
    },
    Register {
        config: AppConfig,
        request: RegisterRequest,
    },
    Logout(AppConfig),
    Visit(visit::Args),
}

impl Action {
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        match self {
            Self::Status(config)
            | Self::Logout(config)
            | Self::Login { config, .. }
            | Self::Register { config, .. } => config,
            Self::Visit(args) => &args.config,
        }
    }

    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
