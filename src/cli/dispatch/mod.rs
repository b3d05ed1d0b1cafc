use crate::{
    auth::{
        guards::{Location, RouteGuard},
        types::{LoginRequest, RegisterRequest},
    },
    cli::{
        actions::{Action, visit},
        commands::{ARG_ADMIN, ARG_EMAIL, ARG_NAME, ARG_PASSWORD, ARG_PATH, client},
    },
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn login_request(matches: &ArgMatches) -> Result<LoginRequest> {
    Ok(LoginRequest {
        email: required(matches, ARG_EMAIL)?,
        password: required(matches, ARG_PASSWORD)?,
    })
}

/// Turn parsed arguments into an [`Action`].
///
/// # Errors
/// Returns an error if the client configuration is invalid or required
/// subcommand arguments are missing.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = client::parse(matches)?;

    match matches.subcommand() {
        Some(("status", _)) => Ok(Action::Status(config)),
        Some(("login", sub_m)) => Ok(Action::Login {
            config,
            request: login_request(sub_m)?,
        }),
        Some(("register", sub_m)) => Ok(Action::Register {
            config,
            request: RegisterRequest {
                email: required(sub_m, ARG_EMAIL)?,
                password: required(sub_m, ARG_PASSWORD)?,
                name: sub_m.get_one::<String>(ARG_NAME).cloned(),
            },
        }),
        Some(("logout", _)) => Ok(Action::Logout(config)),
        Some(("visit", sub_m)) => {
            let raw = required(sub_m, ARG_PATH)?;
            let location = Location::parse(&raw).context("invalid route path")?;
            let guard = if sub_m.get_flag(ARG_ADMIN) {
                RouteGuard::Admin
            } else {
                RouteGuard::Private
            };
            let login = if sub_m.contains_id(ARG_PASSWORD) {
                Some(login_request(sub_m)?)
            } else {
                None
            };

            Ok(Action::Visit(visit::Args {
                config,
                location,
                guard,
                login,
            }))
        }
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}
