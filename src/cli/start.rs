use crate::cli::{
    actions::Action,
    commands, dispatch,
    telemetry::{self, Telemetry},
};
use anyhow::Result;

/// Parse arguments, resolve the action, then install logging for it.
///
/// Argument errors are reported before any subscriber exists, so they go
/// straight to the terminal through clap or `anyhow`.
///
/// # Errors
///
/// Returns an error if the arguments do not form a usable configuration or
/// the subscriber cannot be installed.
pub fn start() -> Result<(Action, Telemetry)> {
    let matches = commands::new().get_matches();
    let action = dispatch::handler(&matches)?;
    let telemetry = telemetry::init(commands::logging::level(&matches), action.config())?;
    Ok((action, telemetry))
}
