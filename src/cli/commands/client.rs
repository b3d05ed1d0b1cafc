use crate::config::{AppConfig, Locale, default_data_dir};
use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use std::{path::PathBuf, time::Duration};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_DATA_DIR: &str = "data-dir";
pub const ARG_LOCALE: &str = "locale";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the Lingo API")
                .env("LINGO_API_URL")
                .default_value(DEFAULT_API_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_DATA_DIR)
                .long(ARG_DATA_DIR)
                .help("Directory holding the stored credential")
                .long_help(
                    "Directory holding the stored credential. Defaults to $XDG_DATA_HOME/lingo or ~/.local/share/lingo.",
                )
                .env("LINGO_DATA_DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new(ARG_LOCALE)
                .long(ARG_LOCALE)
                .help("Language for server messages: en-US or zh-CN")
                .env("LINGO_LOCALE")
                .default_value(Locale::EnUs.as_str())
                .global(true),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Per-request timeout in seconds (default: none)")
                .env("LINGO_REQUEST_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
}

/// Builds the client configuration from the global arguments.
///
/// # Errors
/// Returns an error if the API URL or locale is invalid, or no data
/// directory can be determined.
pub fn parse(matches: &ArgMatches) -> Result<AppConfig> {
    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .map_or(DEFAULT_API_URL, String::as_str);

    let locale = matches
        .get_one::<String>(ARG_LOCALE)
        .map(|value| value.parse::<Locale>())
        .transpose()
        .context("invalid --locale")?
        .unwrap_or_default();

    let data_dir = match matches.get_one::<PathBuf>(ARG_DATA_DIR) {
        Some(dir) => dir.clone(),
        None => default_data_dir()
            .ok_or_else(|| anyhow!("cannot determine a data directory, set --{ARG_DATA_DIR}"))?,
    };

    let request_timeout = matches
        .get_one::<u64>(ARG_REQUEST_TIMEOUT)
        .copied()
        .map(Duration::from_secs);

    AppConfig::new(api_url, data_dir, locale, request_timeout).context("invalid --api-url")
}
