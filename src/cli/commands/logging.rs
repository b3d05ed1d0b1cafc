//! Verbosity flag shared by every subcommand.

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Names accepted by `LINGO_LOG_LEVEL`, indexed by the equivalent `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_level(value: &str) -> Result<u8, String> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u8>() {
        return if count <= 5 {
            Ok(count)
        } else {
            Err(format!("log level {count} is out of range 0-5"))
        };
    }

    LEVEL_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "invalid log level '{value}', expected one of: {}",
                LEVEL_NAMES.join(", ")
            )
        })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Repeat for more output, or set LINGO_LOG_LEVEL (default: errors only)")
            .env("LINGO_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(parse_level),
    )
}

/// Level requested on the command line; `None` keeps the errors-only default.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    match matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0) {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_accepts_names_and_counts() {
        assert_eq!(parse_level("error"), Ok(0));
        assert_eq!(parse_level(" DEBUG "), Ok(3));
        assert_eq!(parse_level("4"), Ok(4));
        assert_eq!(parse_level("5"), Ok(5));
        assert!(parse_level("6").is_err());
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn level_follows_repeated_flag() {
        let expected = [
            None,
            Some(Level::WARN),
            Some(Level::INFO),
            Some(Level::DEBUG),
            Some(Level::TRACE),
            Some(Level::TRACE),
        ];
        for (count, want) in expected.iter().enumerate() {
            temp_env::with_vars([("LINGO_LOG_LEVEL", None::<&str>)], || {
                let mut args = vec!["lingo".to_string(), "logout".to_string()];
                if count > 0 {
                    args.push(format!("-{}", "v".repeat(count)));
                }
                let matches = with_args(Command::new("lingo").subcommand(Command::new("logout")))
                    .get_matches_from(args);
                assert_eq!(level(&matches), *want);
            });
        }
    }
}
