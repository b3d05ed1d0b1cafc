//! Client configuration for the backend endpoint, local storage location, and
//! response language. Values come from CLI flags or their `LINGO_*` environment
//! fallbacks; nothing here is secret.

use crate::errors::AppError;
use std::{env::var, fmt, path::PathBuf, str::FromStr, time::Duration};
use url::Url;

/// Directory name used under the platform data directory.
const DATA_DIR_NAME: &str = "lingo";

/// Languages the backend answers in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    EnUs,
    ZhCn,
}

impl Locale {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhCn => "zh-CN",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" => Ok(Self::EnUs),
            "zh" | "zh-cn" => Ok(Self::ZhCn),
            other => Err(AppError::Config(format!(
                "unsupported locale '{other}', expected en-US or zh-CN"
            ))),
        }
    }
}

/// Resolved client configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub data_dir: PathBuf,
    pub locale: Locale,
    /// `None` leaves requests to the transport's own failure path.
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    /// # Errors
    /// Returns `AppError::Config` if the base URL is not an absolute http(s) URL.
    pub fn new(
        api_base_url: &str,
        data_dir: PathBuf,
        locale: Locale,
        request_timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            data_dir,
            locale,
            request_timeout,
        })
    }

    /// Path of the durable key-value file holding the credential.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}

/// Parses and normalizes the API base URL.
///
/// # Errors
/// Returns `AppError::Config` for malformed URLs, missing hosts, or schemes other than http(s).
pub fn parse_base_url(value: &str) -> Result<Url, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("API base URL is not configured.".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|err| AppError::Config(format!("invalid API base URL '{trimmed}': {err}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::Config(format!(
                "unsupported API URL scheme '{scheme}'"
            )));
        }
    }

    if url.host().is_none() {
        return Err(AppError::Config(format!(
            "API base URL '{trimmed}' has no host"
        )));
    }

    Ok(url)
}

/// Default data directory: `$XDG_DATA_HOME/lingo`, else `$HOME/.local/share/lingo`.
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(dir) = var("XDG_DATA_HOME").ok().and_then(|v| normalize_value(&v)) {
        return Some(PathBuf::from(dir).join(DATA_DIR_NAME));
    }

    var("HOME")
        .ok()
        .and_then(|v| normalize_value(&v))
        .map(|home| PathBuf::from(home).join(".local/share").join(DATA_DIR_NAME))
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn locale_parses_common_spellings() {
        assert_eq!("en-US".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("zh_CN".parse::<Locale>().unwrap(), Locale::ZhCn);
        assert_eq!(" zh ".parse::<Locale>().unwrap(), Locale::ZhCn);
        assert!("fr-FR".parse::<Locale>().is_err());
    }

    #[test]
    fn base_url_requires_http_scheme_and_host() {
        assert!(parse_base_url("https://api.lingo.dev").is_ok());
        assert!(parse_base_url("  http://localhost:3000/ ").is_ok());
        assert!(matches!(
            parse_base_url("ftp://lingo.dev"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(parse_base_url(""), Err(AppError::Config(_))));
        assert!(matches!(
            parse_base_url("not a url"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn storage_path_is_inside_data_dir() {
        let config = AppConfig::new(
            "http://localhost:3000",
            PathBuf::from("/tmp/lingo"),
            Locale::EnUs,
            None,
        )
        .unwrap();
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/lingo/storage.json"));
    }

    #[test]
    fn default_data_dir_prefers_xdg() {
        temp_env::with_vars(
            [
                ("XDG_DATA_HOME", Some("/xdg/data")),
                ("HOME", Some("/home/learner")),
            ],
            || {
                assert_eq!(default_data_dir(), Some(PathBuf::from("/xdg/data/lingo")));
            },
        );
    }

    #[test]
    fn default_data_dir_falls_back_to_home() {
        temp_env::with_vars(
            [
                ("XDG_DATA_HOME", None::<&str>),
                ("HOME", Some("/home/learner")),
            ],
            || {
                assert_eq!(
                    default_data_dir(),
                    Some(PathBuf::from("/home/learner/.local/share/lingo"))
                );
            },
        );
    }

    #[test]
    fn default_data_dir_ignores_blank_values() {
        temp_env::with_vars(
            [("XDG_DATA_HOME", Some("  ")), ("HOME", None::<&str>)],
            || {
                assert_eq!(default_data_dir(), None);
            },
        );
    }
}
