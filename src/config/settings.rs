//! Runtime settings and handler selection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telegram::{DEFAULT_API_URL, ParseMode};

/// Notifier settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierSettings {
    /// Bot API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout for a single Bot API request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Parse mode for outgoing messages; `None` sends plain text.
    #[serde(default = "default_parse_mode")]
    pub parse_mode: Option<ParseMode>,

    /// Minimum spacing between outgoing messages in milliseconds.
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,

    /// Maximum run time of an external handler program in seconds.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,

    /// Store passphrase, when it should differ from the bot token.
    #[serde(default, skip_serializing)]
    pub passphrase: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_request_timeout() -> u64 {
    30
}

#[allow(clippy::unnecessary_wraps)]
fn default_parse_mode() -> Option<ParseMode> {
    Some(ParseMode::Html)
}

fn default_send_interval() -> u64 {
    35 // stays under ~30 messages per second
}

fn default_handler_timeout() -> u64 {
    60
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            parse_mode: default_parse_mode(),
            send_interval_ms: default_send_interval(),
            handler_timeout_secs: default_handler_timeout(),
            passphrase: None,
        }
    }
}

impl NotifierSettings {
    /// Creates settings from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `NOTIFIER_PARSE_MODE` names an unknown mode.
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates settings from an arbitrary variable lookup.
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };

        let parse_mode = match lookup("NOTIFIER_PARSE_MODE") {
            Some(mode) => parse_parse_mode(&mode)?,
            None => default_parse_mode(),
        };

        Ok(Self {
            api_url: lookup("NOTIFIER_API_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(default_api_url),
            request_timeout_secs: number(
                "NOTIFIER_REQUEST_TIMEOUT_SECS",
                default_request_timeout(),
            ),
            parse_mode,
            send_interval_ms: number("NOTIFIER_SEND_INTERVAL_MS", default_send_interval()),
            handler_timeout_secs: number(
                "NOTIFIER_HANDLER_TIMEOUT_SECS",
                default_handler_timeout(),
            ),
            passphrase: lookup("NOTIFIER_PASSPHRASE").filter(|s| !s.is_empty()),
        })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    #[must_use]
    pub const fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}

fn parse_parse_mode(value: &str) -> Result<Option<ParseMode>, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "html" => Ok(Some(ParseMode::Html)),
        "markdownv2" => Ok(Some(ParseMode::MarkdownV2)),
        "markdown" => Ok(Some(ParseMode::Markdown)),
        "none" | "plain" | "" => Ok(None),
        _ => Err(ConfigError::InvalidParseMode(value.to_owned())),
    }
}

/// Which subscription handler to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerSpec {
    /// No per-subscriber work; only commands are processed.
    Noop,

    /// External program invoked once per subscriber.
    Program(PathBuf),
}

impl HandlerSpec {
    /// Resolves a handler reference given on the command line.
    ///
    /// Relative program paths are resolved against `cwd`.
    ///
    /// # Errors
    ///
    /// Returns an error for remote (`http://`, `https://`) references.
    pub fn parse(reference: Option<&str>, cwd: &Path) -> Result<Self, ConfigError> {
        let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Self::Noop);
        };

        if reference == "noop" {
            return Ok(Self::Noop);
        }

        let lowered = reference.to_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Err(ConfigError::RemoteHandler(reference.to_owned()));
        }

        Ok(Self::Program(cwd.join(reference)))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown parse mode '{0}' (expected html, markdownv2, markdown or none)")]
    InvalidParseMode(String),

    #[error("Remote handler modules are not supported: {0}")]
    RemoteHandler(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = NotifierSettings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, NotifierSettings::default());
        assert_eq!(settings.api_url, "https://api.telegram.org");
        assert_eq!(settings.parse_mode, Some(ParseMode::Html));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = NotifierSettings::from_lookup(lookup_from(&[
            ("NOTIFIER_API_URL", "http://localhost:8081"),
            ("NOTIFIER_REQUEST_TIMEOUT_SECS", "5"),
            ("NOTIFIER_PARSE_MODE", "None"),
            ("NOTIFIER_SEND_INTERVAL_MS", "not-a-number"),
            ("NOTIFIER_PASSPHRASE", "hunter2"),
        ]))
        .unwrap();

        assert_eq!(settings.api_url, "http://localhost:8081");
        assert_eq!(settings.request_timeout_secs, 5);
        assert_eq!(settings.parse_mode, None);
        assert_eq!(settings.send_interval_ms, 35);
        assert_eq!(settings.passphrase.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_unknown_parse_mode_is_error() {
        let result = NotifierSettings::from_lookup(lookup_from(&[("NOTIFIER_PARSE_MODE", "bbcode")]));
        assert!(matches!(result, Err(ConfigError::InvalidParseMode(_))));
    }

    #[test]
    fn test_passphrase_is_not_serialized() {
        let settings = NotifierSettings {
            passphrase: Some("hunter2".to_owned()),
            ..NotifierSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_handler_spec_parse() {
        let cwd = Path::new("/srv/notifier");

        assert_eq!(HandlerSpec::parse(None, cwd).unwrap(), HandlerSpec::Noop);
        assert_eq!(HandlerSpec::parse(Some("noop"), cwd).unwrap(), HandlerSpec::Noop);
        assert_eq!(
            HandlerSpec::parse(Some("handlers/weather.sh"), cwd).unwrap(),
            HandlerSpec::Program(PathBuf::from("/srv/notifier/handlers/weather.sh"))
        );
        assert_eq!(
            HandlerSpec::parse(Some("/usr/local/bin/notify"), cwd).unwrap(),
            HandlerSpec::Program(PathBuf::from("/usr/local/bin/notify"))
        );
        assert!(matches!(
            HandlerSpec::parse(Some("https://example.com/handler.mjs"), cwd),
            Err(ConfigError::RemoteHandler(_))
        ));
    }
}
