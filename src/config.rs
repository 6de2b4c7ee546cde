//! Provider configuration.
//!
//! Every attribute may be omitted from the configuration block and taken from
//! the environment instead:
//!
//! | attribute          | environment variable    | default                        |
//! |--------------------|-------------------------|--------------------------------|
//! | `token`            | `HCLOUD_TOKEN`          | required, 64 characters        |
//! | `endpoint`         | `HCLOUD_ENDPOINT`       | `https://api.hetzner.cloud/v1` |
//! | `endpoint_hetzner` | `HETZNER_ENDPOINT`      | `https://api.hetzner.com/v1`   |
//! | `poll_interval`    | `HCLOUD_POLL_INTERVAL`  | `500ms`                        |
//! | `poll_function`    | `HCLOUD_POLL_FUNCTION`  | `exponential`                  |
//! | `max_retries`      |                         | `5`                            |

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::hcloud::{
    Client, HttpTransport, PollFunction, PollOptions, RetryOptions, DEFAULT_CLOUD_ENDPOINT,
    DEFAULT_HETZNER_ENDPOINT,
};
use crate::schema::{Attribute, Diagnostic, Schema};

/// Required length of an API token.
pub const TOKEN_LENGTH: usize = 64;

const ENV_TOKEN: &str = "HCLOUD_TOKEN";
const ENV_ENDPOINT: &str = "HCLOUD_ENDPOINT";
const ENV_ENDPOINT_HETZNER: &str = "HETZNER_ENDPOINT";
const ENV_POLL_INTERVAL: &str = "HCLOUD_POLL_INTERVAL";
const ENV_POLL_FUNCTION: &str = "HCLOUD_POLL_FUNCTION";

/// Provider configuration as written by the user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API token.
    pub token: Option<String>,
    /// Hetzner Cloud API endpoint.
    pub endpoint: Option<String>,
    /// Hetzner API endpoint, used for Storage Boxes.
    pub endpoint_hetzner: Option<String>,
    /// Delay between action polls, e.g. `500ms` or `2s`.
    pub poll_interval: Option<String>,
    /// `constant` or `exponential`.
    pub poll_function: Option<String>,
    /// How often a `locked` request is retried.
    pub max_retries: Option<u32>,
}

/// Configuration after environment fallbacks, defaults and validation.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// API token. ⚠️ never log this value
    pub token: String,
    /// Hetzner Cloud API endpoint.
    pub endpoint: String,
    /// Hetzner API endpoint.
    pub endpoint_hetzner: String,
    /// Action polling.
    pub poll: PollOptions,
    /// `locked` retries.
    pub max_retries: u32,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("token", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .field("endpoint_hetzner", &self.endpoint_hetzner)
            .field("poll", &self.poll)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Schema of the provider configuration block.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Hetzner Cloud provider configuration.")
        .with_attribute(
            "token",
            Attribute::optional_string()
                .sensitive()
                .with_description("API token. Falls back to HCLOUD_TOKEN."),
        )
        .with_attribute(
            "endpoint",
            Attribute::optional_string().with_description("Hetzner Cloud API endpoint."),
        )
        .with_attribute(
            "endpoint_hetzner",
            Attribute::optional_string().with_description("Hetzner API endpoint."),
        )
        .with_attribute(
            "poll_interval",
            Attribute::optional_string().with_description("Interval between action polls."),
        )
        .with_attribute(
            "poll_function",
            Attribute::optional_string()
                .with_description("Polling backoff: constant or exponential."),
        )
        .with_attribute(
            "max_retries",
            Attribute::optional_int64().with_description("Retries for locked resources."),
        )
}

impl ProviderConfig {
    /// Decode the configuration block. A null block is an empty configuration.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig, Vec<Diagnostic>> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve using `env` to look up fallbacks. Reports every problem at once.
    pub fn resolve_with<F>(&self, env: F) -> Result<ResolvedConfig, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: &Option<String>, key: &str| {
            value
                .clone()
                .or_else(|| env(key))
                .filter(|v| !v.is_empty())
        };
        let mut diagnostics = Vec::new();

        let token = pick(&self.token, ENV_TOKEN).unwrap_or_default();
        if token.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing API token")
                    .with_detail(format!(
                        "Set the token attribute or the {} environment variable.",
                        ENV_TOKEN
                    ))
                    .with_attribute("token"),
            );
        } else if token.len() != TOKEN_LENGTH {
            diagnostics.push(
                Diagnostic::error("Invalid API token")
                    .with_detail(format!("The token must be {} characters long.", TOKEN_LENGTH))
                    .with_attribute("token"),
            );
        }

        let mut poll = PollOptions::default();
        if let Some(raw) = pick(&self.poll_interval, ENV_POLL_INTERVAL) {
            match parse_duration(&raw) {
                Some(interval) => poll.interval = interval,
                None => diagnostics.push(
                    Diagnostic::error("Invalid poll interval")
                        .with_detail(format!(
                            "'{}' is not a positive duration such as 500ms, 2s or 1m.",
                            raw
                        ))
                        .with_attribute("poll_interval"),
                ),
            }
        }
        if let Some(raw) = pick(&self.poll_function, ENV_POLL_FUNCTION) {
            match raw.as_str() {
                "constant" => poll.function = PollFunction::Constant,
                "exponential" => poll.function = PollFunction::Exponential,
                other => diagnostics.push(
                    Diagnostic::error("Invalid poll function")
                        .with_detail(format!(
                            "'{}' is not one of: constant, exponential.",
                            other
                        ))
                        .with_attribute("poll_function"),
                ),
            }
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Ok(ResolvedConfig {
            token,
            endpoint: pick(&self.endpoint, ENV_ENDPOINT)
                .unwrap_or_else(|| DEFAULT_CLOUD_ENDPOINT.to_string()),
            endpoint_hetzner: pick(&self.endpoint_hetzner, ENV_ENDPOINT_HETZNER)
                .unwrap_or_else(|| DEFAULT_HETZNER_ENDPOINT.to_string()),
            poll,
            max_retries: self
                .max_retries
                .unwrap_or_else(|| RetryOptions::default().max_retries),
        })
    }
}

impl ResolvedConfig {
    /// Build an HTTP-backed API client.
    pub fn build_client(&self) -> Result<Client, ProviderError> {
        let transport = HttpTransport::new(
            self.token.clone(),
            self.endpoint.clone(),
            self.endpoint_hetzner.clone(),
        )
        .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Client::new(Arc::new(transport))
            .with_poll_options(self.poll)
            .with_retry_options(RetryOptions {
                max_retries: self.max_retries,
                ..RetryOptions::default()
            }))
    }
}

/// Parse `<n>ms`, `<n>s` or `<n>m`. Zero is rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => return None,
    };
    let n: u64 = number.parse().ok().filter(|n| *n > 0)?;
    match unit {
        "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => n.checked_mul(60).map(Duration::from_secs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn token() -> String {
        "t".repeat(TOKEN_LENGTH)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig {
            token: Some(token()),
            ..Default::default()
        };
        let resolved = config.resolve_with(no_env).unwrap();
        assert_eq!(resolved.endpoint, DEFAULT_CLOUD_ENDPOINT);
        assert_eq!(resolved.endpoint_hetzner, DEFAULT_HETZNER_ENDPOINT);
        assert_eq!(resolved.poll, PollOptions::default());
        assert_eq!(resolved.max_retries, 5);
    }

    #[test]
    fn test_environment_fallbacks() {
        let env: HashMap<&str, String> = HashMap::from([
            ("HCLOUD_TOKEN", token()),
            ("HCLOUD_ENDPOINT", "http://localhost:4000/v1".to_string()),
            ("HCLOUD_POLL_INTERVAL", "2s".to_string()),
            ("HCLOUD_POLL_FUNCTION", "constant".to_string()),
        ]);
        let config = ProviderConfig::from_value(&json!({"max_retries": 1})).unwrap();
        let resolved = config.resolve_with(|k| env.get(k).cloned()).unwrap();

        assert_eq!(resolved.token, token());
        assert_eq!(resolved.endpoint, "http://localhost:4000/v1");
        assert_eq!(resolved.poll.interval, Duration::from_secs(2));
        assert_eq!(resolved.poll.function, PollFunction::Constant);
        assert_eq!(resolved.max_retries, 1);
    }

    #[test]
    fn test_explicit_value_beats_environment() {
        let config = ProviderConfig {
            token: Some(token()),
            endpoint: Some("https://example.test/v1".to_string()),
            ..Default::default()
        };
        let resolved = config
            .resolve_with(|_| Some("https://env.test/v1".to_string()))
            .map_err(|d| d.len());
        // The env lookup also supplies a bogus poll interval, which must fail.
        assert_eq!(resolved.unwrap_err(), 2);

        let resolved = config
            .resolve_with(|k| (k == ENV_ENDPOINT).then(|| "https://env.test/v1".to_string()))
            .unwrap();
        assert_eq!(resolved.endpoint, "https://example.test/v1");
    }

    #[test]
    fn test_token_validation() {
        let diags = ProviderConfig::default().resolve_with(no_env).unwrap_err();
        assert_eq!(diags[0].summary, "Missing API token");

        let config = ProviderConfig {
            token: Some("short".to_string()),
            ..Default::default()
        };
        let diags = config.resolve_with(no_env).unwrap_err();
        assert_eq!(diags[0].summary, "Invalid API token");
        assert_eq!(diags[0].attribute.as_deref(), Some("token"));
    }

    #[test]
    fn test_invalid_poll_settings() {
        let config = ProviderConfig {
            token: Some(token()),
            poll_interval: Some("soon".to_string()),
            poll_function: Some("linear".to_string()),
            ..Default::default()
        };
        let diags = config.resolve_with(no_env).unwrap_err();
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let config = ProviderConfig {
            token: Some(token()),
            poll_interval: Some("0s".to_string()),
            ..Default::default()
        };
        let diags = config.resolve_with(no_env).unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("poll_interval"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("3s"), Some(Duration::from_secs(3)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("ms"), None);
        assert_eq!(parse_duration("5h"), None);
        assert_eq!(parse_duration("0ms"), None);
        assert_eq!(parse_duration("0s"), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig {
            token: Some(token()),
            ..Default::default()
        };
        let resolved = config.resolve_with(no_env).unwrap();
        assert!(!format!("{:?}", resolved).contains(&token()));
    }
}
