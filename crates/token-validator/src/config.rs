//! Token validator configuration.
//!
//! Configuration is loaded from environment variables. The key set is held
//! as a secret (it may contain symmetric keys) and redacted in Debug output.

use axum::http::HeaderValue;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default graceful-shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 0;

/// Cross-origin policy applied in front of every route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// No allow-list configured: any origin, no credentials.
    Permissive,

    /// Explicit origin allow-list: GET only, credentials allowed.
    AllowList(Vec<HeaderValue>),
}

/// Token validator configuration.
#[derive(Clone)]
pub struct Config {
    /// Serialized key-set document (JWKS JSON).
    pub key_set: SecretString,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Cross-origin policy.
    pub cors: CorsPolicy,

    /// Per-request timeout in seconds (default: 30).
    pub request_timeout_seconds: u64,

    /// Drain period after a shutdown signal, in seconds (default: 0).
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("key_set", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("cors", &self.cors)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid CORS configuration: {0}")]
    InvalidCorsOrigin(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let key_set = vars
            .get("JWTKS")
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.as_str()))
            .ok_or_else(|| ConfigError::MissingEnvVar("JWTKS".to_string()))?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let cors = match vars.get("CORS_ORIGINS") {
            Some(origins) if !origins.trim().is_empty() => parse_cors_origins(origins)?,
            _ => CorsPolicy::Permissive,
        };

        let request_timeout_seconds = if let Some(value_str) = vars.get("REQUEST_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRequestTimeout(format!(
                    "REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRequestTimeout(
                    "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_REQUEST_TIMEOUT_SECONDS
        };

        let drain_seconds = if let Some(value_str) = vars.get("DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            key_set,
            bind_address,
            cors,
            request_timeout_seconds,
            drain_seconds,
        })
    }
}

/// Parse a comma-separated origin allow-list.
///
/// Each entry must be a full origin (`scheme://host[:port]`). A wildcard is
/// rejected because the allow-list mode permits credentials.
fn parse_cors_origins(raw: &str) -> Result<CorsPolicy, ConfigError> {
    let mut origins = Vec::new();

    for origin in raw.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if origin == "*" {
            return Err(ConfigError::InvalidCorsOrigin(
                "CORS_ORIGINS must list explicit origins, '*' is not allowed".to_string(),
            ));
        }

        if !origin.contains("://") {
            return Err(ConfigError::InvalidCorsOrigin(format!(
                "CORS_ORIGINS entry '{}' must include a scheme",
                origin
            )));
        }

        let value = HeaderValue::from_str(origin).map_err(|e| {
            ConfigError::InvalidCorsOrigin(format!(
                "CORS_ORIGINS entry '{}' is not a valid header value: {}",
                origin, e
            ))
        })?;
        origins.push(value);
    }

    if origins.is_empty() {
        return Err(ConfigError::InvalidCorsOrigin(
            "CORS_ORIGINS contains no origins".to_string(),
        ));
    }

    Ok(CorsPolicy::AllowList(origins))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    const JWKS: &str = r#"{"keys":[{"kty":"oct","kid":"k1","k":"c2VjcmV0"}]}"#;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([("JWTKS".to_string(), JWKS.to_string())])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let vars = base_vars();

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.key_set.expose_secret(), JWKS);
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.cors, CorsPolicy::Permissive);
        assert_eq!(config.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);
        assert_eq!(config.drain_seconds, DEFAULT_DRAIN_SECONDS);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "CORS_ORIGINS".to_string(),
            "https://app.example.com, http://localhost:3000".to_string(),
        );
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "5".to_string());
        vars.insert("DRAIN_SECONDS".to_string(), "10".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(
            config.cors,
            CorsPolicy::AllowList(vec![
                HeaderValue::from_static("https://app.example.com"),
                HeaderValue::from_static("http://localhost:3000"),
            ])
        );
        assert_eq!(config.request_timeout_seconds, 5);
        assert_eq!(config.drain_seconds, 10);
    }

    #[test]
    fn test_from_vars_missing_key_set() {
        let vars = HashMap::new();

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWTKS"));
    }

    #[test]
    fn test_from_vars_blank_key_set_is_missing() {
        let vars = HashMap::from([("JWTKS".to_string(), "   ".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWTKS"));
    }

    #[test]
    fn test_empty_cors_origins_is_permissive() {
        let mut vars = base_vars();
        vars.insert("CORS_ORIGINS".to_string(), "".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.cors, CorsPolicy::Permissive);
    }

    #[test]
    fn test_cors_origins_rejects_wildcard() {
        let mut vars = base_vars();
        vars.insert("CORS_ORIGINS".to_string(), "*".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCorsOrigin(msg)) if msg.contains("'*' is not allowed"))
        );
    }

    #[test]
    fn test_cors_origins_rejects_missing_scheme() {
        let mut vars = base_vars();
        vars.insert("CORS_ORIGINS".to_string(), "app.example.com".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCorsOrigin(msg)) if msg.contains("must include a scheme"))
        );
    }

    #[test]
    fn test_cors_origins_rejects_control_characters() {
        let mut vars = base_vars();
        vars.insert(
            "CORS_ORIGINS".to_string(),
            "https://app.example.com\u{7f}".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCorsOrigin(msg)) if msg.contains("not a valid header value"))
        );
    }

    #[test]
    fn test_cors_origins_only_separators() {
        let mut vars = base_vars();
        vars.insert("CORS_ORIGINS".to_string(), " , ,".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCorsOrigin(msg)) if msg.contains("no origins"))
        );
    }

    #[test]
    fn test_request_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRequestTimeout(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_request_timeout_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "thirty".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRequestTimeout(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_drain_seconds_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("DRAIN_SECONDS".to_string(), "-1".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDrainSeconds(msg)) if msg.contains("non-negative integer"))
        );
    }

    #[test]
    fn test_debug_redacts_key_set() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");
        let debug_str = format!("{:?}", config);

        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("c2VjcmV0"));
        assert!(debug_str.contains("0.0.0.0:8080"));
    }
}
