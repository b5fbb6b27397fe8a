//! Proxy configuration, read from the environment at startup.

use std::time::Duration;

use crate::error::AppError;

/// Upstream story service used when `UPSTREAM_URL` is unset.
pub const DEFAULT_UPSTREAM_URL: &str = "http://infinite-sandbox.onrender.com";

/// Runtime configuration for the proxy server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL of the upstream story service.
    pub upstream_url: String,
    /// Timeout for a single upstream request.
    pub upstream_timeout: Duration,
    /// OTLP collector endpoint; span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
}

impl ProxyConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let upstream_url = lookup("UPSTREAM_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let timeout_secs: u64 = lookup("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .map_err(|e| {
                AppError::Config(format!("UPSTREAM_TIMEOUT_SECS must be a whole number: {e}"))
            })?;
        let otlp_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|url| !url.is_empty());

        Ok(Self {
            host,
            port,
            upstream_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
            otlp_endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ProxyConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ProxyConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream_timeout, Duration::from_secs(60));
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("UPSTREAM_URL", "http://localhost:5000"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
        ])
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_url, "http://localhost:5000");
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(
            config.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let result = config_from(&[("PORT", "http")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_timeout_is_a_config_error() {
        let result = config_from(&[("UPSTREAM_TIMEOUT_SECS", "-1")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
