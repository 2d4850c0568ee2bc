//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Secrets are optional
//! at load time; the binary decides which ones are hard requirements.

use std::env;

use crate::psi::DEFAULT_PSI_ENDPOINT;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Turso database URL
    pub turso_url: Option<String>,

    /// Turso authentication token
    pub turso_auth_token: Option<String>,

    /// Shared secret for webhook HMAC signature verification
    pub webhook_secret: Option<String>,

    /// PageSpeed Insights API key
    pub psi_api_key: Option<String>,

    /// Shared access key compared against the `key` query parameter
    pub secure_key: Option<String>,

    /// PageSpeed Insights endpoint base URL (overridable for tests/staging)
    pub psi_api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            turso_url: env::var("TURSO_URL").ok(),

            turso_auth_token: env::var("TURSO_AUTH_TOKEN").ok(),

            webhook_secret: env::var("WEBHOOK_SECRET").ok(),

            psi_api_key: env::var("PSI_API_KEY").ok(),

            secure_key: env::var("SECURE_KEY").ok(),

            psi_api_base: env::var("PSI_API_URL")
                .unwrap_or_else(|_| DEFAULT_PSI_ENDPOINT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults_and_overrides() {
        env::set_var("PORT", "9090");
        env::set_var("TURSO_URL", "libsql://audits.turso.io");
        env::set_var("WEBHOOK_SECRET", "hook-secret");
        env::remove_var("TURSO_AUTH_TOKEN");
        env::remove_var("PSI_API_KEY");
        env::remove_var("SECURE_KEY");
        env::remove_var("PSI_API_URL");

        let config = Config::from_env();
        assert_eq!(config.port, 9090);
        assert_eq!(config.turso_url.as_deref(), Some("libsql://audits.turso.io"));
        assert_eq!(config.webhook_secret.as_deref(), Some("hook-secret"));
        assert_eq!(config.turso_auth_token, None);
        assert_eq!(config.psi_api_key, None);
        assert_eq!(config.secure_key, None);
        assert_eq!(config.psi_api_base, DEFAULT_PSI_ENDPOINT);

        env::remove_var("PORT");
        env::remove_var("TURSO_URL");
        env::remove_var("WEBHOOK_SECRET");
    }
}
