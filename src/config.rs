//! Application configuration loaded from environment variables.
//!
//! The provider endpoint and keys are read once at startup; a missing
//! required value is a startup-fatal error, never a runtime one.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted identity/storage provider
    pub provider_url: String,
    /// Public API key sent with every provider call
    pub provider_anon_key: String,
    /// Secret the provider signs access tokens with (raw bytes).
    /// Used to verify session tokens locally in the gateway.
    pub provider_jwt_secret: Vec<u8>,
    /// Frontend URL for CORS and cookie security attributes
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            provider_url: env::var("PROVIDER_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("PROVIDER_URL"))?,
            provider_anon_key: env::var("PROVIDER_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("PROVIDER_ANON_KEY"))?,
            provider_jwt_secret: env::var("PROVIDER_JWT_SECRET")
                .map_err(|_| ConfigError::Missing("PROVIDER_JWT_SECRET"))?
                .into_bytes(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Whether session cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            provider_url: "http://localhost:54321".to_string(),
            provider_anon_key: "test_anon_key".to_string(),
            provider_jwt_secret: b"test_jwt_secret_32_bytes_minimum".to_vec(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
