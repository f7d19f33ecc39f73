// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Collaborator credentials (mail API, image storage, OAuth apps) are optional:
//! when absent the corresponding feature degrades instead of refusing to start.

use std::env;

/// Which backend holds accounts, OTPs and referrals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// OAuth application credentials for one social provider.
#[derive(Debug, Clone)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Transactional mail API settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub reply_to: String,
}

/// Image storage (Cloudinary) settings, injected into the profile service.
#[derive(Debug, Clone)]
pub struct ImageStorageConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Deployment environment ("production" hides error details)
    pub app_env: String,
    /// Frontend URL for redirects, CORS and emailed links
    pub client_url: String,
    /// Public base URL of this API (OAuth callbacks)
    pub api_url: String,
    /// Storage backend selection
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
    pub google: Option<OAuthAppConfig>,
    pub facebook: Option<OAuthAppConfig>,
    pub mail: Option<MailConfig>,
    pub image_storage: Option<ImageStorageConfig>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            app_env: "test".to_string(),
            client_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            google: Some(OAuthAppConfig {
                client_id: "test-google-client".to_string(),
                client_secret: "test-google-secret".to_string(),
            }),
            facebook: None,
            mail: None,
            image_storage: None,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
            .into_bytes();
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(String::into_bytes)
            .unwrap_or_else(|_| jwt_signing_key.clone());

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string()),
            store_backend,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            jwt_signing_key,
            oauth_state_key,
            google: oauth_app("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            facebook: oauth_app("FB_APP_ID", "FB_APP_SECRET"),
            mail: mail_config(),
            image_storage: image_storage_config(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

fn secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn oauth_app(id_var: &str, secret_var: &str) -> Option<OAuthAppConfig> {
    Some(OAuthAppConfig {
        client_id: secret(id_var)?,
        client_secret: secret(secret_var)?,
    })
}

fn mail_config() -> Option<MailConfig> {
    let from = env::var("MAIL_FROM").unwrap_or_else(|_| "\"BeeBark\" <info@thebeebark.com>".to_string());
    Some(MailConfig {
        api_url: secret("MAIL_API_URL")?,
        api_key: secret("MAIL_API_KEY")?,
        reply_to: env::var("MAIL_REPLY_TO").unwrap_or_else(|_| "info@thebeebark.com".to_string()),
        from,
    })
}

fn image_storage_config() -> Option<ImageStorageConfig> {
    Some(ImageStorageConfig {
        cloud_name: secret("CLOUDINARY_CLOUD_NAME")?,
        api_key: secret("CLOUDINARY_API_KEY")?,
        api_secret: secret("CLOUDINARY_API_SECRET")?,
        folder: env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "users".to_string()),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
