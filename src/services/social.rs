// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google and Facebook OAuth: consent URLs, code exchange and profile fetch.

use crate::config::{Config, OAuthAppConfig};
use crate::error::{AppError, Result};
use crate::models::social::{FacebookUser, GoogleUserInfo};
use crate::models::{ProviderProfile, SocialProfile, SocialProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const FACEBOOK_AUTH_URL: &str = "https://www.facebook.com/v19.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v19.0/oauth/access_token";
const FACEBOOK_ME_URL: &str = "https://graph.facebook.com/me";

const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Turns an authorization code into the provider's user payload.
#[async_trait]
pub trait SocialProfileSource: Send + Sync {
    async fn fetch_profile(
        &self,
        provider: SocialProvider,
        app: &OAuthAppConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderProfile>;
}

/// Provider HTTP client.
pub struct OAuthHttpClient {
    http: reqwest::Client,
}

impl OAuthHttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    async fn google(
        &self,
        app: &OAuthAppConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleUserInfo> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(provider_error)?;
        let token: TokenResponse = check_response_json(response, SocialProvider::Google).await?;

        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(provider_error)?;
        check_response_json(response, SocialProvider::Google).await
    }

    async fn facebook(
        &self,
        app: &OAuthAppConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<FacebookUser> {
        let response = self
            .http
            .get(FACEBOOK_TOKEN_URL)
            .query(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(provider_error)?;
        let token: TokenResponse = check_response_json(response, SocialProvider::Facebook).await?;

        let response = self
            .http
            .get(FACEBOOK_ME_URL)
            .query(&[
                ("fields", "id,name,email,first_name,last_name"),
                ("access_token", token.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(provider_error)?;
        check_response_json(response, SocialProvider::Facebook).await
    }
}

#[async_trait]
impl SocialProfileSource for OAuthHttpClient {
    async fn fetch_profile(
        &self,
        provider: SocialProvider,
        app: &OAuthAppConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderProfile> {
        match provider {
            SocialProvider::Google => self
                .google(app, code, redirect_uri)
                .await
                .map(ProviderProfile::Google),
            SocialProvider::Facebook => self
                .facebook(app, code, redirect_uri)
                .await
                .map(ProviderProfile::Facebook),
        }
    }
}

fn provider_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() || e.is_connect() {
        AppError::Transient(format!("OAuth provider request failed: {}", e))
    } else {
        AppError::Internal(anyhow::anyhow!("OAuth provider request failed: {}", e))
    }
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    provider: SocialProvider,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%provider, %status, body = %body, "OAuth provider rejected request");
        if status.is_server_error() {
            return Err(AppError::Transient(format!("{provider} returned {status}")));
        }
        return Err(AppError::Unauthorized);
    }
    response
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid {provider} response: {}", e)))
}

/// Social sign-in front end: builds consent URLs and resolves callbacks to
/// a canonical [`SocialProfile`].
pub struct SocialAuthService {
    google: Option<OAuthAppConfig>,
    facebook: Option<OAuthAppConfig>,
    api_url: String,
    source: Arc<dyn SocialProfileSource>,
}

impl SocialAuthService {
    pub fn new(config: &Config, source: Arc<dyn SocialProfileSource>) -> Self {
        Self {
            google: config.google.clone(),
            facebook: config.facebook.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            source,
        }
    }

    fn app(&self, provider: SocialProvider) -> Result<&OAuthAppConfig> {
        let app = match provider {
            SocialProvider::Google => self.google.as_ref(),
            SocialProvider::Facebook => self.facebook.as_ref(),
        };
        app.ok_or_else(|| AppError::Validation(format!("{provider} sign-in is not configured")))
    }

    pub fn redirect_uri(&self, provider: SocialProvider) -> String {
        format!("{}/api/auth/{}/callback", self.api_url, provider)
    }

    /// Provider consent-screen URL carrying `state`.
    pub fn authorize_url(&self, provider: SocialProvider, state: &str) -> Result<String> {
        let app = self.app(provider)?;
        let (base, scope) = match provider {
            SocialProvider::Google => (GOOGLE_AUTH_URL, "openid email profile"),
            SocialProvider::Facebook => (FACEBOOK_AUTH_URL, "email,public_profile"),
        };
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            base,
            urlencoding::encode(&app.client_id),
            urlencoding::encode(&self.redirect_uri(provider)),
            urlencoding::encode(scope),
            urlencoding::encode(state)
        ))
    }

    /// Exchange an authorization code and normalize the provider payload.
    pub async fn complete(&self, provider: SocialProvider, code: &str) -> Result<SocialProfile> {
        let app = self.app(provider)?;
        let payload = self
            .source
            .fetch_profile(provider, app, code, &self.redirect_uri(provider))
            .await?;
        Ok(payload.into())
    }
}
