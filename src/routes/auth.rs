// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential and social authentication routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::models::{AccountView, SocialProvider};
use crate::services::{OtpPurpose, RegisterRequest};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a social sign-in `state` stays acceptable.
const OAUTH_STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/verify-forgot-otp", post(verify_forgot_otp))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/{provider}", get(social_start))
        .route("/api/auth/{provider}/callback", get(social_callback))
}

/// Plain acknowledgement body.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: AccountView,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let outcome = state.accounts.register(req).await?;
    if !outcome.is_clean() {
        tracing::warn!(
            account_id = %outcome.value.id,
            failures = outcome.failures.len(),
            "Registration completed with secondary failures"
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully, OTP sent to email.".to_string(),
            user: outcome.into_value(),
        }),
    ))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    email: String,
    password: String,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let response = state
        .accounts
        .login(&req.email, &req.password)
        .await
        .map_err(AppError::not_found_as_bad_request)?;

    let cookie = session_cookie(response.token.clone(), state.config.is_production());
    Ok((jar.add(cookie), Json(response)))
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    let removal = Cookie::build(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.remove(removal), StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct OtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    email: String,
    new_password: String,
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let _ = state
        .verification
        .start_password_reset(&req.email)
        .await
        .map_err(AppError::not_found_as_bad_request)?;
    Ok(MessageResponse::new("OTP sent to email"))
}

async fn verify_forgot_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<MessageResponse>> {
    let _ = state
        .verification
        .verify(&req.email, &req.otp, OtpPurpose::PasswordReset)
        .await?;
    Ok(MessageResponse::new(
        "OTP verified. You can now reset your password.",
    ))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .verification
        .reset_password(&req.email, &req.new_password)
        .await?;
    Ok(MessageResponse::new("Password updated successfully"))
}

// ─── Social Sign-in ──────────────────────────────────────────────

fn parse_provider(raw: &str) -> Result<SocialProvider> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Unknown provider: {raw}")))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn sign(payload: &str, secret: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signed state: base64 of "provider|timestamp_ms_hex|signature_hex".
fn encode_state(provider: SocialProvider, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", provider, timestamp_ms);
    let signature = sign(&payload, secret)?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Check the signature and age of `state` and return the provider it was issued for.
fn verify_and_decode_state(state: &str, secret: &[u8], now_ms: u128) -> Option<SocialProvider> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [provider, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let expected = sign(&format!("{}|{}", provider, timestamp_hex), secret).ok()?;
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::warn!("OAuth state signature mismatch");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > OAUTH_STATE_MAX_AGE_MS {
        tracing::info!("OAuth state expired");
        return None;
    }

    provider.parse().ok()
}

/// Start social sign-in: redirect to the provider consent screen.
async fn social_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let provider = parse_provider(&provider)?;
    let oauth_state = encode_state(provider, now_millis()?, &state.config.oauth_state_key)?;
    let url = state.social.authorize_url(provider, &oauth_state)?;

    tracing::info!(%provider, "Starting social sign-in");
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Provider callback: resolve the account and hand a session token to the client.
async fn social_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let provider = parse_provider(&provider)?;
    let client_url = state.config.client_url.trim_end_matches('/');

    match complete_social_login(&state, provider, params).await {
        Ok(token) => Ok(Redirect::temporary(&format!(
            "{}/oauth/success?token={}",
            client_url, token
        ))),
        Err(e) => {
            tracing::warn!(%provider, error = %e, "Social sign-in failed");
            Ok(Redirect::temporary(&format!(
                "{}/login?social={}-fail",
                client_url, provider
            )))
        }
    }
}

async fn complete_social_login(
    state: &AppState,
    provider: SocialProvider,
    params: CallbackParams,
) -> Result<String> {
    if let Some(error) = params.error {
        return Err(AppError::Validation(format!("Provider returned error: {error}")));
    }

    let issued_for = params
        .state
        .as_deref()
        .and_then(|s| verify_and_decode_state(s, &state.config.oauth_state_key, now_millis().ok()?));
    if issued_for != Some(provider) {
        return Err(AppError::Validation("Invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let profile = state.social.complete(provider, &code).await?;
    let account = state.identity.resolve(profile).await?;

    tracing::info!(account_id = %account.id, %provider, "Social sign-in succeeded");
    state.accounts.session_token(&account.id)
}
