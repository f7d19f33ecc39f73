// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email verification OTP routes.

use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

use crate::error::Result;
use crate::routes::auth::{EmailRequest, MessageResponse, OtpRequest};
use crate::services::OtpPurpose;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/otp/send-otp", post(send_otp))
        .route("/api/otp/verify-otp", post(verify_otp))
        .route("/api/otp/resend-otp", post(resend_otp))
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let _ = state
        .verification
        .issue(&req.email, OtpPurpose::EmailVerification)
        .await?;
    Ok(MessageResponse::new("OTP sent"))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<MessageResponse>> {
    let _ = state
        .verification
        .verify(&req.email, &req.otp, OtpPurpose::EmailVerification)
        .await?;
    Ok(MessageResponse::new("OTP verified successfully"))
}

async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let _ = state.verification.resend(&req.email).await?;
    Ok(MessageResponse::new("A new OTP has been sent to your email."))
}
