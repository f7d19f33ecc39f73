// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP issuance and validation for email verification and password reset.
//!
//! Both purposes share one ledger keyed by email, so a reset code replaces a
//! pending verification code and vice versa.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::OtpRecord;
use crate::services::effects::{Completed, SideEffect};
use crate::services::mail::{templates, EmailMessage, Mailer};
use crate::services::password;
use crate::time_utils::{format_utc_rfc3339, Clock};
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Why a code is being issued or checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    fn message(self, email: &str, code: &str) -> EmailMessage {
        match self {
            OtpPurpose::EmailVerification => templates::verification_otp(email, code),
            OtpPurpose::PasswordReset => templates::password_reset_otp(email, code),
        }
    }
}

/// Generate a six-digit code in `100000..=999999`.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// Constant-time string comparison.
pub(crate) fn codes_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

pub struct VerificationService {
    db: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl VerificationService {
    pub fn new(db: Arc<dyn Store>, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        Self { db, mailer, clock }
    }

    /// Replace any active code for `email` with a fresh one and mail it.
    ///
    /// The stored record survives a delivery failure; the failure is recorded
    /// on the returned outcome.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<Completed<()>> {
        let email = require_email(email)?;
        let record = OtpRecord::new(email, generate_code(), self.clock.now());
        self.db.put_otp(&record).await?;

        tracing::info!(email, ?purpose, "OTP issued");

        let mut outcome = Completed::new(());
        if let Err(e) = self.mailer.send(&purpose.message(email, &record.code)).await {
            outcome.record(SideEffect::OtpEmail, e);
        }
        Ok(outcome)
    }

    /// Check `code` against the active record and consume it.
    ///
    /// Any mismatch, expiry or lost consume race yields `InvalidOrExpiredOtp`
    /// and leaves both the record and the account untouched. For email
    /// verification the code is consumed in the same write that marks the
    /// account verified, so a failed write leaves the code usable.
    pub async fn verify(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<Completed<()>> {
        let email = require_email(email)?;
        let record = self
            .db
            .get_otp(email)
            .await?
            .ok_or(AppError::InvalidOrExpiredOtp)?;

        if !codes_match(&record.code, code) || !record.is_valid_at(self.clock.now()) {
            tracing::info!(email, ?purpose, "OTP rejected");
            return Err(AppError::InvalidOrExpiredOtp);
        }

        let outcome = match purpose {
            OtpPurpose::EmailVerification => self.consume_and_mark_verified(&record).await?,
            OtpPurpose::PasswordReset => {
                if !self.db.consume_otp(&record).await? {
                    return Err(AppError::InvalidOrExpiredOtp);
                }
                Completed::new(())
            }
        };

        tracing::info!(email, ?purpose, "OTP verified");
        Ok(outcome)
    }

    async fn consume_and_mark_verified(&self, record: &OtpRecord) -> Result<Completed<()>> {
        let email = record.email.as_str();
        let account = self.db.find_account_by_email(email).await?;

        let consumed = match &account {
            Some(account) if !account.is_verified => {
                let now = format_utc_rfc3339(self.clock.now());
                self.db
                    .consume_otp_and_verify(record, &account.id, &now)
                    .await?
            }
            Some(_) => self.db.consume_otp(record).await?,
            None => {
                tracing::warn!(email, "Verified OTP for an email with no account");
                self.db.consume_otp(record).await?
            }
        };
        if !consumed {
            return Err(AppError::InvalidOrExpiredOtp);
        }

        let mut outcome = Completed::new(());
        if let Some(account) = account {
            let message = templates::email_verified(email, &account.profile.firstname);
            if let Err(e) = self.mailer.send(&message).await {
                outcome.record(SideEffect::WelcomeEmail, e);
            }
        }
        Ok(outcome)
    }

    /// Reissue a verification code unless the current one is under a minute old.
    pub async fn resend(&self, email: &str) -> Result<Completed<()>> {
        let email = require_email(email)?;
        if let Some(existing) = self.db.get_otp(email).await? {
            if let Some(retry_after_secs) = existing.resend_wait_secs(self.clock.now()) {
                return Err(AppError::RateLimited { retry_after_secs });
            }
        }
        self.issue(email, OtpPurpose::EmailVerification).await
    }

    /// Issue a password-reset code to an existing account.
    pub async fn start_password_reset(&self, email: &str) -> Result<Completed<()>> {
        let email = require_email(email)?;
        if self.db.find_account_by_email(email).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.issue(email, OtpPurpose::PasswordReset).await
    }

    /// Overwrite the credential hash for `email`.
    ///
    /// Not gated on a prior successful reset verification. An unknown email
    /// is a silent no-op.
    pub async fn reset_password(&self, email: &str, new_password: &str) -> Result<()> {
        let email = require_email(email)?;
        if new_password.is_empty() {
            return Err(AppError::Validation("newPassword is required".to_string()));
        }

        let hash = password::hash_password(new_password).await?;
        let Some(mut account) = self.db.find_account_by_email(email).await? else {
            tracing::warn!(email, "Password reset for unknown email");
            return Ok(());
        };

        account.credential_hash = Some(hash);
        account.updated_at = format_utc_rfc3339(self.clock.now());
        self.db.update_account(&account).await?;

        tracing::info!(account_id = %account.id, "Password reset");
        Ok(())
    }
}

fn require_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    Ok(email)
}
