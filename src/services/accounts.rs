// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential registration and login.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::profile::DEFAULT_CATEGORY;
use crate::models::{Account, AccountView, Profile};
use crate::services::effects::{Completed, SideEffect};
use crate::services::mail::{templates, Mailer};
use crate::services::password;
use crate::services::referral::ReferralService;
use crate::services::verification::{OtpPurpose, VerificationService};
use crate::time_utils::{format_utc_rfc3339, Clock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Category value that enables the free-text `otherCategory`.
pub const OTHER_CATEGORY: &str = "others";

/// Registration request body.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "firstname is required"))]
    pub firstname: String,
    pub lastname: String,
    pub name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    pub phone: String,
    pub country_code: String,
    pub category: String,
    pub other_category: Option<String>,
    pub referral_code: Option<String>,
}

impl RegisterRequest {
    /// Initial profile for a new credential account.
    fn profile(&self) -> Profile {
        let firstname = self.firstname.trim().to_string();
        let lastname = self.lastname.trim().to_string();
        let name = match self.name.trim() {
            "" => format!("{firstname} {lastname}").trim().to_string(),
            name => name.to_string(),
        };
        let category = match self.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            category => category.to_string(),
        };
        let other_category = if category == OTHER_CATEGORY {
            self.other_category
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };

        Profile {
            firstname,
            lastname,
            name,
            phone: self.phone.trim().to_string(),
            country_code: self.country_code.trim().to_string(),
            category,
            other_category,
            ..Profile::default()
        }
    }
}

/// Successful login: session token plus the account.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountView,
}

pub struct AccountService {
    db: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    verification: Arc<VerificationService>,
    referrals: Arc<ReferralService>,
    jwt_signing_key: Vec<u8>,
}

impl AccountService {
    pub fn new(
        db: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        verification: Arc<VerificationService>,
        referrals: Arc<ReferralService>,
        jwt_signing_key: Vec<u8>,
    ) -> Self {
        Self {
            db,
            mailer,
            clock,
            verification,
            referrals,
            jwt_signing_key,
        }
    }

    /// Create an unverified credential account, redeem its referral code if
    /// any, send the welcome email and issue a verification OTP.
    ///
    /// Only the account write is fatal. Referral crediting, mail delivery and
    /// OTP issuance failures are recorded on the outcome.
    pub async fn register(&self, req: RegisterRequest) -> Result<Completed<AccountView>> {
        req.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let email = req.email.trim().to_string();

        if self.db.find_account_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let credential_hash = password::hash_password(&req.password).await?;

        // Unknown or already-used codes are ignored.
        let referral = match req.referral_code.as_deref() {
            Some(code) => self.referrals.find_redeemable(code).await?,
            None => None,
        };

        let now = format_utc_rfc3339(self.clock.now());
        let mut account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            credential_hash: Some(credential_hash),
            provider: None,
            provider_id: None,
            is_verified: false,
            referred_by: referral.as_ref().map(|r| r.referrer.clone()),
            reward_points: 0,
            profile: req.profile(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.create_account(&account).await?;
        tracing::info!(account_id = %account.id, "Account registered");

        let mut outcome = Completed::new(());

        if let Some(referral) = &referral {
            let claimed = outcome.absorb(self.referrals.redeem(referral, &account).await?);
            if !claimed {
                // Lost the code to a concurrent signup.
                account.referred_by = None;
                if let Err(e) = self.db.update_account(&account).await {
                    outcome.record(SideEffect::ReferralReward, e);
                }
            }
        }

        let welcome = templates::welcome(&email, &account.profile.firstname);
        if let Err(e) = self.mailer.send(&welcome).await {
            outcome.record(SideEffect::WelcomeEmail, e);
        }

        match self
            .verification
            .issue(&email, OtpPurpose::EmailVerification)
            .await
        {
            Ok(issued) => outcome.absorb(issued),
            Err(e) => outcome.record(SideEffect::OtpIssue, e),
        }

        Ok(outcome.map(|()| account.view()))
    }

    /// Check credentials and issue a one-hour session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let account = self
            .db
            .find_account_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let Some(hash) = account.credential_hash.as_deref() else {
            // Social-only account
            return Err(AppError::InvalidCredentials);
        };
        if !password::verify_password(password, hash).await? {
            tracing::info!(account_id = %account.id, "Login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.session_token(&account.id)?;
        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(LoginResponse {
            token,
            user: account.view(),
        })
    }

    /// Sign a session token for `account_id`.
    pub fn session_token(&self, account_id: &str) -> Result<String> {
        create_jwt(account_id, &self.jwt_signing_key).map_err(AppError::Internal)
    }

    pub async fn current(&self, account_id: &str) -> Result<AccountView> {
        self.db
            .get_account(account_id)
            .await?
            .map(|a| a.view())
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_derives_name_and_drops_other_category() {
        let req = RegisterRequest {
            firstname: " Asha ".to_string(),
            lastname: "Rao".to_string(),
            category: "Architect".to_string(),
            other_category: Some("Landscape".to_string()),
            ..Default::default()
        };
        let profile = req.profile();
        assert_eq!(profile.name, "Asha Rao");
        assert_eq!(profile.category, "Architect");
        assert_eq!(profile.other_category, "");
    }

    #[test]
    fn profile_keeps_other_category_for_others() {
        let req = RegisterRequest {
            firstname: "Asha".to_string(),
            name: "Studio Asha".to_string(),
            category: OTHER_CATEGORY.to_string(),
            other_category: Some(" Lighting designer ".to_string()),
            ..Default::default()
        };
        let profile = req.profile();
        assert_eq!(profile.name, "Studio Asha");
        assert_eq!(profile.other_category, "Lighting designer");
    }

    #[test]
    fn blank_category_defaults() {
        let profile = RegisterRequest::default().profile();
        assert_eq!(profile.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn validation_rejects_bad_email() {
        let req = RegisterRequest {
            firstname: "Asha".to_string(),
            email: "not-an-email".to_string(),
            password: "pw123456".to_string(),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
