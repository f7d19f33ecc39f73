// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Referral codes: minting, invitations and redemption at signup.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::referral::REFERRAL_REWARD_POINTS;
use crate::models::{Account, ReferralRecord};
use crate::services::effects::{Completed, SideEffect};
use crate::services::mail::{templates, Mailer};
use crate::time_utils::{format_utc_rfc3339, Clock};
use std::sync::Arc;
use validator::ValidateEmail;

const MINT_ATTEMPTS: usize = 3;

pub struct ReferralService {
    db: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    client_url: String,
}

impl ReferralService {
    pub fn new(
        db: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        client_url: String,
    ) -> Self {
        Self {
            db,
            mailer,
            clock,
            client_url,
        }
    }

    /// Signup link carrying a referral code.
    pub fn signup_link(&self, code: &str) -> String {
        format!(
            "{}/signup?ref={}",
            self.client_url.trim_end_matches('/'),
            urlencoding::encode(code)
        )
    }

    /// Persist a new record under a fresh code, retrying on the unlikely
    /// event of a code collision.
    async fn mint(&self, referrer: &str, referred_email: Option<String>) -> Result<ReferralRecord> {
        let now = format_utc_rfc3339(self.clock.now());
        let mut last_err = None;
        for _ in 0..MINT_ATTEMPTS {
            let code = uuid::Uuid::new_v4().to_string();
            let record = ReferralRecord::new(referrer, referred_email.clone(), code, &now);
            match self.db.create_referral(&record).await {
                Ok(()) => return Ok(record),
                Err(AppError::Conflict(msg)) => {
                    tracing::warn!(referrer, "Referral code collision, retrying");
                    last_err = Some(AppError::Conflict(msg));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Failed to mint referral code"))
        }))
    }

    /// Invite `friend_email` on behalf of `referrer_id` and mail the signup link.
    pub async fn create_invitation(
        &self,
        referrer_id: &str,
        friend_email: &str,
    ) -> Result<Completed<ReferralRecord>> {
        let friend_email = friend_email.trim();
        if friend_email.is_empty() {
            return Err(AppError::Validation("Friend email is required".to_string()));
        }
        if !friend_email.validate_email() {
            return Err(AppError::Validation("Invalid friend email".to_string()));
        }

        let referrer = self
            .db
            .get_account(referrer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if referrer.email == friend_email {
            return Err(AppError::Validation("You cannot refer yourself".to_string()));
        }
        if self
            .db
            .find_invitation(referrer_id, friend_email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "You have already referred {friend_email}"
            )));
        }

        let record = self
            .mint(referrer_id, Some(friend_email.to_string()))
            .await?;
        tracing::info!(account_id = referrer_id, "Referral invitation created");

        let mut outcome = Completed::new(record);
        let message = templates::invitation(
            friend_email,
            display_name(&referrer),
            &self.signup_link(&outcome.value.referral_code),
        );
        if let Err(e) = self.mailer.send(&message).await {
            outcome.record(SideEffect::InvitationEmail, e);
        }
        Ok(outcome)
    }

    /// Mint a code that is not bound to any email.
    pub async fn issue_code(&self, referrer_id: &str) -> Result<ReferralRecord> {
        if self.db.get_account(referrer_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let record = self.mint(referrer_id, None).await?;
        tracing::info!(account_id = referrer_id, "Referral code issued");
        Ok(record)
    }

    /// The caller's referral records, newest first.
    pub async fn list(&self, referrer_id: &str) -> Result<Vec<ReferralRecord>> {
        self.db.list_referrals(referrer_id).await
    }

    /// Look up an unused code. Unknown or used codes yield `None`.
    pub async fn find_redeemable(&self, code: &str) -> Result<Option<ReferralRecord>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        Ok(self.db.get_referral(code).await?.filter(|r| !r.used))
    }

    /// Mark `referral` used by `account` and credit the referrer.
    ///
    /// Returns `false` if another signup claimed the code first. A failed
    /// credit is recorded on the outcome and does not undo the claim.
    pub async fn redeem(
        &self,
        referral: &ReferralRecord,
        account: &Account,
    ) -> Result<Completed<bool>> {
        let now = format_utc_rfc3339(self.clock.now());
        let Some(claimed) = self
            .db
            .claim_referral(&referral.referral_code, &account.id, &now)
            .await?
        else {
            tracing::info!(account_id = %account.id, "Referral code already used");
            return Ok(Completed::new(false));
        };

        let mut outcome = Completed::new(true);
        match self
            .db
            .credit_referral_reward(&claimed.referral_code, REFERRAL_REWARD_POINTS)
            .await
        {
            Ok(()) => tracing::info!(
                account_id = %account.id,
                referrer = %claimed.referrer,
                points = REFERRAL_REWARD_POINTS,
                "Referral redeemed"
            ),
            Err(e) => outcome.record(SideEffect::ReferralReward, e),
        }
        Ok(outcome)
    }
}

fn display_name(account: &Account) -> &str {
    let profile = &account.profile;
    if !profile.name.trim().is_empty() {
        &profile.name
    } else if !profile.firstname.trim().is_empty() {
        &profile.firstname
    } else {
        &account.email
    }
}
