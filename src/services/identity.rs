// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maps a social sign-in to an account, creating one on first login.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{Account, Profile, SocialProfile};
use crate::time_utils::{format_utc_rfc3339, Clock};
use std::sync::Arc;

pub struct IdentityResolver {
    db: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl IdentityResolver {
    pub fn new(db: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Return the account linked to this provider identity, creating a
    /// verified account if there is none.
    ///
    /// An email already owned by another account is a `Conflict`: accounts
    /// are never linked automatically.
    pub async fn resolve(&self, social: SocialProfile) -> Result<Account> {
        if let Some(account) = self
            .db
            .find_account_by_provider(social.provider, &social.provider_id)
            .await?
        {
            tracing::debug!(account_id = %account.id, provider = %social.provider, "Social login for existing account");
            return Ok(account);
        }

        let email = social
            .email
            .clone()
            .ok_or_else(|| AppError::MissingEmail(social.provider.to_string()))?;

        if self.db.find_account_by_email(&email).await?.is_some() {
            tracing::info!(provider = %social.provider, "Social login email belongs to another account");
            return Err(AppError::Conflict(format!(
                "An account with this email already exists; sign in with your password instead of {}",
                social.provider
            )));
        }

        let account = new_social_account(&social, email, &format_utc_rfc3339(self.clock.now()));

        match self.db.create_account(&account).await {
            Ok(()) => {
                tracing::info!(account_id = %account.id, provider = %social.provider, "Social account created");
                Ok(account)
            }
            Err(AppError::Conflict(msg)) => {
                // A simultaneous first login may have created it already.
                self.db
                    .find_account_by_provider(social.provider, &social.provider_id)
                    .await?
                    .ok_or(AppError::Conflict(msg))
            }
            Err(e) => Err(e),
        }
    }
}

fn new_social_account(social: &SocialProfile, email: String, now: &str) -> Account {
    let profile = Profile {
        firstname: social.given_name.clone().unwrap_or_default(),
        lastname: social.family_name.clone().unwrap_or_default(),
        name: social.full_name(&email),
        ..Profile::default()
    };

    Account {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        credential_hash: None,
        provider: Some(social.provider),
        provider_id: Some(social.provider_id.clone()),
        is_verified: true,
        referred_by: None,
        reward_points: 0,
        profile,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}
