// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.
//!
//! All tables live behind one lock, so every trait method is atomic.

use crate::db::{social_identity_key, Store};
use crate::error::{AppError, Result};
use crate::models::{Account, OtpRecord, ReferralRecord, SocialProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    /// email -> account id
    emails: HashMap<String, String>,
    /// provider:providerId -> account id
    identities: HashMap<String, String>,
    /// email -> active code
    otps: HashMap<String, OtpRecord>,
    /// code -> record
    referrals: HashMap<String, ReferralRecord>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of OTP records held for `email` (0 or 1).
    pub async fn otp_count(&self, email: &str) -> usize {
        usize::from(self.tables.read().await.otps.contains_key(email))
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn find_account_by_provider(
        &self,
        provider: SocialProvider,
        provider_id: &str,
    ) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .identities
            .get(&social_identity_key(provider, provider_id))
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables.write().await;

        let identity = account
            .provider
            .zip(account.provider_id.as_deref())
            .map(|(provider, id)| social_identity_key(provider, id));

        if let Some(key) = &identity {
            if tables.identities.contains_key(key) {
                return Err(AppError::Conflict(format!(
                    "Social identity {key} already registered"
                )));
            }
        }
        if tables.emails.contains_key(&account.email) {
            return Err(AppError::Conflict("User already exists".to_string()));
        }
        if tables.accounts.contains_key(&account.id) {
            return Err(AppError::Conflict(format!(
                "Account {} already exists",
                account.id
            )));
        }

        tables
            .emails
            .insert(account.email.clone(), account.id.clone());
        if let Some(key) = identity {
            tables.identities.insert(key, account.id.clone());
        }
        tables.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(&account.id) {
            Some(existing) => {
                let reward_points = existing.reward_points;
                *existing = Account {
                    reward_points,
                    ..account.clone()
                };
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Account {} not found",
                account.id
            ))),
        }
    }

    async fn get_otp(&self, email: &str) -> Result<Option<OtpRecord>> {
        Ok(self.tables.read().await.otps.get(email).cloned())
    }

    async fn put_otp(&self, record: &OtpRecord) -> Result<()> {
        self.tables
            .write()
            .await
            .otps
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn consume_otp(&self, record: &OtpRecord) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.otps.get(&record.email) == Some(record) {
            tables.otps.remove(&record.email);
            return Ok(true);
        }
        Ok(false)
    }

    async fn consume_otp_and_verify(
        &self,
        record: &OtpRecord,
        account_id: &str,
        now: &str,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.otps.get(&record.email) != Some(record) {
            return Ok(false);
        }
        let account = tables
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| AppError::NotFound(format!("Account {account_id} not found")))?;
        account.is_verified = true;
        account.updated_at = now.to_string();
        tables.otps.remove(&record.email);
        Ok(true)
    }

    async fn create_referral(&self, record: &ReferralRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.referrals.contains_key(&record.referral_code) {
            return Err(AppError::Conflict("Referral code already exists".to_string()));
        }
        tables
            .referrals
            .insert(record.referral_code.clone(), record.clone());
        Ok(())
    }

    async fn get_referral(&self, code: &str) -> Result<Option<ReferralRecord>> {
        Ok(self.tables.read().await.referrals.get(code).cloned())
    }

    async fn find_invitation(
        &self,
        referrer: &str,
        referred_email: &str,
    ) -> Result<Option<ReferralRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .referrals
            .values()
            .find(|r| r.referrer == referrer && r.referred_email.as_deref() == Some(referred_email))
            .cloned())
    }

    async fn list_referrals(&self, referrer: &str) -> Result<Vec<ReferralRecord>> {
        let mut records: Vec<ReferralRecord> = self
            .tables
            .read()
            .await
            .referrals
            .values()
            .filter(|r| r.referrer == referrer)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn claim_referral(
        &self,
        code: &str,
        account_id: &str,
        now: &str,
    ) -> Result<Option<ReferralRecord>> {
        let mut tables = self.tables.write().await;
        match tables.referrals.get_mut(code) {
            Some(record) if !record.used => {
                record.redeem(account_id, now);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn credit_referral_reward(&self, code: &str, points: u32) -> Result<()> {
        let mut tables = self.tables.write().await;
        let Tables {
            accounts,
            referrals,
            ..
        } = &mut *tables;

        let referral = referrals
            .get_mut(code)
            .ok_or_else(|| AppError::NotFound(format!("Referral {code} not found")))?;
        if referral.reward_status {
            return Ok(());
        }
        let referrer = accounts.get_mut(&referral.referrer).ok_or_else(|| {
            AppError::NotFound(format!("Referrer {} not found", referral.referrer))
        })?;

        referrer.reward_points = referrer.reward_points.saturating_add(points);
        referral.reward_status = true;
        Ok(())
    }
}
