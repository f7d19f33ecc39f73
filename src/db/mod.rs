// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the account store, OTP ledger and referral ledger.
//!
//! Two backends implement [`Store`]: Firestore for deployments and an
//! in-process map for local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::Result;
use crate::models::{Account, OtpRecord, ReferralRecord, SocialProvider};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const ACCOUNTS: &str = "accounts";
    /// Create-only claims keyed by email (uniqueness)
    pub const ACCOUNT_EMAILS: &str = "account_emails";
    /// Create-only claims keyed by `provider:providerId`
    pub const SOCIAL_IDENTITIES: &str = "social_identities";
    /// Active OTP per email
    pub const OTPS: &str = "otps";
    /// Referral codes (keyed by code)
    pub const REFERRALS: &str = "referrals";
}

/// Key for a social identity claim.
pub fn social_identity_key(provider: SocialProvider, provider_id: &str) -> String {
    format!("{}:{}", provider.as_str(), provider_id)
}

/// Persistence operations used by the services.
///
/// Composite operations (`create_account`, `consume_otp`,
/// `consume_otp_and_verify`, `claim_referral`, `credit_referral_reward`) read
/// and write as one unit in every backend.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Accounts ────────────────────────────────────────────────

    async fn get_account(&self, id: &str) -> Result<Option<Account>>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_account_by_provider(
        &self,
        provider: SocialProvider,
        provider_id: &str,
    ) -> Result<Option<Account>>;

    /// Insert a new account. Fails with `Conflict` if the email or the
    /// provider identity is already claimed.
    async fn create_account(&self, account: &Account) -> Result<()>;

    /// Overwrite an existing account. Email and provider identity must not
    /// change. The stored reward balance is kept; only
    /// `credit_referral_reward` writes it.
    async fn update_account(&self, account: &Account) -> Result<()>;

    // ─── OTP Ledger ──────────────────────────────────────────────

    async fn get_otp(&self, email: &str) -> Result<Option<OtpRecord>>;

    /// Store `record` as the only active code for its email.
    async fn put_otp(&self, record: &OtpRecord) -> Result<()>;

    /// Delete `record` if it is still the active code for its email.
    /// Returns `false` if it was already consumed or superseded.
    async fn consume_otp(&self, record: &OtpRecord) -> Result<bool>;

    /// `consume_otp` and mark account `account_id` verified in the same write.
    /// Neither happens unless both do.
    async fn consume_otp_and_verify(
        &self,
        record: &OtpRecord,
        account_id: &str,
        now: &str,
    ) -> Result<bool>;

    // ─── Referral Ledger ─────────────────────────────────────────

    /// Insert a new referral. Fails with `Conflict` on a duplicate code.
    async fn create_referral(&self, record: &ReferralRecord) -> Result<()>;

    async fn get_referral(&self, code: &str) -> Result<Option<ReferralRecord>>;

    async fn find_invitation(
        &self,
        referrer: &str,
        referred_email: &str,
    ) -> Result<Option<ReferralRecord>>;

    async fn list_referrals(&self, referrer: &str) -> Result<Vec<ReferralRecord>>;

    /// Transition the code from unused to used for `account_id`.
    /// Returns the updated record, or `None` if it is missing or already used.
    async fn claim_referral(
        &self,
        code: &str,
        account_id: &str,
        now: &str,
    ) -> Result<Option<ReferralRecord>>;

    /// Add `points` to the referrer and mark the referral rewarded, atomically.
    /// A referral that is already rewarded is left unchanged.
    async fn credit_referral_reward(&self, code: &str, points: u32) -> Result<()>;
}
