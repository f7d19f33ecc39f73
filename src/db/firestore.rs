// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts (profile storage, keyed by account ID)
//! - Email and social identity claims (uniqueness)
//! - OTPs (one document per email)
//! - Referrals (keyed by referral code)

use crate::db::{collections, social_identity_key, Store};
use crate::error::{AppError, Result};
use crate::models::{Account, OtpRecord, ReferralRecord, SocialProvider};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Attempts for a transaction whose commit lost to a concurrent writer.
const TRANSACTION_ATTEMPTS: usize = 3;

/// Account field written only by `credit_referral_reward`.
const REWARD_FIELD: &str = "rewardPoints";

/// Uniqueness claim pointing at the owning account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountClaim {
    account_id: String,
}

/// Map a Firestore error onto the application taxonomy.
fn db_error(e: FirestoreError) -> AppError {
    match e {
        FirestoreError::DataConflictError(err) => AppError::Conflict(err.to_string()),
        FirestoreError::NetworkError(err) => AppError::Transient(err.to_string()),
        FirestoreError::DatabaseError(err) if err.retry_possible => {
            AppError::Transient(err.to_string())
        }
        other => AppError::Database(other.to_string()),
    }
}

/// Document ID for a free-form key (emails contain `@`, `.`, `+`).
fn doc_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Update mask for `update_account`: every stored field except the reward balance.
fn account_update_mask(account: &Account) -> Result<Vec<String>> {
    let value = serde_json::to_value(account)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize account: {}", e)))?;
    let fields = value
        .as_object()
        .map(|map| {
            map.keys()
                .filter(|key| key.as_str() != REWARD_FIELD)
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Ok(fields)
}

/// Re-run `attempt` while it fails with a retryable error (commit contention,
/// network), up to [`TRANSACTION_ATTEMPTS`] times.
async fn with_retries<T, F, Fut>(operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && tries < TRANSACTION_ATTEMPTS => {
                tracing::warn!(operation, attempt = tries, error = %e, "Retrying transaction");
                tries += 1;
            }
            other => return other,
        }
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Client whose reads are part of `transaction`, so the commit fails if
    /// any document read through it changed in the meantime.
    fn reader_for(
        &self,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        self.client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
    }

    // ─── Claim Helpers ───────────────────────────────────────────

    async fn get_claim(&self, collection: &str, key: &str) -> Result<Option<AccountClaim>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(&doc_key(key))
            .await
            .map_err(db_error)
    }

    /// Create-only insert; fails with `Conflict` if the claim already exists.
    async fn insert_claim(&self, collection: &str, key: &str, account_id: &str) -> Result<()> {
        let claim = AccountClaim {
            account_id: account_id.to_string(),
        };
        let _: AccountClaim = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(doc_key(key))
            .object(&claim)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, doc_id: &str) -> Result<()> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn account_for_claim(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<Option<Account>> {
        match self.get_claim(collection, key).await? {
            Some(claim) => self.get_account(&claim.account_id).await,
            None => Ok(None),
        }
    }

    async fn release_email_claim(&self, email: &str) {
        if let Err(e) = self
            .delete_doc(collections::ACCOUNT_EMAILS, &doc_key(email))
            .await
        {
            tracing::error!(error = %e, "Failed to release email claim");
        }
    }

    // ─── Transactional Bodies ────────────────────────────────────

    /// One attempt at deleting `record`, optionally marking `verify` (account
    /// ID, timestamp) verified in the same commit.
    async fn try_consume_otp(
        &self,
        record: &OtpRecord,
        verify: Option<(&str, &str)>,
    ) -> Result<bool> {
        let mut transaction = self.client.begin_transaction().await.map_err(db_error)?;
        let reader = self.reader_for(&transaction);

        let current: Option<OtpRecord> = reader
            .fluent()
            .select()
            .by_id_in(collections::OTPS)
            .obj()
            .one(&doc_key(&record.email))
            .await
            .map_err(db_error)?;
        if current.as_ref() != Some(record) {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        if let Some((account_id, now)) = verify {
            let account: Option<Account> = reader
                .fluent()
                .select()
                .by_id_in(collections::ACCOUNTS)
                .obj()
                .one(account_id)
                .await
                .map_err(db_error)?;
            let Some(mut account) = account else {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("Account {account_id} not found")));
            };
            account.is_verified = true;
            account.updated_at = now.to_string();

            self.client
                .fluent()
                .update()
                .fields(["isVerified", "updatedAt"])
                .in_col(collections::ACCOUNTS)
                .document_id(account_id)
                .object(&account)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add account to transaction: {}", e))
                })?;
        }

        self.client
            .fluent()
            .delete()
            .from(collections::OTPS)
            .document_id(doc_key(&record.email))
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add OTP deletion to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn try_claim_referral(
        &self,
        code: &str,
        account_id: &str,
        now: &str,
    ) -> Result<Option<ReferralRecord>> {
        let mut transaction = self.client.begin_transaction().await.map_err(db_error)?;

        let current: Option<ReferralRecord> = self
            .reader_for(&transaction)
            .fluent()
            .select()
            .by_id_in(collections::REFERRALS)
            .obj()
            .one(code)
            .await
            .map_err(db_error)?;
        let Some(mut record) = current else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };
        if record.used {
            let _ = transaction.rollback().await;
            // A retried commit that had in fact landed
            let ours = record.redeemed_by.as_deref() == Some(account_id);
            return Ok(ours.then_some(record));
        }

        record.redeem(account_id, now);

        self.client
            .fluent()
            .update()
            .in_col(collections::REFERRALS)
            .document_id(code)
            .object(&record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add referral to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(db_error)?;
        Ok(Some(record))
    }

    async fn try_credit_referral_reward(&self, code: &str, points: u32) -> Result<()> {
        let mut transaction = self.client.begin_transaction().await.map_err(db_error)?;
        let reader = self.reader_for(&transaction);

        // 1. Read both documents inside the transaction
        let referral: Option<ReferralRecord> = reader
            .fluent()
            .select()
            .by_id_in(collections::REFERRALS)
            .obj()
            .one(code)
            .await
            .map_err(db_error)?;
        let Some(mut referral) = referral else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Referral {code} not found")));
        };
        if referral.reward_status {
            let _ = transaction.rollback().await;
            return Ok(());
        }
        let referrer: Option<Account> = reader
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(&referral.referrer)
            .await
            .map_err(db_error)?;
        let Some(mut referrer) = referrer else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Referrer {} not found",
                referral.referrer
            )));
        };

        // 2. Update in memory
        referrer.reward_points = referrer.reward_points.saturating_add(points);
        referral.reward_status = true;

        // 3. Write the balance and the referral in one commit
        self.client
            .fluent()
            .update()
            .fields([REWARD_FIELD])
            .in_col(collections::ACCOUNTS)
            .document_id(&referrer.id)
            .object(&referrer)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add referrer to transaction: {}", e))
            })?;

        self.client
            .fluent()
            .update()
            .in_col(collections::REFERRALS)
            .document_id(code)
            .object(&referral)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add referral to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(db_error)?;

        tracing::info!(
            referrer = %referrer.id,
            points,
            total = referrer.reward_points,
            "Referral reward credited"
        );

        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Account Operations ──────────────────────────────────────

    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACCOUNTS)
            .obj()
            .one(id)
            .await
            .map_err(db_error)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.account_for_claim(collections::ACCOUNT_EMAILS, email)
            .await
    }

    async fn find_account_by_provider(
        &self,
        provider: SocialProvider,
        provider_id: &str,
    ) -> Result<Option<Account>> {
        self.account_for_claim(
            collections::SOCIAL_IDENTITIES,
            &social_identity_key(provider, provider_id),
        )
        .await
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        self.insert_claim(collections::ACCOUNT_EMAILS, &account.email, &account.id)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::Conflict("User already exists".to_string()),
                other => other,
            })?;

        let identity = account
            .provider
            .zip(account.provider_id.as_deref())
            .map(|(provider, id)| social_identity_key(provider, id));

        if let Some(key) = &identity {
            if let Err(e) = self
                .insert_claim(collections::SOCIAL_IDENTITIES, key, &account.id)
                .await
            {
                self.release_email_claim(&account.email).await;
                return Err(e);
            }
        }

        let write: Result<()> = async {
            let _: () = self
                .client
                .fluent()
                .update()
                .in_col(collections::ACCOUNTS)
                .document_id(&account.id)
                .object(account)
                .execute()
                .await
                .map_err(db_error)?;
            Ok(())
        }
        .await;

        if let Err(e) = write {
            // Roll back the claims so the email can be registered again
            self.release_email_claim(&account.email).await;
            if let Some(key) = &identity {
                if let Err(release_err) = self
                    .delete_doc(collections::SOCIAL_IDENTITIES, &doc_key(key))
                    .await
                {
                    tracing::error!(error = %release_err, "Failed to release social identity claim");
                }
            }
            return Err(e);
        }

        tracing::debug!(account_id = %account.id, "Account created");
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(account_update_mask(account)?)
            .in_col(collections::ACCOUNTS)
            .document_id(&account.id)
            .object(account)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    // ─── OTP Operations ──────────────────────────────────────────

    async fn get_otp(&self, email: &str) -> Result<Option<OtpRecord>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::OTPS)
            .obj()
            .one(&doc_key(email))
            .await
            .map_err(db_error)
    }

    async fn put_otp(&self, record: &OtpRecord) -> Result<()> {
        // Keyed by email: a single write replaces any previous code.
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::OTPS)
            .document_id(doc_key(&record.email))
            .object(record)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn consume_otp(&self, record: &OtpRecord) -> Result<bool> {
        with_retries("consume_otp", move || self.try_consume_otp(record, None)).await
    }

    async fn consume_otp_and_verify(
        &self,
        record: &OtpRecord,
        account_id: &str,
        now: &str,
    ) -> Result<bool> {
        with_retries("consume_otp_and_verify", move || {
            self.try_consume_otp(record, Some((account_id, now)))
        })
        .await
    }

    // ─── Referral Operations ─────────────────────────────────────

    async fn create_referral(&self, record: &ReferralRecord) -> Result<()> {
        let _: ReferralRecord = self
            .client
            .fluent()
            .insert()
            .into(collections::REFERRALS)
            .document_id(&record.referral_code)
            .object(record)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn get_referral(&self, code: &str) -> Result<Option<ReferralRecord>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::REFERRALS)
            .obj()
            .one(code)
            .await
            .map_err(db_error)
    }

    async fn find_invitation(
        &self,
        referrer: &str,
        referred_email: &str,
    ) -> Result<Option<ReferralRecord>> {
        let referrer = referrer.to_string();
        let referred_email = referred_email.to_string();
        let found: Vec<ReferralRecord> = self
            .client
            .fluent()
            .select()
            .from(collections::REFERRALS)
            .filter(move |q| {
                q.for_all([
                    q.field("referrer").eq(referrer.clone()),
                    q.field("referredEmail").eq(referred_email.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(found.into_iter().next())
    }

    async fn list_referrals(&self, referrer: &str) -> Result<Vec<ReferralRecord>> {
        let referrer = referrer.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::REFERRALS)
            .filter(move |q| q.for_all([q.field("referrer").eq(referrer.clone())]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    async fn claim_referral(
        &self,
        code: &str,
        account_id: &str,
        now: &str,
    ) -> Result<Option<ReferralRecord>> {
        with_retries("claim_referral", move || {
            self.try_claim_referral(code, account_id, now)
        })
        .await
    }

    async fn credit_referral_reward(&self, code: &str, points: u32) -> Result<()> {
        with_retries("credit_referral_reward", move || {
            self.try_credit_referral_reward(code, points)
        })
        .await
    }
}

