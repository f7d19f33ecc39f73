// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Referral ledger records.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Points credited to a referrer when their code is redeemed at signup.
pub const REFERRAL_REWARD_POINTS: u32 = 10;

/// A referral code minted by a referrer, optionally bound to an invited email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRecord {
    /// Unique opaque code (also used as document ID)
    pub referral_code: String,
    /// Account ID of the referrer
    pub referrer: String,
    /// Invited email, when the code was sent as an invitation
    #[serde(default)]
    pub referred_email: Option<String>,
    /// Code has been redeemed by a signup
    #[serde(default)]
    pub used: bool,
    /// Invited person has signed up
    #[serde(default)]
    pub signup_status: bool,
    /// Referrer has been credited
    #[serde(default)]
    pub reward_status: bool,
    /// Account created with this code
    #[serde(default)]
    pub redeemed_by: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub used_at: Option<String>,
}

impl ReferralRecord {
    pub fn new(referrer: &str, referred_email: Option<String>, code: String, now: &str) -> Self {
        Self {
            referral_code: code,
            referrer: referrer.to_string(),
            referred_email,
            used: false,
            signup_status: false,
            reward_status: false,
            redeemed_by: None,
            created_at: now.to_string(),
            used_at: None,
        }
    }

    /// Mark the code redeemed by `account_id`.
    pub fn redeem(&mut self, account_id: &str, now: &str) {
        self.used = true;
        self.signup_status = true;
        self.redeemed_by = Some(account_id.to_string());
        self.used_at = Some(now.to_string());
    }
}
