// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::profile::Profile;
use crate::models::social::SocialProvider;

/// Account record stored in the account store.
///
/// `credential_hash` never leaves the service; API responses use [`AccountView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Opaque account ID (also used as document ID)
    pub id: String,
    /// Unique email, compared exactly as stored
    pub email: String,
    /// Argon2 PHC string; absent for pure social accounts
    #[serde(default)]
    pub credential_hash: Option<String>,
    /// Social provider this account was created through
    #[serde(default)]
    pub provider: Option<SocialProvider>,
    /// Provider-scoped subject ID
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    /// ID of the account whose referral code was used at signup
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub reward_points: u32,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    /// Public projection of the account, without credentials.
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.clone(),
            email: self.email.clone(),
            provider: self.provider,
            is_verified: self.is_verified,
            referred_by: self.referred_by.clone(),
            reward_points: self.reward_points,
            profile: self.profile.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Account as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub provider: Option<SocialProvider>,
    pub is_verified: bool,
    pub referred_by: Option<String>,
    pub reward_points: u32,
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub profile: Profile,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        account.view()
    }
}
