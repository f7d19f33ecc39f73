// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social sign-in providers and the profiles they return.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl SocialProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Google => "google",
            SocialProvider::Facebook => "facebook",
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(SocialProvider::Google),
            "facebook" => Ok(SocialProvider::Facebook),
            other => Err(format!("unknown social provider: {other}")),
        }
    }
}

/// Google `oauth2/v2/userinfo` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Facebook Graph `/me` response.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Raw provider payload, before normalization.
#[derive(Debug, Clone)]
pub enum ProviderProfile {
    Google(GoogleUserInfo),
    Facebook(FacebookUser),
}

/// Canonical social identity handed to the identity resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialProfile {
    pub provider: SocialProvider,
    pub provider_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<ProviderProfile> for SocialProfile {
    fn from(profile: ProviderProfile) -> Self {
        match profile {
            ProviderProfile::Google(user) => SocialProfile {
                provider: SocialProvider::Google,
                provider_id: user.id,
                email: non_empty(user.email),
                display_name: non_empty(user.name),
                given_name: non_empty(user.given_name),
                family_name: non_empty(user.family_name),
            },
            ProviderProfile::Facebook(user) => SocialProfile {
                provider: SocialProvider::Facebook,
                provider_id: user.id,
                email: non_empty(user.email),
                display_name: non_empty(user.name),
                given_name: non_empty(user.first_name),
                family_name: non_empty(user.last_name),
            },
        }
    }
}

impl SocialProfile {
    /// Display name, else given + family name, else the email.
    pub fn full_name(&self, email: &str) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        let joined = format!(
            "{} {}",
            self.given_name.as_deref().unwrap_or(""),
            self.family_name.as_deref().unwrap_or("")
        );
        let joined = joined.trim();
        if joined.is_empty() {
            email.to_string()
        } else {
            joined.to_string()
        }
    }
}
