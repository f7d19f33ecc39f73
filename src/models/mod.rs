// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod account;
pub mod otp;
pub mod profile;
pub mod referral;
pub mod social;

pub use account::{Account, AccountView};
pub use otp::OtpRecord;
pub use profile::{Profile, ProfileUpdate};
pub use referral::ReferralRecord;
pub use social::{ProviderProfile, SocialProfile, SocialProvider};
