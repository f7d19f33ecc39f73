// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod effects;
pub mod identity;
pub mod mail;
pub mod media;
pub mod password;
pub mod profile;
pub mod referral;
pub mod social;
pub mod verification;

pub use accounts::{AccountService, LoginResponse, RegisterRequest};
pub use effects::{Completed, SideEffect};
pub use identity::IdentityResolver;
pub use mail::{EmailMessage, HttpMailer, LogMailer, MailError, Mailer};
pub use media::{CloudinaryStore, DisabledImageStore, ImageStore, ImageUpload};
pub use profile::{ImageSlot, ProfileImages, ProfileService};
pub use referral::ReferralService;
pub use social::{OAuthHttpClient, SocialAuthService, SocialProfileSource};
pub use verification::{OtpPurpose, VerificationService};
