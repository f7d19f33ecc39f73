// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beebark accounts: the user-account backend for the Beebark network
//!
//! This crate provides registration, credential and social login, OTP email
//! verification, password reset, profile management and referrals.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{
    AccountService, IdentityResolver, ImageStore, Mailer, ProfileService, ReferralService,
    SocialAuthService, SocialProfileSource, VerificationService,
};
use std::sync::Arc;
use time_utils::Clock;

/// Image folder used when no storage config names one.
const DEFAULT_IMAGE_FOLDER: &str = "users";

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub accounts: AccountService,
    pub verification: Arc<VerificationService>,
    pub referrals: Arc<ReferralService>,
    pub identity: IdentityResolver,
    pub profiles: ProfileService,
    pub social: SocialAuthService,
}

impl AppState {
    /// Wire the services over their collaborators.
    pub fn new(
        config: Config,
        db: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        images: Arc<dyn ImageStore>,
        clock: Arc<dyn Clock>,
        social_source: Arc<dyn SocialProfileSource>,
    ) -> Self {
        let verification = Arc::new(VerificationService::new(
            db.clone(),
            mailer.clone(),
            clock.clone(),
        ));
        let referrals = Arc::new(ReferralService::new(
            db.clone(),
            mailer.clone(),
            clock.clone(),
            config.client_url.clone(),
        ));
        let accounts = AccountService::new(
            db.clone(),
            mailer,
            clock.clone(),
            verification.clone(),
            referrals.clone(),
            config.jwt_signing_key.clone(),
        );
        let folder = config
            .image_storage
            .as_ref()
            .map(|s| s.folder.clone())
            .unwrap_or_else(|| DEFAULT_IMAGE_FOLDER.to_string());
        let profiles = ProfileService::new(db.clone(), images, clock.clone(), folder);
        let identity = IdentityResolver::new(db.clone(), clock);
        let social = SocialAuthService::new(&config, social_source);

        Self {
            config,
            db,
            accounts,
            verification,
            referrals,
            identity,
            profiles,
            social,
        }
    }
}
