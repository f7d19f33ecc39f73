// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use beebark_accounts::config::{Config, OAuthAppConfig};
use beebark_accounts::db::{FirestoreDb, MemoryDb, Store};
use beebark_accounts::error::{AppError, Result};
use beebark_accounts::models::{Account, OtpRecord, ProviderProfile, ReferralRecord, SocialProvider};
use beebark_accounts::routes::create_router;
use beebark_accounts::services::{
    EmailMessage, ImageStore, ImageUpload, MailError, Mailer, SocialProfileSource,
};
use beebark_accounts::time_utils::ManualClock;
use beebark_accounts::AppState;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake Collaborators ──────────────────────────────────────

/// Mailer that keeps every message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, to: &str) -> Vec<EmailMessage> {
        self.messages().into_iter().filter(|m| m.to == to).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> std::result::Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("mail server unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Image store that returns predictable URLs.
#[derive(Default)]
pub struct FakeImageStore {
    uploads: Mutex<Vec<(String, String)>>,
}

impl FakeImageStore {
    /// (folder, file name) of every upload.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String> {
        self.uploads
            .lock()
            .unwrap()
            .push((folder.to_string(), image.file_name.clone()));
        Ok(format!("https://images.test/{}/{}", folder, image.file_name))
    }
}

/// Social profile source keyed by authorization code.
#[derive(Default)]
pub struct StubSocialSource {
    profiles: Mutex<HashMap<String, ProviderProfile>>,
}

impl StubSocialSource {
    pub fn add(&self, code: &str, profile: ProviderProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(code.to_string(), profile);
    }
}

#[async_trait]
impl SocialProfileSource for StubSocialSource {
    async fn fetch_profile(
        &self,
        _provider: SocialProvider,
        _app: &OAuthAppConfig,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<ProviderProfile> {
        self.profiles
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Store over [`MemoryDb`] with switches that inject failures and lost races.
pub struct FlakyStore {
    inner: Arc<MemoryDb>,
    fail_account_writes: AtomicBool,
    fail_reward_credits: AtomicBool,
    lose_referral_claims: AtomicBool,
    racing_account: Mutex<Option<Account>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryDb>) -> Self {
        Self {
            inner,
            fail_account_writes: AtomicBool::new(false),
            fail_reward_credits: AtomicBool::new(false),
            lose_referral_claims: AtomicBool::new(false),
            racing_account: Mutex::new(None),
        }
    }

    /// Fail `update_account` and `consume_otp_and_verify`.
    pub fn set_failing_account_writes(&self, fail: bool) {
        self.fail_account_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_failing_reward_credits(&self, fail: bool) {
        self.fail_reward_credits.store(fail, Ordering::SeqCst);
    }

    /// Let another signup take every code just before `claim_referral` runs.
    pub fn set_losing_referral_claims(&self, lose: bool) {
        self.lose_referral_claims.store(lose, Ordering::SeqCst);
    }

    /// Make the next `create_account` lose to `winner`, as if a concurrent
    /// request inserted it first.
    pub fn race_next_create(&self, winner: Account) {
        *self.racing_account.lock().unwrap() = Some(winner);
    }

    fn write_error() -> AppError {
        AppError::Database("write rejected".to_string())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.inner.find_account_by_email(email).await
    }

    async fn find_account_by_provider(
        &self,
        provider: SocialProvider,
        provider_id: &str,
    ) -> Result<Option<Account>> {
        self.inner
            .find_account_by_provider(provider, provider_id)
            .await
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        let winner = self.racing_account.lock().unwrap().take();
        if let Some(winner) = winner {
            self.inner.create_account(&winner).await?;
            return Err(AppError::Conflict("User already exists".to_string()));
        }
        self.inner.create_account(account).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        if self.fail_account_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.inner.update_account(account).await
    }

    async fn get_otp(&self, email: &str) -> Result<Option<OtpRecord>> {
        self.inner.get_otp(email).await
    }

    async fn put_otp(&self, record: &OtpRecord) -> Result<()> {
        self.inner.put_otp(record).await
    }

    async fn consume_otp(&self, record: &OtpRecord) -> Result<bool> {
        self.inner.consume_otp(record).await
    }

    async fn consume_otp_and_verify(
        &self,
        record: &OtpRecord,
        account_id: &str,
        now: &str,
    ) -> Result<bool> {
        if self.fail_account_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.inner
            .consume_otp_and_verify(record, account_id, now)
            .await
    }

    async fn create_referral(&self, record: &ReferralRecord) -> Result<()> {
        self.inner.create_referral(record).await
    }

    async fn get_referral(&self, code: &str) -> Result<Option<ReferralRecord>> {
        self.inner.get_referral(code).await
    }

    async fn find_invitation(
        &self,
        referrer: &str,
        referred_email: &str,
    ) -> Result<Option<ReferralRecord>> {
        self.inner.find_invitation(referrer, referred_email).await
    }

    async fn list_referrals(&self, referrer: &str) -> Result<Vec<ReferralRecord>> {
        self.inner.list_referrals(referrer).await
    }

    async fn claim_referral(
        &self,
        code: &str,
        account_id: &str,
        now: &str,
    ) -> Result<Option<ReferralRecord>> {
        if self.lose_referral_claims.load(Ordering::SeqCst) {
            self.inner
                .claim_referral(code, "concurrent-signup", now)
                .await?;
        }
        self.inner.claim_referral(code, account_id, now).await
    }

    async fn credit_referral_reward(&self, code: &str, points: u32) -> Result<()> {
        if self.fail_reward_credits.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        self.inner.credit_referral_reward(code, points).await
    }
}

// ─── Test App ────────────────────────────────────────────────

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    /// The store the app uses; wraps `db`.
    pub store: Arc<FlakyStore>,
    pub mailer: Arc<RecordingMailer>,
    pub images: Arc<FakeImageStore>,
    pub clock: Arc<ManualClock>,
    pub social: Arc<StubSocialSource>,
}

/// Create a test app over the in-memory store with fake collaborators.
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

pub fn create_test_app_with_config(mut config: Config) -> TestApp {
    config.facebook = Some(OAuthAppConfig {
        client_id: "test-fb-app".to_string(),
        client_secret: "test-fb-secret".to_string(),
    });

    let db = Arc::new(MemoryDb::new());
    let mailer = Arc::new(RecordingMailer::default());
    let images = Arc::new(FakeImageStore::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let social = Arc::new(StubSocialSource::default());

    let store = Arc::new(FlakyStore::new(db.clone()));
    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        mailer.clone(),
        images.clone(),
        clock.clone(),
        social.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        store,
        mailer,
        images,
        clock,
        social,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST a JSON body, optionally with a bearer token.
    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        into_json(response).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        into_json(response).await
    }

    /// Register an account through the API and return its JSON view.
    pub async fn register(&self, email: &str, referral_code: Option<&str>) -> Value {
        let mut body = serde_json::json!({
            "firstname": "Asha",
            "lastname": "Rao",
            "email": email,
            "password": "s3cret-pass",
            "phone": "9876543210",
            "countryCode": "+91",
            "category": "Architect",
        });
        if let Some(code) = referral_code {
            body["referralCode"] = Value::from(code);
        }
        let (status, json) = self.post_json("/api/auth/register", body, None).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {json}");
        json["user"].clone()
    }

    /// Log in and return the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, json) = self
            .post_json(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {json}");
        json["token"].as_str().unwrap().to_string()
    }

    /// The code currently stored for `email`.
    pub async fn active_code(&self, email: &str) -> Option<String> {
        self.db.get_otp(email).await.unwrap().map(|r| r.code)
    }
}

pub async fn into_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// A six-digit code different from `code`.
pub fn wrong_code(code: &str) -> String {
    if code == "123456" {
        "654321".to_string()
    } else {
        "123456".to_string()
    }
}
