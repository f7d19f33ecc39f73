// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beebark Accounts API Server
//!
//! Registration, login, social sign-in, email verification, profiles and
//! referrals for the Beebark network.

use beebark_accounts::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, Store},
    error::set_expose_internal_details,
    services::{
        CloudinaryStore, DisabledImageStore, HttpMailer, ImageStore, LogMailer, Mailer,
        OAuthHttpClient,
    },
    time_utils::SystemClock,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, env = %config.app_env, "Starting Beebark Accounts API");

    set_expose_internal_details(!config.is_production());

    let db: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Firestore => {
            tracing::info!(project = %config.gcp_project_id, "Using Firestore store");
            Arc::new(FirestoreDb::new(&config.gcp_project_id).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match config.mail.clone() {
        Some(mail) => Arc::new(HttpMailer::new(mail)?),
        None => {
            tracing::warn!("MAIL_API_URL/MAIL_API_KEY not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let images: Arc<dyn ImageStore> = match config.image_storage.clone() {
        Some(storage) => Arc::new(CloudinaryStore::new(storage)?),
        None => {
            tracing::warn!("Cloudinary credentials not set; image uploads disabled");
            Arc::new(DisabledImageStore)
        }
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        mailer,
        images,
        Arc::new(SystemClock),
        Arc::new(OAuthHttpClient::new()?),
    ));

    // Build router
    let app = beebark_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beebark_accounts=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
