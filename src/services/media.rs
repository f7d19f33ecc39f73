// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image storage for profile photos, cover images and business logos.
//!
//! Uploads use Cloudinary's signed upload API. The client is built from an
//! explicit [`ImageStorageConfig`] handed in at construction.

use crate::config::ImageStorageConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// An image received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Object storage collaborator: stores a file in a folder and returns its public URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Cloudinary-backed image store.
pub struct CloudinaryStore {
    http: reqwest::Client,
    config: ImageStorageConfig,
    base_url: String,
}

impl CloudinaryStore {
    pub fn new(config: ImageStorageConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            config,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
        })
    }
}

/// Cloudinary request signature: SHA-256 over the sorted `key=value` pairs
/// joined by `&`, followed by the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs()
            .to_string();

        let signed = [("folder", folder.to_string()), ("timestamp", timestamp.clone())];
        let signature = sign_params(&signed, &self.config.api_secret);

        let mut part = reqwest::multipart::Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = &image.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| AppError::Validation(format!("Invalid image content type: {}", e)))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let url = format!("{}/{}/image/upload", self.base_url, self.config.cloud_name);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AppError::Transient(format!("Image upload failed: {}", e))
                } else {
                    AppError::Internal(anyhow::anyhow!("Image upload failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::Transient(format!(
                "Image storage returned status {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "Image storage rejected upload ({}): {}",
                status,
                body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid upload response: {}", e)))?;

        tracing::info!(folder, url = %uploaded.secure_url, "Image uploaded");
        Ok(uploaded.secure_url)
    }
}

/// Image store used when no storage credentials are configured.
#[derive(Debug, Default)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _image: ImageUpload, _folder: &str) -> Result<String> {
        Err(AppError::Validation(
            "Image uploads are not configured".to_string(),
        ))
    }
}
