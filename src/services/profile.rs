// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile reads and partial updates, including image uploads.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{AccountView, ProfileUpdate};
use crate::services::media::{ImageStore, ImageUpload};
use crate::time_utils::{format_utc_rfc3339, Clock};
use std::sync::Arc;

/// Image fields that accept an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    ProfilePhoto,
    CoverImage,
    BusinessLogo,
}

impl ImageSlot {
    /// Map a multipart field name to its slot.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "profilePhoto" => Some(ImageSlot::ProfilePhoto),
            "coverImage" => Some(ImageSlot::CoverImage),
            "businessLogo" => Some(ImageSlot::BusinessLogo),
            _ => None,
        }
    }
}

/// Optional new images, at most one per slot.
#[derive(Debug, Default)]
pub struct ProfileImages {
    pub profile_photo: Option<ImageUpload>,
    pub cover_image: Option<ImageUpload>,
    pub business_logo: Option<ImageUpload>,
}

impl ProfileImages {
    /// Put `image` in `slot`, replacing an earlier file for the same slot.
    pub fn set(&mut self, slot: ImageSlot, image: ImageUpload) {
        match slot {
            ImageSlot::ProfilePhoto => self.profile_photo = Some(image),
            ImageSlot::CoverImage => self.cover_image = Some(image),
            ImageSlot::BusinessLogo => self.business_logo = Some(image),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profile_photo.is_none() && self.cover_image.is_none() && self.business_logo.is_none()
    }
}

pub struct ProfileService {
    db: Arc<dyn Store>,
    images: Arc<dyn ImageStore>,
    clock: Arc<dyn Clock>,
    folder: String,
}

impl ProfileService {
    pub fn new(
        db: Arc<dyn Store>,
        images: Arc<dyn ImageStore>,
        clock: Arc<dyn Clock>,
        folder: String,
    ) -> Self {
        Self {
            db,
            images,
            clock,
            folder,
        }
    }

    pub async fn get_profile(&self, account_id: &str) -> Result<AccountView> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(AppError::Validation("User ID is required".to_string()));
        }
        self.db
            .get_account(account_id)
            .await?
            .map(|a| a.view())
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn upload(&self, image: Option<ImageUpload>) -> Result<Option<String>> {
        match image {
            Some(image) => Ok(Some(self.images.upload(image, &self.folder).await?)),
            None => Ok(None),
        }
    }

    /// Apply `update` and any new images. Absent fields are left untouched.
    pub async fn update_profile(
        &self,
        account_id: &str,
        update: ProfileUpdate,
        images: ProfileImages,
    ) -> Result<AccountView> {
        // Uploads happen before the read so the read-modify-write stays short.
        let profile_photo = self.upload(images.profile_photo).await?;
        let cover_image = self.upload(images.cover_image).await?;
        let business_logo = self.upload(images.business_logo).await?;

        let mut account = self
            .db
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        account.profile.apply(update);
        if let Some(url) = profile_photo {
            account.profile.profile_photo = url;
        }
        if let Some(url) = cover_image {
            account.profile.cover_image = url;
        }
        if business_logo.is_some() {
            account.profile.business_logo = business_logo;
        }
        account.updated_at = format_utc_rfc3339(self.clock.now());

        self.db.update_account(&account).await?;
        tracing::info!(account_id = %account.id, "Profile updated");
        Ok(account.view())
    }
}
