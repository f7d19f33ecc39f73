// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and referral routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AccountView, ProfileUpdate, ReferralRecord};
use crate::services::{ImageSlot, ImageUpload, ProfileImages};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Upper bound on an update-profile request (three images plus fields).
const PROFILE_UPLOAD_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Fields that may arrive as JSON text: nested objects and lists.
const JSON_FIELDS: [&str; 11] = [
    "contact",
    "languageSpoken",
    "certifications",
    "associations",
    "workHistory",
    "testimonials",
    "awards",
    "projects",
    "teamMembers",
    "socialLinks",
    "availability",
];
const NUMBER_FIELDS: [&str; 2] = ["establishmentYear", "yearOfExperience"];
const BOOL_FIELDS: [&str; 5] = [
    "isOpenToFreelance",
    "openToCollaboration",
    "openToHiringOrInternship",
    "fullTime",
    "partTime",
];

/// Routes that need no session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/users/get-profile", get(get_profile))
}

/// Routes that require a session. The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/users/update-profile",
            post(update_profile).layer(DefaultBodyLimit::max(PROFILE_UPLOAD_LIMIT_BYTES)),
        )
        .route("/api/users/refer", post(refer_friend))
        .route("/api/users/referral-code", post(create_referral_code))
        .route("/api/users/referrals", get(list_referrals))
        .route("/api/users/me", get(get_me))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub success: bool,
    pub user_data: AccountView,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileResponse>> {
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("User ID is required".to_string()))?;

    let user_data = state.profiles.get_profile(&user_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user_data,
    }))
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AccountView>> {
    Ok(Json(state.accounts.current(&user.account_id).await?))
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: String,
    pub user: AccountView,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<UpdateProfileResponse>> {
    let (update, images) = read_profile_form(multipart).await?;
    let updated = state
        .profiles
        .update_profile(&user.account_id, update, images)
        .await?;

    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "User profile updated successfully".to_string(),
        user: updated,
    }))
}

/// Split a multipart form into text fields and image files.
async fn read_profile_form(mut multipart: Multipart) -> Result<(ProfileUpdate, ProfileImages)> {
    let mut fields = Vec::new();
    let mut images = ProfileImages::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read {}: {}", name, e)))?;
            // Browsers send an empty part for an unselected file input.
            if bytes.is_empty() {
                continue;
            }
            match ImageSlot::from_field_name(&name) {
                Some(slot) => images.set(
                    slot,
                    ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                ),
                None => tracing::warn!(field = %name, "Ignoring unexpected file field"),
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read {}: {}", name, e)))?;
        fields.push((name, value));
    }

    Ok((build_update(fields)?, images))
}

/// Split `parent[child]` or `parent.child` into its parts.
fn split_key(key: &str) -> (&str, Option<&str>) {
    if let Some((parent, rest)) = key.split_once('[') {
        return (parent, rest.strip_suffix(']'));
    }
    match key.split_once('.') {
        Some((parent, child)) => (parent, Some(child)),
        None => (key, None),
    }
}

/// Convert a text form value to JSON according to the field it belongs to.
fn coerce_value(field: &str, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();

    if JSON_FIELDS.contains(&field) && (trimmed.starts_with('[') || trimmed.starts_with('{')) {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            return Ok(parsed);
        }
    }

    if NUMBER_FIELDS.contains(&field) {
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        return trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::Validation(format!("{field} must be a number")));
    }

    if BOOL_FIELDS.contains(&field) {
        return match trimmed {
            "" => Ok(Value::Null),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(AppError::Validation(format!("{field} must be true or false"))),
        };
    }

    Ok(Value::String(raw.to_string()))
}

/// Assemble text fields into a [`ProfileUpdate`]. Unknown fields are ignored.
fn build_update(fields: Vec<(String, String)>) -> Result<ProfileUpdate> {
    let mut root = Map::new();

    for (key, raw) in fields {
        match split_key(&key) {
            (parent, Some(child)) => {
                let value = coerce_value(child, &raw)?;
                let entry = root
                    .entry(parent.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                match entry {
                    Value::Object(map) => {
                        map.insert(child.to_string(), value);
                    }
                    _ => {
                        return Err(AppError::Validation(format!(
                            "{parent} given both as a value and as an object"
                        )))
                    }
                }
            }
            (field, None) => {
                root.insert(field.to_string(), coerce_value(field, &raw)?);
            }
        }
    }

    serde_json::from_value(Value::Object(root))
        .map_err(|e| AppError::Validation(format!("Invalid profile fields: {}", e)))
}

// ─── Referrals ───────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferRequest {
    friend_email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferResponse {
    pub success: bool,
    pub message: String,
    pub referral_code: String,
}

async fn refer_friend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ReferRequest>,
) -> Result<Json<ReferResponse>> {
    let outcome = state
        .referrals
        .create_invitation(&user.account_id, &req.friend_email)
        .await?;
    let record = outcome.into_value();

    Ok(Json(ReferResponse {
        success: true,
        message: format!("Referral sent to {}", req.friend_email.trim()),
        referral_code: record.referral_code,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCodeResponse {
    pub referral_code: String,
    pub signup_link: String,
}

async fn create_referral_code(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ReferralCodeResponse>> {
    let record = state.referrals.issue_code(&user.account_id).await?;
    Ok(Json(ReferralCodeResponse {
        signup_link: state.referrals.signup_link(&record.referral_code),
        referral_code: record.referral_code,
    }))
}

async fn list_referrals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ReferralRecord>>> {
    Ok(Json(state.referrals.list(&user.account_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn nested_and_coerced_fields_build_an_update() {
        let update = build_update(fields(&[
            ("bio", "Architect in Pune"),
            ("yearOfExperience", "12"),
            ("isOpenToFreelance", "true"),
            ("socialLinks[website]", "https://asha.studio"),
            ("availability.partTime", "false"),
            ("certifications", "LEED AP, RIBA"),
            ("awards", r#"[{"title":"Best Studio","year":2024}]"#),
            ("email", "ignored@x.com"),
        ]))
        .unwrap();

        assert_eq!(update.bio.as_deref(), Some("Architect in Pune"));
        assert_eq!(update.year_of_experience, Some(12));
        assert_eq!(update.is_open_to_freelance, Some(true));
        assert_eq!(
            update.social_links.and_then(|l| l.website).as_deref(),
            Some("https://asha.studio")
        );
        assert_eq!(update.availability.and_then(|a| a.part_time), Some(false));
        assert_eq!(
            update.certifications,
            Some(vec!["LEED AP".to_string(), "RIBA".to_string()])
        );
        let awards = update.awards.unwrap();
        assert_eq!(awards[0].title, "Best Studio");
        assert_eq!(awards[0].year, Some(2024));
    }

    #[test]
    fn bracketed_text_stays_text_outside_structured_fields() {
        let update = build_update(fields(&[
            ("bio", "[1,2]"),
            ("licenseNumber", "{A-113}"),
            ("socialLinks[website]", "[https://asha.studio]"),
            ("languageSpoken", r#"["Hindi","Marathi"]"#),
        ]))
        .unwrap();

        assert_eq!(update.bio.as_deref(), Some("[1,2]"));
        assert_eq!(update.license_number.as_deref(), Some("{A-113}"));
        assert_eq!(
            update.social_links.and_then(|l| l.website).as_deref(),
            Some("[https://asha.studio]")
        );
        assert_eq!(
            update.language_spoken,
            Some(vec!["Hindi".to_string(), "Marathi".to_string()])
        );
    }

    #[test]
    fn bad_number_is_a_validation_error() {
        let err = build_update(fields(&[("establishmentYear", "nineteen")])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn blank_number_leaves_field_untouched() {
        let update = build_update(fields(&[("establishmentYear", "")])).unwrap();
        assert_eq!(update.establishment_year, None);
    }

    #[test]
    fn split_key_handles_both_notations() {
        assert_eq!(split_key("contact[city]"), ("contact", Some("city")));
        assert_eq!(split_key("contact.city"), ("contact", Some("city")));
        assert_eq!(split_key("bio"), ("bio", None));
    }
}
