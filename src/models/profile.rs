// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mutable profile fields of an account and the partial update applied to them.

use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const DEFAULT_PROFILE_PHOTO: &str =
    "https://res.cloudinary.com/dx35apf2r/image/upload/v1747476185/default_profile_pic_url_uqcruc.png";
pub const DEFAULT_COVER_IMAGE: &str =
    "https://res.cloudinary.com/dx35apf2r/image/upload/v1747476185/default_cover_image_url.png";
pub const DEFAULT_CATEGORY: &str = "Individual";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub enum ProfileType {
    #[default]
    Individual,
    Firm,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub address: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLinks {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Availability {
    pub full_time: Option<bool>,
    pub part_time: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct WorkHistoryEntry {
    pub name: String,
    pub role: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Testimonial {
    pub client_name: String,
    pub message: String,
    /// ISO 8601 date as entered by the client
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Award {
    pub title: String,
    pub organization: String,
    pub year: Option<i32>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub title: String,
    /// e.g. "Residential", "Commercial"
    #[serde(rename = "type")]
    pub project_type: String,
    /// e.g. "Completed", "In Progress"
    pub year_status: String,
    pub location: String,
    pub budget_range: String,
    pub role_in_project: String,
    pub project_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
    pub bio: String,
    pub linked_profile_id: Option<String>,
}

/// Profile section of an account. Every field has a neutral default so that
/// social sign-ups (which supply almost nothing) still produce a complete record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    // ─── Basic Info ──────────────────────────────────────────────
    pub firstname: String,
    pub lastname: String,
    pub name: String,

    // ─── Contact ─────────────────────────────────────────────────
    pub phone: String,
    pub phone_business: Option<String>,
    pub country_code: String,
    pub contact: Contact,

    // ─── Professional ────────────────────────────────────────────
    pub category: String,
    pub other_category: String,
    pub profile_type: ProfileType,
    pub profile_photo: String,
    pub cover_image: String,
    pub business_logo: Option<String>,
    pub bio: Option<String>,
    pub establishment_year: Option<i32>,
    pub year_of_experience: Option<u32>,
    pub license_number: Option<String>,
    pub language_spoken: Vec<String>,
    pub certifications: Vec<String>,
    pub associations: Vec<String>,

    // ─── Portfolio ───────────────────────────────────────────────
    pub work_history: Vec<WorkHistoryEntry>,
    pub testimonials: Vec<Testimonial>,
    pub awards: Vec<Award>,
    pub projects: Vec<Project>,
    pub team_members: Vec<TeamMember>,

    // ─── Social & Availability ───────────────────────────────────
    pub social_links: SocialLinks,
    pub is_open_to_freelance: Option<bool>,
    pub availability: Availability,
    pub open_to_collaboration: Option<bool>,
    pub open_to_hiring_or_internship: Option<bool>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            firstname: String::new(),
            lastname: String::new(),
            name: String::new(),
            phone: String::new(),
            phone_business: None,
            country_code: String::new(),
            contact: Contact::default(),
            category: DEFAULT_CATEGORY.to_string(),
            other_category: String::new(),
            profile_type: ProfileType::Individual,
            profile_photo: DEFAULT_PROFILE_PHOTO.to_string(),
            cover_image: DEFAULT_COVER_IMAGE.to_string(),
            business_logo: None,
            bio: None,
            establishment_year: None,
            year_of_experience: None,
            license_number: None,
            language_spoken: Vec::new(),
            certifications: Vec::new(),
            associations: Vec::new(),
            work_history: Vec::new(),
            testimonials: Vec::new(),
            awards: Vec::new(),
            projects: Vec::new(),
            team_members: Vec::new(),
            social_links: SocialLinks::default(),
            is_open_to_freelance: None,
            availability: Availability::default(),
            open_to_collaboration: None,
            open_to_hiring_or_internship: None,
        }
    }
}

/// Partial profile update. `None` means "leave untouched".
///
/// Email and credentials are deliberately absent: they change only through
/// registration and the password-reset flow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub phone_business: Option<String>,
    pub country_code: Option<String>,
    pub contact: Option<ContactUpdate>,
    pub category: Option<String>,
    pub other_category: Option<String>,
    pub profile_type: Option<ProfileType>,
    pub bio: Option<String>,
    pub establishment_year: Option<i32>,
    pub year_of_experience: Option<u32>,
    pub license_number: Option<String>,
    #[serde(deserialize_with = "deserialize_list_field")]
    pub language_spoken: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_list_field")]
    pub certifications: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_list_field")]
    pub associations: Option<Vec<String>>,
    pub work_history: Option<Vec<WorkHistoryEntry>>,
    pub testimonials: Option<Vec<Testimonial>>,
    pub awards: Option<Vec<Award>>,
    pub projects: Option<Vec<Project>>,
    pub team_members: Option<Vec<TeamMember>>,
    pub social_links: Option<SocialLinksUpdate>,
    pub is_open_to_freelance: Option<bool>,
    pub availability: Option<AvailabilityUpdate>,
    pub open_to_collaboration: Option<bool>,
    pub open_to_hiring_or_internship: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactUpdate {
    pub address: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLinksUpdate {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityUpdate {
    pub full_time: Option<bool>,
    pub part_time: Option<bool>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl Profile {
    /// Apply a partial update in place. Fields absent from `update` are kept.
    pub fn apply(&mut self, update: ProfileUpdate) {
        set(&mut self.firstname, update.firstname);
        set(&mut self.lastname, update.lastname);
        set(&mut self.name, update.name);
        set(&mut self.phone, update.phone);
        set_opt(&mut self.phone_business, update.phone_business);
        set(&mut self.country_code, update.country_code);
        if let Some(contact) = update.contact {
            set(&mut self.contact.address, contact.address);
            set(&mut self.contact.country, contact.country);
            set(&mut self.contact.state, contact.state);
            set(&mut self.contact.city, contact.city);
            set(&mut self.contact.pincode, contact.pincode);
        }
        set(&mut self.category, update.category);
        set(&mut self.other_category, update.other_category);
        set(&mut self.profile_type, update.profile_type);
        set_opt(&mut self.bio, update.bio);
        set_opt(&mut self.establishment_year, update.establishment_year);
        set_opt(&mut self.year_of_experience, update.year_of_experience);
        set_opt(&mut self.license_number, update.license_number);
        set(&mut self.language_spoken, update.language_spoken);
        set(&mut self.certifications, update.certifications);
        set(&mut self.associations, update.associations);
        set(&mut self.work_history, update.work_history);
        set(&mut self.testimonials, update.testimonials);
        set(&mut self.awards, update.awards);
        set(&mut self.projects, update.projects);
        set(&mut self.team_members, update.team_members);
        if let Some(links) = update.social_links {
            set_opt(&mut self.social_links.facebook, links.facebook);
            set_opt(&mut self.social_links.twitter, links.twitter);
            set_opt(&mut self.social_links.linkedin, links.linkedin);
            set_opt(&mut self.social_links.website, links.website);
        }
        set_opt(&mut self.is_open_to_freelance, update.is_open_to_freelance);
        if let Some(availability) = update.availability {
            set_opt(&mut self.availability.full_time, availability.full_time);
            set_opt(&mut self.availability.part_time, availability.part_time);
        }
        set_opt(&mut self.open_to_collaboration, update.open_to_collaboration);
        set_opt(
            &mut self.open_to_hiring_or_internship,
            update.open_to_hiring_or_internship,
        );
    }
}

/// Split a comma-delimited list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListField {
    Items(Vec<String>),
    Delimited(String),
}

/// Accept either `["a", "b"]` or `"a, b"` for list-valued profile fields.
fn deserialize_list_field<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<ListField>::deserialize(deserializer)?;
    Ok(field.map(|field| match field {
        ListField::Items(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        ListField::Delimited(raw) => split_list(&raw),
    }))
}
