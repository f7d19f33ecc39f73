// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time password records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Minimum age of the current code before a resend is allowed.
pub const OTP_RESEND_COOLDOWN_SECS: i64 = 60;

/// The active verification code for an email.
///
/// Stored keyed by email, so issuing a new code replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    pub email: String,
    /// Six ASCII digits, compared as an opaque string
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(email: &str, code: String, now: DateTime<Utc>) -> Self {
        Self {
            email: email.to_string(),
            code,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            created_at: now,
        }
    }

    /// A record is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whole seconds (rounded up) until a resend is allowed, or `None` if it
    /// is allowed now.
    pub fn resend_wait_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let elapsed_ms = (now - self.created_at).num_milliseconds();
        let cooldown_ms = OTP_RESEND_COOLDOWN_SECS * 1000;
        if elapsed_ms >= cooldown_ms {
            return None;
        }
        let remaining_ms = (cooldown_ms - elapsed_ms) as u64;
        Some(remaining_ms.div_ceil(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn validity_ends_exactly_at_expiry() {
        let record = OtpRecord::new("a@x.com", "123456".to_string(), at(0));
        assert!(record.is_valid_at(at(OTP_TTL_MINUTES * 60 - 1)));
        assert!(!record.is_valid_at(at(OTP_TTL_MINUTES * 60)));
    }

    #[test]
    fn resend_wait_rounds_up() {
        let record = OtpRecord::new("a@x.com", "123456".to_string(), at(0));
        assert_eq!(record.resend_wait_secs(at(0)), Some(60));
        assert_eq!(
            record.resend_wait_secs(at(0) + Duration::milliseconds(59_001)),
            Some(1)
        );
        assert_eq!(record.resend_wait_secs(at(60)), None);
    }
}
