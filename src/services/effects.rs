// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outcome of an operation whose primary write succeeded but whose
//! secondary effects (emails, referral rewards) may have failed.
//!
//! Secondary failures are logged when recorded and never reach the client.

use std::fmt;

/// A best-effort effect that follows a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    WelcomeEmail,
    OtpIssue,
    OtpEmail,
    InvitationEmail,
    ReferralReward,
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SideEffect::WelcomeEmail => "welcome_email",
            SideEffect::OtpIssue => "otp_issue",
            SideEffect::OtpEmail => "otp_email",
            SideEffect::InvitationEmail => "invitation_email",
            SideEffect::ReferralReward => "referral_reward",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectFailure {
    pub effect: SideEffect,
    pub error: String,
}

/// Primary result plus any secondary-effect failures.
#[derive(Debug)]
#[must_use]
pub struct Completed<T> {
    pub value: T,
    pub failures: Vec<SideEffectFailure>,
}

impl<T> Completed<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }

    /// Record (and log) a failed secondary effect.
    pub fn record(&mut self, effect: SideEffect, error: impl fmt::Display) {
        let error = error.to_string();
        tracing::warn!(effect = %effect, error = %error, "Secondary effect failed");
        self.failures.push(SideEffectFailure { effect, error });
    }

    /// Merge the failures of a nested operation and return its value.
    pub fn absorb<U>(&mut self, other: Completed<U>) -> U {
        self.failures.extend(other.failures);
        other.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completed<U> {
        Completed {
            value: f(self.value),
            failures: self.failures,
        }
    }

    pub fn failed(&self, effect: SideEffect) -> bool {
        self.failures.iter().any(|f| f.effect == effect)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_keeps_nested_failures() {
        let mut outer = Completed::new(1);
        let mut inner = Completed::new("inner");
        inner.record(SideEffect::OtpEmail, "smtp down");

        let value = outer.absorb(inner);

        assert_eq!(value, "inner");
        assert!(outer.failed(SideEffect::OtpEmail));
        assert!(!outer.failed(SideEffect::WelcomeEmail));
        assert_eq!(outer.into_value(), 1);
    }
}
