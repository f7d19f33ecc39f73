// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound email.
//!
//! Delivery goes through a transactional mail HTTP API. Callers treat every
//! send as best-effort: a failure is logged by the caller and never undoes
//! the write that triggered it.

use crate::config::MailConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const MAIL_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport timed out: {0}")]
    Timeout(String),

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Email delivery collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// JSON body accepted by the mail API.
#[derive(Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    reply_to: &'a str,
}

/// Mailer backed by an HTTP mail API.
pub struct HttpMailer {
    http: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(MAIL_HTTP_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let body = SendMailRequest {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            reply_to: &self.config.reply_to,
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailError::Timeout(e.to_string())
                } else {
                    MailError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Mailer that only logs. Used when no mail API is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            subject = %message.subject,
            "Mail API not configured, email not delivered"
        );
        Ok(())
    }
}

/// Message templates.
pub mod templates {
    use super::EmailMessage;

    /// Escape text for an HTML body or a quoted attribute.
    fn escape_html(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                c => escaped.push(c),
            }
        }
        escaped
    }

    pub fn welcome(to: &str, first_name: &str) -> EmailMessage {
        let first_name = escape_html(first_name);
        EmailMessage {
            to: to.to_string(),
            subject: "Welcome to Beebark - Let's Get You Started".to_string(),
            html: format!(
                r#"<div style="font-family: Arial, sans-serif; font-size: 16px; line-height: 1.6;">
<p>Hi {first_name},</p>
<p>Thanks for signing up on <strong>Beebark</strong>. You've taken the first step into a growing ecosystem designed to connect people, ideas, and possibilities in the built environment.</p>
<p>To complete your registration, we just need to verify your email.</p>
<p><strong>Next Step:</strong> Please check your inbox for the OTP and enter it to confirm your email.</p>
<p>If you didn't request this registration, feel free to ignore this message.</p>
<p>See you on the inside,</p>
<p><strong>Team Beebark</strong></p>
</div>"#
            ),
        }
    }

    pub fn email_verified(to: &str, first_name: &str) -> EmailMessage {
        let first_name = escape_html(first_name);
        EmailMessage {
            to: to.to_string(),
            subject: "Your Beebark email is verified".to_string(),
            html: format!(
                "<p>Hi {first_name},</p>\
                 <p>Your email has been verified. Welcome to <strong>Beebark</strong>!</p>\
                 <p>With purpose,<br/>Team Beebark</p>"
            ),
        }
    }

    pub fn verification_otp(to: &str, code: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: format!("Your Beebark OTP is {code}"),
            html: format!(
                "<p>Hi User,</p>\
                 <p>Your One-Time Password (OTP) for verifying your email with Beebark is:</p>\
                 <p><strong>{code}</strong></p>\
                 <p>Please enter this on the verification page to continue your onboarding.</p>\
                 <p>The OTP is valid for 10 minutes.</p>\
                 <p>If you didn't request this, please ignore this email.</p>\
                 <p>With purpose,<br/>Team Beebark</p>"
            ),
        }
    }

    pub fn password_reset_otp(to: &str, code: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Reset Password OTP".to_string(),
            html: format!(
                "<p>Your OTP is: <strong>{code}</strong></p>\
                 <p>Please check your Spam folder if you're not seeing it in Inbox.</p>"
            ),
        }
    }

    pub fn invitation(to: &str, referrer_name: &str, signup_link: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: format!("{referrer_name} invited you to join Beebark"),
            html: format!(
                "<p>Hi,</p>\
                 <p>{name} thinks you'd be a great fit for <strong>Beebark</strong>, \
                 the network for people building the built environment.</p>\
                 <p><a href=\"{link}\">Create your account</a></p>\
                 <p>With purpose,<br/>Team Beebark</p>",
                name = escape_html(referrer_name),
                link = escape_html(signup_link),
            ),
        }
    }
}
