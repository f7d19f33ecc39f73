// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP verification and password reset flows.
//!
//! Time is driven by the manual clock, so expiry and the resend cooldown are
//! exercised without sleeping.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use beebark_accounts::db::Store;
use chrono::Duration;
use serde_json::json;

mod common;
use common::{create_test_app, into_json, wrong_code};

#[tokio::test]
async fn test_verify_wrong_then_right_then_again() {
    let app = create_test_app();
    let user = app.register("asha@studio.in", None).await;
    let code = app.active_code("asha@studio.in").await.unwrap();

    let (status, body) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": wrong_code(&code) }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_or_expired_otp");

    let (status, body) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP verified successfully");

    let (_, profile) = app
        .get(
            &format!("/api/users/get-profile?userId={}", user["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(profile["userData"]["isVerified"], true);

    let (status, _) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_verify_leaves_state_untouched() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;
    let before = app.db.get_otp("asha@studio.in").await.unwrap().unwrap();

    let (status, _) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": wrong_code(&before.code) }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let after = app.db.get_otp("asha@studio.in").await.unwrap().unwrap();
    assert_eq!(before, after);
    let account = app
        .db
        .find_account_by_email("asha@studio.in")
        .await
        .unwrap()
        .unwrap();
    assert!(!account.is_verified);
}

#[tokio::test]
async fn test_successful_verify_sends_confirmation_email() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;
    let code = app.active_code("asha@studio.in").await.unwrap();

    app.post_json(
        "/api/otp/verify-otp",
        json!({ "email": "asha@studio.in", "otp": code }),
        None,
    )
    .await;

    let last = app.mailer.messages_to("asha@studio.in").pop().unwrap();
    assert_eq!(last.subject, "Your Beebark email is verified");
    assert!(last.html.contains("Hi Asha"));
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;
    let code = app.active_code("asha@studio.in").await.unwrap();

    app.clock.advance(Duration::minutes(10));

    let (status, _) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_otp_replaces_previous_code() {
    let app = create_test_app();
    let (status, body) = app
        .post_json("/api/otp/send-otp", json!({ "email": "new@x.com" }), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent");
    let first = app.active_code("new@x.com").await.unwrap();

    app.post_json("/api/otp/send-otp", json!({ "email": "new@x.com" }), None)
        .await;
    let second = app.active_code("new@x.com").await.unwrap();
    assert_eq!(app.db.otp_count("new@x.com").await, 1);

    if first != second {
        let (status, _) = app
            .post_json(
                "/api/otp/verify-otp",
                json!({ "email": "new@x.com", "otp": first }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_resend_is_rate_limited_for_sixty_seconds() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;

    app.clock.advance(Duration::seconds(20));
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/otp/resend-otp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "email": "asha@studio.in" }).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "40");
    let (_, body) = into_json(response).await;
    assert_eq!(
        body["details"],
        "Please wait 40 seconds before requesting a new OTP."
    );

    app.clock.advance(Duration::seconds(40));
    let (status, body) = app
        .post_json("/api/otp/resend-otp", json!({ "email": "asha@studio.in" }), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "A new OTP has been sent to your email.");

    let (status, _) = app
        .post_json("/api/otp/resend-otp", json!({ "email": "asha@studio.in" }), None)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_resend_remaining_seconds_round_up() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;

    app.clock.advance(Duration::milliseconds(59_500));
    let (status, body) = app
        .post_json("/api/otp/resend-otp", json!({ "email": "asha@studio.in" }), None)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["details"],
        "Please wait 1 seconds before requesting a new OTP."
    );
}

#[tokio::test]
async fn test_forgot_password_code_expires_after_ten_minutes() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;

    let (status, body) = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "asha@studio.in" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent to email");
    let code = app.active_code("asha@studio.in").await.unwrap();
    let reset_mail = app.mailer.messages_to("asha@studio.in").pop().unwrap();
    assert_eq!(reset_mail.subject, "Reset Password OTP");

    app.clock.advance(Duration::minutes(11));

    let (status, _) = app
        .post_json(
            "/api/auth/verify-forgot-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_password_unknown_email_is_bad_request() {
    let app = create_test_app();
    let (status, body) = app
        .post_json(
            "/api/auth/forgot-password",
            json!({ "email": "nobody@x.com" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "User not found");
    assert_eq!(app.db.otp_count("nobody@x.com").await, 0);
}

#[tokio::test]
async fn test_reset_flow_changes_password() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;

    app.post_json(
        "/api/auth/forgot-password",
        json!({ "email": "asha@studio.in" }),
        None,
    )
    .await;
    let code = app.active_code("asha@studio.in").await.unwrap();

    let (status, body) = app
        .post_json(
            "/api/auth/verify-forgot-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "OTP verified. You can now reset your password."
    );
    assert_eq!(app.db.otp_count("asha@studio.in").await, 0);

    let (status, _) = app
        .post_json(
            "/api/auth/reset-password",
            json!({ "email": "asha@studio.in", "newPassword": "brand-new-pass" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.login("asha@studio.in", "brand-new-pass").await;
    let (status, _) = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "asha@studio.in", "password": "s3cret-pass" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_verification_does_not_verify_email() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;

    app.post_json(
        "/api/auth/forgot-password",
        json!({ "email": "asha@studio.in" }),
        None,
    )
    .await;
    let code = app.active_code("asha@studio.in").await.unwrap();
    app.post_json(
        "/api/auth/verify-forgot-otp",
        json!({ "email": "asha@studio.in", "otp": code }),
        None,
    )
    .await;

    let account = app
        .db
        .find_account_by_email("asha@studio.in")
        .await
        .unwrap()
        .unwrap();
    assert!(!account.is_verified);
}

#[tokio::test]
async fn test_padded_code_is_rejected() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;
    let code = app.active_code("asha@studio.in").await.unwrap();

    for padded in [format!(" {code}"), format!("{code}\n"), format!("{code} ")] {
        let (status, body) = app
            .post_json(
                "/api/otp/verify-otp",
                json!({ "email": "asha@studio.in", "otp": padded }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_or_expired_otp");
    }
    assert_eq!(app.active_code("asha@studio.in").await, Some(code));
}

#[tokio::test]
async fn test_failed_verify_write_keeps_code_usable() {
    let app = create_test_app();
    app.register("asha@studio.in", None).await;
    let code = app.active_code("asha@studio.in").await.unwrap();
    app.store.set_failing_account_writes(true);

    let (status, body) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert_eq!(app.active_code("asha@studio.in").await, Some(code.clone()));
    let account = app
        .db
        .find_account_by_email("asha@studio.in")
        .await
        .unwrap()
        .unwrap();
    assert!(!account.is_verified);

    app.store.set_failing_account_writes(false);
    let (status, _) = app
        .post_json(
            "/api/otp/verify-otp",
            json!({ "email": "asha@studio.in", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let account = app
        .db
        .find_account_by_email("asha@studio.in")
        .await
        .unwrap()
        .unwrap();
    assert!(account.is_verified);
    assert_eq!(app.active_code("asha@studio.in").await, None);
}
