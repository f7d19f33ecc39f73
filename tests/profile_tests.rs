// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile read and multipart update tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};

mod common;
use common::{create_test_app, into_json, TestApp};

const BOUNDARY: &str = "beebark-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn update_profile(
    app: &TestApp,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/users/update-profile")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .send(builder.body(Body::from(multipart_body(parts))).unwrap())
        .await;
    into_json(response).await
}

async fn signed_in(app: &TestApp) -> (String, String) {
    let user = app.register("asha@studio.in", None).await;
    let token = app.login("asha@studio.in", "s3cret-pass").await;
    (user["id"].as_str().unwrap().to_string(), token)
}

#[tokio::test]
async fn test_get_profile_requires_user_id() {
    let app = create_test_app();

    let (status, body) = app.get("/api/users/get-profile", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "User ID is required");

    let (status, _) = app
        .get("/api/users/get-profile?userId=missing-account", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_profile_hides_credentials() {
    let app = create_test_app();
    let (id, _) = signed_in(&app).await;

    let (status, body) = app
        .get(&format!("/api/users/get-profile?userId={id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["userData"]["id"], id.as_str());
    assert_eq!(body["userData"]["category"], "Architect");
    assert!(body["userData"].get("credentialHash").is_none());
}

#[tokio::test]
async fn test_partial_update_keeps_absent_fields() {
    let app = create_test_app();
    let (_, token) = signed_in(&app).await;

    let (status, body) = update_profile(
        &app,
        Some(&token),
        &[
            Part::Text("bio", "Designing calm spaces"),
            Part::Text("yearOfExperience", "12"),
            Part::Text("certifications", "LEED AP,  RIBA , "),
            Part::Text("languageSpoken", r#"["English","Marathi"]"#),
            Part::Text("socialLinks[linkedin]", "https://linkedin.com/in/asha"),
            Part::Text("contact[city]", "Pune"),
            Part::Text("isOpenToFreelance", "true"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let user = &body["user"];
    assert_eq!(user["bio"], "Designing calm spaces");
    assert_eq!(user["yearOfExperience"], 12);
    assert_eq!(user["certifications"], serde_json::json!(["LEED AP", "RIBA"]));
    assert_eq!(user["languageSpoken"], serde_json::json!(["English", "Marathi"]));
    assert_eq!(user["socialLinks"]["linkedin"], "https://linkedin.com/in/asha");
    assert_eq!(user["contact"]["city"], "Pune");
    assert_eq!(user["isOpenToFreelance"], true);
    // Untouched
    assert_eq!(user["firstname"], "Asha");
    assert_eq!(user["phone"], "9876543210");
    assert_eq!(user["email"], "asha@studio.in");
}

#[tokio::test]
async fn test_email_cannot_be_changed_through_profile() {
    let app = create_test_app();
    let (_, token) = signed_in(&app).await;

    let (status, body) = update_profile(
        &app,
        Some(&token),
        &[
            Part::Text("email", "hijack@x.com"),
            Part::Text("password", "plaintext"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "asha@studio.in");
    app.login("asha@studio.in", "s3cret-pass").await;
}

#[tokio::test]
async fn test_images_are_uploaded_to_users_folder() {
    let app = create_test_app();
    let (_, token) = signed_in(&app).await;

    let (status, body) = update_profile(
        &app,
        Some(&token),
        &[
            Part::File("profilePhoto", "me.png", b"\x89PNG photo"),
            Part::File("businessLogo", "logo.png", b"\x89PNG logo"),
            Part::File("coverImage", "", b""),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["user"]["profilePhoto"],
        "https://images.test/users/me.png"
    );
    assert_eq!(
        body["user"]["businessLogo"],
        "https://images.test/users/logo.png"
    );
    // The empty cover part is skipped and the default stays
    assert!(body["user"]["coverImage"]
        .as_str()
        .unwrap()
        .contains("default_cover_image"));
    assert_eq!(app.images.uploads().len(), 2);
}

#[tokio::test]
async fn test_bad_number_is_rejected() {
    let app = create_test_app();
    let (_, token) = signed_in(&app).await;

    let (status, body) = update_profile(
        &app,
        Some(&token),
        &[Part::Text("establishmentYear", "last year")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_update_requires_auth() {
    let app = create_test_app();
    let (status, _) = update_profile(&app, None, &[Part::Text("bio", "x")]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_current_account() {
    let app = create_test_app();
    let (id, token) = signed_in(&app).await;

    let (status, body) = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
}
