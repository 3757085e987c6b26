//! Login, logout, registration and profile flows.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cafe_origen_integration_tests::{CUSTOMER_EMAIL, TestApp, location};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_login_stores_user_and_favorites() {
    let app = TestApp::spawn().await;
    app.backend.data().favorites = vec![2];

    let response = app.login().await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile");

    let home = app.get("/").await.text().await.unwrap();
    assert!(home.contains("Log out"));
    assert!(home.contains(">ana</a>"));

    let store: Value = app.get("/api/store").await.json().await.unwrap();
    let favorites = store["favorites"].as_array().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["uid"], 2);
    assert_eq!(favorites[0]["name"], "Colombia Huila");
}

#[tokio::test]
async fn test_login_follows_safe_return_path() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", "cafecito1"),
                ("return_to", "/shopping-cart"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/shopping-cart");
}

#[tokio::test]
async fn test_login_ignores_offsite_return_path() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", "cafecito1"),
                ("return_to", "//evil.test/phish"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/profile");
}

#[tokio::test]
async fn test_wrong_password_shows_backend_message() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/login",
            &[("email", CUSTOMER_EMAIL), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response.text().await.unwrap();
    assert!(body.contains("Incorrect password"));
    assert!(body.contains(CUSTOMER_EMAIL));
}

#[tokio::test]
async fn test_unknown_email_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/login",
            &[("email", "nadie@example.com"), ("password", "cafecito1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.text().await.unwrap().contains("User not found"));
}

#[tokio::test]
async fn test_backend_failure_during_login_is_bad_gateway() {
    let app = TestApp::spawn().await;
    app.backend.data().login_fails = true;

    let response = app
        .post_form(
            "/login",
            &[("email", CUSTOMER_EMAIL), ("password", "cafecito1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let profile = app.get("/profile").await;
    assert!(location(&profile).starts_with("/login"));
}

#[tokio::test]
async fn test_login_form_requires_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form("/login", &[("email", ""), ("password", "")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Email is required"));
    assert!(body.contains("Password is required"));
}

#[tokio::test]
async fn test_profile_requires_login() {
    let app = TestApp::spawn().await;

    let response = app.get("/profile").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?return_to=%2Fprofile");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app.post_form("/logout", &[]).await;
    assert_eq!(location(&response), "/");

    let home = app.get("/").await.text().await.unwrap();
    assert!(home.contains("You have been logged out."));
    assert!(home.contains("Sign up"));

    let store: Value = app.get("/api/store").await.json().await.unwrap();
    assert!(store["favorites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_revoked_token_expires_session() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.backend.data().tokens_revoked = true;

    let response = app.get("/profile").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let login_page = app.get("/login").await.text().await.unwrap();
    assert!(login_page.contains("Your session has expired. Please log in again."));

    let again = app.get("/profile").await;
    assert_eq!(location(&again), "/login?return_to=%2Fprofile");
}

#[tokio::test]
async fn test_register_then_login() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/register",
            &[
                ("email", "luis@example.com"),
                ("user_name", "luis"),
                ("first_name", "Luis"),
                ("last_name", "Gómez"),
                ("phone", "+34-611-22-33-44"),
                ("address", ""),
                ("password", "tostado9"),
                ("confirm_password", "tostado9"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let login_page = app.get("/login").await.text().await.unwrap();
    assert!(login_page.contains("Account created successfully!"));

    let sent = app.backend.data().registrations[0].clone();
    assert_eq!(sent["email"], "luis@example.com");
    assert_eq!(sent["phone"], "+34-611-22-33-44");
    assert!(sent.get("address").is_none());

    let response = app
        .post_form(
            "/login",
            &[("email", "luis@example.com"), ("password", "tostado9")],
        )
        .await;
    assert_eq!(location(&response), "/profile");
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/register",
            &[
                ("email", "luis@example.com"),
                ("user_name", "luis"),
                ("phone", "+34-611-22-33-44"),
                ("password", "tostado9"),
                ("confirm_password", "tostado8"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Passwords do not match"));
    assert!(!body.contains("tostado9"));
    assert!(app.backend.data().registrations.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email_shows_backend_error() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/register",
            &[
                ("email", CUSTOMER_EMAIL),
                ("user_name", "ana2"),
                ("phone", "+34-611-22-33-44"),
                ("password", "tostado9"),
                ("confirm_password", "tostado9"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("User already exists"));
}

#[tokio::test]
async fn test_profile_shows_backend_data() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app.get("/profile").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Calle Mayor 1, Madrid"));
    assert!(body.contains(CUSTOMER_EMAIL));
}

#[tokio::test]
async fn test_profile_update_validates_before_sending() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app
        .post_form(
            "/profile",
            &[
                ("email", "not-an-email"),
                ("user_name", "ana"),
                ("first_name", "Ana"),
                ("last_name", "Ruiz"),
                ("phone", "call me"),
                ("address", "Calle Mayor 1, Madrid"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Email is invalid"));
    assert!(body.contains("Please fix the errors in the form"));
    assert!(app.backend.data().profile_updates.is_empty());
}

#[tokio::test]
async fn test_profile_update_refreshes_navbar() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app
        .post_form(
            "/profile",
            &[
                ("email", CUSTOMER_EMAIL),
                ("user_name", "ana_tostadora"),
                ("first_name", "Ana"),
                ("last_name", "Ruiz"),
                ("phone", "+34-600-12-34-56"),
                ("address", "Calle Mayor 1, Madrid"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile");

    let body = app.get("/profile").await.text().await.unwrap();
    assert!(body.contains("User data updated successfully"));
    assert!(body.contains(">ana_tostadora</a>"));

    let update = app.backend.data().profile_updates[0].clone();
    assert!(update.get("password").is_none());
}

#[tokio::test]
async fn test_delete_account_logs_out() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app.post_form("/profile/delete", &[]).await;
    assert_eq!(location(&response), "/");
    assert!(app.backend.data().users.is_empty());

    let home = app.get("/").await.text().await.unwrap();
    assert!(home.contains("User deleted"));
    assert!(home.contains("Log in"));
}
