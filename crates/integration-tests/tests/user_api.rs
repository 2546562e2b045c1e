//! Profile and saved delivery addresses.

use axum::http::{Method, StatusCode};
use serde_json::json;

use balance_botanica_integration_tests::TestApp;

#[tokio::test]
async fn test_profile_update_validates_fields() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("u1", "olena@example.com").await;

    let updated = app
        .put(
            "/api/user/profile",
            Some(&cookie),
            &json!({ "first_name": "  Olena ", "phone": "050 123 45 67" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{:?}", updated.body);
    assert_eq!(updated.body["first_name"], "Olena");
    assert_eq!(updated.body["phone"], "0501234567");

    let bad_phone = app
        .put("/api/user/profile", Some(&cookie), &json!({ "phone": "12" }))
        .await;
    assert_eq!(bad_phone.status, StatusCode::BAD_REQUEST);
    assert!(bad_phone.body["error"].is_string());

    let too_long = app
        .put(
            "/api/user/profile",
            Some(&cookie),
            &json!({ "last_name": "x".repeat(101) }),
        )
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);

    let anonymous = app
        .put("/api/user/profile", None, &json!({ "first_name": "Eve" }))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_addresses_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let u1 = app.sign_in("u1", "u1@example.com").await;
    let u2 = app.sign_in("u2", "u2@example.com").await;

    let created = app
        .post(
            "/api/user/addresses",
            Some(&u1),
            &json!({
                "recipient_name": "Olena Koval",
                "phone": "+380501234567",
                "city": "Odesa",
                "address_line": "Derybasivska 5",
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    let id = created.body["id"].as_str().unwrap_or_default().to_owned();

    let listed = app.get("/api/user/addresses", Some(&u1)).await;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
    let others = app.get("/api/user/addresses", Some(&u2)).await;
    assert_eq!(others.body, json!([]));

    let path = format!("/api/user/addresses/{id}");
    let stolen = app.request(Method::DELETE, &path, Some(&u2), None).await;
    assert_eq!(stolen.status, StatusCode::NOT_FOUND);

    let deleted = app.request(Method::DELETE, &path, Some(&u1), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let listed = app.get("/api/user/addresses", Some(&u1)).await;
    assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn test_address_requires_fields() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("u1", "u1@example.com").await;

    let response = app
        .post(
            "/api/user/addresses",
            Some(&cookie),
            &json!({
                "recipient_name": " ",
                "phone": "+380501234567",
                "city": "Odesa",
                "address_line": "Derybasivska 5",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
