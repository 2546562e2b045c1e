//! Placing, viewing and cancelling orders.

use axum::http::StatusCode;
use serde_json::{Value, json};

use balance_botanica_integration_tests::TestApp;

fn delivery() -> Value {
    json!({
        "recipient": "Olena Koval",
        "phone": "+380 (50) 123-45-67",
        "city": "Lviv",
        "address": "Svobody Ave 10, apt 4",
    })
}

#[tokio::test]
async fn test_owner_cancels_pending_order_other_user_is_denied() {
    let app = TestApp::new().await;
    let u1 = app.sign_in("u1", "u1@example.com").await;
    let u2 = app.sign_in("u2", "u2@example.com").await;
    app.seed_product("rose-oil", "450.00", 10).await;
    app.insert_order("806039", "u1", "rose-oil", 1).await;

    let denied = app
        .post("/api/orders/806039/cancel", Some(&u2), &json!({}))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["error"], "access denied");

    let cancelled = app
        .post("/api/orders/806039/cancel", Some(&u1), &json!({}))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["status"], "cancelled");

    let again = app
        .post("/api/orders/806039/cancel", Some(&u1), &json!({}))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_only_owner_can_view_order() {
    let app = TestApp::new().await;
    let u1 = app.sign_in("u1", "u1@example.com").await;
    let u2 = app.sign_in("u2", "u2@example.com").await;
    app.seed_product("rose-oil", "450.00", 10).await;
    app.insert_order("806039", "u1", "rose-oil", 2).await;

    let own = app.get("/api/orders/806039", Some(&u1)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["total"]["amount"], "900.00");

    let other = app.get("/api/orders/806039", Some(&u2)).await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let missing = app.get("/api/orders/000001", Some(&u1)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let anonymous = app.get("/api/orders/806039", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_place_order_takes_stock_and_notifies() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("u1", "u1@example.com").await;
    app.seed_product("rose-oil", "450.00", 3).await;
    app.seed_product("mint-tea", "120.50", 10).await;

    let placed = app
        .post(
            "/api/orders",
            Some(&cookie),
            &json!({
                "items": [
                    { "product_id": "rose-oil", "quantity": 2 },
                    { "product_id": "mint-tea", "quantity": 1 },
                ],
                "delivery": delivery(),
                "notes": "Call before delivery",
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    assert_eq!(placed.body["status"], "pending");
    assert_eq!(placed.body["total"]["amount"], "1020.50");
    assert_eq!(placed.body["delivery"]["phone"], "+380501234567");

    let id = placed.body["id"].as_str().unwrap_or_default().to_owned();
    assert_eq!(id.len(), 6);
    assert!(id.chars().all(|c| c.is_ascii_digit()));

    let product = app.get("/api/products/rose-oil", None).await;
    assert_eq!(product.body["stock"], 1);

    let mine = app.get("/api/orders", Some(&cookie)).await;
    assert_eq!(mine.body.as_array().map(Vec::len), Some(1));

    assert_eq!(app.harness.notifier.events().await.len(), 1);
    let rows = app.harness.sheet.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id.as_str(), id);
}

#[tokio::test]
async fn test_order_beyond_stock_is_rejected_and_rolled_back() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("u1", "u1@example.com").await;
    app.seed_product("rose-oil", "450.00", 5).await;
    app.seed_product("mint-tea", "120.50", 1).await;

    let response = app
        .post(
            "/api/orders",
            Some(&cookie),
            &json!({
                "items": [
                    { "product_id": "rose-oil", "quantity": 2 },
                    { "product_id": "mint-tea", "quantity": 3 },
                ],
                "delivery": delivery(),
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let rose = app.get("/api/products/rose-oil", None).await;
    assert_eq!(rose.body["stock"], 5);
    let mine = app.get("/api/orders", Some(&cookie)).await;
    assert_eq!(mine.body, json!([]));
    assert!(app.harness.notifier.events().await.is_empty());
}

#[tokio::test]
async fn test_cancel_returns_stock() {
    let app = TestApp::new().await;
    let cookie = app.sign_in("u1", "u1@example.com").await;
    app.seed_product("rose-oil", "450.00", 4).await;

    let placed = app
        .post(
            "/api/orders",
            Some(&cookie),
            &json!({
                "items": [{ "product_id": "rose-oil", "quantity": 3 }],
                "delivery": delivery(),
            }),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    let id = placed.body["id"].as_str().unwrap_or_default().to_owned();

    let cancelled = app
        .post(&format!("/api/orders/{id}/cancel"), Some(&cookie), &json!({}))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);

    let rose = app.get("/api/products/rose-oil", None).await;
    assert_eq!(rose.body["stock"], 4);
}

#[tokio::test]
async fn test_admin_moves_order_forward_only() {
    let app = TestApp::new().await;
    let customer = app.sign_in("u1", "u1@example.com").await;
    let admin = app.sign_in_admin().await;
    app.seed_product("rose-oil", "450.00", 10).await;
    app.insert_order("806039", "u1", "rose-oil", 1).await;

    let by_customer = app
        .put(
            "/api/orders/806039/status",
            Some(&customer),
            &json!({ "status": "confirmed" }),
        )
        .await;
    assert_eq!(by_customer.status, StatusCode::FORBIDDEN);

    for status in ["confirmed", "delivered"] {
        let response = app
            .put(
                "/api/orders/806039/status",
                Some(&admin),
                &json!({ "status": status }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        assert_eq!(response.body["status"], status);
    }

    for status in ["pending", "confirmed", "cancelled"] {
        let response = app
            .put(
                "/api/orders/806039/status",
                Some(&admin),
                &json!({ "status": status }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT, "delivered -> {status}");
    }

    let delivered = app.get("/api/admin/orders?status=delivered", Some(&admin)).await;
    assert_eq!(delivered.body.as_array().map(Vec::len), Some(1));
    let pending = app.get("/api/admin/orders?status=pending", Some(&admin)).await;
    assert_eq!(pending.body, json!([]));

    // Placed is not recorded for a direct insert; two status changes are.
    assert_eq!(app.harness.notifier.events().await.len(), 2);
}

#[tokio::test]
async fn test_cart_quote_prices_from_catalogue() {
    let app = TestApp::new().await;
    app.seed_product("rose-oil", "450.00", 10).await;

    let quote = app
        .post(
            "/api/cart/quote",
            None,
            &json!({ "items": [
                { "product_id": "rose-oil", "quantity": 1 },
                { "product_id": "rose-oil", "quantity": 2 },
            ]}),
        )
        .await;
    assert_eq!(quote.status, StatusCode::OK);
    assert_eq!(quote.body["total"]["amount"], "1350.00");
    assert_eq!(quote.body["item_count"], 3);

    let empty = app.post("/api/cart/quote", None, &json!({ "items": [] })).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .post(
            "/api/cart/quote",
            None,
            &json!({ "items": [{ "product_id": "ghost", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_get_json_400() {
    let app = TestApp::new().await;
    let admin = app.sign_in_admin().await;
    let customer = app.sign_in("u1", "u1@example.com").await;
    app.seed_product("rose-oil", "450.00", 10).await;
    app.insert_order("806039", "u1", "rose-oil", 1).await;

    let unknown_status = app
        .put(
            "/api/orders/806039/status",
            Some(&admin),
            &json!({ "status": "shipped" }),
        )
        .await;
    assert_eq!(unknown_status.status, StatusCode::BAD_REQUEST);
    assert!(unknown_status.body["error"].is_string(), "{:?}", unknown_status.body);

    let bad_filter = app.get("/api/admin/orders?status=shipped", Some(&admin)).await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);
    assert!(bad_filter.body["error"].is_string());

    let missing_delivery = app
        .post(
            "/api/orders",
            Some(&customer),
            &json!({ "items": [{ "product_id": "rose-oil", "quantity": 1 }] }),
        )
        .await;
    assert_eq!(missing_delivery.status, StatusCode::BAD_REQUEST);
    assert!(missing_delivery.body["error"].is_string());

    let order = app.get("/api/orders/806039", Some(&customer)).await;
    assert_eq!(order.body["status"], "pending");
}

#[tokio::test]
async fn test_overflowing_quantities_are_rejected() {
    let app = TestApp::new().await;
    app.seed_product("rose-oil", "450.00", 10).await;

    let quote = app
        .post(
            "/api/cart/quote",
            None,
            &json!({ "items": [
                { "product_id": "rose-oil", "quantity": i64::MAX },
                { "product_id": "rose-oil", "quantity": 1 },
            ]}),
        )
        .await;
    assert_eq!(quote.status, StatusCode::BAD_REQUEST);
    assert!(quote.body["error"].is_string());
}
