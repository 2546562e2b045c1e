//! Products and admin-only routes.

use axum::http::StatusCode;
use serde_json::json;

use balance_botanica_integration_tests::TestApp;

#[tokio::test]
async fn test_product_listing_filters_category_and_inactive() {
    let app = TestApp::new().await;
    app.seed_product("rose-oil", "450.00", 10).await;
    app.seed_product("argan-oil", "300.00", 0).await;
    let admin = app.sign_in_admin().await;

    let hidden = app
        .put(
            "/api/products/argan-oil",
            Some(&admin),
            &json!({ "active": false }),
        )
        .await;
    assert_eq!(hidden.status, StatusCode::OK);

    let oils = app.get("/api/products?category=oils", None).await;
    assert_eq!(oils.status, StatusCode::OK);
    let ids: Vec<_> = oils
        .body
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, ["rose-oil"]);

    let teas = app.get("/api/products?category=teas", None).await;
    assert_eq!(teas.body, json!([]));

    let inactive = app.get("/api/products/argan-oil", None).await;
    assert_eq!(inactive.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_admins_create_products() {
    let app = TestApp::new().await;
    let customer = app.sign_in("u1", "u1@example.com").await;
    let admin = app.sign_in_admin().await;
    let product = json!({
        "id": "lavender-soap",
        "name": "Lavender soap",
        "category": "soaps",
        "price": "95.00",
        "stock": 20,
    });

    let anonymous = app.post("/api/products", None, &product).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app.post("/api/products", Some(&customer), &product).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let created = app.post("/api/products", Some(&admin), &product).await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.body["price"]["amount"], "95.00");

    let duplicate = app.post("/api/products", Some(&admin), &product).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let negative = app
        .post(
            "/api/products",
            Some(&admin),
            &json!({ "id": "x", "name": "X", "category": "soaps", "price": "-1" }),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_sync_pushes_every_order() {
    let app = TestApp::new().await;
    let admin = app.sign_in_admin().await;
    app.sign_in("u1", "u1@example.com").await;
    app.seed_product("rose-oil", "450.00", 10).await;
    app.insert_order("806039", "u1", "rose-oil", 1).await;
    app.insert_order("806040", "u1", "rose-oil", 2).await;

    let started = app.post("/api/orders/sync", Some(&admin), &json!({})).await;
    assert_eq!(started.status, StatusCode::ACCEPTED);

    let mut report = None;
    for _ in 0..100 {
        let status = app.get("/api/orders/sync", Some(&admin)).await;
        if status.body["running"] == false && !status.body["last_report"].is_null() {
            report = Some(status.body["last_report"].clone());
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let report = report.unwrap_or_default();
    assert_eq!(report["orders_synced"], 2);
    assert_eq!(report["pages_failed"], 0);
    assert_eq!(app.harness.sheet.rows().await.len(), 2);
}

#[tokio::test]
async fn test_image_routes_need_configuration() {
    let app = TestApp::new().await;
    let admin = app.sign_in_admin().await;

    let signature = app.get("/api/cloudinary/signature", Some(&admin)).await;
    assert_eq!(signature.status, StatusCode::SERVICE_UNAVAILABLE);

    let anonymous = app.get("/api/cloudinary/signature", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
