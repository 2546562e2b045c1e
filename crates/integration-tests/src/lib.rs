//! Integration tests for the Balance Botanica storefront.
//!
//! Every test builds the full router over an in-memory SQLite database with
//! fake integrations (`storefront::test_support`) and drives it with
//! `tower::ServiceExt::oneshot`, so no server, network or database file is
//! needed.
//!
//! ```bash
//! cargo test -p balance-botanica-integration-tests
//! ```

use std::str::FromStr;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use balance_botanica_core::{Email, OrderId, PhoneNumber, ProductId, UserId};
use balance_botanica_storefront::app;
use balance_botanica_storefront::db::orders::{OrderRecord, insert_item, insert_order};
use balance_botanica_storefront::models::{DeliveryDetails, NewProduct, OrderItem};
use balance_botanica_storefront::state::AppState;
use balance_botanica_storefront::test_support::TestHarness;

/// The one admin account of every test app.
pub const ADMIN_EMAIL: &str = "admin@balancebotanica.com.ua";

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body; a non-JSON body becomes a string, an empty one `Null`.
    pub body: Value,
}

impl TestResponse {
    /// Every full `Set-Cookie` value for `bb_session`, attributes included.
    #[must_use]
    pub fn session_set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|v| v.starts_with("bb_session="))
            .map(str::to_owned)
            .collect()
    }

    /// The `bb_session=...` pair from `Set-Cookie`, ready for a `Cookie` header.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.session_set_cookies()
            .first()
            .and_then(|v| v.split(';').next())
            .map(str::to_owned)
    }

    /// `Max-Age` of the session cookie, in seconds.
    #[must_use]
    pub fn session_max_age(&self) -> Option<i64> {
        self.session_set_cookies().first().and_then(|v| {
            v.split(';')
                .filter_map(|attr| attr.trim().strip_prefix("Max-Age="))
                .find_map(|age| age.parse().ok())
        })
    }
}

/// The router plus handles on its fakes.
pub struct TestApp {
    pub harness: TestHarness,
    router: Router,
}

impl TestApp {
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be set up.
    pub async fn new() -> Self {
        let harness = TestHarness::new(&[ADMIN_EMAIL])
            .await
            .expect("Failed to set up test database");
        let router = app(harness.state.clone());
        Self { harness, router }
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.harness.state
    }

    /// # Panics
    ///
    /// Panics if the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a request with an optional cookie and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<&Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, cookie, None).await
    }

    pub async fn post(&self, path: &str, cookie: Option<&str>, body: &Value) -> TestResponse {
        self.request(Method::POST, path, cookie, Some(body)).await
    }

    pub async fn put(&self, path: &str, cookie: Option<&str>, body: &Value) -> TestResponse {
        self.request(Method::PUT, path, cookie, Some(body)).await
    }

    /// Sign in through `/api/auth/callback` and return the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if sign-in fails.
    pub async fn sign_in(&self, user_id: &str, email: &str) -> String {
        let token = format!("token-{user_id}");
        self.harness.identity.add(&token, user_id, email).await;

        let response = self
            .post(
                "/api/auth/callback",
                None,
                &serde_json::json!({ "access_token": token }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response
            .session_cookie()
            .expect("sign-in must set the session cookie")
    }

    pub async fn sign_in_admin(&self) -> String {
        self.sign_in("admin", ADMIN_EMAIL).await
    }

    /// Add an active product.
    ///
    /// # Panics
    ///
    /// Panics if the product is rejected.
    pub async fn seed_product(&self, id: &str, price: &str, stock: i64) {
        self.state()
            .products()
            .create(NewProduct {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                description: None,
                category: "oils".to_owned(),
                price: Decimal::from_str(price).expect("test price is valid"),
                stock,
                image_urls: Vec::new(),
            })
            .await
            .expect("Failed to seed product");
    }

    /// Write a `pending` order with a fixed id, bypassing stock.
    ///
    /// # Panics
    ///
    /// Panics if the rows cannot be written (e.g. the user does not exist).
    pub async fn insert_order(&self, id: &str, user_id: &str, product_id: &str, quantity: u32) {
        let product = self
            .state()
            .products()
            .get(&ProductId::new(product_id), true)
            .await
            .expect("product must be seeded first");
        let line_total = product.price.times(quantity);
        let delivery = DeliveryDetails {
            recipient: "Olena Test".to_owned(),
            phone: PhoneNumber::parse("+380501234567").expect("test phone is valid"),
            city: "Kyiv".to_owned(),
            address: "Khreshchatyk 1".to_owned(),
            postal_code: None,
        };
        let email = Email::parse(&format!("{user_id}@example.com")).expect("test email is valid");
        let order_id = OrderId::new(id);
        let user_id = UserId::new(user_id);

        let mut conn = self
            .state()
            .pool()
            .acquire()
            .await
            .expect("Failed to acquire connection");
        insert_order(
            &mut conn,
            &OrderRecord {
                id: &order_id,
                user_id: &user_id,
                total_cents: line_total.to_cents().expect("total fits"),
                customer_email: &email,
                delivery: &delivery,
                notes: None,
            },
        )
        .await
        .expect("Failed to insert order");
        insert_item(
            &mut conn,
            &order_id,
            &OrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity,
                unit_price: product.price,
                line_total,
            },
            product.price.to_cents().expect("price fits"),
        )
        .await
        .expect("Failed to insert order item");
    }
}
