//! Order export to the shop's spreadsheet.
//!
//! The spreadsheet side is a web-app script that accepts
//! `{"rows": [...]}` and upserts each row by `order_id`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;
use url::Url;

use super::ports::{IntegrationError, OrderSheet, SheetRow};
use crate::config::SheetsConfig;

const SERVICE: &str = "Spreadsheet";

/// Header carrying the shared secret.
pub const SYNC_SECRET_HEADER: &str = "x-sync-secret";

#[derive(Serialize)]
struct UpsertRequest<'a> {
    rows: &'a [SheetRow],
}

/// Spreadsheet web-app client.
#[derive(Clone)]
pub struct SheetsWebhook {
    client: reqwest::Client,
    url: Url,
    secret: SecretString,
}

impl SheetsWebhook {
    /// Create a client for the configured endpoint.
    #[must_use]
    pub fn new(config: &SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.webhook_url.clone(),
            secret: config.secret.clone(),
        }
    }
}

#[async_trait]
impl OrderSheet for SheetsWebhook {
    #[instrument(skip_all, fields(rows = rows.len()))]
    async fn upsert_rows(&self, rows: &[SheetRow]) -> Result<(), IntegrationError> {
        if rows.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.url.clone())
            .header(SYNC_SECRET_HEADER, self.secret.expose_secret())
            .json(&UpsertRequest { rows })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(IntegrationError::Unauthorized(SERVICE));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use balance_botanica_core::{Email, OrderId, OrderStatus};

    use super::*;

    fn webhook(server: &MockServer) -> SheetsWebhook {
        SheetsWebhook::new(&SheetsConfig {
            webhook_url: Url::parse(&format!("{}/exec", server.uri())).unwrap(),
            secret: SecretString::from("s3cr3t"),
        })
    }

    fn row() -> SheetRow {
        SheetRow {
            order_id: OrderId::new("806039"),
            created_at: "2025-03-01T10:00:00+00:00".to_owned(),
            status: OrderStatus::Pending,
            customer_email: Email::parse("u1@example.com").unwrap(),
            recipient: "Olena K".to_owned(),
            phone: "+380501234567".to_owned(),
            city: "Kyiv".to_owned(),
            address: "Nova Poshta #12".to_owned(),
            items: "Calm tea x2".to_owned(),
            total: "240.00".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_posts_rows_with_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(SYNC_SECRET_HEADER, "s3cr3t"))
            .and(body_partial_json(json!({
                "rows": [{ "order_id": "806039", "status": "pending" }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        webhook(&server).upsert_rows(&[row()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let result = webhook(&server).upsert_rows(&[row()]).await;
        assert!(matches!(
            result,
            Err(IntegrationError::Api { status: 500, .. })
        ));
    }
}
