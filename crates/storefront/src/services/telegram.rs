//! Telegram order notifications.
//!
//! Posts one HTML-formatted `sendMessage` per order event to the shop's chat.

use std::fmt::Write as _;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::instrument;

use super::ports::{IntegrationError, OrderEvent, OrderEventKind, OrderNotifier};
use crate::config::TelegramConfig;

const SERVICE: &str = "Telegram";
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API notifier.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for the configured bot and chat.
    #[must_use]
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Create a notifier against a different Bot API host.
    #[must_use]
    pub fn with_api_base(config: &TelegramConfig, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl OrderNotifier for TelegramNotifier {
    #[instrument(skip_all, fields(order_id = %event.order.id))]
    async fn notify(&self, event: &OrderEvent) -> Result<(), IntegrationError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );
        let body = json!({
            "chat_id": self.chat_id,
            "text": format_order_event(event),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if status.as_u16() == 401 {
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

/// Escape text for Telegram's HTML parse mode.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Render an order event as a Telegram HTML message.
#[must_use]
pub fn format_order_event(event: &OrderEvent) -> String {
    let order = &event.order;
    let mut text = String::new();

    let headline = match event.kind {
        OrderEventKind::Placed => format!("🛒 <b>New order #{}</b>", escape_html(order.id.as_str())),
        OrderEventKind::StatusChanged { from } => format!(
            "🔄 <b>Order #{}</b>: {} → <b>{}</b>",
            escape_html(order.id.as_str()),
            from,
            order.status
        ),
    };
    let _ = writeln!(text, "{headline}");
    let _ = writeln!(text);

    for item in &order.items {
        let _ = writeln!(
            text,
            "• {} × {} = {}",
            escape_html(&item.product_name),
            item.quantity,
            item.line_total
        );
    }
    let _ = writeln!(text, "<b>Total:</b> {}", order.total);
    let _ = writeln!(text);

    let delivery = &order.delivery;
    let _ = writeln!(text, "👤 {}", escape_html(&delivery.recipient));
    let _ = writeln!(text, "📞 {}", delivery.phone);
    let _ = writeln!(text, "✉️ {}", escape_html(order.customer_email.as_str()));
    let _ = write!(
        text,
        "📍 {}, {}",
        escape_html(&delivery.city),
        escape_html(&delivery.address)
    );
    if let Some(notes) = order.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = write!(text, "\n📝 {}", escape_html(notes));
    }

    text
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use balance_botanica_core::{
        Email, OrderId, OrderStatus, PhoneNumber, Price, ProductId, UserId,
    };

    use super::*;
    use crate::models::{DeliveryDetails, Order, OrderItem};

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new("806039"),
            user_id: UserId::new("u1"),
            status,
            total: Price::from_cents(24_000),
            customer_email: Email::parse("u1@example.com").unwrap(),
            delivery: DeliveryDetails {
                recipient: "Olena <K>".to_owned(),
                phone: PhoneNumber::parse("+380501234567").unwrap(),
                city: "Kyiv".to_owned(),
                address: "Khreshchatyk 1 & 2".to_owned(),
                postal_code: None,
            },
            notes: Some("Call <before>".to_owned()),
            items: vec![OrderItem {
                product_id: ProductId::new("calm-tea"),
                product_name: "Calm tea".to_owned(),
                quantity: 2,
                unit_price: Price::from_cents(12_000),
                line_total: Price::from_cents(24_000),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_escapes_user_text() {
        let text = format_order_event(&OrderEvent {
            kind: OrderEventKind::Placed,
            order: order(OrderStatus::Pending),
        });
        assert!(text.contains("New order #806039"));
        assert!(text.contains("Olena &lt;K&gt;"));
        assert!(text.contains("Khreshchatyk 1 &amp; 2"));
        assert!(text.contains("Call &lt;before&gt;"));
        assert!(text.contains("240.00 UAH"));
        assert!(!text.contains("<K>"));
    }

    #[test]
    fn test_format_status_change() {
        let text = format_order_event(&OrderEvent {
            kind: OrderEventKind::StatusChanged {
                from: OrderStatus::Pending,
            },
            order: order(OrderStatus::Cancelled),
        });
        assert!(text.contains("pending → <b>cancelled</b>"));
    }

    #[tokio::test]
    async fn test_notify_posts_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "-100200",
                "parse_mode": "HTML"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::with_api_base(
            &TelegramConfig {
                bot_token: SecretString::from("123:abc"),
                chat_id: "-100200".to_owned(),
            },
            &server.uri(),
        );
        notifier
            .notify(&OrderEvent {
                kind: OrderEventKind::Placed,
                order: order(OrderStatus::Pending),
            })
            .await
            .unwrap();
    }
}
