//! In-memory database and fake integrations for tests.
//!
//! Enabled with the `test-support` feature so the integration-test crate can
//! build a full [`AppState`] without a database file or network access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use balance_botanica_core::{Email, UserId};

use crate::config::StorefrontConfig;
use crate::db::{RepositoryError, create_memory_pool};
use crate::services::ports::{
    Identity, IdentityProvider, IntegrationError, OrderEvent, OrderNotifier, OrderSheet, SheetRow,
};
use crate::state::{AppState, Integrations};

/// Configuration with only the required variables plus `admin_emails`.
///
/// # Panics
///
/// Panics if an admin email is malformed.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_config(admin_emails: &[&str]) -> StorefrontConfig {
    let vars: HashMap<String, String> = [
        ("BB_DATABASE_URL", "sqlite::memory:".to_string()),
        ("BB_BASE_URL", "http://localhost:3000".to_string()),
        ("SUPABASE_URL", "http://localhost:54321".to_string()),
        ("SUPABASE_ANON_KEY", "test-anon-key".to_string()),
        ("ADMIN_EMAILS", admin_emails.join(",")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    StorefrontConfig::from_map(&vars).expect("test configuration is valid")
}

/// Identity provider answering from a fixed token table.
#[derive(Default)]
pub struct StaticIdentity {
    users: Mutex<HashMap<String, Identity>>,
}

impl StaticIdentity {
    /// Accept `token` as the given user.
    ///
    /// # Panics
    ///
    /// Panics if `email` is malformed.
    #[allow(clippy::expect_used)]
    pub async fn add(&self, token: &str, id: &str, email: &str) {
        let identity = Identity {
            id: UserId::new(id),
            email: Email::parse(email).expect("test email is valid"),
            first_name: None,
            last_name: None,
        };
        self.users.lock().await.insert(token.to_owned(), identity);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn user_for_token(&self, access_token: &str) -> Result<Identity, IntegrationError> {
        self.users
            .lock()
            .await
            .get(access_token)
            .cloned()
            .ok_or(IntegrationError::Unauthorized("Supabase"))
    }
}

/// Notifier that keeps every event.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<OrderEvent>>,
}

impl RecordingNotifier {
    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), IntegrationError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Sheet that keeps every upserted row, last write wins per order.
#[derive(Default)]
pub struct RecordingSheet {
    rows: Mutex<Vec<SheetRow>>,
}

impl RecordingSheet {
    pub async fn rows(&self) -> Vec<SheetRow> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl OrderSheet for RecordingSheet {
    async fn upsert_rows(&self, rows: &[SheetRow]) -> Result<(), IntegrationError> {
        let mut stored = self.rows.lock().await;
        for row in rows {
            stored.retain(|existing| existing.order_id != row.order_id);
            stored.push(row.clone());
        }
        Ok(())
    }
}

/// A full application state over an in-memory database and fakes.
pub struct TestHarness {
    pub state: AppState,
    pub identity: Arc<StaticIdentity>,
    pub notifier: Arc<RecordingNotifier>,
    pub sheet: Arc<RecordingSheet>,
}

impl TestHarness {
    /// Build a harness; `admin_emails` may use admin routes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the in-memory database cannot be set up.
    pub async fn new(admin_emails: &[&str]) -> Result<Self, RepositoryError> {
        let pool = create_memory_pool().await?;
        let identity = Arc::new(StaticIdentity::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let sheet = Arc::new(RecordingSheet::default());

        let integrations = Integrations {
            identity: identity.clone(),
            notifier: Some(notifier.clone()),
            sheet: Some(sheet.clone()),
            cloudinary: None,
        };
        let state = AppState::with_integrations(test_config(admin_emails), pool, integrations);

        Ok(Self {
            state,
            identity,
            notifier,
            sheet,
        })
    }
}
