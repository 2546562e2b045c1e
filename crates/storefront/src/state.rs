//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::StorefrontConfig;
use crate::services::auth::{AuthService, SessionService};
use crate::services::cloudinary::CloudinaryClient;
use crate::services::orders::OrderService;
use crate::services::ports::{IdentityProvider, OrderNotifier, OrderSheet};
use crate::services::products::ProductService;
use crate::services::sheets::SheetsWebhook;
use crate::services::supabase::SupabaseClient;
use crate::services::sync::SyncService;
use crate::services::telegram::TelegramNotifier;
use crate::services::users::UserService;

/// External collaborators, chosen by the caller.
///
/// `main` builds the real HTTP clients from configuration; tests pass fakes.
#[derive(Clone)]
pub struct Integrations {
    pub identity: Arc<dyn IdentityProvider>,
    pub notifier: Option<Arc<dyn OrderNotifier>>,
    pub sheet: Option<Arc<dyn OrderSheet>>,
    pub cloudinary: Option<CloudinaryClient>,
}

impl Integrations {
    /// Real clients for every configured integration.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            identity: Arc::new(SupabaseClient::new(&config.supabase)),
            notifier: config
                .telegram
                .as_ref()
                .map(|c| Arc::new(TelegramNotifier::new(c)) as Arc<dyn OrderNotifier>),
            sheet: config
                .sheets
                .as_ref()
                .map(|c| Arc::new(SheetsWebhook::new(c)) as Arc<dyn OrderSheet>),
            cloudinary: config.cloudinary.as_ref().map(CloudinaryClient::new),
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns one instance of each
/// service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    auth: AuthService,
    sessions: SessionService,
    users: UserService,
    products: ProductService,
    orders: OrderService,
    sync: SyncService,
    cloudinary: Option<CloudinaryClient>,
}

impl AppState {
    /// Create state with the real integrations from `config`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: SqlitePool) -> Self {
        let integrations = Integrations::from_config(&config);
        Self::with_integrations(config, pool, integrations)
    }

    /// Create state with explicitly chosen integrations.
    #[must_use]
    pub fn with_integrations(
        config: StorefrontConfig,
        pool: SqlitePool,
        integrations: Integrations,
    ) -> Self {
        let users = UserService::new(pool.clone());
        let sessions = SessionService::new(pool.clone());
        let auth = AuthService::new(integrations.identity, users.clone(), sessions.clone());
        let products = ProductService::new(pool.clone());
        let orders = OrderService::new(
            pool.clone(),
            integrations.notifier,
            integrations.sheet.clone(),
        );
        let sync = SyncService::new(pool.clone(), integrations.sheet);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                sessions,
                users,
                products,
                orders,
                sync,
                cloudinary: integrations.cloudinary,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionService {
        &self.inner.sessions
    }

    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.inner.products
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn sync(&self) -> &SyncService {
        &self.inner.sync
    }

    /// The Cloudinary client, if configured.
    #[must_use]
    pub fn cloudinary(&self) -> Option<&CloudinaryClient> {
        self.inner.cloudinary.as_ref()
    }
}
