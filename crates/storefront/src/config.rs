//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BB_DATABASE_URL` - SQLite URL, e.g. `sqlite://data/balance-botanica.db`
//!   (falls back to `DATABASE_URL`)
//! - `BB_BASE_URL` - Public URL of the site (cookies are `Secure` when https)
//! - `SUPABASE_URL` - Supabase project URL
//! - `SUPABASE_ANON_KEY` - Supabase anon (publishable) key
//!
//! ## Optional
//! - `BB_HOST` - Bind address (default: 127.0.0.1)
//! - `BB_PORT` - Listen port (default: 3000)
//! - `BB_TRUST_PROXY_HEADERS` - `true` when a reverse proxy sets
//!   `X-Forwarded-For`/`X-Real-IP` (default: false, use the socket peer)
//! - `ADMIN_EMAILS` - Comma-separated emails allowed into admin routes
//! - `TELEGRAM_BOT_TOKEN` + `TELEGRAM_CHAT_ID` - Order notifications
//! - `SHEETS_WEBHOOK_URL` + `SHEETS_WEBHOOK_SECRET` - Order spreadsheet export
//! - `CLOUDINARY_CLOUD_NAME` + `CLOUDINARY_API_KEY` + `CLOUDINARY_API_SECRET` - Image uploads
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! Each integration group is all-or-nothing: setting only some of its
//! variables is an error rather than a silently disabled integration.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use balance_botanica_core::Email;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Incomplete {group} configuration: {missing} is not set")]
    PartialGroup {
        group: &'static str,
        missing: &'static str,
    },
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// SQLite database URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Key rate limits on proxy client-IP headers instead of the socket peer
    pub trust_proxy_headers: bool,
    /// Public base URL of the site
    pub base_url: Url,
    /// Identity provider
    pub supabase: SupabaseConfig,
    /// Accounts allowed into admin routes
    pub admin_emails: Vec<Email>,
    /// Order notifications, if configured
    pub telegram: Option<TelegramConfig>,
    /// Order spreadsheet export, if configured
    pub sheets: Option<SheetsConfig>,
    /// Image hosting, if configured
    pub cloudinary: Option<CloudinaryConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Supabase project settings.
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: Url,
    pub anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Telegram bot used for order notifications.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Spreadsheet web-app endpoint receiving order rows.
#[derive(Clone)]
pub struct SheetsConfig {
    pub webhook_url: Url,
    pub secret: SecretString,
}

impl std::fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("webhook_url", &self.webhook_url.as_str())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Cloudinary account used for product images.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, an
    /// integration group is only partly set, or a secret fails validation
    /// (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let database_url = env.database_url("BB_DATABASE_URL")?;
        let host = env
            .or_default("BB_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BB_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("BB_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BB_PORT".to_string(), e.to_string()))?;
        let trust_proxy_headers = env
            .or_default("BB_TRUST_PROXY_HEADERS", "false")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BB_TRUST_PROXY_HEADERS".to_string(), e.to_string())
            })?;
        let base_url = env.url("BB_BASE_URL")?;

        let supabase = SupabaseConfig {
            url: env.url("SUPABASE_URL")?,
            anon_key: SecretString::from(env.required("SUPABASE_ANON_KEY")?),
        };

        Ok(Self {
            database_url,
            host,
            port,
            trust_proxy_headers,
            base_url,
            supabase,
            admin_emails: env.admin_emails()?,
            telegram: TelegramConfig::from_env(&env)?,
            sheets: SheetsConfig::from_env(&env)?,
            cloudinary: CloudinaryConfig::from_env(&env)?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    /// Whether `email` may use admin routes.
    #[must_use]
    pub fn is_admin(&self, email: &Email) -> bool {
        self.admin_emails.contains(email)
    }
}

impl TelegramConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some([bot_token, chat_id]) =
            env.group("Telegram", ["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"])?
        else {
            return Ok(None);
        };
        validate_secret_strength(&bot_token, "TELEGRAM_BOT_TOKEN")?;
        Ok(Some(Self {
            bot_token: SecretString::from(bot_token),
            chat_id,
        }))
    }
}

impl SheetsConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some([webhook_url, secret]) =
            env.group("spreadsheet", ["SHEETS_WEBHOOK_URL", "SHEETS_WEBHOOK_SECRET"])?
        else {
            return Ok(None);
        };
        validate_secret_strength(&secret, "SHEETS_WEBHOOK_SECRET")?;
        Ok(Some(Self {
            webhook_url: parse_url("SHEETS_WEBHOOK_URL", &webhook_url)?,
            secret: SecretString::from(secret),
        }))
    }
}

impl CloudinaryConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some([cloud_name, api_key, api_secret]) = env.group(
            "Cloudinary",
            [
                "CLOUDINARY_CLOUD_NAME",
                "CLOUDINARY_API_KEY",
                "CLOUDINARY_API_SECRET",
            ],
        )?
        else {
            return Ok(None);
        };
        validate_secret_strength(&api_secret, "CLOUDINARY_API_SECRET")?;
        Ok(Some(Self {
            cloud_name,
            api_key,
            api_secret: SecretString::from(api_secret),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup; empty values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        parse_url(key, &self.required(key)?)
    }

    /// Database URL with fallback to the generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    fn admin_emails(&self) -> Result<Vec<Email>, ConfigError> {
        let Some(raw) = self.optional("ADMIN_EMAILS") else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Email::parse(s).map_err(|e| {
                    ConfigError::InvalidEnvVar("ADMIN_EMAILS".to_string(), format!("{s}: {e}"))
                })
            })
            .collect()
    }

    /// All of `keys` or none of them.
    fn group<const N: usize>(
        &self,
        group: &'static str,
        keys: [&'static str; N],
    ) -> Result<Option<[String; N]>, ConfigError> {
        let values = keys.map(|key| self.optional(key));
        if values.iter().all(Option::is_none) {
            return Ok(None);
        }
        if let Some(missing) = keys.iter().zip(&values).find_map(|(k, v)| v.is_none().then_some(*k)) {
            return Err(ConfigError::PartialGroup { group, missing });
        }
        Ok(Some(values.map(Option::unwrap_or_default)))
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
