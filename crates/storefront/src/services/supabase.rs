//! Supabase Auth client.
//!
//! The browser completes the OAuth flow with Supabase and hands us the
//! resulting access token. We only ask Supabase who the token belongs to.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use balance_botanica_core::{Email, UserId};

use super::ports::{Identity, IdentityProvider, IntegrationError};
use crate::config::SupabaseConfig;

const SERVICE: &str = "Supabase";

/// Subset of the `GET /auth/v1/user` response we use.
#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

/// Profile data filled in by the OAuth provider.
#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    first_name: Option<String>,
    last_name: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
}

impl UserMetadata {
    fn names(self) -> (Option<String>, Option<String>) {
        if self.first_name.is_some() || self.last_name.is_some() {
            return (self.first_name, self.last_name);
        }
        let Some(full) = self.full_name.or(self.name) else {
            return (None, None);
        };
        let mut parts = full.trim().splitn(2, ' ');
        let first = parts.next().filter(|s| !s.is_empty()).map(str::to_owned);
        let last = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
        (first, last)
    }
}

/// Supabase Auth API client.
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
}

impl SupabaseClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, IntegrationError> {
        self.base_url
            .join(path)
            .map_err(|e| IntegrationError::Parse(format!("invalid Supabase URL: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    #[instrument(skip_all)]
    async fn user_for_token(&self, access_token: &str) -> Result<Identity, IntegrationError> {
        let response = self
            .client
            .get(self.endpoint("/auth/v1/user")?)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
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

        let user: SupabaseUser = response
            .json()
            .await
            .map_err(|e| IntegrationError::Parse(e.to_string()))?;

        let email = user
            .email
            .as_deref()
            .ok_or_else(|| IntegrationError::Parse("Supabase user has no email".to_owned()))
            .and_then(|raw| {
                Email::parse(raw).map_err(|e| IntegrationError::Parse(format!("email: {e}")))
            })?;
        let (first_name, last_name) = user.user_metadata.names();

        Ok(Identity {
            id: UserId::new(user.id),
            email,
            first_name,
            last_name,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: SecretString::from("anon"),
        })
    }

    #[tokio::test]
    async fn test_user_for_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "8d0f6c9e-user",
                "email": "Olena@Example.com",
                "user_metadata": { "full_name": "Olena Kovalenko" }
            })))
            .mount(&server)
            .await;

        let identity = client(&server).user_for_token("good-token").await.unwrap();
        assert_eq!(identity.id.as_str(), "8d0f6c9e-user");
        assert_eq!(identity.email.as_str(), "olena@example.com");
        assert_eq!(identity.first_name.as_deref(), Some("Olena"));
        assert_eq!(identity.last_name.as_deref(), Some("Kovalenko"));
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "bad jwt"})))
            .mount(&server)
            .await;

        let result = client(&server).user_for_token("expired").await;
        assert!(matches!(result, Err(IntegrationError::Unauthorized(_))));
    }

    #[test]
    fn test_explicit_names_win_over_full_name() {
        let metadata = UserMetadata {
            first_name: Some("Iryna".to_owned()),
            last_name: None,
            full_name: Some("Someone Else".to_owned()),
            name: None,
        };
        assert_eq!(metadata.names(), (Some("Iryna".to_owned()), None));
    }
}
