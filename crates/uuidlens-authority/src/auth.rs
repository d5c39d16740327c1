//! Request authentication.
//!
//! Basic credentials are attached directly with the tenant key header.
//! OAuth client-credentials tokens are fetched on demand and cached until
//! shortly before they expire.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use uuidlens_config::AuthConfig;

use crate::error::AuthorityError;

/// Header carrying the tenant API key.
pub const TENANT_HEADER: &str = "aw-tenant-code";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response carries none.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Attaches credentials to outgoing requests.
pub struct Authenticator {
    credentials: AuthConfig,
    token: Mutex<Option<CachedToken>>,
}

// Credentials stay out of debug output.
impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("scheme", &self.scheme())
            .finish()
    }
}

impl Authenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            credentials: config.clone(),
            token: Mutex::new(None),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self.credentials {
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Oauth { .. } => "oauth",
        }
    }

    /// Whether a 401 can be cured by fetching fresh credentials.
    pub fn can_refresh(&self) -> bool {
        matches!(self.credentials, AuthConfig::Oauth { .. })
    }

    /// Add credentials to `request`.
    pub async fn apply(
        &self,
        client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, AuthorityError> {
        match &self.credentials {
            AuthConfig::Basic {
                username,
                password,
                tenant_key,
            } => Ok(request
                .basic_auth(username, Some(password))
                .header(TENANT_HEADER, tenant_key)),
            AuthConfig::Oauth {
                token_url,
                client_id,
                client_secret,
            } => {
                let token = self
                    .bearer_token(client, token_url, client_id, client_secret)
                    .await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    /// Forget the cached token so the next request fetches a new one.
    pub async fn invalidate(&self) {
        if self.token.lock().await.take().is_some() {
            debug!("OAuth token invalidated");
        }
    }

    async fn bearer_token(
        &self,
        client: &Client,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, AuthorityError> {
        // Held across the fetch so concurrent callers wait for one request.
        let mut cached = self.token.lock().await;
        if let Some(ref t) = *cached {
            if Instant::now() < t.refresh_at {
                return Ok(t.value.clone());
            }
        }

        let response = client
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| AuthorityError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthorityError::Token(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::Token(e.to_string()))?;

        let lifetime = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = lifetime.as_secs(), "Obtained OAuth access token");

        *cached = Some(CachedToken {
            value: body.access_token.clone(),
            refresh_at,
        });
        Ok(body.access_token)
    }
}
