//! REST authority client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use uuidlens_config::AuthorityConfig;
use uuidlens_core::{Authority, EntityRecord, EntityType, ResolutionFailure};

use crate::auth::Authenticator;
use crate::error::AuthorityError;
use crate::mapping::map_entity;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves UUIDs against the management REST API.
#[derive(Debug)]
pub struct RestAuthority {
    client: Client,
    base_url: String,
    endpoints: HashMap<EntityType, String>,
    auth: Authenticator,
}

impl RestAuthority {
    pub fn new(config: &AuthorityConfig) -> Result<Self, AuthorityError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| AuthorityError::Config(format!("base_url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuthorityError::Config(format!(
                "base_url: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AuthorityError::Config(format!("HTTP client: {}", e)))?;

        let endpoints = EntityType::PRIORITY
            .iter()
            .filter_map(|t| config.endpoint_for(t.as_str()).map(|e| (*t, e)))
            .collect();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoints,
            auth: Authenticator::new(&config.auth),
        })
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Full URL for a lookup, or `None` when the type has no endpoint.
    pub fn endpoint_url(&self, uuid: &str, entity_type: EntityType) -> Option<String> {
        let template = self.endpoints.get(&entity_type)?;
        let path = template.replace("{uuid}", uuid);
        if path.starts_with('/') {
            Some(format!("{}{}", self.base_url, path))
        } else {
            Some(format!("{}/{}", self.base_url, path))
        }
    }

    /// Fetch and map one entity.
    pub async fn fetch(
        &self,
        uuid: &str,
        entity_type: EntityType,
    ) -> Result<EntityRecord, AuthorityError> {
        let url = self.endpoint_url(uuid, entity_type).ok_or_else(|| {
            AuthorityError::Config(format!("no endpoint for entity type {}", entity_type))
        })?;

        let mut response = self.send(&url).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.auth.can_refresh() {
            debug!(%uuid, "Unauthorized, refreshing credentials and retrying");
            self.auth.invalidate().await;
            response = self.send(&url).await?;
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthorityError::from_status(status, body));
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| AuthorityError::Decode(e.to_string()))?;
        map_entity(entity_type, &value)
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, AuthorityError> {
        debug!("GET {}", url);
        let request = self.client.get(url).header(ACCEPT, "application/json");
        let request = self.auth.apply(&self.client, request).await?;
        Ok(request.send().await?)
    }
}

#[async_trait]
impl Authority for RestAuthority {
    fn name(&self) -> &str {
        "rest"
    }

    async fn lookup(
        &self,
        uuid: &str,
        entity_type: EntityType,
    ) -> Result<EntityRecord, ResolutionFailure> {
        self.fetch(uuid, entity_type).await.map_err(|e| {
            warn!(%uuid, %entity_type, "Lookup failed: {}", e);
            ResolutionFailure::from(e)
        })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
