//! Remote authority connection configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection to the REST service that resolves UUIDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL, e.g. `https://as1506.awmdm.com`.
    pub base_url: String,

    pub auth: AuthConfig,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Endpoint path templates keyed by entity type name. `{uuid}` is substituted.
    /// Missing entries fall back to the built-in templates.
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl AuthorityConfig {
    /// Endpoint template for an entity type, falling back to the built-in one.
    pub fn endpoint_for(&self, entity_type: &str) -> Option<String> {
        self.endpoints
            .get(entity_type)
            .cloned()
            .or_else(|| default_endpoint(entity_type).map(str::to_string))
    }
}

/// Authentication scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    /// Basic credentials plus the tenant key header.
    Basic {
        username: String,
        password: String,
        tenant_key: String,
    },
    /// OAuth client-credentials grant.
    Oauth {
        token_url: String,
        client_id: String,
        client_secret: String,
    },
}

/// Built-in endpoint template for an entity type.
pub fn default_endpoint(entity_type: &str) -> Option<&'static str> {
    match entity_type {
        "tag" => Some("/API/mdm/tags/{uuid}"),
        "application" => Some("/API/mam/apps/{uuid}"),
        "profile" => Some("/API/mdm/profiles/{uuid}"),
        "script" => Some("/API/mdm/scripts/{uuid}"),
        "product" => Some("/API/mdm/products/{uuid}"),
        "organization-group" => Some("/API/system/groups/{uuid}"),
        _ => None,
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("uuidlens/{}", env!("CARGO_PKG_VERSION"))
}
