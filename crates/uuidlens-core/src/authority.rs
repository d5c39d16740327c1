//! Remote authority seam.
//!
//! The authority performs the credentialed lookup of a UUID. The core never
//! sees credentials; it only calls [`Authority::lookup`].

use async_trait::async_trait;

use crate::entity::{EntityRecord, EntityType};
use crate::error::ResolutionFailure;

/// Service that turns a (uuid, type) pair into an entity record.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn lookup(
        &self,
        uuid: &str,
        entity_type: EntityType,
    ) -> Result<EntityRecord, ResolutionFailure>;
}

/// Authority used when none is configured; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAuthority;

#[async_trait]
impl Authority for UnavailableAuthority {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn lookup(
        &self,
        _uuid: &str,
        _entity_type: EntityType,
    ) -> Result<EntityRecord, ResolutionFailure> {
        Err(ResolutionFailure::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_authority_fails() {
        let authority = UnavailableAuthority;
        let result = authority.lookup("u", EntityType::Tag).await;
        assert_eq!(result, Err(ResolutionFailure::Unavailable));
    }
}
