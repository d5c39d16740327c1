//! Entity types and resolved entity records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ResolutionFailure, UnknownEntityType};

/// Business entity a UUID can identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Tag,
    Application,
    Profile,
    Script,
    Product,
    OrganizationGroup,
}

impl EntityType {
    /// Classification priority; earlier types win keyword overlaps.
    pub const PRIORITY: [EntityType; 6] = [
        EntityType::OrganizationGroup,
        EntityType::Product,
        EntityType::Script,
        EntityType::Tag,
        EntityType::Application,
        EntityType::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Application => "application",
            Self::Profile => "profile",
            Self::Script => "script",
            Self::Product => "product",
            Self::OrganizationGroup => "organization-group",
        }
    }

    /// Human label used in annotation pills.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OrganizationGroup => "organization group",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "tag" => Ok(Self::Tag),
            "application" | "app" => Ok(Self::Application),
            "profile" => Ok(Self::Profile),
            "script" => Ok(Self::Script),
            "product" => Ok(Self::Product),
            "organization-group" | "og" => Ok(Self::OrganizationGroup),
            _ => Err(UnknownEntityType(s.to_string())),
        }
    }
}

/// Type-specific fields an authority may return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_actionable: Option<bool>,
}

/// What an authority returns for a successful lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub details: EntityDetails,
}

impl EntityRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A UUID resolved (or not) to a human-readable entity.
///
/// Failures use the same shape with `error` set and a `name` describing the
/// failure, so callers can render them like any other entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub uuid: String,
    pub entity_type: EntityType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub details: EntityDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionFailure>,
}

impl ResolvedEntity {
    pub fn from_record(uuid: &str, entity_type: EntityType, record: EntityRecord) -> Self {
        Self {
            uuid: uuid.to_string(),
            entity_type,
            name: record.name,
            description: record.description,
            category: record.category,
            details: record.details,
            error: None,
        }
    }

    pub fn failed(uuid: &str, entity_type: EntityType, failure: ResolutionFailure) -> Self {
        Self {
            uuid: uuid.to_string(),
            entity_type,
            name: failure.display_name(),
            description: None,
            category: None,
            details: EntityDetails::default(),
            error: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// `Name (type)`, the visible annotation text.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.entity_type.label())
    }

    /// Labelled fields for the hover panel, specific to the entity type.
    pub fn detail_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let d = &self.details;
        let yes_no = |b: bool| (if b { "Yes" } else { "No" }).to_string();

        if let Some(ref failure) = self.error {
            fields.push(("Error", failure.to_string()));
        }
        if let Some(ref description) = self.description {
            fields.push(("Description", description.clone()));
        }

        match self.entity_type {
            EntityType::Tag => {
                if let Some(ref color) = d.color {
                    fields.push(("Color", color.clone()));
                }
                if let Some(ref category) = self.category {
                    fields.push(("Tag type", category.clone()));
                }
            }
            EntityType::Application => {
                if let Some(ref version) = d.version {
                    fields.push(("Version", version.clone()));
                }
                if let Some(ref platform) = d.platform {
                    fields.push(("Platform", platform.clone()));
                }
                if let Some(ref bundle_id) = d.bundle_id {
                    fields.push(("Bundle ID", bundle_id.clone()));
                }
                if let Some(ref category) = self.category {
                    fields.push(("Category", category.clone()));
                }
            }
            EntityType::Profile => {
                if let Some(ref platform) = d.platform {
                    fields.push(("Platform", platform.clone()));
                }
                if let Some(ref device_type) = d.device_type {
                    fields.push(("Device type", device_type.clone()));
                }
                if let Some(ref version) = d.version {
                    fields.push(("Version", version.clone()));
                }
                if let Some(active) = d.is_active {
                    fields.push(("Active", yes_no(active)));
                }
            }
            EntityType::Script => {
                if let Some(ref platform) = d.platform {
                    fields.push(("Platform", platform.clone()));
                }
                if let Some(ref version) = d.version {
                    fields.push(("Version", version.clone()));
                }
                if let Some(active) = d.is_active {
                    fields.push(("Active", yes_no(active)));
                }
            }
            EntityType::Product => {
                if let Some(ref platform) = d.platform {
                    fields.push(("Platform", platform.clone()));
                }
                if let Some(ref product_type) = d.product_type {
                    fields.push(("Product type", product_type.clone()));
                }
                if let Some(active) = d.is_active {
                    fields.push(("Active", yes_no(active)));
                }
                if let Some(actionable) = d.is_actionable {
                    fields.push(("Actionable", yes_no(actionable)));
                }
            }
            EntityType::OrganizationGroup => {
                if let Some(ref category) = self.category {
                    fields.push(("Group type", category.clone()));
                }
            }
        }

        fields.push(("UUID", self.uuid.clone()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trip_names() {
        for t in EntityType::PRIORITY {
            assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
        }
        assert_eq!(
            "organization_group".parse::<EntityType>().unwrap(),
            EntityType::OrganizationGroup
        );
        assert_eq!("App".parse::<EntityType>().unwrap(), EntityType::Application);
        assert!("device".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_serde_is_kebab_case() {
        let json = serde_json::to_string(&EntityType::OrganizationGroup).unwrap();
        assert_eq!(json, "\"organization-group\"");
        let t: EntityType = serde_json::from_str("\"script\"").unwrap();
        assert_eq!(t, EntityType::Script);
    }

    #[test]
    fn test_display_label() {
        let entity = ResolvedEntity::from_record(
            "ff645018-de64-43cb-a80c-d63da9422c82",
            EntityType::Script,
            EntityRecord::named("Nightly Cleanup"),
        );
        assert_eq!(entity.display_label(), "Nightly Cleanup (script)");
        assert!(!entity.is_failure());
    }

    #[test]
    fn test_failed_entity_shape() {
        let entity = ResolvedEntity::failed("u", EntityType::Tag, ResolutionFailure::NotFound);
        assert!(entity.is_failure());
        assert_eq!(entity.name, "Unresolved (not found)");
        let fields = entity.detail_fields();
        assert_eq!(fields[0], ("Error", "Not found".to_string()));
        assert_eq!(fields.last().unwrap().0, "UUID");
    }

    #[test]
    fn test_detail_fields_are_type_specific() {
        let record = EntityRecord {
            name: "Chrome".to_string(),
            description: None,
            category: None,
            details: EntityDetails {
                version: Some("120.0".to_string()),
                platform: Some("Android".to_string()),
                bundle_id: Some("com.android.chrome".to_string()),
                color: Some("#ff0000".to_string()),
                ..Default::default()
            },
        };
        let app = ResolvedEntity::from_record("u", EntityType::Application, record.clone());
        let labels: Vec<_> = app.detail_fields().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Version", "Platform", "Bundle ID", "UUID"]);

        let tag = ResolvedEntity::from_record("u", EntityType::Tag, record);
        let labels: Vec<_> = tag.detail_fields().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Color", "UUID"]);
    }
}
