//! Response body to [`EntityRecord`] mapping.
//!
//! Entity endpoints disagree on field naming (`Name`, `ApplicationName`,
//! `TagName`, ...). Each record field has a list of accepted keys, tried in
//! order at the top level and then inside a nested `General` object.

use serde_json::Value;

use uuidlens_core::{EntityDetails, EntityRecord, EntityType};

use crate::error::AuthorityError;

const NAME_KEYS: &[&str] = &[
    "name",
    "Name",
    "ApplicationName",
    "TagName",
    "ProfileName",
    "ScriptName",
    "ProductName",
    "GroupName",
    "displayName",
    "DisplayName",
];
const DESCRIPTION_KEYS: &[&str] = &["description", "Description"];
const CATEGORY_KEYS: &[&str] = &[
    "category",
    "Category",
    "TagType",
    "LocationGroupType",
    "GroupType",
];
const VERSION_KEYS: &[&str] = &["version", "Version", "AppVersion", "ActualFileVersion"];
const PLATFORM_KEYS: &[&str] = &["platform", "Platform"];
const BUNDLE_ID_KEYS: &[&str] = &["bundleId", "BundleId"];
const DEVICE_TYPE_KEYS: &[&str] = &["deviceType", "DeviceType"];
const PRODUCT_TYPE_KEYS: &[&str] = &["productType", "ProductType"];
const COLOR_KEYS: &[&str] = &["color", "Color"];
const ACTIVE_KEYS: &[&str] = &["isActive", "IsActive", "Active"];
const ACTIONABLE_KEYS: &[&str] = &["isActionable", "IsActionable"];

/// Map a response body to a record. Fails only when no name can be found.
pub fn map_entity(entity_type: EntityType, body: &Value) -> Result<EntityRecord, AuthorityError> {
    let general = body.get("General");
    let lookup = |keys: &[&str]| -> Option<&Value> {
        find(body, keys).or_else(|| general.and_then(|g| find(g, keys)))
    };
    let text = |keys: &[&str]| lookup(keys).and_then(as_text);
    let flag = |keys: &[&str]| lookup(keys).and_then(as_flag);

    let name = text(NAME_KEYS).ok_or(AuthorityError::MissingName)?;

    let mut details = EntityDetails {
        version: text(VERSION_KEYS),
        platform: text(PLATFORM_KEYS),
        ..Default::default()
    };
    match entity_type {
        EntityType::Application => {
            details.bundle_id = text(BUNDLE_ID_KEYS);
            details.is_active = flag(ACTIVE_KEYS);
        }
        EntityType::Profile => {
            details.device_type = text(DEVICE_TYPE_KEYS);
            details.is_active = flag(ACTIVE_KEYS);
        }
        EntityType::Product => {
            details.product_type = text(PRODUCT_TYPE_KEYS);
            details.is_active = flag(ACTIVE_KEYS);
        }
        EntityType::Tag => {
            details.color = text(COLOR_KEYS);
            details.is_actionable = flag(ACTIONABLE_KEYS);
        }
        EntityType::Script | EntityType::OrganizationGroup => {}
    }

    Ok(EntityRecord {
        name,
        description: text(DESCRIPTION_KEYS),
        category: text(CATEGORY_KEYS),
        details,
    })
}

fn find<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(key))
        .find(|v| !v.is_null())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_application_fields() {
        let body = json!({
            "ApplicationName": "Chrome",
            "AppVersion": "120.0.1",
            "Platform": "Apple",
            "BundleId": "com.google.chrome.ios",
            "IsActive": true,
            "Description": "Browser"
        });
        let record = map_entity(EntityType::Application, &body).unwrap();
        assert_eq!(record.name, "Chrome");
        assert_eq!(record.description.as_deref(), Some("Browser"));
        assert_eq!(record.details.version.as_deref(), Some("120.0.1"));
        assert_eq!(record.details.platform.as_deref(), Some("Apple"));
        assert_eq!(record.details.bundle_id.as_deref(), Some("com.google.chrome.ios"));
        assert_eq!(record.details.is_active, Some(true));
    }

    #[test]
    fn test_nested_general_object() {
        let body = json!({
            "General": { "Name": "Wi-Fi Corp", "Version": 3, "Platform": "Android" },
            "DeviceType": "Android"
        });
        let record = map_entity(EntityType::Profile, &body).unwrap();
        assert_eq!(record.name, "Wi-Fi Corp");
        assert_eq!(record.details.version.as_deref(), Some("3"));
        assert_eq!(record.details.device_type.as_deref(), Some("Android"));
    }

    #[test]
    fn test_top_level_wins_over_general() {
        let body = json!({ "name": "outer", "General": { "Name": "inner" } });
        let record = map_entity(EntityType::Script, &body).unwrap();
        assert_eq!(record.name, "outer");
    }

    #[test]
    fn test_tag_fields() {
        let body = json!({
            "TagName": "Kiosk",
            "TagType": "Device",
            "Color": "#ff0000",
            "IsActionable": "false"
        });
        let record = map_entity(EntityType::Tag, &body).unwrap();
        assert_eq!(record.name, "Kiosk");
        assert_eq!(record.category.as_deref(), Some("Device"));
        assert_eq!(record.details.color.as_deref(), Some("#ff0000"));
        assert_eq!(record.details.is_actionable, Some(false));
    }

    #[test]
    fn test_type_specific_fields_are_not_copied_across() {
        let body = json!({ "Name": "HQ", "BundleId": "x", "LocationGroupType": "Customer" });
        let record = map_entity(EntityType::OrganizationGroup, &body).unwrap();
        assert_eq!(record.category.as_deref(), Some("Customer"));
        assert_eq!(record.details.bundle_id, None);
    }

    #[test]
    fn test_missing_or_blank_name() {
        assert!(matches!(
            map_entity(EntityType::Script, &json!({ "Version": "1" })),
            Err(AuthorityError::MissingName)
        ));
        assert!(matches!(
            map_entity(EntityType::Script, &json!({ "name": "  ", "Name": null })),
            Err(AuthorityError::MissingName)
        ));
    }

    #[test]
    fn test_null_key_falls_through_to_alias() {
        let body = json!({ "name": null, "ScriptName": "Cleanup" });
        let record = map_entity(EntityType::Script, &body).unwrap();
        assert_eq!(record.name, "Cleanup");
    }
}
