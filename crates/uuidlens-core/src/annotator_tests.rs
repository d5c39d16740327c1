use uuidlens_config::ScanConfig;

use super::*;
use crate::entity::{EntityDetails, EntityRecord, EntityType};
use crate::error::ResolutionFailure;
use crate::scanner::{ScanSession, UuidScanner};

const SCRIPT_UUID: &str = "ff645018-de64-43cb-a80c-d63da9422c82";
const TAG_UUID: &str = "3b1f9c2e-5a47-4d8b-9e21-7c6a0f4d8e13";

fn page() -> Document {
    Document::from_json(&format!(
        r#"{{
            "root": {{ "tag": "body", "children": [
                {{ "tag": "form", "children": [
                    {{ "tag": "label", "attributes": {{ "for": "script-ref" }}, "children": [
                        {{ "text": "Script UUID" }}
                    ]}},
                    {{ "tag": "input", "attributes": {{ "id": "script-ref" }}, "value": "{script}" }},
                    {{ "tag": "p", "children": [ {{ "text": "Tag {tag} is applied" }} ] }}
                ]}}
            ]}}
        }}"#,
        script = SCRIPT_UUID,
        tag = TAG_UUID,
    ))
    .unwrap()
}

fn occurrences(doc: &Document) -> Vec<UuidOccurrence> {
    let scanner = UuidScanner::new(&ScanConfig::default()).with_ignored_class("uuidlens-annotation");
    scanner.scan(doc, doc.root(), &mut ScanSession::new())
}

fn find<'a>(found: &'a [UuidOccurrence], uuid: &str) -> &'a UuidOccurrence {
    found.iter().find(|o| o.uuid == uuid).unwrap()
}

fn script_entity() -> ResolvedEntity {
    let record = EntityRecord {
        name: "Nightly Cleanup".to_string(),
        details: EntityDetails {
            platform: Some("Windows".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    ResolvedEntity::from_record(SCRIPT_UUID, EntityType::Script, record)
}

#[test]
fn test_overlay_for_input() {
    let mut doc = page();
    let found = occurrences(&doc);
    let occurrence = find(&found, SCRIPT_UUID);
    let annotator = Annotator::default();

    let outcome = annotator.annotate(&mut doc, occurrence, &script_entity()).unwrap();
    let AnnotateOutcome::Inserted(marker) = outcome else {
        panic!("expected insertion, got {:?}", outcome);
    };

    let input = occurrence.location.element;
    let form = doc.parent(input).unwrap();
    let position = doc.children(form).iter().position(|&c| c == marker).unwrap();
    assert_eq!(doc.children(form)[position - 1], input);

    assert!(doc.has_class(marker, "uuidlens-overlay"));
    assert_eq!(doc.attribute(marker, "style"), Some("position:absolute"));
    assert_eq!(doc.attribute(marker, ATTR_TYPE), Some("script"));
    let text = doc.text_content(marker);
    assert!(text.starts_with("Nightly Cleanup (script)"));
    assert!(text.contains("Platform: Windows"));
    assert!(doc.attribute(marker, "title").unwrap().contains("UUID: "));
}

#[test]
fn test_inline_after_text() {
    let mut doc = page();
    let found = occurrences(&doc);
    let occurrence = find(&found, TAG_UUID);
    let annotator = Annotator::default();
    let entity = ResolvedEntity::from_record(TAG_UUID, EntityType::Tag, EntityRecord::named("Kiosk"));

    let (reference, placement) = annotator.placement(&doc, occurrence);
    assert_eq!(placement, Placement::Inline);
    assert_eq!(reference, occurrence.location.anchor());

    let AnnotateOutcome::Inserted(marker) = annotator.annotate(&mut doc, occurrence, &entity).unwrap()
    else {
        panic!("expected insertion");
    };
    let p = occurrence.location.element;
    assert_eq!(doc.children(p), &[reference, marker]);
    assert!(!doc.has_class(marker, "uuidlens-overlay"));
}

#[test]
fn test_second_annotate_is_duplicate() {
    let mut doc = page();
    let found = occurrences(&doc);
    let occurrence = find(&found, SCRIPT_UUID);
    let annotator = Annotator::default();

    assert!(matches!(
        annotator.annotate(&mut doc, occurrence, &script_entity()).unwrap(),
        AnnotateOutcome::Inserted(_)
    ));
    assert_eq!(
        annotator.annotate(&mut doc, occurrence, &script_entity()).unwrap(),
        AnnotateOutcome::Duplicate
    );
    assert_eq!(annotator.annotations(&doc).len(), 1);
}

#[test]
fn test_detached_source_is_discarded() {
    let mut doc = page();
    let found = occurrences(&doc);
    let occurrence = find(&found, SCRIPT_UUID);
    let form = doc.parent(occurrence.location.element).unwrap();
    doc.remove(form).unwrap();

    let annotator = Annotator::default();
    assert_eq!(
        annotator.annotate(&mut doc, occurrence, &script_entity()).unwrap(),
        AnnotateOutcome::Detached
    );
}

#[test]
fn test_failure_marker_and_suppression() {
    let mut doc = page();
    let found = occurrences(&doc);
    let occurrence = find(&found, SCRIPT_UUID);
    let failed = ResolvedEntity::failed(SCRIPT_UUID, EntityType::Script, ResolutionFailure::NotFound);

    let quiet = Annotator::new(&AnnotatorConfig {
        show_failures: false,
        ..Default::default()
    });
    assert_eq!(
        quiet.annotate(&mut doc, occurrence, &failed).unwrap(),
        AnnotateOutcome::Suppressed
    );

    let AnnotateOutcome::Inserted(marker) = Annotator::default()
        .annotate(&mut doc, occurrence, &failed)
        .unwrap()
    else {
        panic!("expected insertion");
    };
    assert!(doc.has_class(marker, "uuidlens-failed"));
    assert!(doc.text_content(marker).starts_with("Unresolved (not found) (script)"));
}

#[test]
fn test_remove_all_restores_markup() {
    let mut doc = page();
    let before = doc.to_html(doc.root());
    let found = occurrences(&doc);
    let annotator = Annotator::default();

    annotator
        .annotate(&mut doc, find(&found, SCRIPT_UUID), &script_entity())
        .unwrap();
    let tag = ResolvedEntity::from_record(TAG_UUID, EntityType::Tag, EntityRecord::named("Kiosk"));
    annotator.annotate(&mut doc, find(&found, TAG_UUID), &tag).unwrap();
    assert_ne!(doc.to_html(doc.root()), before);

    assert_eq!(annotator.remove_all_annotations(&mut doc), 2);
    assert_eq!(doc.to_html(doc.root()), before);
    assert_eq!(annotator.remove_all_annotations(&mut doc), 0);
}

#[test]
fn test_markers_do_not_feed_back_into_scans() {
    let mut doc = page();
    let found = occurrences(&doc);
    let annotator = Annotator::default();
    annotator
        .annotate(&mut doc, find(&found, SCRIPT_UUID), &script_entity())
        .unwrap();

    // The marker's tooltip and detail rows contain the UUID again.
    let rescanned = occurrences(&doc);
    assert_eq!(rescanned.len(), found.len());
}
