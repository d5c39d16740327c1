//! End-to-end tests for the enhancement pipeline.
//!
//! A document goes through scan, classify, resolve and annotate against an
//! in-memory authority.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use uuidlens_config::Config;
use uuidlens_core::{
    Authority, Document, EnhancementSession, EntityRecord, EntityType, LensComponents, LensEvent,
    ResolutionFailure, Settings, SharedDocument,
};

const SCRIPT_UUID: &str = "ff645018-de64-43cb-a80c-d63da9422c82";
const TAG_UUID: &str = "3b1f9c2e-5a47-4d8b-9e21-7c6a0f4d8e13";

// ============================================================================
// Test Helpers
// ============================================================================

/// Authority answering from a table, counting lookups.
#[derive(Default)]
struct TableAuthority {
    names: HashMap<(String, EntityType), String>,
    calls: AtomicUsize,
}

impl TableAuthority {
    fn with(mut self, uuid: &str, entity_type: EntityType, name: &str) -> Self {
        self.names
            .insert((uuid.to_string(), entity_type), name.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authority for TableAuthority {
    fn name(&self) -> &str {
        "table"
    }

    async fn lookup(
        &self,
        uuid: &str,
        entity_type: EntityType,
    ) -> Result<EntityRecord, ResolutionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.names
            .get(&(uuid.to_string(), entity_type))
            .map(EntityRecord::named)
            .ok_or(ResolutionFailure::NotFound)
    }
}

fn script_page() -> SharedDocument {
    let doc = Document::from_json(&format!(
        r#"{{
            "title": "Applications",
            "url": "https://uem.example.com/AirWatch/#/apps/workflow",
            "root": {{ "tag": "body", "children": [
                {{ "tag": "p", "children": [ {{ "text": "Manage application workflows" }} ] }},
                {{ "tag": "form", "children": [
                    {{ "tag": "div", "attributes": {{ "class": "clr-form-control" }}, "children": [
                        {{ "tag": "label", "attributes": {{ "for": "step-1" }}, "children": [
                            {{ "text": "Script UUID" }}
                        ]}},
                        {{ "tag": "input", "attributes": {{ "id": "step-1", "readonly": "" }},
                          "value": "{script}" }}
                    ]}},
                    {{ "tag": "div", "attributes": {{ "class": "clr-form-control" }}, "children": [
                        {{ "tag": "label", "attributes": {{ "for": "step-2" }}, "children": [
                            {{ "text": "Fallback application" }}
                        ]}},
                        {{ "tag": "input", "attributes": {{ "id": "step-2" }} }}
                    ]}}
                ]}}
            ]}}
        }}"#,
        script = SCRIPT_UUID,
    ))
    .unwrap();
    Arc::new(RwLock::new(doc))
}

fn session_with(
    document: SharedDocument,
    authority: Arc<TableAuthority>,
    settings: Settings,
) -> EnhancementSession {
    let components = LensComponents::from_config(&Config::default(), authority);
    EnhancementSession::new(document, settings, components)
}

fn html(document: &SharedDocument) -> String {
    let doc = document.read();
    doc.to_html(doc.root())
}

fn marker_texts(document: &SharedDocument) -> Vec<String> {
    let doc = document.read();
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.has_class(n, "uuidlens-annotation"))
        .map(|n| {
            let name = doc.children(n)[0];
            let pill = doc.children(n)[2];
            format!("{} {}", doc.text_content(name), doc.text_content(pill))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_script_uuid_is_annotated() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    let report = session.run_pass().await;

    assert_eq!(report.detected, 1);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.annotated, 1);
    assert_eq!(marker_texts(&document), vec!["Nightly Cleanup (script)"]);
    assert_eq!(authority.calls(), 1);
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    session.run_pass().await;
    let before = html(&document);
    let report = session.run_pass().await;

    assert_eq!(report.detected, 0);
    assert_eq!(html(&document), before);
    assert_eq!(authority.calls(), 1);
}

#[tokio::test]
async fn test_remove_all_restores_document() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    let original = html(&document);
    let session = session_with(document.clone(), authority.clone(), Settings::default());
    let mut events = session.subscribe();

    session.run_pass().await;
    assert_eq!(session.remove_all_annotations(), 1);
    assert_eq!(html(&document), original);

    // Seen-set was reset, so the next pass annotates again from cache.
    let report = session.run_pass().await;
    assert_eq!(report.annotated, 1);
    assert_eq!(authority.calls(), 1);

    let mut saw_cleared = false;
    while let Ok(event) = events.try_recv() {
        if event == (LensEvent::Cleared { removed: 1 }) {
            saw_cleared = true;
        }
    }
    assert!(saw_cleared);
}

#[tokio::test]
async fn test_disabled_type_is_detected_but_not_resolved() {
    let authority = Arc::new(TableAuthority::default());
    let document = script_page();
    let settings = Settings::default().with_type_enabled(EntityType::Script, false);
    let session = session_with(document.clone(), authority.clone(), settings);

    let report = session.run_pass().await;

    assert_eq!(report.detected, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.by_type[&EntityType::Script], 1);
    assert_eq!(authority.calls(), 0);
    assert!(marker_texts(&document).is_empty());
}

#[tokio::test]
async fn test_disabled_lens_does_not_scan() {
    let authority = Arc::new(TableAuthority::default());
    let document = script_page();
    let settings = Settings {
        enabled: false,
        ..Default::default()
    };
    let session = session_with(document.clone(), authority.clone(), settings);

    let report = session.run_pass().await;
    assert!(report.is_empty());
    assert_eq!(session.stats().passes, 0);
    assert_eq!(authority.calls(), 0);
}

#[tokio::test]
async fn test_failed_resolution_renders_error_marker() {
    let authority = Arc::new(TableAuthority::default());
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    let report = session.run_pass().await;
    assert_eq!(report.failed, 1);
    assert_eq!(marker_texts(&document), vec!["Unresolved (not found) (script)"]);
}

#[tokio::test]
async fn test_same_uuid_in_two_locations_annotated_twice() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    {
        let mut doc = document.write();
        let root = doc.root();
        let dl = doc.append_element(root, "dl", &[]).unwrap();
        let dt = doc.append_element(dl, "dt", &[]).unwrap();
        doc.append_text(dt, "Script").unwrap();
        let dd = doc.append_element(dl, "dd", &[]).unwrap();
        doc.append_text(dd, SCRIPT_UUID).unwrap();
    }
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    let report = session.run_pass().await;
    assert_eq!(report.detected, 2);
    assert_eq!(report.annotated, 2);
    assert_eq!(authority.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watch_detects_late_value() {
    let late = "9a0b1c2d-3e4f-4a5b-8c6d-7e8f90a1b2c3";
    let authority = Arc::new(
        TableAuthority::default()
            .with(SCRIPT_UUID, EntityType::Script, "Nightly Cleanup")
            .with(TAG_UUID, EntityType::Tag, "Kiosk")
            .with(late, EntityType::Application, "Chrome"),
    );
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    session.run_pass().await;
    let watch = session.watch();

    {
        let mut doc = document.write();
        let input = doc.element_by_id("step-2").unwrap();
        doc.set_form_value(input, Some(late)).unwrap();
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    let texts = marker_texts(&document);
    assert!(texts.contains(&"Chrome (application)".to_string()), "{:?}", texts);
    assert_eq!(session.stats().annotated, 2);
    watch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_removed_annotations_stay_removed_under_watch() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    session.run_pass().await;
    let watch = session.watch();
    assert_eq!(session.remove_all_annotations(), 1);
    assert!(watch.is_paused());

    // Several reconcile intervals pass without bringing markers back.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(marker_texts(&document).is_empty());

    // An explicit pass re-annotates and resumes the watch.
    let report = session.run_pass().await;
    assert_eq!(report.annotated, 1);
    assert!(!watch.is_paused());
    assert_eq!(authority.calls(), 1);
    watch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_reenabling_resumes_watch_after_removal() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    session.run_pass().await;
    let watch = session.watch();
    session.remove_all_annotations();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(marker_texts(&document).is_empty());

    session.update_settings(Settings::default());
    assert!(!watch.is_paused());
    // The reconcile tick picks the page up again.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(marker_texts(&document), vec!["Nightly Cleanup (script)"]);
    watch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_clear_discards_in_flight_results() {
    let authority = Arc::new(TableAuthority::default().with(
        SCRIPT_UUID,
        EntityType::Script,
        "Nightly Cleanup",
    ));
    let document = script_page();
    let session = session_with(document.clone(), authority.clone(), Settings::default());

    let pass = tokio::spawn({
        let session = session.clone();
        async move { session.run_pass().await }
    });
    // Lookup takes 20ms; clear while it is outstanding.
    tokio::time::sleep(Duration::from_millis(5)).await;
    session.remove_all_annotations();

    let report = pass.await.unwrap();
    assert_eq!(report.discarded, 1);
    assert!(marker_texts(&document).is_empty());
}
