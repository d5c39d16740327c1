//! Subcommand handlers for uuidlens.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use parking_lot::RwLock;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use uuidlens_authority::RestAuthority;
use uuidlens_config::{Config, ConfigValidator};
use uuidlens_core::{
    Authority, Document, EnhancementSession, EntityResolver, EntityType, LensComponents,
    LensEvent, PassReport, ResolutionCache, Settings, UnavailableAuthority,
};

/// Build the configured authority, or one that fails every lookup.
fn build_authority(config: &Config) -> anyhow::Result<Arc<dyn Authority>> {
    match &config.authority {
        Some(authority) => {
            let rest = RestAuthority::new(authority).context("Failed to create REST authority")?;
            info!(
                base_url = %authority.base_url,
                auth = rest.authenticator().scheme(),
                "Using REST authority"
            );
            Ok(Arc::new(rest))
        }
        None => {
            warn!("No authority configured; UUIDs will not resolve");
            Ok(Arc::new(UnavailableAuthority))
        }
    }
}

/// Run one pass over a snapshot file.
pub(crate) async fn scan(
    config: &Config,
    snapshot: &Path,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(snapshot)
        .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
    let document = Document::from_json(&content).context("Invalid snapshot")?;
    let document = Arc::new(RwLock::new(document));

    let components = LensComponents::from_config(config, build_authority(config)?);
    let session = EnhancementSession::new(
        document.clone(),
        Settings::from_config(&config.settings),
        components,
    );
    let mut events = session.subscribe();

    let report = session.run_pass().await;

    let mut lines = Vec::new();
    loop {
        match events.try_recv() {
            Ok(LensEvent::Resolved {
                uuid,
                entity_type,
                name,
            }) => lines.push(format!("  {}  {:<18} {}", uuid, entity_type.as_str(), name)),
            Ok(LensEvent::Failed {
                uuid,
                entity_type,
                failure,
            }) => lines.push(format!("  {}  {:<18} ! {}", uuid, entity_type.as_str(), failure)),
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event receiver lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &lines);
    }

    if let Some(path) = output {
        let html = {
            let doc = document.read();
            doc.to_html(doc.root())
        };
        std::fs::write(path, html)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Annotated markup written to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &PassReport, lines: &[String]) {
    if report.detected == 0 {
        println!("No UUIDs found.");
        return;
    }
    println!("Detected {} UUID occurrence(s)", report.detected);
    for (entity_type, count) in &report.by_type {
        println!("  {:<18} {}", entity_type.as_str(), count);
    }
    if !lines.is_empty() {
        println!();
        for line in lines {
            println!("{}", line);
        }
    }
    println!();
    println!(
        "resolved={} failed={} skipped={} annotated={} duplicate={} discarded={}",
        report.resolved,
        report.failed,
        report.skipped,
        report.annotated,
        report.duplicate,
        report.discarded
    );
}

/// Resolve one UUID and print the result as JSON.
pub(crate) async fn resolve(config: &Config, uuid: &str, entity_type: &str) -> anyhow::Result<()> {
    let entity_type: EntityType = entity_type.parse()?;
    let uuid = uuid.trim().to_ascii_lowercase();
    if uuid::Uuid::parse_str(&uuid).is_err() {
        bail!("'{}' is not a UUID", uuid);
    }

    let cache = Arc::new(ResolutionCache::with_capacity(
        Duration::from_millis(config.settings.cache_timeout_ms),
        config.resolver.cache_capacity,
    ));
    let resolver = EntityResolver::new(build_authority(config)?, cache, &config.resolver);
    let entity = resolver.resolve(&uuid, entity_type).await;

    println!("{}", serde_json::to_string_pretty(&entity)?);
    if let Some(failure) = entity.error {
        bail!("Resolution failed: {}", failure);
    }
    Ok(())
}

/// Print validation results; errors fail the command.
pub(crate) fn check_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        bail!("Configuration has {} error(s)", result.errors.len());
    }
    println!("Configuration OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuidlens_config::ConfigLoader;

    const SNAPSHOT: &str = r#"{
        "title": "Scripts",
        "root": { "tag": "body", "children": [
            { "tag": "label", "attributes": { "for": "s" }, "children": [ { "text": "Script UUID" } ] },
            { "tag": "input", "attributes": { "id": "s" }, "value": "ff645018-de64-43cb-a80c-d63da9422c82" }
        ]}
    }"#;

    #[tokio::test]
    async fn test_scan_writes_annotated_markup() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("page.json");
        let output = dir.path().join("page.html");
        std::fs::write(&snapshot, SNAPSHOT).unwrap();

        scan(&Config::default(), &snapshot, Some(&output), true)
            .await
            .unwrap();

        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains("uuidlens-annotation"));
        assert!(html.contains("(script)"));
    }

    #[tokio::test]
    async fn test_scan_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan(&Config::default(), &dir.path().join("absent.json"), None, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_input() {
        let config = Config::default();
        assert!(resolve(&config, "not-a-uuid", "script").await.is_err());
        assert!(
            resolve(&config, "ff645018-de64-43cb-a80c-d63da9422c82", "device")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_resolve_without_authority_fails() {
        let result = resolve(
            &Config::default(),
            "ff645018-de64-43cb-a80c-d63da9422c82",
            "script",
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_check_config() {
        assert!(check_config(&Config::default()).is_ok());

        let config = ConfigLoader::load_str("[settings]\ncache_timeout_ms = 0\n").unwrap();
        assert!(check_config(&config).is_err());
    }
}
