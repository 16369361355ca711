//! CLI route table driven end to end over the fake service.

use crate::integration::support::{client_config, FakeService, FakeTransport, PNG_BYTES};
use infogen::cli::{Commands, QueueCommands, RunContext};
use infogen::config::InfogenConfig;
use infogen::error::ApiError;
use infogen::orchestrator::Timings;
use infogen::state::{StatePatch, StateStore, UnitId};
use std::sync::Arc;
use tempfile::TempDir;

const URL: &str = "https://youtu.be/abc123";

fn config_for(dir: &TempDir) -> InfogenConfig {
    let mut config = InfogenConfig::default();
    config.client = client_config();
    config.storage.store_path = Some(dir.path().join("store"));
    config
}

fn context(dir: &TempDir, service: FakeService) -> RunContext {
    RunContext::with_transport(
        dir.path().to_path_buf(),
        config_for(dir),
        Arc::new(FakeTransport(Arc::new(service))),
        Timings::immediate(),
    )
    .unwrap()
}

fn queue(command: QueueCommands) -> Commands {
    Commands::Queue { command }
}

#[test]
fn test_generate_then_status_and_export() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, FakeService::default());

    let out = ctx
        .execute(&Commands::Generate {
            url: URL.to_string(),
            title: Some("Demo".to_string()),
        })
        .unwrap();
    assert!(out.contains("Infographic ready for abc123"));

    let status = ctx
        .execute(&Commands::Status {
            unit: None,
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(parsed["focused"], "abc123");
    assert_eq!(parsed["unit"]["status"], "COMPLETED");
    assert!(parsed["lock"].is_null());

    let target = dir.path().join("out.png");
    let out = ctx
        .execute(&Commands::Export {
            unit: URL.to_string(),
            path: target.clone(),
        })
        .unwrap();
    assert!(out.contains("image/png"));
    assert_eq!(std::fs::read(&target).unwrap(), PNG_BYTES);
}

#[test]
fn test_export_without_stored_image_fails() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, FakeService::default());
    let err = ctx
        .execute(&Commands::Export {
            unit: "missing".to_string(),
            path: dir.path().join("x.png"),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::ArtifactMissing(_)));
}

#[test]
fn test_queue_commands_edit_and_list() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, FakeService::default());

    let out = ctx
        .execute(&queue(QueueCommands::Add {
            url: URL.to_string(),
            title: Some("First".to_string()),
        }))
        .unwrap();
    assert_eq!(out, "Queued abc123");
    let out = ctx
        .execute(&queue(QueueCommands::Add {
            url: "https://www.youtube.com/watch?v=abc123".to_string(),
            title: None,
        }))
        .unwrap();
    assert_eq!(out, "abc123 is already queued");
    ctx.execute(&queue(QueueCommands::Add {
        url: "https://youtu.be/def456".to_string(),
        title: None,
    }))
    .unwrap();

    let listed = ctx
        .execute(&queue(QueueCommands::List {
            format: "json".to_string(),
        }))
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert_eq!(parsed[0]["status"], "PENDING");

    let out = ctx.execute(&queue(QueueCommands::Remove { index: 0 })).unwrap();
    assert_eq!(out, "Removed abc123");
    let err = ctx
        .execute(&queue(QueueCommands::Remove { index: 5 }))
        .unwrap_err();
    assert!(matches!(err, ApiError::QueueIndexOutOfRange(5)));

    let out = ctx.execute(&queue(QueueCommands::Clear)).unwrap();
    assert_eq!(out, "Cleared 1 queued item(s)");
}

#[test]
fn test_queue_run_reports_halt() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, FakeService::default().with_quota(0));
    for id in ["aaa", "bbb"] {
        ctx.execute(&queue(QueueCommands::Add {
            url: format!("https://youtu.be/{}", id),
            title: None,
        }))
        .unwrap();
    }
    let out = ctx.execute(&queue(QueueCommands::Run)).unwrap();
    assert!(out.contains("0 completed, 1 failed"));
    assert!(out.contains("Stopped early (Limit); 1 item(s) left pending"));
}

#[test]
fn test_reset_forgets_unit() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, FakeService::default());
    ctx.execute(&Commands::Generate {
        url: URL.to_string(),
        title: None,
    })
    .unwrap();

    let out = ctx
        .execute(&Commands::Reset {
            unit: "abc123".to_string(),
            yes: true,
        })
        .unwrap();
    assert_eq!(out, "Reset abc123");
    let out = ctx
        .execute(&Commands::Reset {
            unit: "abc123".to_string(),
            yes: true,
        })
        .unwrap();
    assert_eq!(out, "No state recorded for abc123");
}

#[test]
fn test_startup_sweeps_interrupted_runs() {
    let dir = TempDir::new().unwrap();
    {
        let store = StateStore::open(&dir.path().join("store")).unwrap();
        let now = infogen::state::now_millis();
        store
            .update_state(&UnitId::new("abc123"), StatePatch::running(now, None), now)
            .unwrap();
        store.flush().unwrap();
    }
    let ctx = context(&dir, FakeService::default());
    let out = ctx.execute(&Commands::Sweep).unwrap();
    assert!(out.contains("Interrupted runs failed: 1"));
    assert!(out.contains("abc123"));

    let state = ctx
        .orchestrator()
        .store()
        .get_state(&UnitId::new("abc123"))
        .unwrap()
        .unwrap();
    assert!(state.status.is_failure());
}

#[test]
fn test_events_and_gallery_output() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, FakeService::default());
    ctx.execute(&Commands::Generate {
        url: URL.to_string(),
        title: Some("Demo".to_string()),
    })
    .unwrap();

    let events = ctx
        .execute(&Commands::Events {
            after: 1,
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&events).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["status"], "COMPLETED");

    let gallery = ctx
        .execute(&Commands::Gallery {
            format: "text".to_string(),
        })
        .unwrap();
    assert!(gallery.contains("abc123"));
    assert!(gallery.contains("Total: 1"));
}

#[test]
fn test_config_command_redacts_cookie() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir);
    config.client.cookie = Some("SID=secret".to_string());
    let ctx = RunContext::with_transport(
        dir.path().to_path_buf(),
        config,
        Arc::new(FakeTransport(Arc::new(FakeService::default()))),
        Timings::immediate(),
    )
    .unwrap();
    let out = ctx.execute(&Commands::Config).unwrap();
    assert!(out.contains("<redacted>"));
    assert!(!out.contains("secret"));
    assert!(out.contains("notebook.example.test"));
}
