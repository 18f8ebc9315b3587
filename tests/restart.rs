mod common;

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use promptbridge_lib::license::RemoteApi;
use promptbridge_lib::router::{Envelope, Response, Sender};
use promptbridge_lib::storage::SqliteStore;
use promptbridge_lib::Background;
use serde_json::{json, Value};

use common::{AcceptingRemote, OfflineRemote, QuietHost};

const URL: &str = "https://www.youtube.com/watch?v=abc";

fn start(path: &Path, remote: Arc<dyn RemoteApi>) -> Background {
    let store = SqliteStore::new(path.to_path_buf()).unwrap();
    Background::new(
        Arc::new(store),
        remote,
        Arc::new(QuietHost::default()),
        Duration::minutes(5),
    )
}

async fn send(bg: &Background, action: &str, payload: Value, sender: Sender) -> Response {
    bg.on_message(Envelope::new(action, payload, sender))
        .await
        .expect("routed action must reply")
}

#[tokio::test]
async fn durable_state_survives_a_restart_and_memory_state_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("promptbridge.sqlite3");

    {
        let bg = start(&path, Arc::new(AcceptingRemote));
        let validated = send(
            &bg,
            "validate-license",
            json!({"licenseKey": "LIFE-1", "email": "me@example.com"}),
            Sender::default(),
        )
        .await;
        assert!(validated.success);

        let saved = send(
            &bg,
            "save-custom-variant",
            json!({"variant": {"variant": "exec-summary", "prompt": "Summarize: {transcript}"}}),
            Sender::default(),
        )
        .await;
        assert!(saved.success);

        let variants = send(&bg, "get-prompt-variants", Value::Null, Sender::default()).await;
        assert!(variants.success);

        send(
            &bg,
            "store-transcript",
            json!({"url": URL, "transcript": "hello"}),
            Sender::tab(5, 1),
        )
        .await;
        bg.on_icon_activated(1).await;
    }

    // Restarted process, and the API is now unreachable.
    let bg = start(&path, Arc::new(OfflineRemote));

    let status = send(&bg, "get-license-status", Value::Null, Sender::default()).await;
    let license = status.field("license").unwrap();
    assert_eq!(license["state"], "checked");
    assert_eq!(license["licenseKey"], "LIFE-1");

    let custom = send(&bg, "get-custom-variants", Value::Null, Sender::default()).await;
    assert_eq!(custom.field("variants").unwrap()[0]["variant"], "exec-summary");

    let remote = send(&bg, "get-prompt-variants", Value::Null, Sender::default()).await;
    assert!(remote.success);
    assert_eq!(remote.field("variants").unwrap()[0]["variant"], "summary");

    assert!(!bg.on_tab_updated(5, Some("complete"), Some(URL)).await);
    let panel = send(&bg, "get-panel-state", json!({"windowId": 1}), Sender::default()).await;
    assert_eq!(panel.field("isOpen"), Some(&json!(false)));
}

#[tokio::test]
async fn clearing_the_license_persists_the_no_license_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("promptbridge.sqlite3");

    {
        let bg = start(&path, Arc::new(AcceptingRemote));
        send(
            &bg,
            "validate-license",
            json!({"licenseKey": "LIFE-1", "email": "me@example.com"}),
            Sender::default(),
        )
        .await;
        let cleared = send(&bg, "clear-license", Value::Null, Sender::default()).await;
        assert!(cleared.success);
    }

    let bg = start(&path, Arc::new(OfflineRemote));
    let status = send(&bg, "get-license-status", Value::Null, Sender::default()).await;
    assert_eq!(status.field("license"), Some(&json!({"state": "none"})));
}
