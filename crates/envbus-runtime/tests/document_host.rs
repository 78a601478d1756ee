#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use envbus_core::error::{BusError, Result};
use envbus_runtime::config;
use envbus_runtime::host::{
    CatalogResolver, DocumentHost, DocumentStore, FsDocumentStore, LanguageResolver,
};
use envbus_runtime::OuterHandler;

use common::{data_json, RecordingChannel};

#[derive(Default)]
struct MemStore {
    files: Mutex<HashMap<PathBuf, String>>,
}

#[async_trait]
impl DocumentStore for MemStore {
    async fn read(&self, path: &Path) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BusError::Delegate(format!("{} not found", path.display())))
    }

    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}

fn catalog() -> CatalogResolver {
    let cfg = config::load_from_str(
        r#"
version: 1
languages:
  - extension: ".DMN"
    editor_id: "dmn"
    gwt_module_name: "org.kie.DmnEditor"
    errai_domain: "dmn"
    resources:
      - type: js
        paths: ["dmn/editor.nocache.js"]
"#,
    )
    .unwrap();
    CatalogResolver::from_config(&cfg.languages)
}

fn setup(path: &str) -> (Arc<RecordingChannel>, OuterHandler, Arc<DocumentHost>, Arc<MemStore>) {
    let store = Arc::new(MemStore::default());
    store
        .files
        .lock()
        .unwrap()
        .insert(PathBuf::from("models/loan.dmn"), "<dmn/>".to_string());

    let host = Arc::new(DocumentHost::new(
        path,
        "vscode",
        Arc::new(catalog()),
        store.clone(),
    ));
    let channel = Arc::new(RecordingChannel::new());
    let bus = OuterHandler::new(channel.clone(), host.clone());
    (channel, bus, host, store)
}

#[test]
fn catalog_matches_extension_loosely() {
    let c = catalog();
    assert_eq!(c.len(), 1);
    assert_eq!(c.resolve("dmn").unwrap().editor_id, "dmn");
    assert_eq!(c.resolve(".Dmn").unwrap().gwt_module_name, "org.kie.DmnEditor");
    assert!(c.resolve("bpmn").is_none());
    assert!(c.resolve("").is_none());
}

#[tokio::test(start_paused = true)]
async fn polling_announces_host_origin() {
    let (channel, bus, _host, _store) = setup("models/loan.dmn");
    bus.start_init_polling().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(15)).await;

    let (probe, _) = &channel.sent()[0];
    assert_eq!(probe.msg_type, "REQUEST_INIT");
    assert_eq!(data_json(probe), serde_json::json!("vscode"));
}

#[tokio::test]
async fn language_is_resolved_from_path_extension() {
    let (channel, bus, host, _store) = setup("models/loan.dmn");
    assert_eq!(host.extension(), "dmn");

    bus.receive(common::env(r#"{"type":"REQUEST_LANGUAGE"}"#)).await;
    let (env, _) = &channel.sent()[0];
    assert_eq!(env.msg_type, "RETURN_LANGUAGE");
    let data = data_json(env);
    assert_eq!(data["editorId"], "dmn");
    assert_eq!(data["resources"][0]["type"], "js");
}

#[tokio::test]
async fn unknown_extension_returns_no_language() {
    let (channel, bus, _host, _store) = setup("notes/readme.txt");
    bus.receive(common::env(r#"{"type":"REQUEST_LANGUAGE"}"#)).await;

    let (env, _) = &channel.sent()[0];
    assert_eq!(env.msg_type, "RETURN_LANGUAGE");
    assert!(env.data.is_none());
}

#[tokio::test]
async fn content_request_serves_the_document() {
    let (channel, bus, _host, _store) = setup("models/loan.dmn");
    bus.receive(common::env(r#"{"type":"REQUEST_SET_CONTENT"}"#)).await;

    let (env, _) = &channel.sent()[0];
    assert_eq!(env.msg_type, "RETURN_SET_CONTENT");
    assert_eq!(data_json(env), serde_json::json!("<dmn/>"));
}

#[tokio::test]
async fn missing_document_is_a_delegate_error() {
    let (channel, bus, _host, _store) = setup("models/other.dmn");
    bus.receive(common::env(r#"{"type":"REQUEST_SET_CONTENT"}"#)).await;

    assert!(channel.sent().is_empty());
    assert_eq!(
        bus.metrics()
            .delegate_errors
            .get(&[("role", "outer"), ("type", "REQUEST_SET_CONTENT")]),
        1
    );
}

#[tokio::test]
async fn save_round_trip_writes_content() {
    let (channel, bus, host, store) = setup("models/loan.dmn");

    assert!(host.request_save(&bus).unwrap());
    assert_eq!(channel.sent_types(), ["REQUEST_GET_CONTENT"]);

    bus.receive(common::env(r#"{"type":"RETURN_GET_CONTENT","data":"<dmn v=\"2\"/>"}"#))
        .await;
    assert_eq!(
        store.files.lock().unwrap().get(Path::new("models/loan.dmn")).unwrap(),
        "<dmn v=\"2\"/>"
    );
}

#[tokio::test]
async fn save_is_skipped_without_a_path() {
    let (channel, bus, host, _store) = setup("");
    assert!(!host.request_save(&bus).unwrap());
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn fs_store_reads_and_writes() {
    let path = std::env::temp_dir().join(format!("envbus-fs-store-{}.dmn", std::process::id()));
    let store = FsDocumentStore;

    store.write(&path, "<dmn/>").await.unwrap();
    assert_eq!(store.read(&path).await.unwrap(), "<dmn/>");
    tokio::fs::remove_file(&path).await.unwrap();

    let err = store.read(&path).await.expect_err("must fail");
    assert_eq!(err.code().as_str(), "DELEGATE");
}
