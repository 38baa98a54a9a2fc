use pretty_assertions::assert_eq;
use pulse_server::config::StorageBackend;
use pulse_server::storage::{
    build_store, GcsStore, LocalDirStore, MemoryStore, ObjectStore, StorageError,
};
use pulse_server::ServiceConfig;

#[tokio::test]
async fn test_memory_store() {
    let store = MemoryStore::new();
    store.put("b.png", vec![1, 2], "image/png").await.unwrap();
    store.put("a.png", vec![3], "image/png").await.unwrap();
    store.put("a.png", vec![4], "image/png").await.unwrap();

    assert_eq!(store.names(), vec!["a.png", "b.png"]);
    assert_eq!(store.get("a.png").unwrap().bytes, vec![4]);
    assert_eq!(store.get("b.png").unwrap().content_type, "image/png");

    assert_eq!(store.fetch("b.png").await.unwrap(), Some(vec![1, 2]));
    assert_eq!(store.fetch("missing.png").await.unwrap(), None);

    store.delete("a.png").await.unwrap();
    store.delete("missing.png").await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_local_dir_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalDirStore::new(dir.path());

    store
        .put("model_loss_created_at_angular/angular.png", b"png".to_vec(), "image/png")
        .await
        .unwrap();
    let path = dir.path().join("model_loss_created_at_angular/angular.png");
    assert_eq!(std::fs::read(&path).unwrap(), b"png");
    assert_eq!(
        store
            .fetch("model_loss_created_at_angular/angular.png")
            .await
            .unwrap(),
        Some(b"png".to_vec())
    );
    assert_eq!(store.fetch("never_stored.png").await.unwrap(), None);

    store
        .delete("model_loss_created_at_angular/angular.png")
        .await
        .unwrap();
    assert!(!path.exists());
    store.delete("never_stored.png").await.unwrap();
}

#[tokio::test]
async fn test_local_dir_store_rejects_escaping_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalDirStore::new(dir.path());

    for name in ["../outside.png", "/etc/passwd", ""] {
        let result = store.put(name, Vec::new(), "image/png").await;
        assert_eq!(result, Err(StorageError::InvalidName(name.to_string())));
    }
}

#[test]
fn test_gcs_urls() {
    let store = GcsStore::new("https://storage.googleapis.com", "pulse-charts", None).unwrap();

    assert_eq!(
        store.upload_url("pull_chart_react.png").as_str(),
        "https://storage.googleapis.com/upload/storage/v1/b/pulse-charts/o?uploadType=media&name=pull_chart_react.png"
    );
    assert_eq!(
        store.object_url("charts/pull_chart_react.png").as_str(),
        "https://storage.googleapis.com/storage/v1/b/pulse-charts/o/charts%2Fpull_chart_react.png"
    );

    let emulator = GcsStore::new("http://localhost:4443/", "b", None).unwrap();
    assert_eq!(
        emulator.object_url("x.png").as_str(),
        "http://localhost:4443/storage/v1/b/b/o/x.png"
    );
}

#[test]
fn test_gcs_rejects_bad_endpoint() {
    assert!(GcsStore::new("not a url", "b", None).is_err());
    assert!(GcsStore::new("mailto:someone@example.com", "b", None).is_err());
}

#[test]
fn test_build_store_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        base_image_path: "https://example.com/".to_string(),
        bucket_name: "charts".to_string(),
        storage_backend: StorageBackend::Local,
        local_storage_dir: Some(dir.path().to_path_buf()),
        ..ServiceConfig::default()
    };
    let store = build_store(&config).unwrap();
    assert!(store.describe().contains("charts"));

    let memory = ServiceConfig {
        storage_backend: StorageBackend::Memory,
        ..config
    };
    assert_eq!(build_store(&memory).unwrap().describe(), "memory");
}
