//! Object storage for rendered charts.
//!
//! The store is created once at startup and shared by every request as an
//! `Arc<dyn ObjectStore>`.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::{ConfigError, ServiceConfig, StorageBackend};

/// Storage failure for a single object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Storage responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid object name '{0}'")]
    InvalidName(String),
}

/// A flat namespace of named blobs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or replace `name`.
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Current contents of `name`, `None` when it does not exist.
    async fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove `name`. Removing a missing object succeeds.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Google Cloud Storage through its JSON API.
#[derive(Debug, Clone)]
pub struct GcsStore {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    token: Option<String>,
}

impl GcsStore {
    pub fn new(endpoint: &str, bucket: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::Invalid {
            key: "STORAGE_ENDPOINT".to_string(),
            reason: format!("'{}': {}", endpoint, e),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "STORAGE_ENDPOINT".to_string(),
                reason: format!("'{}' cannot carry a path", endpoint),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            bucket: bucket.to_string(),
            token,
        })
    }

    fn with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Media upload URL for `name`.
    pub fn upload_url(&self, name: &str) -> Url {
        let mut url = self.with_segments(&["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", name);
        url
    }

    /// Metadata URL for `name`. The name is a single, percent-encoded segment.
    pub fn object_url(&self, name: &str) -> Url {
        self.with_segments(&["storage", "v1", "b", self.bucket.as_str(), "o", name])
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn status_error(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StorageError::Status { status, body }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let request = self
            .client
            .post(self.upload_url(name))
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        debug!(bucket = %self.bucket, name, "object uploaded");
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut url = self.object_url(name);
        url.query_pairs_mut().append_pair("alt", "media");
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let request = self.client.delete(self.object_url(name));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    fn describe(&self) -> String {
        format!("gcs bucket {} at {}", self.bucket, self.endpoint)
    }
}

/// Objects as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path an object is stored at. Names may contain `/` but must stay below the root.
    pub fn object_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(name);
        let contained = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn put(&self, name: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))
    }

    async fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.object_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.object_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<StoredObject> {
        self.objects.read().get(name).cloned()
    }

    /// Stored names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.objects.write().insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.read().get(name).map(|object| object.bytes.clone()))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.objects.write().remove(name);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Build the store selected by the configuration.
pub fn build_store(config: &ServiceConfig) -> Result<Arc<dyn ObjectStore>, ConfigError> {
    let store: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackend::Gcs => Arc::new(GcsStore::new(
            &config.storage_endpoint,
            &config.bucket_name,
            config.gcs_access_token.clone(),
        )?),
        StorageBackend::Local => {
            let root = config
                .local_storage_dir
                .clone()
                .ok_or(ConfigError::Missing("LOCAL_STORAGE_DIR"))?;
            Arc::new(LocalDirStore::new(root.join(&config.bucket_name)))
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
