//! Object storage capability for flat documents.
//!
//! Objects are UTF-8 bodies addressed by slash-separated keys such as
//! `posts/<slug>.md`, each carrying a small string-metadata map and an
//! upload timestamp. The filesystem implementation persists the metadata in
//! a JSON sidecar next to the body file.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::fs;
use tokio::sync::RwLock;

use super::error::InfraError;

const SIDECAR_SUFFIX: &str = ".meta.json";

/// A fetched object with its attached metadata.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: String,
    pub metadata: HashMap<String, String>,
    pub uploaded_at: OffsetDateTime,
}

/// A listing entry; bodies are not loaded during listing.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub uploaded_at: OffsetDateTime,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, InfraError>;
    async fn put(
        &self,
        key: &str,
        body: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), InfraError>;
    async fn delete(&self, key: &str) -> Result<(), InfraError>;
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, InfraError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    #[serde(with = "time::serde::rfc3339")]
    uploaded_at: OffsetDateTime,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Objects as plain files under a root directory, metadata in sidecars.
#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, InfraError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, InfraError> {
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(InfraError::storage(format!("invalid object key `{key}`")));
        }

        Ok(self.root.join(relative))
    }

    fn sidecar_path(path: &Path) -> PathBuf {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(SIDECAR_SUFFIX);
        PathBuf::from(raw)
    }

    async fn read_sidecar(path: &Path) -> Option<Sidecar> {
        let raw = fs::read_to_string(Self::sidecar_path(path)).await.ok()?;
        serde_json::from_str(&raw).ok()
    }

    async fn uploaded_at(path: &Path) -> Result<OffsetDateTime, InfraError> {
        if let Some(sidecar) = Self::read_sidecar(path).await {
            return Ok(sidecar.uploaded_at);
        }
        let modified = fs::metadata(path).await?.modified()?;
        Ok(OffsetDateTime::from(modified))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, InfraError> {
        let path = self.resolve(key)?;
        let body = match fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(InfraError::Io(err)),
        };

        let (metadata, uploaded_at) = match Self::read_sidecar(&path).await {
            Some(sidecar) => (sidecar.metadata, sidecar.uploaded_at),
            None => {
                let modified = fs::metadata(&path).await?.modified()?;
                (HashMap::new(), OffsetDateTime::from(modified))
            }
        };

        Ok(Some(StoredObject {
            body,
            metadata,
            uploaded_at,
        }))
    }

    async fn put(
        &self,
        key: &str,
        body: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), InfraError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, body).await?;

        let sidecar = Sidecar {
            uploaded_at: OffsetDateTime::now_utc(),
            metadata,
        };
        let raw = serde_json::to_string(&sidecar)
            .map_err(|err| InfraError::storage(format!("sidecar encoding failed: {err}")))?;
        fs::write(Self::sidecar_path(&path), raw).await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), InfraError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(InfraError::Io(err)),
        }
        match fs::remove_file(Self::sidecar_path(&path)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::Io(err)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, InfraError> {
        let mut entries = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(directory) = pending.pop() {
            let mut reader = match fs::read_dir(&directory).await {
                Ok(reader) => reader,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(InfraError::Io(err)),
            };

            while let Some(entry) = reader.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Some(key) = object_key(&self.root, &path) else {
                    continue;
                };
                if key.ends_with(SIDECAR_SUFFIX) || !key.starts_with(prefix) {
                    continue;
                }

                let size = entry.metadata().await?.len();
                let uploaded_at = Self::uploaded_at(&path).await?;
                entries.push(ObjectEntry {
                    key,
                    size,
                    uploaded_at,
                });
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        let part = component.as_os_str().to_str()?;
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(part);
    }
    Some(key)
}

/// Non-persistent store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, InfraError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        body: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), InfraError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body: body.to_string(),
                metadata,
                uploaded_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), InfraError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, InfraError> {
        let objects = self.objects.read().await;
        let mut entries: Vec<ObjectEntry> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectEntry {
                key: key.clone(),
                size: object.body.len() as u64,
                uploaded_at: object.uploaded_at,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
