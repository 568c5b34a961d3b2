//! Namespaced key/value preferences, persisted as one JSON file per namespace.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Namespace holding settings, targets and step counters.
pub const SETTINGS_NAMESPACE: &str = "steps_ohos";

type Namespace = BTreeMap<String, Value>;

/// Shared handle to the preference store. Clones refer to the same data.
#[derive(Clone)]
pub struct PreferenceCache {
    dir: Option<PathBuf>,
    namespaces: Arc<Mutex<HashMap<String, Namespace>>>,
}

impl PreferenceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            namespaces: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A cache that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            namespaces: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn file_for(dir: &Path, namespace: &str) -> PathBuf {
        dir.join(format!("{namespace}.json"))
    }

    /// Loads `namespace` from disk. Opening an already open namespace is a no-op.
    pub async fn open(&self, namespace: &str) -> Result<()> {
        let mut namespaces = self.namespaces.lock().await;
        if namespaces.contains_key(namespace) {
            return Ok(());
        }

        let values = match &self.dir {
            Some(dir) => {
                let path = Self::file_for(dir, namespace);
                match tokio::fs::read(&path).await {
                    Ok(bytes) => serde_json::from_slice(&bytes)?,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Namespace::new(),
                    Err(e) => return Err(e.into()),
                }
            }
            None => Namespace::new(),
        };
        tracing::debug!(namespace, keys = values.len(), "opened preference namespace");
        namespaces.insert(namespace.to_string(), values);
        Ok(())
    }

    pub async fn is_open(&self, namespace: &str) -> bool {
        self.namespaces.lock().await.contains_key(namespace)
    }

    /// Value stored under `key`, or `default` when the key is absent or holds
    /// a value of another shape.
    pub async fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str, default: T) -> Result<T> {
        Ok(self.get_opt(namespace, key).await?.unwrap_or(default))
    }

    pub async fn get_opt<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>> {
        let namespaces = self.namespaces.lock().await;
        let values = namespaces
            .get(namespace)
            .ok_or_else(|| Error::NamespaceNotOpen(namespace.to_string()))?;
        let Some(value) = values.get(key) else {
            return Ok(None);
        };
        match serde_json::from_value(value.clone()) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(namespace, key, error = %e, "ignoring malformed preference value");
                Ok(None)
            }
        }
    }

    pub async fn put<T: Serialize + ?Sized>(&self, namespace: &str, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut namespaces = self.namespaces.lock().await;
        let values = namespaces
            .get_mut(namespace)
            .ok_or_else(|| Error::NamespaceNotOpen(namespace.to_string()))?;
        values.insert(key.to_string(), value);
        self.flush(namespace, values).await
    }

    /// Removes `key`. Returns whether it was present.
    pub async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let mut namespaces = self.namespaces.lock().await;
        let values = namespaces
            .get_mut(namespace)
            .ok_or_else(|| Error::NamespaceNotOpen(namespace.to_string()))?;
        if values.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(namespace, values).await?;
        Ok(true)
    }

    /// Puts `id` at the front of the id list stored under `key`, dropping
    /// the oldest ids beyond `cap`. Returns the dropped ids, oldest last.
    pub async fn prepend_capped(
        &self,
        namespace: &str,
        key: &str,
        id: &str,
        cap: Option<usize>,
    ) -> Result<Vec<String>> {
        let mut namespaces = self.namespaces.lock().await;
        let values = namespaces
            .get_mut(namespace)
            .ok_or_else(|| Error::NamespaceNotOpen(namespace.to_string()))?;

        let mut ids: Vec<String> = values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        ids.insert(0, id.to_string());
        let dropped = cap
            .filter(|&cap| ids.len() > cap)
            .map(|cap| ids.split_off(cap))
            .unwrap_or_default();
        values.insert(key.to_string(), serde_json::to_value(ids)?);
        self.flush(namespace, values).await?;
        Ok(dropped)
    }

    async fn flush(&self, namespace: &str, values: &Namespace) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = Self::file_for(dir, namespace);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(values)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
