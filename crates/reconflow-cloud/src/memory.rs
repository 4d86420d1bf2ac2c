//! In-memory backend
//!
//! Stores objects exactly as submitted, which makes it the identity backend
//! the round-trip law is stated against. Used by tests and dry runs.

use crate::backend::{Backend, BackendObject};
use crate::error::BackendError;
use crate::identity::ResourceIdentity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Key that treats subscription and resource group case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    subscription_id: String,
    resource_group: String,
    parent_name: String,
    name: String,
}

impl From<&ResourceIdentity> for ObjectKey {
    fn from(id: &ResourceIdentity) -> Self {
        Self {
            subscription_id: id.subscription_id.to_ascii_lowercase(),
            resource_group: id.resource_group.to_ascii_lowercase(),
            parent_name: id.parent_name.clone(),
            name: id.name.clone(),
        }
    }
}

/// Backend holding objects in a map
pub struct MemoryBackend<T> {
    objects: RwLock<HashMap<ObjectKey, T>>,
    latency: Option<Duration>,
    next_failure: Mutex<Option<BackendError>>,
}

impl<T: BackendObject> MemoryBackend<T> {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            latency: None,
            next_failure: Mutex::new(None),
        }
    }

    /// Delay every call, for exercising deadlines
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call fail with `error`
    pub async fn fail_next(&self, error: BackendError) {
        *self.next_failure.lock().await = Some(error);
    }

    /// Seed an object that was created outside the reconciler
    pub async fn insert(&self, id: &ResourceIdentity, object: T) {
        self.objects.write().await.insert(id.into(), object);
    }

    pub async fn stored(&self, id: &ResourceIdentity) -> Option<T> {
        self.objects.read().await.get(&ObjectKey::from(id)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn before_call(&self) -> Result<(), BackendError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.next_failure.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<T: BackendObject> Default for MemoryBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: BackendObject> Backend for MemoryBackend<T> {
    type Object = T;

    async fn get(&self, id: &ResourceIdentity) -> Result<T, BackendError> {
        self.before_call().await?;
        self.objects
            .read()
            .await
            .get(&ObjectKey::from(id))
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn create_or_update(&self, id: &ResourceIdentity, object: T) -> Result<(), BackendError> {
        self.before_call().await?;
        tracing::debug!("Storing {} in memory backend", id);
        self.objects.write().await.insert(id.into(), object);
        Ok(())
    }

    async fn delete(&self, id: &ResourceIdentity) -> Result<(), BackendError> {
        self.before_call().await?;
        match self.objects.write().await.remove(&ObjectKey::from(id)) {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdFormat;

    #[derive(Debug, Clone, PartialEq)]
    struct Thing(&'static str);

    impl BackendObject for Thing {
        fn kind(&self) -> &str {
            self.0
        }
    }

    const FORMAT: IdFormat = IdFormat::new("Test.Provider", "parents", "things");

    #[tokio::test]
    async fn test_lookup_ignores_resource_group_case() {
        let backend = MemoryBackend::new();
        let id = ResourceIdentity::new(FORMAT, "sub", "MyGroup", "p", "n");
        backend.insert(&id, Thing("a")).await;

        let mut lowered = id.clone();
        lowered.resource_group = "mygroup".to_string();
        assert_eq!(backend.get(&lowered).await.unwrap(), Thing("a"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let backend: MemoryBackend<Thing> = MemoryBackend::new();
        let id = ResourceIdentity::new(FORMAT, "sub", "rg", "p", "n");
        assert_eq!(backend.delete(&id).await, Err(BackendError::NotFound));
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let backend: MemoryBackend<Thing> = MemoryBackend::new();
        let id = ResourceIdentity::new(FORMAT, "sub", "rg", "p", "n");
        backend
            .fail_next(BackendError::Transport("connection reset".into()))
            .await;

        assert!(matches!(
            backend.create_or_update(&id, Thing("a")).await,
            Err(BackendError::Transport(_))
        ));
        assert!(backend.create_or_update(&id, Thing("a")).await.is_ok());
        assert_eq!(backend.len().await, 1);
    }
}
