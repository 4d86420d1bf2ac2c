//! Backend RPC abstraction
//!
//! The management API is an opaque typed RPC client here. Every resource
//! kind plugs in a [`Backend`] whose object type is a closed enum of the
//! kinds that endpoint can return.

use crate::error::BackendError;
use crate::identity::ResourceIdentity;
use async_trait::async_trait;

/// Vendor-side representation of one resource
pub trait BackendObject: Clone + Send + Sync {
    /// Discriminating kind tag (e.g. "CosmosDbMongoDbApi")
    fn kind(&self) -> &str;

    /// Id reported by the backend, if the object carries one
    fn reported_id(&self) -> Option<&str> {
        None
    }
}

/// Typed RPC client for one resource kind
///
/// Not-found is reported as [`BackendError::NotFound`] by every method.
#[async_trait]
pub trait Backend: Send + Sync {
    type Object: BackendObject;

    async fn get(&self, id: &ResourceIdentity) -> Result<Self::Object, BackendError>;

    async fn create_or_update(
        &self,
        id: &ResourceIdentity,
        object: Self::Object,
    ) -> Result<(), BackendError>;

    async fn delete(&self, id: &ResourceIdentity) -> Result<(), BackendError>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    type Object = B::Object;

    async fn get(&self, id: &ResourceIdentity) -> Result<Self::Object, BackendError> {
        (**self).get(id).await
    }

    async fn create_or_update(
        &self,
        id: &ResourceIdentity,
        object: Self::Object,
    ) -> Result<(), BackendError> {
        (**self).create_or_update(id, object).await
    }

    async fn delete(&self, id: &ResourceIdentity) -> Result<(), BackendError> {
        (**self).delete(id).await
    }
}
