//! Reconcile adapter
//!
//! Drives one resource kind through create-or-update, read and delete.
//! Each call is a single request-response cycle bounded by [`Timeouts`];
//! nothing is cached between calls and nothing is retried.

use crate::backend::{Backend, BackendObject};
use crate::error::{Operation, ReconcileError, Result};
use crate::identity::ResourceIdentity;
use crate::mapper::PropertyMapper;
use crate::plan::Plan;
use crate::property::PropertyRecord;
use crate::resolver::IdentityResolver;
use std::future::Future;
use std::time::Duration;

/// Per-operation deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    /// Same deadline for every operation
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Whether a write is a fresh create or an update of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Check for an existing object first and refuse to adopt it
    Create,
    Update,
}

/// Result of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Present(PropertyRecord),
    /// The identity has no live counterpart; callers should drop their handle
    Absent,
}

impl ReadOutcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }

    pub fn into_record(self) -> Option<PropertyRecord> {
        match self {
            ReadOutcome::Present(record) => Some(record),
            ReadOutcome::Absent => None,
        }
    }
}

/// Reconciler for one resource kind
pub struct Reconciler<M, B> {
    resolver: IdentityResolver,
    mapper: M,
    backend: B,
    timeouts: Timeouts,
}

impl<M, B> Reconciler<M, B>
where
    M: PropertyMapper,
    B: Backend<Object = M::Object>,
{
    /// `subscription_id` is used for configurations that address the parent by name
    pub fn new(mapper: M, backend: B, subscription_id: impl Into<String>) -> Self {
        let resolver = IdentityResolver::new(
            mapper.id_format(),
            mapper.identity_fields(),
            subscription_id,
        );
        Self {
            resolver,
            mapper,
            backend,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Resolve the identity from configuration, then create or update
    pub async fn apply(&self, mode: WriteMode, config: &PropertyRecord) -> Result<ResourceIdentity> {
        let identity = self.resolver.resolve_for_write(config)?;
        self.create_or_update(mode, &identity, config).await
    }

    /// Submit the configuration for `identity`.
    ///
    /// In [`WriteMode::Create`] the backend is checked first and an existing
    /// object fails with `AlreadyExists`. The check is best-effort; a
    /// concurrent writer can still slip in between check and submit.
    pub async fn create_or_update(
        &self,
        mode: WriteMode,
        identity: &ResourceIdentity,
        config: &PropertyRecord,
    ) -> Result<ResourceIdentity> {
        let operation = match mode {
            WriteMode::Create => Operation::Create,
            WriteMode::Update => Operation::Update,
        };

        self.within(operation, identity, async {
            if mode == WriteMode::Create {
                self.ensure_absent(identity).await?;
            }

            let object = self.mapper.expand(config)?;

            tracing::info!(
                "Submitting {} {} ({})",
                self.mapper.resource_type(),
                identity,
                operation
            );
            self.backend
                .create_or_update(identity, object)
                .await
                .map_err(|e| ReconcileError::backend(identity.to_string(), e))?;

            Ok(identity.clone())
        })
        .await
    }

    async fn ensure_absent(&self, identity: &ResourceIdentity) -> Result<()> {
        tracing::debug!("Checking for presence of existing {}", identity);
        match self.backend.get(identity).await {
            Ok(existing) => {
                let id = existing
                    .reported_id()
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| identity.to_string());
                Err(ReconcileError::AlreadyExists {
                    resource_type: self.mapper.resource_type().to_string(),
                    id,
                })
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ReconcileError::backend(identity.to_string(), e)),
        }
    }

    /// Fetch and flatten the live object
    pub async fn read(&self, identity: &ResourceIdentity) -> Result<ReadOutcome> {
        self.within(Operation::Read, identity, async {
            let object = match self.backend.get(identity).await {
                Ok(object) => object,
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} was not found, treating as absent", identity);
                    return Ok(ReadOutcome::Absent);
                }
                Err(e) => return Err(ReconcileError::backend(identity.to_string(), e)),
            };

            if object.kind() != self.mapper.kind() {
                return Err(ReconcileError::TypeMismatch {
                    resource: identity.to_string(),
                    expected: self.mapper.kind().to_string(),
                    received: object.kind().to_string(),
                });
            }

            let mut record = self
                .mapper
                .flatten(&object)
                .map_err(|e| e.for_resource(&identity.to_string()))?;
            record.merge(self.resolver.flatten_identity(identity));

            Ok(ReadOutcome::Present(record))
        })
        .await
    }

    /// Parse a persisted handle and read it
    pub async fn read_handle(&self, handle: &str) -> Result<ReadOutcome> {
        let identity = self.resolver.parse(handle)?;
        self.read(&identity).await
    }

    /// Delete the object. Deleting something already gone succeeds.
    pub async fn delete(&self, identity: &ResourceIdentity) -> Result<()> {
        self.within(Operation::Delete, identity, async {
            tracing::info!("Deleting {} {}", self.mapper.resource_type(), identity);
            match self.backend.delete(identity).await {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} was already gone", identity);
                    Ok(())
                }
                Err(e) => Err(ReconcileError::backend(identity.to_string(), e)),
            }
        })
        .await
    }

    /// Adopt an existing object by handle
    pub async fn import(&self, handle: &str) -> Result<(ResourceIdentity, PropertyRecord)> {
        let identity = self.resolver.parse(handle)?;
        match self.read(&identity).await? {
            ReadOutcome::Present(record) => Ok((identity, record)),
            ReadOutcome::Absent => Err(ReconcileError::invalid_config(format!(
                "cannot import non-existent remote object {}",
                identity
            ))),
        }
    }

    /// Compare configuration with live state without changing anything
    pub async fn plan(&self, config: &PropertyRecord) -> Result<Plan> {
        let identity = self.resolver.resolve_for_write(config)?;
        let schema = self.mapper.schema();
        let resource_type = self.mapper.resource_type();

        Ok(match self.read(&identity).await? {
            ReadOutcome::Absent => Plan::create(resource_type, identity.to_string(), schema, config),
            ReadOutcome::Present(current) => {
                Plan::update(resource_type, identity.to_string(), schema, config, &current)
            }
        })
    }

    async fn within<T, F>(&self, operation: Operation, identity: &ResourceIdentity, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let after = self.timeouts.for_operation(operation);
        match tokio::time::timeout(after, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("{} of {} timed out after {:?}", operation, identity, after);
                Err(ReconcileError::Timeout {
                    operation,
                    resource: identity.to_string(),
                    after,
                })
            }
        }
    }
}
