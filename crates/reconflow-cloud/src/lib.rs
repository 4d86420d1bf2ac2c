//! reconflow cloud core
//!
//! This crate provides the generic resource reconciliation adapter used by
//! every reconflow resource kind: translate a flat configuration record into
//! a backend request, call the management API, and flatten the response back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              recon CLI / library caller           │
//! └─────────────────┬────────────────────────────────┘
//!                   │ PropertyRecord / handle
//! ┌─────────────────▼────────────────────────────────┐
//! │                reconflow-cloud                    │
//! │  ┌──────────────────┐   ┌─────────────────────┐  │
//! │  │ IdentityResolver │   │   PropertyMapper    │  │
//! │  └────────┬─────────┘   └──────────┬──────────┘  │
//! │           └──────────┬─────────────┘             │
//! │              ┌───────▼────────┐                  │
//! │              │   Reconciler   │                  │
//! │              └───────┬────────┘                  │
//! └──────────────────────┼───────────────────────────┘
//!                        │ trait Backend
//!          ┌─────────────┴──────────────┐
//! ┌────────▼────────┐          ┌────────▼────────┐
//! │ ARM (azure crate)│          │  MemoryBackend  │
//! └─────────────────┘          └─────────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod identity;
pub mod mapper;
pub mod memory;
pub mod plan;
pub mod property;
pub mod reconciler;
pub mod resolver;
pub mod schema;
pub mod state;

// Re-exports
pub use backend::{Backend, BackendObject};
pub use error::{BackendError, Operation, ReconcileError, Result};
pub use identity::{IdFormat, ParentIdentity, ResourceIdentity, check_segment};
pub use mapper::PropertyMapper;
pub use memory::MemoryBackend;
pub use plan::{ActionType, ChangeKind, FieldChange, Plan, PlanSummary};
pub use property::{PropertyRecord, PropertyValue};
pub use reconciler::{ReadOutcome, Reconciler, Timeouts, WriteMode};
pub use resolver::{IdentityFields, IdentityResolver, ParentRef};
pub use schema::{Comparison, FieldSpec, FieldType, SENSITIVE_PLACEHOLDER, Schema, Validator};
pub use state::{HandleEntry, HandleState, HandleStore};
