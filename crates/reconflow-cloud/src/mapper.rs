//! Property mapping between records and backend objects

use crate::backend::BackendObject;
use crate::error::Result;
use crate::identity::IdFormat;
use crate::property::PropertyRecord;
use crate::resolver::IdentityFields;
use crate::schema::Schema;

/// Bidirectional transform for one resource kind
///
/// `expand` and `flatten` are pure. For a backend that stores objects
/// unchanged, `flatten(expand(r)) == r` must hold for every record `r`
/// restricted to the mapper's own (non-identity) fields.
pub trait PropertyMapper: Send + Sync {
    type Object: BackendObject;

    /// Resource type name (e.g. "data_factory_linked_service_cosmosdb_mongoapi")
    fn resource_type(&self) -> &'static str;

    /// Kind tag the backend object must carry
    fn kind(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    /// Path layout of this kind's identities
    fn id_format(&self) -> IdFormat;

    fn identity_fields(&self) -> IdentityFields;

    /// Record to wire object. Absent optional fields stay unset.
    fn expand(&self, config: &PropertyRecord) -> Result<Self::Object>;

    /// Wire object to record. Fails with `TypeMismatch` on a foreign kind.
    fn flatten(&self, object: &Self::Object) -> Result<PropertyRecord>;
}
