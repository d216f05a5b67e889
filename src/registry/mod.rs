//! Field registry: which columns are exposed, under what alias, with what
//! type and which operations.

mod resolved;
mod types;

pub use resolved::{ResolvedField, ResolvedFields};
pub use types::{FieldDescriptor, FieldRegistry, FieldType, WriteOp};
