//! CrudService: action orchestration over the registry, coercion engine and
//! filter-query compiler.

mod crud;
mod validation;
pub use crud::{CrudService, Key};
