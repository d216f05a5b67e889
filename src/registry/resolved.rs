//! Resolved field view: registry + schema columns flattened for one call.

use crate::connector::ColumnMeta;
use crate::error::CrudError;
use crate::registry::{FieldDescriptor, FieldRegistry, FieldType, WriteOp};
use std::collections::HashSet;

/// One field as seen by a single action call.
#[derive(Clone, Debug)]
pub struct ResolvedField {
    /// Storage column name, possibly `table.column` qualified.
    pub storage_name: String,
    /// External alias; key used in records and filter specifications.
    pub alias: String,
    pub field_type: FieldType,
    pub readable: bool,
    pub creatable: bool,
    pub updatable: bool,
    pub create_required: bool,
    pub update_required: bool,
}

/// Flattened registry for the duration of one action call. Built outside the
/// per-row loops; immutable afterwards.
#[derive(Clone, Debug)]
pub struct ResolvedFields {
    fields: Vec<ResolvedField>,
    explicit: bool,
}

impl ResolvedFields {
    /// Combine the registry with the schema provider's column list.
    ///
    /// `All` exposes one read-only field per schema column, typed via the
    /// native-type mapping. `Explicit` takes the descriptors as declared;
    /// a duplicate alias is a misconfiguration and fails the call.
    pub fn resolve(
        registry: &FieldRegistry,
        columns: &[ColumnMeta],
    ) -> Result<ResolvedFields, CrudError> {
        match registry {
            FieldRegistry::All => Ok(ResolvedFields {
                fields: columns
                    .iter()
                    .map(|c| ResolvedField {
                        storage_name: c.name.clone(),
                        alias: c.name.clone(),
                        field_type: FieldType::from_native(&c.native_type),
                        readable: true,
                        creatable: false,
                        updatable: false,
                        create_required: false,
                        update_required: false,
                    })
                    .collect(),
                explicit: false,
            }),
            FieldRegistry::Explicit(descriptors) => {
                let mut seen = HashSet::new();
                for d in descriptors {
                    if !seen.insert(d.external_name()) {
                        return Err(CrudError::SchemaMismatch(format!(
                            "duplicate field alias '{}'",
                            d.external_name()
                        )));
                    }
                }
                Ok(ResolvedFields {
                    fields: descriptors.iter().map(from_descriptor).collect(),
                    explicit: true,
                })
            }
        }
    }

    /// Whether the registry was an explicit descriptor list. Write actions
    /// are rejected otherwise.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn field(&self, alias: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.alias == alias)
    }

    pub fn storage_name(&self, alias: &str) -> Option<&str> {
        self.field(alias).map(|f| f.storage_name.as_str())
    }

    pub fn readable_fields(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields.iter().filter(|f| f.readable)
    }

    /// Aliases that must be present (and non-null) in a write payload.
    pub fn required(&self, op: WriteOp) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| match op {
                WriteOp::Create => f.create_required,
                WriteOp::Update => f.update_required,
            })
            .map(|f| f.alias.as_str())
            .collect()
    }
}

fn from_descriptor(d: &FieldDescriptor) -> ResolvedField {
    ResolvedField {
        storage_name: d.name.clone(),
        alias: d.external_name().to_string(),
        field_type: d.field_type,
        readable: d.readable,
        creatable: d.creatable,
        updatable: d.updatable,
        create_required: d.create_required,
        update_required: d.update_required,
    }
}
