//! Write-permission and required-field checks.

use crate::error::CrudError;
use crate::registry::{ResolvedFields, WriteOp};
use crate::Record;
use serde_json::Value;

/// Reject the payload unless every key is permitted for `op` and every
/// required field is present and non-null. The error message names the
/// offending fields.
pub(crate) fn check_writable(
    resolved: &ResolvedFields,
    record: &Record,
    op: WriteOp,
) -> Result<(), CrudError> {
    if !resolved.is_explicit() {
        // An unstructured registry forbids writes; callers must declare
        // fields explicitly before create/update.
        return Err(CrudError::Validation(
            "create/update requires an explicit field registry".into(),
        ));
    }
    let rejected: Vec<&str> = record
        .keys()
        .filter(|alias| {
            !resolved
                .field(alias)
                .map(|f| match op {
                    WriteOp::Create => f.creatable,
                    WriteOp::Update => f.updatable,
                })
                .unwrap_or(false)
        })
        .map(String::as_str)
        .collect();
    if !rejected.is_empty() {
        let verb = match op {
            WriteOp::Create => "creatable",
            WriteOp::Update => "updatable",
        };
        return Err(CrudError::Validation(format!(
            "fields not {}: {}",
            verb,
            rejected.join(", ")
        )));
    }
    let missing: Vec<&str> = resolved
        .required(op)
        .into_iter()
        .filter(|alias| matches!(record.get(*alias), None | Some(Value::Null)))
        .collect();
    if !missing.is_empty() {
        return Err(CrudError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
