//! Field Registry Tests
//!
//! Properties:
//! - Native type strings map to semantic types, most specific match first
//! - The "all columns" sentinel exposes everything read-only
//! - Duplicate aliases are a misconfiguration
//! - Required sets follow the per-operation flags

use crudkit::registry::ResolvedFields;
use crudkit::{ColumnMeta, CrudError, FieldDescriptor, FieldRegistry, FieldType, WriteOp};

fn column(name: &str, native: &str, pk: bool) -> ColumnMeta {
    ColumnMeta {
        name: name.to_string(),
        native_type: native.to_string(),
        nullable: !pk,
        default_value: None,
        primary_key: pk,
    }
}

// =============================================================================
// Native type mapping
// =============================================================================

#[test]
fn native_types_map_by_most_specific_substring() {
    assert_eq!(FieldType::from_native("tinyint(1)"), FieldType::Boolean);
    assert_eq!(FieldType::from_native("tinyint(4)"), FieldType::Integer);
    assert_eq!(FieldType::from_native("int(11)"), FieldType::Integer);
    assert_eq!(FieldType::from_native("bigint unsigned"), FieldType::Integer);
    assert_eq!(FieldType::from_native("decimal(8,2)"), FieldType::Float);
    assert_eq!(FieldType::from_native("float"), FieldType::Float);
    assert_eq!(FieldType::from_native("datetime"), FieldType::Datetime);
    assert_eq!(FieldType::from_native("date"), FieldType::Date);
    assert_eq!(FieldType::from_native("time"), FieldType::Time);
    assert_eq!(FieldType::from_native("varchar(100)"), FieldType::String);
    assert_eq!(FieldType::from_native("mediumtext"), FieldType::Text);
    assert_eq!(FieldType::from_native("longblob"), FieldType::Blob);
    assert_eq!(FieldType::from_native("geometry"), FieldType::Undefined);
}

#[test]
fn native_mapping_is_case_insensitive() {
    assert_eq!(FieldType::from_native("VARCHAR(50)"), FieldType::String);
    assert_eq!(FieldType::from_native("DATETIME"), FieldType::Datetime);
    assert_eq!(FieldType::from_native("INTEGER"), FieldType::Integer);
}

// =============================================================================
// Sentinel registry
// =============================================================================

#[test]
fn sentinel_exposes_every_column_read_only() {
    let columns = vec![
        column("id", "int(11)", true),
        column("name", "varchar(100)", false),
    ];
    let resolved = ResolvedFields::resolve(&FieldRegistry::All, &columns).unwrap();
    assert!(!resolved.is_explicit());
    let id = resolved.field("id").unwrap();
    assert!(id.readable);
    assert!(!id.creatable && !id.updatable);
    assert_eq!(id.field_type, FieldType::Integer);
    assert_eq!(resolved.field("name").unwrap().field_type, FieldType::String);
    assert!(resolved.required(WriteOp::Create).is_empty());
}

// =============================================================================
// Explicit registry
// =============================================================================

#[test]
fn duplicate_alias_is_rejected() {
    let registry = FieldRegistry::explicit(vec![
        FieldDescriptor::new("a", FieldType::String),
        FieldDescriptor::new("b", FieldType::String).alias("a"),
    ]);
    match ResolvedFields::resolve(&registry, &[]) {
        Err(CrudError::SchemaMismatch(msg)) => assert!(msg.contains("a")),
        other => panic!("expected schema mismatch, got {:?}", other),
    }
}

#[test]
fn alias_maps_to_storage_name() {
    let registry = FieldRegistry::explicit(vec![
        FieldDescriptor::new("product_name", FieldType::String).alias("name")
    ]);
    let resolved = ResolvedFields::resolve(&registry, &[]).unwrap();
    assert_eq!(resolved.storage_name("name"), Some("product_name"));
    assert!(resolved.field("product_name").is_none());
}

#[test]
fn required_sets_follow_the_operation() {
    let registry = FieldRegistry::explicit(vec![
        FieldDescriptor::new("name", FieldType::String).writable().create_required(),
        FieldDescriptor::new("state", FieldType::String).writable().update_required(),
    ]);
    let resolved = ResolvedFields::resolve(&registry, &[]).unwrap();
    assert_eq!(resolved.required(WriteOp::Create), vec!["name"]);
    assert_eq!(resolved.required(WriteOp::Update), vec!["state"]);
}
