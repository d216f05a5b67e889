//! Filter Query Compiler Tests
//!
//! Properties:
//! - Empty specification compiles to the always-true base predicate
//! - Every filter value is positionally bound, never interpolated
//! - LIKE wildcards live in the bound value, not the SQL text
//! - in/not_in expand to one placeholder per CSV element
//! - not_in treats NULL rows as "not in"
//! - Ordering/paging directives sanitize and default per contract

use crudkit::registry::ResolvedFields;
use crudkit::sql::{compile_filter, count_sql, select_sql, CompiledFilter};
use crudkit::{FieldDescriptor, FieldRegistry, FieldType, Record};
use serde_json::json;

// =============================================================================
// Helpers
// =============================================================================

fn resolved() -> ResolvedFields {
    let registry = FieldRegistry::explicit(vec![
        FieldDescriptor::new("id", FieldType::Integer),
        FieldDescriptor::new("name", FieldType::String).writable(),
        FieldDescriptor::new("qty", FieldType::Integer).writable(),
        FieldDescriptor::new("active", FieldType::Boolean).writable(),
        FieldDescriptor::new("p.label", FieldType::String).alias("label"),
    ]);
    ResolvedFields::resolve(&registry, &[]).unwrap()
}

fn compile(query: serde_json::Value) -> CompiledFilter {
    let query: Record = query.as_object().unwrap().clone();
    compile_filter(&query, &resolved(), &["id".to_string()])
}

// =============================================================================
// Base predicate and defaults
// =============================================================================

#[test]
fn empty_specification_matches_every_row() {
    let f = compile(json!({}));
    assert_eq!(f.where_sql, "1");
    assert!(f.binds.is_empty());
    assert_eq!(f.order_by, "id");
    assert_eq!(f.order, "ASC");
    assert_eq!(f.limit, 1000);
    assert_eq!(f.offset, 0);
}

#[test]
fn limit_and_offset_parse_loosely() {
    let f = compile(json!({"limit": "50", "offset": 7}));
    assert_eq!(f.limit, 50);
    assert_eq!(f.offset, 7);

    let f = compile(json!({"limit": "abc", "offset": "xyz"}));
    assert_eq!(f.limit, 0);
    assert_eq!(f.offset, 0);
}

#[test]
fn order_defaults_to_asc_unless_desc() {
    assert_eq!(compile(json!({"order": "DeSc"})).order, "DESC");
    assert_eq!(compile(json!({"order": "asc"})).order, "ASC");
    assert_eq!(compile(json!({"order": "sideways"})).order, "ASC");
}

// =============================================================================
// Predicates
// =============================================================================

#[test]
fn equality_binds_value() {
    let f = compile(json!({"name": "peter"}));
    assert_eq!(f.where_sql, "1 AND `name`=?");
    assert_eq!(f.binds, vec![json!("peter")]);
}

#[test]
fn equality_on_boolean_normalizes_literals() {
    let f = compile(json!({"active": "true"}));
    assert_eq!(f.binds, vec![json!(1)]);
    let f = compile(json!({"active": "false"}));
    assert_eq!(f.binds, vec![json!(0)]);
    let f = compile(json!({"active": "maybe"}));
    assert_eq!(f.binds, vec![json!("maybe")]);
}

#[test]
fn contains_wraps_value_in_wildcards() {
    let f = compile(json!({"name__contains": "pe"}));
    assert_eq!(f.where_sql, "1 AND `name` IS NOT NULL AND `name` LIKE ?");
    assert_eq!(f.binds, vec![json!("%pe%")]);
}

#[test]
fn contains_is_repeatable_with_an_array() {
    let f = compile(json!({"name__contains": ["a", "b"]}));
    assert_eq!(
        f.where_sql,
        "1 AND `name` IS NOT NULL AND `name` LIKE ? AND `name` IS NOT NULL AND `name` LIKE ?"
    );
    assert_eq!(f.binds, vec![json!("%a%"), json!("%b%")]);
}

#[test]
fn startswith_and_endswith_anchor_the_wildcard() {
    assert_eq!(compile(json!({"name__startswith": "A"})).binds, vec![json!("A%")]);
    assert_eq!(compile(json!({"name__endswith": "A"})).binds, vec![json!("%A")]);
}

#[test]
fn comparison_operators_guard_null() {
    let f = compile(json!({"qty__lte": 20}));
    assert_eq!(f.where_sql, "1 AND `qty` IS NOT NULL AND `qty` <= ?");
    assert_eq!(f.binds, vec![json!(20)]);
    assert!(compile(json!({"qty__lt": 1})).where_sql.contains("`qty` < ?"));
    assert!(compile(json!({"qty__gt": 1})).where_sql.contains("`qty` > ?"));
    assert!(compile(json!({"qty__gte": 1})).where_sql.contains("`qty` >= ?"));
}

#[test]
fn in_splits_csv_into_placeholders() {
    let f = compile(json!({"qty__in": "2,3,10"}));
    assert_eq!(f.where_sql, "1 AND `qty` IS NOT NULL AND `qty` IN (?,?,?)");
    assert_eq!(f.binds, vec![json!("2"), json!("3"), json!("10")]);
}

#[test]
fn not_in_counts_null_as_not_in() {
    let f = compile(json!({"qty__not_in": "2,3"}));
    assert_eq!(f.where_sql, "1 AND (`qty` IS NULL OR `qty` NOT IN (?,?))");
    assert_eq!(f.binds, vec![json!("2"), json!("3")]);
}

#[test]
fn isnull_switches_on_the_literal() {
    assert_eq!(compile(json!({"qty__isnull": "true"})).where_sql, "1 AND `qty` IS NULL");
    assert_eq!(
        compile(json!({"qty__isnull": "false"})).where_sql,
        "1 AND `qty` IS NOT NULL"
    );
}

#[test]
fn unknown_operator_and_unknown_field_contribute_nothing() {
    let f = compile(json!({"name__sounds_like": "x", "ghost": 1}));
    assert_eq!(f.where_sql, "1");
    assert!(f.binds.is_empty());
}

// =============================================================================
// Injection is data
// =============================================================================

#[test]
fn like_value_with_quotes_stays_bound() {
    let hostile = "x' OR '1'='1' --";
    let f = compile(json!({ "name__contains": hostile }));
    assert!(!f.where_sql.contains('\''));
    assert!(!f.where_sql.contains("--"));
    assert_eq!(f.binds, vec![json!(format!("%{}%", hostile))]);
}

#[test]
fn in_list_members_stay_bound() {
    let f = compile(json!({"name__in": "a','b"}));
    assert!(!f.where_sql.contains('\''));
    assert_eq!(f.binds, vec![json!("a'"), json!("'b")]);
}

#[test]
fn order_by_strips_unsafe_characters() {
    let f = compile(json!({"order_by": "name; DROP TABLE items"}));
    assert_eq!(f.order_by, "nameDROPTABLEitems");

    // Stripped-to-nothing falls back to the identifier.
    let f = compile(json!({"order_by": ";--"}));
    assert_eq!(f.order_by, "id");
}

#[test]
fn order_by_resolves_alias_to_storage_column() {
    // `label` is an alias for the joined column p.label; the qualifier is
    // not a safe ORDER BY character and is stripped.
    let f = compile(json!({"order_by": "label"}));
    assert_eq!(f.order_by, "plabel");
    let f = compile(json!({"order_by": "name"}));
    assert_eq!(f.order_by, "name");
}

// =============================================================================
// Statement assembly
// =============================================================================

#[test]
fn select_projects_readable_fields_with_aliases() {
    let f = compile(json!({"name": "A"}));
    let q = select_sql("items", &[], &resolved(), &f);
    assert_eq!(
        q.sql,
        "SELECT `id`, `name`, `qty`, `active`, `p`.`label` AS `label` FROM `items` \
         WHERE 1 AND `name`=? ORDER BY id ASC LIMIT 1000 OFFSET 0"
    );
    assert_eq!(q.params, vec![json!("A")]);
}

#[test]
fn count_has_no_ordering_or_paging() {
    let f = compile(json!({"qty__gte": 3}));
    let q = count_sql("items", &[], &f);
    assert_eq!(
        q.sql,
        "SELECT COUNT(*) FROM `items` WHERE 1 AND `qty` IS NOT NULL AND `qty` >= ?"
    );
}

#[test]
fn join_clauses_are_appended_after_from() {
    let f = compile(json!({}));
    let joins = vec!["LEFT JOIN `p` ON `p`.`id`=`items`.`pid`".to_string()];
    let q = select_sql("items", &joins, &resolved(), &f);
    assert!(q.sql.contains("FROM `items` LEFT JOIN `p` ON `p`.`id`=`items`.`pid` WHERE"));
}
