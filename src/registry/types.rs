//! Registry config types: field descriptors and the registry itself.

use serde::{Deserialize, Serialize};

/// Semantic type of an exposed column. Drives coercion in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Time,
    Datetime,
    Blob,
    /// No semantic type known; coerced like a string.
    Undefined,
}

impl FieldType {
    /// Best-effort mapping from a driver-native type string
    /// (e.g. "tinyint(1)", "varchar(100)", "DATETIME"). Most specific
    /// substring wins; unrecognized types map to [`FieldType::Undefined`].
    pub fn from_native(native: &str) -> Self {
        let t = native.to_ascii_lowercase();
        if t.contains("tinyint(1)") {
            FieldType::Boolean
        } else if t.contains("int") {
            FieldType::Integer
        } else if t.contains("decimal") || t.contains("float") {
            FieldType::Float
        } else if t.contains("datetime") {
            FieldType::Datetime
        } else if t.contains("date") {
            FieldType::Date
        } else if t.contains("time") {
            FieldType::Time
        } else if t.contains("char") {
            FieldType::String
        } else if t.contains("text") {
            FieldType::Text
        } else if t.contains("blob") {
            FieldType::Blob
        } else {
            FieldType::Undefined
        }
    }
}

fn default_true() -> bool {
    true
}

/// One exposed column: storage name (may carry a `table.` qualifier for
/// joined tables), external alias, type and per-operation policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// External-facing name; defaults to `name`.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub readable: bool,
    #[serde(default)]
    pub creatable: bool,
    #[serde(default)]
    pub updatable: bool,
    #[serde(default)]
    pub create_required: bool,
    #[serde(default)]
    pub update_required: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            alias: None,
            field_type,
            readable: true,
            creatable: false,
            updatable: false,
            create_required: false,
            update_required: false,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn readable(mut self, yes: bool) -> Self {
        self.readable = yes;
        self
    }

    /// Allow the field in create payloads.
    pub fn creatable(mut self) -> Self {
        self.creatable = true;
        self
    }

    /// Allow the field in update payloads.
    pub fn updatable(mut self) -> Self {
        self.updatable = true;
        self
    }

    /// Allow the field in both write payloads.
    pub fn writable(mut self) -> Self {
        self.creatable = true;
        self.updatable = true;
        self
    }

    pub fn create_required(mut self) -> Self {
        self.create_required = true;
        self
    }

    pub fn update_required(mut self) -> Self {
        self.update_required = true;
        self
    }

    /// Effective external name.
    pub fn external_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Registry of exposed fields. `All` exposes every schema column read-only
/// (writes require an explicit descriptor list); `Explicit` is an ordered
/// descriptor list built by the owner before any action call.
#[derive(Clone, Debug, Default)]
pub enum FieldRegistry {
    #[default]
    All,
    Explicit(Vec<FieldDescriptor>),
}

impl FieldRegistry {
    pub fn explicit(fields: Vec<FieldDescriptor>) -> Self {
        FieldRegistry::Explicit(fields)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, FieldRegistry::Explicit(_))
    }
}

/// Which write operation a permission check runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
}
