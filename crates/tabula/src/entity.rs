//! Entity and field descriptors handed over by discovery.

use camino::{Utf8Path, Utf8PathBuf};

/// The module an entity was declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    label: String,
    path: Utf8PathBuf,
}

impl ModuleRef {
    pub fn new(label: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Short label, used for connection routing and the allow-list.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Filesystem location, used for the vendored-code exclusion.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Semantic column type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Auto-incrementing 32-bit key.
    AutoField,
    /// Auto-incrementing 64-bit key.
    BigAutoField,
    SmallInteger,
    Integer,
    BigInteger,
    /// Bounded string.
    Char { max_length: u32 },
    /// Unbounded string.
    Text,
    Float,
    Decimal { max_digits: u32, decimal_places: u32 },
    Boolean,
    Date,
    DateTime,
    Time,
}

/// One column of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    column: String,
    field_type: FieldType,
    nullable: bool,
    primary_key: bool,
    unique: bool,
    default: Option<String>,
}

impl FieldDescriptor {
    pub fn new(column: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            column: column.into(),
            field_type,
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Raw SQL default expression.
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// A declared data entity.
///
/// Descriptors are immutable from the outside. The only thing that ever
/// changes is the visible table identifier, and only while a
/// [`TableRename`](crate::TableRename) guard is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    module: ModuleRef,
    db_table: String,
    managed: bool,
    fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// An unmanaged entity with no fields yet.
    pub fn new(module: ModuleRef, db_table: impl Into<String>) -> Self {
        Self {
            module,
            db_table: db_table.into(),
            managed: false,
            fields: Vec::new(),
        }
    }

    /// Mark the entity as migrated by the host application.
    pub fn managed(mut self, managed: bool) -> Self {
        self.managed = managed;
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn module(&self) -> &ModuleRef {
        &self.module
    }

    /// The table identifier as currently visible.
    pub fn table(&self) -> &str {
        &self.db_table
    }

    pub fn is_managed(&self) -> bool {
        self.managed
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub(crate) fn replace_table(&mut self, db_table: String) -> String {
        std::mem::replace(&mut self.db_table, db_table)
    }
}
