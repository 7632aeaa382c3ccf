//! DDL statements.

use crate::{ColumnName, SchemaName};

/// A DDL statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    CreateSchema(CreateSchemaStmt),
    CreateTable(CreateTableStmt),
    AlterTable(AlterTableStmt),
}

/// `CREATE SCHEMA`, only if it does not exist yet.
#[derive(Debug, Clone)]
pub struct CreateSchemaStmt {
    pub schema: SchemaName,
}

impl CreateSchemaStmt {
    pub fn new(schema: SchemaName) -> Self {
        Self { schema }
    }
}

/// `CREATE TABLE` with inline column definitions.
#[derive(Debug, Clone)]
pub struct CreateTableStmt {
    pub table: TableRef,
    pub columns: Vec<ColumnDef>,
}

impl CreateTableStmt {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(columns);
        self
    }
}

/// `ALTER TABLE` with a single column-level action.
#[derive(Debug, Clone)]
pub struct AlterTableStmt {
    pub table: TableRef,
    pub action: AlterAction,
}

impl AlterTableStmt {
    pub fn add_column(table: TableRef, column: ColumnDef) -> Self {
        Self {
            table,
            action: AlterAction::AddColumn(column),
        }
    }

    pub fn alter_column_type(table: TableRef, column: ColumnDef) -> Self {
        Self {
            table,
            action: AlterAction::AlterColumnType(column),
        }
    }
}

/// What an `ALTER TABLE` does.
#[derive(Debug, Clone)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    /// Retype an existing column to `column.db_type`.
    AlterColumnType(ColumnDef),
}

/// A table reference as it appears in DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    /// An already formatted physical identifier, written verbatim.
    Physical(String),
}

impl TableRef {
    pub fn physical(name: impl Into<String>) -> Self {
        TableRef::Physical(name.into())
    }
}

/// A column definition, as produced by a vendor handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: ColumnName,
    /// Full DDL type, modifiers included (`varchar(120)`, `numeric(10, 2)`).
    pub db_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// Raw SQL default expression.
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: ColumnName, db_type: impl Into<String>) -> Self {
        Self {
            name,
            db_type: db_type.into(),
            nullable: false,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn default_expr(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }
}
