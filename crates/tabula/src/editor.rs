//! The DDL-execution collaborator.
//!
//! The reconciler decides what has to exist; a [`SchemaEditor`] knows how to
//! ask a particular backend about its catalog and how to issue DDL inside a
//! transaction. One editor is opened per connection unit and is never shared
//! between units.

use crate::{BackendError, ColumnDef, ConnectionAlias};
use tabula_config::ConnectionSettings;

/// Transactional DDL access to one connection.
///
/// Introspection takes the schema as `None` for schema-less backends. DDL
/// methods receive the physical table identifier already formatted for the
/// backend's dialect and must use it verbatim.
pub trait SchemaEditor {
    /// Vendor identifier of the backend, e.g. `postgresql`.
    fn vendor(&self) -> &str;

    fn begin(&mut self) -> Result<(), BackendError>;

    fn commit(&mut self) -> Result<(), BackendError>;

    fn rollback(&mut self) -> Result<(), BackendError>;

    fn schema_exists(&mut self, schema: &str) -> Result<bool, BackendError>;

    fn create_schema(&mut self, schema: &str) -> Result<(), BackendError>;

    fn table_exists(&mut self, schema: Option<&str>, table: &str) -> Result<bool, BackendError>;

    /// Declared type of a column as the catalog reports it, or `None` when
    /// the table or column does not exist.
    fn column_type(
        &mut self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, BackendError>;

    fn create_table(&mut self, table: &str, columns: &[ColumnDef]) -> Result<(), BackendError>;

    fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), BackendError>;

    /// Retype an existing column to `column.db_type`.
    fn alter_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), BackendError>;
}

/// Opens a [`SchemaEditor`] for a connection alias.
///
/// Shared between concurrently running units, hence `Sync`.
pub trait ConnectionSource: Sync {
    fn connect(
        &self,
        alias: &ConnectionAlias,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn SchemaEditor>, BackendError>;
}
