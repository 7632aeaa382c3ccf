//! PostgreSQL backend for tabula.
//!
//! [`PgSource`] opens one [`PgEditor`] per connection unit. Each editor owns
//! its client and a current-thread runtime, so the blocking
//! [`SchemaEditor`] calls can drive the async driver without an ambient
//! runtime. Every statement is traced under `db.execute` or `db.query`.
//!
//! The connection string comes from the alias's `url` setting:
//!
//! ```text
//! connections {
//!     default { vendor postgresql, url "postgres://app@localhost/app" }
//! }
//! ```

use tabula::{
    BackendError, ColumnDef, ConnectionAlias, ConnectionSettings, ConnectionSource, SchemaEditor,
};
use tabula_sql::{
    AlterTableStmt, CreateSchemaStmt, CreateTableStmt, Dialect, SchemaName, Stmt, TableRef,
    render,
};
use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::Instrument;
use tracing::field::Empty;

/// Vendor identifier reported by [`PgEditor`].
pub const VENDOR: &str = "postgresql";

const SCHEMA_EXISTS: &str = "SELECT EXISTS (
    SELECT 1 FROM information_schema.schemata
    WHERE schema_name::text = $1::text
)";

const TABLE_EXISTS: &str = "SELECT EXISTS (
    SELECT 1 FROM information_schema.tables
    WHERE table_schema::text = COALESCE($1::text, current_schema()::text)
      AND table_name::text = $2::text
)";

const COLUMN_TYPE: &str = "SELECT data_type::text
    FROM information_schema.columns
    WHERE table_schema::text = COALESCE($1::text, current_schema()::text)
      AND table_name::text = $2::text
      AND column_name::text = $3::text";

/// Opens PostgreSQL editors from connection settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgSource;

impl ConnectionSource for PgSource {
    fn connect(
        &self,
        alias: &ConnectionAlias,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn SchemaEditor>, BackendError> {
        let url = settings.url.as_deref().ok_or_else(|| {
            BackendError::connectivity(format!("connection '{alias}' has no url"))
        })?;
        tracing::debug!(%alias, "connecting to postgres");
        Ok(Box::new(PgEditor::connect(url)?))
    }
}

/// A blocking, traced PostgreSQL session.
pub struct PgEditor {
    runtime: Runtime,
    client: Client,
}

impl PgEditor {
    pub fn connect(url: &str) -> Result<Self, BackendError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackendError::connectivity(format!("cannot start runtime: {e}")))?;

        let (client, connection) = runtime
            .block_on(tokio_postgres::connect(url, NoTls))
            .map_err(classify)?;

        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection error");
            }
        });

        Ok(Self { runtime, client })
    }

    fn batch(&self, sql: &str) -> Result<(), BackendError> {
        let span = tracing::debug_span!("db.execute", sql = %sql, params = 0usize, affected = Empty);
        self.runtime
            .block_on(self.client.batch_execute(sql).instrument(span))
            .map_err(classify)
    }

    fn execute(&self, sql: &str) -> Result<u64, BackendError> {
        let span = tracing::debug_span!("db.execute", sql = %sql, params = 0usize, affected = Empty);
        let affected = self
            .runtime
            .block_on(self.client.execute(sql, &[]).instrument(span.clone()))
            .map_err(classify)?;
        span.record("affected", affected);
        Ok(affected)
    }

    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, BackendError> {
        let span = tracing::debug_span!("db.query", sql = %sql, params = params.len(), rows = Empty);
        let row = self
            .runtime
            .block_on(self.client.query_opt(sql, params).instrument(span.clone()))
            .map_err(classify)?;
        span.record("rows", if row.is_some() { 1u64 } else { 0u64 });
        Ok(row)
    }

    fn query_bool(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<bool, BackendError> {
        match self.query_opt(sql, params)? {
            Some(row) => row.try_get(0).map_err(classify),
            None => Ok(false),
        }
    }

    fn run(&self, stmt: Stmt) -> Result<(), BackendError> {
        let sql = render(&stmt, Dialect::Postgres)?;
        self.execute(&sql)?;
        Ok(())
    }
}

impl SchemaEditor for PgEditor {
    fn vendor(&self) -> &str {
        VENDOR
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.batch("ROLLBACK")
    }

    fn schema_exists(&mut self, schema: &str) -> Result<bool, BackendError> {
        self.query_bool(SCHEMA_EXISTS, &[&schema])
    }

    fn create_schema(&mut self, schema: &str) -> Result<(), BackendError> {
        let schema = SchemaName::from(schema.to_string());
        self.run(Stmt::CreateSchema(CreateSchemaStmt::new(schema)))
    }

    fn table_exists(&mut self, schema: Option<&str>, table: &str) -> Result<bool, BackendError> {
        self.query_bool(TABLE_EXISTS, &[&schema, &table])
    }

    fn column_type(
        &mut self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, BackendError> {
        match self.query_opt(COLUMN_TYPE, &[&schema, &table, &column])? {
            Some(row) => row.try_get(0).map(Some).map_err(classify),
            None => Ok(None),
        }
    }

    fn create_table(&mut self, table: &str, columns: &[ColumnDef]) -> Result<(), BackendError> {
        let stmt = CreateTableStmt::new(TableRef::physical(table)).columns(columns.iter().cloned());
        self.run(Stmt::CreateTable(stmt))
    }

    fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), BackendError> {
        let stmt = AlterTableStmt::add_column(TableRef::physical(table), column.clone());
        self.run(Stmt::AlterTable(stmt))
    }

    fn alter_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), BackendError> {
        let stmt = AlterTableStmt::alter_column_type(TableRef::physical(table), column.clone());
        self.run(Stmt::AlterTable(stmt))
    }
}

/// Server-side refusals are schema problems; anything else means the
/// connection can't be trusted any more.
fn classify(err: tokio_postgres::Error) -> BackendError {
    if err.is_closed() {
        return BackendError::connectivity(err.to_string());
    }
    match err.as_db_error() {
        Some(db) => BackendError::rejected(format!("{} ({})", db.message(), db.code().code())),
        None => BackendError::connectivity(err.to_string()),
    }
}
