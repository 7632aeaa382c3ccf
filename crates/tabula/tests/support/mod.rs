//! In-memory backends for driving the reconciler.
//!
//! Every alias gets its own catalog. An editor works on a copy of the
//! catalog taken at `begin` and writes it back on `commit`, so a rolled-back
//! unit leaves nothing behind. Every call that changes something is logged.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use tabula::{
    BackendError, ColumnDef, ConnectionAlias, ConnectionSettings, ConnectionSource,
    QualifiedName, SchemaEditor,
};

/// Schema used for backends without schemas.
const NO_SCHEMA: &str = "main";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub schemas: BTreeSet<String>,
    /// (schema, table) -> column -> declared type
    pub tables: BTreeMap<(String, String), IndexMap<String, String>>,
}

#[derive(Debug)]
struct Backend {
    vendor: String,
    catalog: Catalog,
}

#[derive(Debug, Default)]
struct State {
    backends: HashMap<String, Backend>,
    log: Vec<(String, String)>,
    fail_connect: HashSet<String>,
    disconnect: HashSet<String>,
    rejected: HashSet<(String, String)>,
    connects: usize,
    column_reads: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<State>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an empty backend behind `alias`.
    pub fn backend(self, alias: &str, vendor: &str) -> Self {
        self.state().backends.insert(
            alias.to_string(),
            Backend {
                vendor: vendor.to_string(),
                catalog: Catalog::default(),
            },
        );
        self
    }

    pub fn with_schema(self, alias: &str, schema: &str) -> Self {
        self.catalog_mut(alias, |catalog| {
            catalog.schemas.insert(schema.to_string());
        });
        self
    }

    /// Pre-existing table; its schema is created too.
    pub fn with_table(self, alias: &str, schema: &str, table: &str, columns: &[(&str, &str)]) -> Self {
        self.catalog_mut(alias, |catalog| {
            catalog.schemas.insert(schema.to_string());
            catalog.tables.insert(
                (schema.to_string(), table.to_string()),
                columns
                    .iter()
                    .map(|(name, ty)| (name.to_string(), ty.to_string()))
                    .collect(),
            );
        });
        self
    }

    /// `connect` fails for `alias`.
    pub fn fail_connect(self, alias: &str) -> Self {
        self.state().fail_connect.insert(alias.to_string());
        self
    }

    /// Introspection on `alias` fails as if the connection dropped.
    pub fn disconnect(self, alias: &str) -> Self {
        self.state().disconnect.insert(alias.to_string());
        self
    }

    /// Adding or altering `table.column` is refused.
    pub fn reject_column(self, table: &str, column: &str) -> Self {
        self.state()
            .rejected
            .insert((table.to_string(), column.to_string()));
        self
    }

    fn catalog_mut(&self, alias: &str, f: impl FnOnce(&mut Catalog)) {
        let mut state = self.state();
        let backend = state
            .backends
            .get_mut(alias)
            .unwrap_or_else(|| panic!("no backend registered for {alias}"));
        f(&mut backend.catalog);
    }

    /// Committed catalog of `alias`.
    pub fn catalog(&self, alias: &str) -> Catalog {
        self.state().backends[alias].catalog.clone()
    }

    pub fn columns(&self, alias: &str, schema: &str, table: &str) -> Option<Vec<(String, String)>> {
        self.catalog(alias)
            .tables
            .get(&(schema.to_string(), table.to_string()))
            .map(|cols| cols.iter().map(|(c, t)| (c.clone(), t.clone())).collect())
    }

    /// Everything issued against `alias`, in order.
    pub fn log(&self, alias: &str) -> Vec<String> {
        self.state()
            .log
            .iter()
            .filter(|(a, _)| a == alias)
            .map(|(_, op)| op.clone())
            .collect()
    }

    /// Only the DDL issued against `alias`.
    pub fn ddl(&self, alias: &str) -> Vec<String> {
        self.log(alias)
            .into_iter()
            .filter(|op| !matches!(op.as_str(), "begin" | "commit" | "rollback"))
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    /// Column type lookups across all aliases.
    pub fn column_reads(&self) -> usize {
        self.state().column_reads
    }
}

impl ConnectionSource for FakeSource {
    fn connect(
        &self,
        alias: &ConnectionAlias,
        _settings: &ConnectionSettings,
    ) -> Result<Box<dyn SchemaEditor>, BackendError> {
        let mut state = self.state();
        state.connects += 1;
        if state.fail_connect.contains(alias.as_str()) {
            return Err(BackendError::connectivity("connection refused"));
        }
        let backend = state
            .backends
            .get(alias.as_str())
            .ok_or_else(|| BackendError::connectivity(format!("unknown host for {alias}")))?;
        Ok(Box::new(FakeEditor {
            state: self.state.clone(),
            alias: alias.to_string(),
            vendor: backend.vendor.clone(),
            working: None,
        }))
    }
}

struct FakeEditor {
    state: Arc<Mutex<State>>,
    alias: String,
    vendor: String,
    working: Option<Catalog>,
}

impl FakeEditor {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, op: String) {
        self.state().log.push((self.alias.clone(), op));
    }

    fn check_connected(&self) -> Result<(), BackendError> {
        if self.state().disconnect.contains(&self.alias) {
            return Err(BackendError::connectivity("server closed the connection"));
        }
        Ok(())
    }

    fn read(&self) -> Catalog {
        match &self.working {
            Some(catalog) => catalog.clone(),
            None => self.state().backends[&self.alias].catalog.clone(),
        }
    }

    fn working(&mut self) -> Result<&mut Catalog, BackendError> {
        self.working
            .as_mut()
            .ok_or_else(|| BackendError::rejected("DDL outside a transaction"))
    }

    fn key(schema: Option<&str>, table: &str) -> (String, String) {
        (schema.unwrap_or(NO_SCHEMA).to_string(), table.to_string())
    }

    /// Resolve a physical identifier the same way a server would.
    fn resolve(physical: &str) -> Result<(String, String), BackendError> {
        let name = QualifiedName::parse(physical, NO_SCHEMA)
            .map_err(|e| BackendError::rejected(e.to_string()))?;
        Ok((name.schema, name.table))
    }

    fn check_rejected(&self, key: &(String, String), column: &str) -> Result<(), BackendError> {
        if self
            .state()
            .rejected
            .contains(&(key.1.clone(), column.to_string()))
        {
            return Err(BackendError::rejected(format!(
                "permission denied for table {}",
                key.1
            )));
        }
        Ok(())
    }
}

impl SchemaEditor for FakeEditor {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.working = Some(self.read());
        self.record("begin".into());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        let working = self
            .working
            .take()
            .ok_or_else(|| BackendError::rejected("no transaction"))?;
        let alias = self.alias.clone();
        if let Some(backend) = self.state().backends.get_mut(&alias) {
            backend.catalog = working;
        }
        self.record("commit".into());
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.working = None;
        self.record("rollback".into());
        Ok(())
    }

    fn schema_exists(&mut self, schema: &str) -> Result<bool, BackendError> {
        self.check_connected()?;
        Ok(self.read().schemas.contains(schema))
    }

    fn create_schema(&mut self, schema: &str) -> Result<(), BackendError> {
        self.working()?.schemas.insert(schema.to_string());
        self.record(format!("create schema {schema}"));
        Ok(())
    }

    fn table_exists(&mut self, schema: Option<&str>, table: &str) -> Result<bool, BackendError> {
        self.check_connected()?;
        Ok(self.read().tables.contains_key(&Self::key(schema, table)))
    }

    fn column_type(
        &mut self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, BackendError> {
        self.check_connected()?;
        self.state().column_reads += 1;
        Ok(self
            .read()
            .tables
            .get(&Self::key(schema, table))
            .and_then(|cols| cols.get(column).cloned()))
    }

    fn create_table(&mut self, table: &str, columns: &[ColumnDef]) -> Result<(), BackendError> {
        let key = Self::resolve(table)?;
        let working = self.working()?;
        if !working.schemas.contains(&key.0) && key.0 != NO_SCHEMA {
            return Err(BackendError::rejected(format!("schema {} does not exist", key.0)));
        }
        working.tables.insert(
            key,
            columns
                .iter()
                .map(|c| (c.name.to_string(), c.db_type.clone()))
                .collect(),
        );
        let cols: Vec<_> = columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.db_type))
            .collect();
        self.record(format!("create table {table} ({})", cols.join(", ")));
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), BackendError> {
        let key = Self::resolve(table)?;
        self.check_rejected(&key, column.name.as_str())?;
        let cols = self
            .working()?
            .tables
            .get_mut(&key)
            .ok_or_else(|| BackendError::rejected(format!("no table {table}")))?;
        cols.insert(column.name.to_string(), column.db_type.clone());
        self.record(format!("add column {table} {} {}", column.name, column.db_type));
        Ok(())
    }

    fn alter_column(&mut self, table: &str, column: &ColumnDef) -> Result<(), BackendError> {
        let key = Self::resolve(table)?;
        self.check_rejected(&key, column.name.as_str())?;
        let ty = self
            .working()?
            .tables
            .get_mut(&key)
            .and_then(|cols| cols.get_mut(column.name.as_str()))
            .ok_or_else(|| BackendError::rejected(format!("no column {}", column.name)))?;
        *ty = column.db_type.clone();
        self.record(format!("alter column {table} {} {}", column.name, column.db_type));
        Ok(())
    }
}
