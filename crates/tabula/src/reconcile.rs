//! The schema reconciler.
//!
//! A run goes through these steps:
//!
//! 1. Filter out managed entities and entities from vendored modules.
//! 2. Group what is left by connection alias, in discovery order.
//! 3. Per alias (a *unit*): open an editor, pick the vendor handler, resolve
//!    every table name, begin a transaction, swap in physical names, create or
//!    diff each entity, restore the names, then commit or roll back.
//!
//! Units never share an editor. A failure aborts only its own unit; other
//! units still commit.

use std::sync::Arc;

use indexmap::IndexMap;
use tabula_config::{Config, ConnectionSettings};
use tracing::field::Empty;

use crate::report::{Change, RunReport, UnitOutcome, UnitReport};
use crate::types::TypeCompatibilityMatrix;
use crate::vendor::{FieldChange, HandlerCache, HandlerRegistry, VendorHandler};
use crate::{
    BackendError, ColumnDef, ConnectionAlias, ConnectionSource, EntityDescriptor, Error,
    QualifiedName, RenameScope, SchemaEditor, TableRename,
};

/// Entities routed to one connection alias.
pub type Groups<'e> = IndexMap<ConnectionAlias, Vec<&'e mut EntityDescriptor>>;

/// Drives reconciliation for a fixed configuration.
///
/// Vendor handlers are cached per (vendor, settings fingerprint) for the
/// lifetime of the reconciler, so repeated runs reuse them too.
pub struct Reconciler {
    config: Config,
    registry: HandlerRegistry,
    cache: HandlerCache,
    matrix: TypeCompatibilityMatrix,
}

impl Reconciler {
    /// A reconciler with the built-in vendor handlers.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: HandlerRegistry::with_builtins(),
            cache: HandlerCache::default(),
            matrix: TypeCompatibilityMatrix::BUILTIN,
        }
    }

    /// Replace the vendor registry. Clears the handler cache.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self.cache = HandlerCache::default();
        self
    }

    /// Replace the type families used to decide whether a column needs
    /// retyping.
    pub fn with_matrix(mut self, matrix: TypeCompatibilityMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Whether an entity takes part in reconciliation.
    ///
    /// Managed entities never do. Others do when their module path does not
    /// contain the exclusion marker, or when their module label is on the
    /// allow-list.
    ///
    /// An empty marker excludes nothing. This differs from a plain substring
    /// test, under which the empty string is contained in every path and
    /// every module off the allow-list would be excluded.
    pub fn is_eligible(&self, entity: &EntityDescriptor) -> bool {
        if entity.is_managed() {
            return false;
        }
        let marker = self.config.exclude_path();
        let module = entity.module();
        let local = marker.is_empty() || !module.path().as_str().contains(marker);
        local || self.config.is_included(module.label())
    }

    /// Connection alias an entity is routed to.
    pub fn resolve_alias(&self, entity: &EntityDescriptor) -> ConnectionAlias {
        ConnectionAlias::from(self.config.alias_for(entity.module().label()))
    }

    /// Eligible entities grouped by alias. Both the aliases and the entities
    /// within a group keep discovery order.
    pub fn group<'e>(&self, entities: &'e mut [EntityDescriptor]) -> Groups<'e> {
        let mut groups = Groups::new();
        for entity in entities.iter_mut() {
            if !self.is_eligible(entity) {
                tracing::debug!(
                    table = entity.table(),
                    module = entity.module().label(),
                    managed = entity.is_managed(),
                    "skipping entity"
                );
                continue;
            }
            let alias = self.resolve_alias(entity);
            groups.entry(alias).or_default().push(entity);
        }
        groups
    }

    /// Cached handler for a vendor identifier.
    pub fn handler_for(
        &self,
        alias: &ConnectionAlias,
        vendor: &str,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn VendorHandler>, Error> {
        self.cache
            .get_or_construct(&self.registry, vendor, settings)
            .ok_or_else(|| Error::UnknownVendor {
                alias: alias.clone(),
                vendor: vendor.to_string(),
            })
    }

    /// Reconcile every eligible entity.
    ///
    /// Declared table identifiers are the same after the call as before it,
    /// whatever the outcome.
    pub fn run(
        &self,
        entities: &mut [EntityDescriptor],
        source: &dyn ConnectionSource,
    ) -> RunReport {
        let groups = self.group(entities);
        tracing::info!(
            units = groups.len(),
            parallel = self.config.parallel(),
            "reconciling"
        );

        let units: Vec<UnitReport> = if self.config.parallel() && groups.len() > 1 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = groups
                    .into_iter()
                    .map(|(alias, group)| scope.spawn(move || self.run_unit(alias, group, source)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                    })
                    .collect()
            })
        } else {
            groups
                .into_iter()
                .map(|(alias, group)| self.run_unit(alias, group, source))
                .collect()
        };

        RunReport { units }
    }

    fn run_unit(
        &self,
        alias: ConnectionAlias,
        mut entities: Vec<&mut EntityDescriptor>,
        source: &dyn ConnectionSource,
    ) -> UnitReport {
        let span = tracing::info_span!("reconcile.unit", alias = %alias, vendor = Empty);
        let _enter = span.enter();

        let declared = entities.iter().map(|e| e.table().to_string()).collect();
        let outcome = match self.reconcile_unit(&alias, &mut entities, source, &span) {
            Ok(changes) => {
                tracing::info!(changes = changes.len(), "committed");
                UnitOutcome::Committed { changes }
            }
            Err(error) => {
                tracing::warn!(%error, "unit aborted");
                UnitOutcome::Aborted { error }
            }
        };

        UnitReport {
            alias,
            entities: declared,
            outcome,
        }
    }

    fn reconcile_unit(
        &self,
        alias: &ConnectionAlias,
        entities: &mut [&mut EntityDescriptor],
        source: &dyn ConnectionSource,
        span: &tracing::Span,
    ) -> Result<Vec<Change>, Error> {
        let settings = self
            .config
            .connections
            .get(alias.as_str())
            .ok_or_else(|| Error::MissingConnection {
                alias: alias.clone(),
            })?;

        let mut editor = source
            .connect(alias, settings)
            .map_err(|source| Error::Connectivity {
                alias: alias.clone(),
                source,
            })?;

        let vendor = editor.vendor().to_string();
        let handler = self.handler_for(alias, &vendor, settings)?;
        span.record("vendor", handler.vendor().as_str());

        // Resolve every name up front: a bad identifier aborts before any DDL.
        let names = entities
            .iter()
            .map(|entity| {
                QualifiedName::parse(entity.table(), handler.default_schema()).map_err(|source| {
                    Error::NameParse {
                        alias: alias.clone(),
                        entity: entity.table().to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        editor.begin().map_err(|source| Error::Connectivity {
            alias: alias.clone(),
            source,
        })?;

        let unit = Unit {
            alias,
            handler: &*handler,
            matrix: &self.matrix,
        };
        let mut changes = Vec::new();
        let result = {
            let mut scope = RenameScope::new();
            for (entity, name) in entities.iter_mut().zip(&names) {
                scope.push(TableRename::apply(entity, name.format(&*handler)));
            }

            let mut result = Ok(());
            for (guard, name) in scope.iter().zip(&names) {
                result = unit.reconcile_entity(
                    &mut *editor,
                    guard.entity(),
                    guard.original(),
                    name,
                    &mut changes,
                );
                if result.is_err() {
                    break;
                }
            }

            scope.release();
            result
        };

        match result {
            Ok(()) => {
                editor.commit().map_err(|source| Error::Commit {
                    alias: alias.clone(),
                    source,
                })?;
                Ok(changes)
            }
            Err(error) => {
                if let Err(rollback) = editor.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Borrowed state for the entities of one unit.
struct Unit<'a> {
    alias: &'a ConnectionAlias,
    handler: &'a dyn VendorHandler,
    matrix: &'a TypeCompatibilityMatrix,
}

impl Unit<'_> {
    /// `entity` carries the physical name; `declared` is what errors and
    /// changes report.
    fn reconcile_entity(
        &self,
        editor: &mut dyn SchemaEditor,
        entity: &EntityDescriptor,
        declared: &str,
        name: &QualifiedName,
        changes: &mut Vec<Change>,
    ) -> Result<(), Error> {
        let span = tracing::debug_span!("reconcile.entity", table = %name);
        let _enter = span.enter();
        let handler = self.handler;

        if handler
            .ensure_schema(editor, &name.schema)
            .map_err(|e| self.fail(declared, None, e))?
        {
            tracing::info!(schema = %name.schema, "created schema");
            changes.push(Change::SchemaCreated {
                schema: name.schema.clone(),
            });
        }

        let exists = handler
            .table_exists(editor, &name.schema, &name.table)
            .map_err(|e| self.fail(declared, None, e))?;
        if !exists {
            let columns: Vec<ColumnDef> = entity
                .fields()
                .iter()
                .map(|field| handler.column_def(field))
                .collect();
            editor
                .create_table(entity.table(), &columns)
                .map_err(|e| self.fail(declared, None, e))?;
            tracing::info!(physical = entity.table(), columns = columns.len(), "created table");
            changes.push(Change::TableCreated {
                table: declared.to_string(),
                physical: entity.table().to_string(),
                columns: columns.len(),
            });
            return Ok(());
        }

        for field in entity.fields() {
            let column = field.column();
            let expected = handler.field_to_db_type(field);
            let existing = handler
                .column_type(editor, &name.schema, &name.table, column)
                .map_err(|e| self.fail(declared, Some(column), e))?;

            if let Some(existing) = &existing {
                if self.matrix.compatible(existing, &expected) {
                    tracing::debug!(column, %existing, %expected, "column is compatible");
                    continue;
                }
            }

            let change = handler
                .reconcile_field(editor, &name.schema, &name.table, field, existing, self.matrix)
                .map_err(|e| self.fail(declared, Some(column), e))?;
            match change {
                FieldChange::Unchanged => {}
                FieldChange::Added => {
                    let db_type = handler.column_def(field).db_type;
                    tracing::info!(column, %db_type, "added column");
                    changes.push(Change::ColumnAdded {
                        table: declared.to_string(),
                        column: column.to_string(),
                        db_type,
                    });
                }
                FieldChange::Altered { from, to } => {
                    tracing::info!(column, %from, %to, "altered column");
                    changes.push(Change::ColumnAltered {
                        table: declared.to_string(),
                        column: column.to_string(),
                        from,
                        to,
                    });
                }
            }
        }

        Ok(())
    }

    fn fail(&self, entity: &str, field: Option<&str>, source: BackendError) -> Error {
        if source.is_connectivity() {
            return Error::Connectivity {
                alias: self.alias.clone(),
                source,
            };
        }
        Error::Schema {
            alias: self.alias.clone(),
            entity: entity.to_string(),
            field: field.map(str::to_string),
            source,
        }
    }
}
