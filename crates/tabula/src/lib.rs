//! Keeps the physical schema of unmanaged entities in line with their
//! declarations.
//!
//! Unmanaged entities are tables the host application does not migrate
//! itself but still expects to exist. Given their descriptors, tabula makes
//! sure each one has a table and that each declared column exists with a
//! compatible type, on whichever backend the entity's module is routed to.
//!
//! Nothing is ever dropped. Compatible columns are left alone; compatibility
//! is decided per type family (integer, string, float, decimal, date-time,
//! boolean), not per exact type.
//!
//! # Connection units
//!
//! Entities are grouped by connection alias. Each group is reconciled inside
//! one transaction: it either commits as a whole or rolls back as a whole,
//! and a failure in one group does not stop the others.
//!
//! ```ignore
//! let config = tabula_config::load()?.0;
//! let reconciler = Reconciler::new(config);
//! let report = reconciler.run(&mut entities, &source);
//! for error in report.errors() {
//!     tracing::error!(%error, "reconcile failed");
//! }
//! ```
//!
//! # Vendors
//!
//! PostgreSQL, SQL Server and SQLite are built in. Each has a
//! [`VendorHandler`] that knows its default schema, type spellings and
//! identifier quoting. More can be added through a [`HandlerRegistry`].

use strid::braid;

mod editor;
mod entity;
mod error;
mod name;
mod reconcile;
mod rename;
mod report;
pub mod types;
pub mod vendor;

pub use editor::{ConnectionSource, SchemaEditor};
pub use entity::{EntityDescriptor, FieldDescriptor, FieldType, ModuleRef};
pub use error::{BackendError, BackendErrorKind, Error, NameParseError};
pub use name::QualifiedName;
pub use reconcile::{Groups, Reconciler};
pub use rename::{RenameScope, TableRename};
pub use report::{Change, RunReport, UnitOutcome, UnitReport};
pub use types::TypeCompatibilityMatrix;
pub use vendor::{FieldChange, HandlerRegistry, Vendor, VendorHandler};

pub use tabula_config::{Config, ConnectionSettings};
pub use tabula_sql::{ColumnDef, Dialect};

/// Name of a configured connection.
#[braid]
pub struct ConnectionAlias;
