//! Identifier quoting and DDL rendering.
//!
//! Build DDL as a small typed AST, then render it for a specific [`Dialect`].
//! Only the statements the reconciler needs are modelled: schema creation,
//! table creation, and the two column-level `ALTER TABLE` forms.

use strid::braid;

mod render;
pub use render::*;

mod stmt;
pub use stmt::*;

/// The name of a schema.
#[braid]
pub struct SchemaName;

/// The name of a column.
#[braid]
pub struct ColumnName;

/// A SQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use tabula_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// An ANSI identifier wrapper (PostgreSQL, SQLite).
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use tabula_sql::Ident;
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// A SQL Server identifier wrapper.
///
/// Display writes the value bracketed, doubling any closing bracket.
///
/// # Example
/// ```
/// use tabula_sql::Bracketed;
/// assert_eq!(format!("{}", Bracketed("order")), "[order]");
/// assert_eq!(format!("{}", Bracketed("a]b")), "[a]]b]");
/// ```
pub struct Bracketed<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Bracketed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for c in self.0.as_ref().chars() {
            if c == ']' {
                write!(f, "]]")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "]")
    }
}

/// SQL dialect families understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Mssql,
    Sqlite,
}

impl Dialect {
    /// Quote a single identifier for this dialect.
    pub fn quote(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("{}", Ident(name)),
            Dialect::Mssql => format!("{}", Bracketed(name)),
        }
    }

    /// Whether the dialect has a schema namespace between database and table.
    pub fn supports_schemas(self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Format a possibly schema-qualified table reference.
    ///
    /// SQLite has no schemas, so the schema is dropped and the bare table
    /// name is returned unquoted, matching how it was declared.
    ///
    /// ```
    /// use tabula_sql::Dialect;
    /// assert_eq!(Dialect::Postgres.qualify(Some("sales"), "orders"), "\"sales\".\"orders\"");
    /// assert_eq!(Dialect::Mssql.qualify(Some("dbo"), "orders"), "[dbo].[orders]");
    /// assert_eq!(Dialect::Sqlite.qualify(Some("main"), "orders"), "orders");
    /// ```
    pub fn qualify(self, schema: Option<&str>, table: &str) -> String {
        match (self, schema) {
            (Dialect::Sqlite, _) => table.to_string(),
            (_, Some(schema)) => format!("{}.{}", self.quote(schema), self.quote(table)),
            (_, None) => self.quote(table),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mssql => "mssql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
