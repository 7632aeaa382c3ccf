//! Render DDL AST to string.

use std::fmt;

use crate::stmt::*;
use crate::{Dialect, Lit};

/// A statement that the target dialect cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported {
    pub dialect: Dialect,
    pub what: &'static str,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} does not support {}", self.dialect, self.what)
    }
}

impl std::error::Error for Unsupported {}

/// Wrapper for rendering a value via Display.
pub struct Fmt<'a, T: Render>(Dialect, &'a T);

impl<T: Render> fmt::Display for Fmt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.1.render(self.0, f)
    }
}

/// Trait for types that can be rendered to SQL.
pub trait Render {
    fn render(&self, dialect: Dialect, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Render for TableRef {
    fn render(&self, _dialect: Dialect, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRef::Physical(name) => write!(f, "{name}"),
        }
    }
}

/// Renders one column definition. `inline_pk` is false when the table
/// carries a composite primary key constraint instead.
fn render_column(
    col: &ColumnDef,
    inline_pk: bool,
    dialect: Dialect,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    write!(f, "{} {}", dialect.quote(col.name.as_str()), col.db_type)?;

    if col.primary_key && inline_pk {
        write!(f, " PRIMARY KEY")?;
    }

    // PK columns are implicitly NOT NULL, but composite PKs are declared as a
    // table constraint so the columns need it spelled out.
    if !col.nullable && (!col.primary_key || !inline_pk) {
        write!(f, " NOT NULL")?;
    } else if col.nullable && dialect == Dialect::Mssql {
        // SQL Server's default nullability depends on session settings
        write!(f, " NULL")?;
    }

    if col.unique && !col.primary_key {
        write!(f, " UNIQUE")?;
    }

    if let Some(default) = &col.default {
        write!(f, " DEFAULT {default}")?;
    }

    Ok(())
}

impl Render for CreateSchemaStmt {
    fn render(&self, dialect: Dialect, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match dialect {
            Dialect::Mssql => {
                let create = format!("CREATE SCHEMA {}", dialect.quote(self.schema.as_str()));
                write!(
                    f,
                    "IF SCHEMA_ID(N{}) IS NULL EXEC(N{});",
                    Lit(self.schema.as_str()),
                    Lit(&create)
                )
            }
            _ => write!(
                f,
                "CREATE SCHEMA IF NOT EXISTS {};",
                dialect.quote(self.schema.as_str())
            ),
        }
    }
}

impl Render for CreateTableStmt {
    fn render(&self, dialect: Dialect, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pk_columns: Vec<&ColumnDef> = self.columns.iter().filter(|c| c.primary_key).collect();
        let inline_pk = pk_columns.len() <= 1;

        write!(f, "CREATE TABLE {} (", Fmt(dialect, &self.table))?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "\n    ")?;
            render_column(col, inline_pk, dialect, f)?;
        }

        if !inline_pk {
            let cols: Vec<String> = pk_columns
                .iter()
                .map(|c| dialect.quote(c.name.as_str()))
                .collect();
            write!(f, ",\n    PRIMARY KEY ({})", cols.join(", "))?;
        }

        write!(f, "\n);")
    }
}

impl Render for AlterTableStmt {
    fn render(&self, dialect: Dialect, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = Fmt(dialect, &self.table);
        match &self.action {
            AlterAction::AddColumn(col) => {
                let keyword = if dialect == Dialect::Mssql {
                    "ADD"
                } else {
                    "ADD COLUMN"
                };
                write!(f, "ALTER TABLE {table} {keyword} ")?;
                render_column(col, true, dialect, f)?;
                write!(f, ";")
            }
            AlterAction::AlterColumnType(col) => {
                let name = dialect.quote(col.name.as_str());
                let ty = &col.db_type;
                match dialect {
                    Dialect::Mssql => {
                        let null = if col.nullable { "NULL" } else { "NOT NULL" };
                        write!(f, "ALTER TABLE {table} ALTER COLUMN {name} {ty} {null};")
                    }
                    _ => write!(
                        f,
                        "ALTER TABLE {table} ALTER COLUMN {name} TYPE {ty} USING {name}::{ty};"
                    ),
                }
            }
        }
    }
}

impl Render for Stmt {
    fn render(&self, dialect: Dialect, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::CreateSchema(s) => s.render(dialect, f),
            Stmt::CreateTable(s) => s.render(dialect, f),
            Stmt::AlterTable(s) => s.render(dialect, f),
        }
    }
}

/// Render a statement for a dialect.
///
/// Fails for statements the dialect has no syntax for: SQLite has neither
/// schemas nor `ALTER COLUMN`.
pub fn render(stmt: &Stmt, dialect: Dialect) -> Result<String, Unsupported> {
    if dialect == Dialect::Sqlite {
        match stmt {
            Stmt::CreateSchema(_) => {
                return Err(Unsupported {
                    dialect,
                    what: "CREATE SCHEMA",
                });
            }
            Stmt::AlterTable(AlterTableStmt {
                action: AlterAction::AlterColumnType(_),
                ..
            }) => {
                return Err(Unsupported {
                    dialect,
                    what: "ALTER COLUMN",
                });
            }
            _ => {}
        }
    }
    Ok(Fmt(dialect, stmt).to_string())
}
