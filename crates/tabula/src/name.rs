//! Schema-qualified table identifiers.
//!
//! Declared table identifiers come in three shapes, tried in order:
//!
//! 1. Bracketed, `[sales].[orders]`: anything containing both `[` and `]`.
//! 2. Dotted, `sales.orders`.
//! 3. Bare, `orders`, which lands in the handler's default schema.
//!
//! Only the first `.` separates schema from table. `sales.orders.archive`
//! resolves to schema `sales` and table `orders.archive`; dotted table names
//! are not split any further.

use crate::NameParseError;
use crate::vendor::VendorHandler;

/// A `(schema, table)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: String,
    pub table: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Resolve a declared identifier against a default schema.
    pub fn parse(raw: &str, default_schema: &str) -> Result<Self, NameParseError> {
        if raw.is_empty() {
            return Err(NameParseError::Empty);
        }

        let (schema, table) = if raw.contains('[') && raw.contains(']') {
            let (schema, table) = raw
                .split_once('.')
                .ok_or_else(|| NameParseError::MissingSeparator(raw.to_string()))?;
            (strip_brackets(schema), strip_brackets(table))
        } else if let Some((schema, table)) = raw.split_once('.') {
            (schema, table)
        } else {
            (default_schema, raw)
        };

        let schema = strip_quotes(schema);
        let table = strip_quotes(table);
        if schema.is_empty() || table.is_empty() {
            return Err(NameParseError::EmptyPart(raw.to_string()));
        }

        Ok(Self::new(schema, table))
    }

    /// Physical identifier in the handler's dialect.
    pub fn format(&self, handler: &dyn VendorHandler) -> String {
        handler.format_qualified_name(&self.schema, &self.table)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

fn strip_brackets(part: &str) -> &str {
    part.trim_matches(|c| c == '[' || c == ']')
}

fn strip_quotes(part: &str) -> &str {
    part.trim_matches('"').trim_matches('\'')
}
