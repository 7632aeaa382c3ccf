//! Coarse column type compatibility.
//!
//! Two type names are compatible when they fall into the same family. The
//! families are a closed partition of synonyms; length and precision are not
//! part of the comparison, so `varchar` and `text` are interchangeable and so
//! are `date` and `timestamp`.

/// A named family of type-name synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeGroup {
    pub name: &'static str,
    pub members: &'static [&'static str],
}

/// The built-in families.
pub const TYPE_GROUPS: &[TypeGroup] = &[
    TypeGroup {
        name: "int",
        members: &["int", "integer", "smallint", "bigint"],
    },
    TypeGroup {
        name: "varchar",
        members: &["varchar", "char", "text", "nvarchar", "nchar"],
    },
    TypeGroup {
        name: "float",
        members: &["float", "real", "double precision"],
    },
    TypeGroup {
        name: "decimal",
        members: &["decimal", "numeric"],
    },
    TypeGroup {
        name: "datetime",
        members: &["datetime", "timestamp", "date", "time"],
    },
    TypeGroup {
        name: "bool",
        members: &["bool", "boolean", "bit"],
    },
];

/// Classifies type names into families.
#[derive(Debug, Clone, Copy)]
pub struct TypeCompatibilityMatrix {
    groups: &'static [TypeGroup],
}

impl TypeCompatibilityMatrix {
    pub const BUILTIN: TypeCompatibilityMatrix = TypeCompatibilityMatrix::new(TYPE_GROUPS);

    pub const fn new(groups: &'static [TypeGroup]) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &'static [TypeGroup] {
        self.groups
    }

    /// Family of a type name, if any. The empty name belongs to none.
    pub fn group_of(&self, type_name: &str) -> Option<&'static str> {
        let canonical = canonicalize(type_name);
        if canonical.is_empty() {
            return None;
        }
        self.groups
            .iter()
            .find(|g| g.members.contains(&canonical.as_str()))
            .map(|g| g.name)
    }

    /// Whether an existing column type can stand in for the expected one.
    ///
    /// Symmetric. Unknown and empty names are never compatible with
    /// anything, themselves included.
    pub fn compatible(&self, existing: &str, expected: &str) -> bool {
        match (self.group_of(existing), self.group_of(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for TypeCompatibilityMatrix {
    fn default() -> Self {
        Self::BUILTIN
    }
}

/// Case-fold and trim a type name.
pub fn canonicalize(type_name: &str) -> String {
    type_name.trim().to_lowercase()
}

/// [`TypeCompatibilityMatrix::compatible`] against the built-in families.
pub fn compatible(existing: &str, expected: &str) -> bool {
    TypeCompatibilityMatrix::BUILTIN.compatible(existing, expected)
}
