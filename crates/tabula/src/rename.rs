//! Scoped table-identifier overrides.
//!
//! While a unit runs, each entity's visible table identifier is swapped for
//! the dialect-formatted physical name so that anything reading the entity
//! sees the name the backend will use. A [`TableRename`] puts the declared
//! identifier back when it is dropped; a [`RenameScope`] drops its guards in
//! reverse order of acquisition. Unwinding restores names the same way.

use crate::EntityDescriptor;

/// Holds one entity's table identifier swapped out.
#[derive(Debug)]
pub struct TableRename<'e> {
    entity: &'e mut EntityDescriptor,
    original: Option<String>,
}

impl<'e> TableRename<'e> {
    /// Swap in `physical` until the guard is dropped.
    pub fn apply(entity: &'e mut EntityDescriptor, physical: impl Into<String>) -> Self {
        let original = entity.replace_table(physical.into());
        tracing::trace!(%original, physical = entity.table(), "renamed table");
        Self {
            entity,
            original: Some(original),
        }
    }

    pub fn entity(&self) -> &EntityDescriptor {
        self.entity
    }

    /// The identifier that will be restored.
    pub fn original(&self) -> &str {
        self.original.as_deref().unwrap_or_default()
    }
}

impl Drop for TableRename<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            let physical = self.entity.replace_table(original);
            tracing::trace!(%physical, restored = self.entity.table(), "restored table");
        }
    }
}

/// A stack of renames released together.
#[derive(Debug, Default)]
pub struct RenameScope<'e> {
    guards: Vec<TableRename<'e>>,
}

impl<'e> RenameScope<'e> {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    pub fn push(&mut self, guard: TableRename<'e>) {
        self.guards.push(guard);
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableRename<'e>> {
        self.guards.iter()
    }

    /// Restore every identifier, most recent first.
    pub fn release(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

impl Drop for RenameScope<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
