//! What a run did, per connection unit.

use crate::{ConnectionAlias, Error};

/// A single DDL decision that was carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    SchemaCreated {
        schema: String,
    },
    TableCreated {
        /// Declared identifier.
        table: String,
        /// Dialect-formatted identifier the DDL used.
        physical: String,
        columns: usize,
    },
    ColumnAdded {
        table: String,
        column: String,
        db_type: String,
    },
    ColumnAltered {
        table: String,
        column: String,
        from: String,
        to: String,
    },
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::SchemaCreated { schema } => write!(f, "+ schema {}", schema),
            Change::TableCreated {
                physical, columns, ..
            } => write!(f, "+ table {} ({} columns)", physical, columns),
            Change::ColumnAdded {
                table,
                column,
                db_type,
            } => write!(f, "+ {}.{}: {}", table, column, db_type),
            Change::ColumnAltered {
                table,
                column,
                from,
                to,
            } => write!(f, "~ {}.{}: {} -> {}", table, column, from, to),
        }
    }
}

/// How a connection unit ended.
#[derive(Debug)]
pub enum UnitOutcome {
    /// The transaction committed. `changes` may be empty.
    Committed { changes: Vec<Change> },
    /// The unit stopped; anything it did was rolled back.
    Aborted { error: Error },
}

/// One connection unit.
#[derive(Debug)]
pub struct UnitReport {
    pub alias: ConnectionAlias,
    /// Declared identifiers of the entities routed to this unit, in order.
    pub entities: Vec<String>,
    pub outcome: UnitOutcome,
}

impl UnitReport {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, UnitOutcome::Committed { .. })
    }

    pub fn changes(&self) -> &[Change] {
        match &self.outcome {
            UnitOutcome::Committed { changes } => changes,
            UnitOutcome::Aborted { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            UnitOutcome::Committed { .. } => None,
            UnitOutcome::Aborted { error } => Some(error),
        }
    }
}

/// Result of [`Reconciler::run`](crate::Reconciler::run), units in the order
/// their aliases were first seen.
#[derive(Debug, Default)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// True when every unit committed.
    pub fn is_success(&self) -> bool {
        self.units.iter().all(UnitReport::is_committed)
    }

    pub fn unit(&self, alias: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.alias.as_str() == alias)
    }

    /// Every committed change, unit by unit.
    pub fn changes(&self) -> impl Iterator<Item = (&ConnectionAlias, &Change)> {
        self.units
            .iter()
            .flat_map(|u| u.changes().iter().map(move |c| (&u.alias, c)))
    }

    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.units.iter().filter_map(UnitReport::error)
    }

    pub fn change_count(&self) -> usize {
        self.units.iter().map(|u| u.changes().len()).sum()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for unit in &self.units {
            match &unit.outcome {
                UnitOutcome::Committed { changes } if changes.is_empty() => {
                    writeln!(f, "{}: up to date", unit.alias)?;
                }
                UnitOutcome::Committed { changes } => {
                    writeln!(f, "{}: committed", unit.alias)?;
                    for change in changes {
                        writeln!(f, "  {}", change)?;
                    }
                }
                UnitOutcome::Aborted { error } => {
                    writeln!(f, "{}: aborted: {}", unit.alias, error)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendError;

    fn report() -> RunReport {
        RunReport {
            units: vec![
                UnitReport {
                    alias: ConnectionAlias::from("default"),
                    entities: vec!["orders".into()],
                    outcome: UnitOutcome::Committed {
                        changes: vec![
                            Change::SchemaCreated {
                                schema: "sales".into(),
                            },
                            Change::TableCreated {
                                table: "sales.orders".into(),
                                physical: "\"sales\".\"orders\"".into(),
                                columns: 3,
                            },
                        ],
                    },
                },
                UnitReport {
                    alias: ConnectionAlias::from("legacy"),
                    entities: vec!["[dbo].[customers]".into()],
                    outcome: UnitOutcome::Aborted {
                        error: Error::Schema {
                            alias: ConnectionAlias::from("legacy"),
                            entity: "[dbo].[customers]".into(),
                            field: Some("name".into()),
                            source: BackendError::rejected("permission denied"),
                        },
                    },
                },
            ],
        }
    }

    #[test]
    fn test_accessors() {
        let report = report();
        assert!(!report.is_success());
        assert_eq!(report.change_count(), 2);
        assert_eq!(report.errors().count(), 1);
        assert!(report.unit("default").unwrap().is_committed());
        assert!(report.unit("legacy").unwrap().changes().is_empty());
        assert!(report.unit("missing").is_none());
        assert!(report.changes().all(|(alias, _)| alias.as_str() == "default"));
    }

    #[test]
    fn test_display() {
        let text = report().to_string();
        insta::assert_snapshot!(text.trim_end(), @r#"
        default: committed
          + schema sales
          + table "sales"."orders" (3 columns)
        legacy: aborted: schema change on 'legacy' rejected for table '[dbo].[customers]', column 'name': rejected: permission denied
        "#);
    }

    #[test]
    fn test_change_display() {
        let added = Change::ColumnAdded {
            table: "orders".into(),
            column: "note".into(),
            db_type: "text".into(),
        };
        assert_eq!(added.to_string(), "+ orders.note: text");
        let altered = Change::ColumnAltered {
            table: "orders".into(),
            column: "total".into(),
            from: "varchar".into(),
            to: "numeric".into(),
        };
        assert_eq!(altered.to_string(), "~ orders.total: varchar -> numeric");
    }
}
