//! Schema diffing - compare a desired schema against an actual one.
//!
//! [`between`] walks two table lists and produces the ordered [`Change`]s
//! needed to turn `actual` into `desired`.
//!
//! ## Ordering
//!
//! Tables are visited in the order they first appear: every name from
//! `desired` in its order, then the names only present in `actual`. Fields
//! and indices inside a table use the same rule. The output is therefore
//! deterministic for a given input order; it is not sorted.
//!
//! ## Column changes
//!
//! A column present on both sides but different is compared attribute by
//! attribute, and each differing attribute produces its own operation, in
//! this order: type, primary key added, primary key removed, null allowed,
//! null disallowed, default. `has_sequence` has no operation of its own.
//!
//! ## Renames
//!
//! Renames are never inferred. A table or column that disappears while a
//! differently-named one appears is reported as a drop plus a create.
//! [`Change::RenameTable`] and [`ColumnChange::RenameColumn`] only come from
//! explicit migrations (see [`crate::Migration`]).
//!
//! ## Preconditions
//!
//! Table names must be unique within each snapshot, and field and index names
//! unique within each table. Both snapshots are validated first; a violation
//! is returned as [`Error::InvalidSnapshot`] and nothing is diffed.

use crate::{
    AlterTable, Change, ColumnChange, Error, Field, Index, IndexChange, Result, Schema, Side,
    Table, validate_tables,
};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

/// How index differences inside an altered table are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Never emit index operations; `AlterTable.indices` is always empty.
    Ignore,
    /// Indices are matched by name. Missing ones are created, extra ones are
    /// dropped, and changed ones are dropped then re-created.
    #[default]
    DropAndCreate,
}

/// Knobs for [`between_with`].
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    pub indices: IndexPolicy,
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indices(mut self, policy: IndexPolicy) -> Self {
        self.indices = policy;
        self
    }
}

/// Compute the changes that turn `actual` into `desired`, with default options.
pub fn between(desired: &[Table], actual: &[Table]) -> Result<Vec<Change>> {
    between_with(desired, actual, &DiffOptions::default())
}

/// Compute the changes that turn `actual` into `desired`.
///
/// # Example
///
/// ```
/// use dbschema::{between, Change, Field, Table};
///
/// let desired = vec![Table::new("users").with_fields([
///     Field::new("id", "integer").primary_key(),
/// ])];
///
/// let changes = between(&desired, &[]).unwrap();
/// assert!(matches!(&changes[..], [Change::CreateTable(t)] if t.name() == "users"));
/// ```
pub fn between_with(
    desired: &[Table],
    actual: &[Table],
    options: &DiffOptions,
) -> Result<Vec<Change>> {
    let span = tracing::debug_span!(
        "between",
        desired = desired.len(),
        actual = actual.len(),
        changes = tracing::field::Empty,
    );
    let _enter = span.enter();

    validate_tables(desired).map_err(|source| Error::InvalidSnapshot {
        side: Side::Desired,
        source,
    })?;
    validate_tables(actual).map_err(|source| Error::InvalidSnapshot {
        side: Side::Actual,
        source,
    })?;

    let desired_by_name: IndexMap<&str, &Table> = desired.iter().map(|t| (t.name(), t)).collect();
    let actual_by_name: IndexMap<&str, &Table> = actual.iter().map(|t| (t.name(), t)).collect();

    let mut changes = Vec::new();
    for name in name_union(desired_by_name.keys().copied(), actual_by_name.keys().copied()) {
        match (desired_by_name.get(name), actual_by_name.get(name)) {
            (Some(desired), None) => {
                trace!(table = name, "table only in desired schema");
                // Checks and foreign keys are not carried into CreateTable.
                changes.push(Change::CreateTable(
                    Table::new(name)
                        .with_fields(desired.fields().to_vec())
                        .with_indices(desired.indices().to_vec()),
                ));
            }
            (None, Some(_)) => {
                trace!(table = name, "table only in actual schema");
                changes.push(Change::DropTable {
                    name: name.to_string(),
                });
            }
            (Some(desired), Some(actual)) if desired != actual => {
                trace!(table = name, "table differs");
                changes.push(Change::AlterTable(diff_table(desired, actual, options)));
            }
            _ => {}
        }
    }

    span.record("changes", changes.len());
    debug!(changes = changes.len(), "schema diff computed");

    Ok(changes)
}

/// Names from `first` in order, then the ones from `second` not seen yet.
fn name_union<'a>(
    first: impl IntoIterator<Item = &'a str>,
    second: impl IntoIterator<Item = &'a str>,
) -> IndexSet<&'a str> {
    first.into_iter().chain(second).collect()
}

/// Diff two tables with the same name.
fn diff_table(desired: &Table, actual: &Table, options: &DiffOptions) -> AlterTable {
    let indices = match options.indices {
        IndexPolicy::Ignore => Vec::new(),
        IndexPolicy::DropAndCreate => diff_indices(desired.indices(), actual.indices()),
    };

    AlterTable {
        name: desired.name().to_string(),
        fields: diff_fields(desired.fields(), actual.fields()),
        indices,
    }
}

/// Diff fields between desired and actual state.
fn diff_fields(desired: &[Field], actual: &[Field]) -> Vec<ColumnChange> {
    let desired_by_name: IndexMap<&str, &Field> =
        desired.iter().map(|f| (f.name.as_str(), f)).collect();
    let actual_by_name: IndexMap<&str, &Field> =
        actual.iter().map(|f| (f.name.as_str(), f)).collect();

    let mut changes = Vec::new();
    for name in name_union(desired_by_name.keys().copied(), actual_by_name.keys().copied()) {
        match (desired_by_name.get(name), actual_by_name.get(name)) {
            (Some(desired), None) => changes.push(ColumnChange::CreateColumn((*desired).clone())),
            (None, Some(_)) => changes.push(ColumnChange::DropColumn {
                name: name.to_string(),
            }),
            (Some(desired), Some(actual)) if desired != actual => {
                changes.extend(diff_field(desired, actual));
            }
            _ => {}
        }
    }
    changes
}

/// Attribute-by-attribute comparison of one column present on both sides.
fn diff_field(desired: &Field, actual: &Field) -> Vec<ColumnChange> {
    let name = || desired.name.clone();
    let mut changes = Vec::new();

    if desired.field_type != actual.field_type {
        changes.push(ColumnChange::AlterColumnType {
            name: name(),
            new_type: desired.field_type.clone(),
        });
    }

    if desired.primary_key && !actual.primary_key {
        changes.push(ColumnChange::CreatePrimaryKey { name: name() });
    }

    if actual.primary_key && !desired.primary_key {
        changes.push(ColumnChange::DropPrimaryKey { name: name() });
    }

    if desired.null && !actual.null {
        changes.push(ColumnChange::AllowNull { name: name() });
    }

    if actual.null && !desired.null {
        changes.push(ColumnChange::DisallowNull { name: name() });
    }

    if desired.default != actual.default {
        changes.push(ColumnChange::AlterColumnDefault {
            name: name(),
            new_default: desired.default.clone(),
        });
    }

    changes
}

/// Diff indices by name.
fn diff_indices(desired: &[Index], actual: &[Index]) -> Vec<IndexChange> {
    let desired_by_name: IndexMap<&str, &Index> =
        desired.iter().map(|i| (i.name.as_str(), i)).collect();
    let actual_by_name: IndexMap<&str, &Index> =
        actual.iter().map(|i| (i.name.as_str(), i)).collect();

    let mut changes = Vec::new();
    for name in name_union(desired_by_name.keys().copied(), actual_by_name.keys().copied()) {
        match (desired_by_name.get(name), actual_by_name.get(name)) {
            (Some(desired), None) => changes.push(IndexChange::CreateIndex((*desired).clone())),
            (None, Some(_)) => changes.push(IndexChange::DropIndex {
                name: name.to_string(),
            }),
            (Some(desired), Some(actual)) if desired != actual => {
                changes.push(IndexChange::DropIndex {
                    name: name.to_string(),
                });
                changes.push(IndexChange::CreateIndex((*desired).clone()));
            }
            _ => {}
        }
    }
    changes
}

/// Extension trait to diff [`Schema`] snapshots directly.
pub trait SchemaDiff {
    /// Changes needed to turn `actual` into `self`.
    fn diff(&self, actual: &Schema) -> Result<Vec<Change>>;

    /// Like [`SchemaDiff::diff`], with explicit options.
    fn diff_with(&self, actual: &Schema, options: &DiffOptions) -> Result<Vec<Change>>;
}

impl SchemaDiff for Schema {
    fn diff(&self, actual: &Schema) -> Result<Vec<Change>> {
        between(self.tables(), actual.tables())
    }

    fn diff_with(&self, actual: &Schema, options: &DiffOptions) -> Result<Vec<Change>> {
        between_with(self.tables(), actual.tables(), options)
    }
}
