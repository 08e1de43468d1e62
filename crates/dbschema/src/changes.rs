//! The change vocabulary.
//!
//! A migration is an ordered list of [`Change`] values. Table-level changes
//! live in [`Change`]; changes inside an existing table are grouped in an
//! [`AlterTable`] as [`ColumnChange`]s and [`IndexChange`]s.
//!
//! Every change carries owned copies of the data it needs, so it stays valid
//! after the schema snapshots it was computed from are dropped.

use crate::{DefaultValue, Field, FieldType, ForeignKey, Index, Table};
use std::fmt;

/// A single table-level schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table with all its fields and indices.
    CreateTable(Table),
    /// Drop an existing table.
    DropTable { name: String },
    /// Change columns and indices of an existing table.
    AlterTable(AlterTable),
    /// Rename a table. Only produced by explicit migrations.
    RenameTable { old_name: String, new_name: String },
    /// Add a foreign key to a table.
    CreateForeignKey {
        table: String,
        foreign_key: ForeignKey,
    },
    /// Drop a foreign key by constraint name.
    DropForeignKey { table: String, name: String },
    /// Rename a foreign key constraint.
    RenameForeignKey {
        table: String,
        old_name: String,
        new_name: String,
    },
}

impl Change {
    /// The table this change touches (the new name, for renames).
    pub fn table_name(&self) -> &str {
        match self {
            Change::CreateTable(table) => table.name(),
            Change::DropTable { name } => name,
            Change::AlterTable(alter) => &alter.name,
            Change::RenameTable { new_name, .. } => new_name,
            Change::CreateForeignKey { table, .. }
            | Change::DropForeignKey { table, .. }
            | Change::RenameForeignKey { table, .. } => table,
        }
    }
}

/// Column and index operations on an existing table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlterTable {
    /// Table name.
    pub name: String,
    /// Column operations, in application order.
    pub fields: Vec<ColumnChange>,
    /// Index operations, in application order.
    pub indices: Vec<IndexChange>,
}

impl AlterTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.indices.is_empty()
    }
}

/// A single column operation inside an [`AlterTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange {
    /// Add a column.
    CreateColumn(Field),
    /// Drop a column.
    DropColumn { name: String },
    /// Rename a column. Only produced by explicit migrations.
    RenameColumn { old_name: String, new_name: String },
    /// Change a column's type.
    AlterColumnType { name: String, new_type: FieldType },
    /// Make the column part of the primary key.
    CreatePrimaryKey { name: String },
    /// Remove the column from the primary key.
    DropPrimaryKey { name: String },
    /// Drop the NOT NULL constraint.
    AllowNull { name: String },
    /// Add a NOT NULL constraint.
    DisallowNull { name: String },
    /// Set or remove the column default.
    AlterColumnDefault {
        name: String,
        new_default: Option<DefaultValue>,
    },
}

impl ColumnChange {
    /// The column this operation targets (the old name, for renames).
    pub fn column_name(&self) -> &str {
        match self {
            ColumnChange::CreateColumn(field) => &field.name,
            ColumnChange::RenameColumn { old_name, .. } => old_name,
            ColumnChange::DropColumn { name }
            | ColumnChange::AlterColumnType { name, .. }
            | ColumnChange::CreatePrimaryKey { name }
            | ColumnChange::DropPrimaryKey { name }
            | ColumnChange::AllowNull { name }
            | ColumnChange::DisallowNull { name }
            | ColumnChange::AlterColumnDefault { name, .. } => name,
        }
    }
}

/// A single index operation inside an [`AlterTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexChange {
    /// Create an index.
    CreateIndex(Index),
    /// Drop an index by name.
    DropIndex { name: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateTable(table) => write!(f, "+ table {}", table.name()),
            Change::DropTable { name } => write!(f, "- table {}", name),
            Change::AlterTable(alter) => write!(f, "~ table {}", alter.name),
            Change::RenameTable { old_name, new_name } => {
                write!(f, "~ rename table {} -> {}", old_name, new_name)
            }
            Change::CreateForeignKey { table, foreign_key } => {
                write!(f, "+ {}: {}", table, foreign_key)
            }
            Change::DropForeignKey { table, name } => {
                write!(f, "- {}: FOREIGN KEY {}", table, name)
            }
            Change::RenameForeignKey {
                table,
                old_name,
                new_name,
            } => write!(
                f,
                "~ {}: rename FOREIGN KEY {} -> {}",
                table, old_name, new_name
            ),
        }
    }
}

impl fmt::Display for ColumnChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnChange::CreateColumn(field) => write!(f, "+ {}", field),
            ColumnChange::DropColumn { name } => write!(f, "- {}", name),
            ColumnChange::RenameColumn { old_name, new_name } => {
                write!(f, "~ rename {} -> {}", old_name, new_name)
            }
            ColumnChange::AlterColumnType { name, new_type } => {
                write!(f, "~ {}: type -> {}", name, new_type)
            }
            ColumnChange::CreatePrimaryKey { name } => write!(f, "+ {}: primary key", name),
            ColumnChange::DropPrimaryKey { name } => write!(f, "- {}: primary key", name),
            ColumnChange::AllowNull { name } => write!(f, "~ {}: nullable", name),
            ColumnChange::DisallowNull { name } => write!(f, "~ {}: not null", name),
            ColumnChange::AlterColumnDefault { name, new_default } => match new_default {
                Some(default) => write!(f, "~ {} default: -> {}", name, default),
                None => write!(f, "~ {} default: -> (none)", name),
            },
        }
    }
}

impl fmt::Display for IndexChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexChange::CreateIndex(index) => write!(f, "+ {}", index),
            IndexChange::DropIndex { name } => write!(f, "- INDEX {}", name),
        }
    }
}

/// Render a list of changes as an indented, human-readable plan.
///
/// ```text
/// + table users
/// ~ table posts
///     + title: text not null
///     - INDEX posts_slug_idx
/// ```
pub fn describe(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "No changes detected.\n".to_string();
    }

    let mut out = String::new();
    for change in changes {
        out.push_str(&change.to_string());
        out.push('\n');
        if let Change::AlterTable(alter) = change {
            for column in &alter.fields {
                out.push_str(&format!("    {}\n", column));
            }
            for index in &alter.indices {
                out.push_str(&format!("    {}\n", index));
            }
        }
    }
    out
}
