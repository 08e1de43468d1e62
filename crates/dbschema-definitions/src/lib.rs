//! Schema definition types for dbschema.
//!
//! This crate contains the value types used to describe a relational schema:
//! [`Table`], [`Field`], [`Index`], [`CheckConstraint`] and [`ForeignKey`], plus
//! the [`Schema`] snapshot that groups tables together. The same types describe
//! both the *desired* schema (declared by the application) and the *actual*
//! schema (read from a live database by an introspector).
//!
//! All types compare structurally. A [`Table`] is never mutated once built: the
//! `with_*` methods return a new table and leave the original untouched.

use std::collections::HashSet;

mod constraint;
mod field;
mod index;
mod naming;

pub use constraint::{CheckConstraint, ForeignKey, ReferentialAction, parse_fk_reference};
pub use field::{DefaultValue, Field, FieldType, Literal};
pub use index::{Index, IndexColumn, IndexTarget, NullsOrder, SortOrder};
pub use naming::{check_constraint_name, foreign_key_name, index_name, unique_index_name};

/// A snapshot is malformed: it cannot be diffed or replayed reliably.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Two tables share a name.
    #[error("table '{table}' is defined more than once")]
    DuplicateTable { table: String },

    /// Two fields of the same table share a name.
    #[error("field '{field}' is defined more than once in table '{table}'")]
    DuplicateField { table: String, field: String },

    /// Two indices of the same table share a name.
    #[error("index '{index}' is defined more than once in table '{table}'")]
    DuplicateIndex { table: String, index: String },

    /// A primary key field allows NULL.
    #[error("primary key field '{field}' in table '{table}' is nullable")]
    NullablePrimaryKey { table: String, field: String },
}

/// A database table definition.
///
/// Equality is structural over the name, the ordered field list, and the
/// *sets* of indices, check constraints and foreign keys.
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    fields: Vec<Field>,
    indices: Vec<Index>,
    checks: Vec<CheckConstraint>,
    foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Indices.
    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// CHECK constraints.
    pub fn checks(&self) -> &[CheckConstraint] {
        &self.checks
    }

    /// Foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indices.iter().find(|i| i.name == name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    /// Look up a CHECK constraint by name.
    pub fn check(&self, name: &str) -> Option<&CheckConstraint> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Look up a foreign key by constraint name.
    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    /// Whether an index covers exactly these plain columns, in this order.
    ///
    /// Indices containing an expression column never match.
    pub fn has_index_on(&self, field_names: &[&str]) -> bool {
        self.indices.iter().any(|idx| idx.covers(field_names))
    }

    /// Like [`Table::has_index_on`], restricted to unique indices.
    pub fn has_unique_index_on(&self, field_names: &[&str]) -> bool {
        self.indices
            .iter()
            .any(|idx| idx.unique && idx.covers(field_names))
    }

    /// Names of the primary key fields, in field order.
    pub fn primary_key_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Whether applying this table needs raw SQL: a field default is a
    /// database expression, an index has an expression column, or any CHECK
    /// constraint exists.
    pub fn has_expressions(&self) -> bool {
        self.fields.iter().any(Field::default_is_expression)
            || self.indices.iter().any(Index::has_expressions)
            || !self.checks.is_empty()
    }

    /// Copy of this table under a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Copy of this table with a different field list.
    pub fn with_fields(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Copy of this table with a different index set.
    pub fn with_indices(&self, indices: impl IntoIterator<Item = Index>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Copy of this table with a different set of CHECK constraints.
    pub fn with_checks(&self, checks: impl IntoIterator<Item = CheckConstraint>) -> Self {
        Self {
            checks: checks.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Copy of this table with a different set of foreign keys.
    pub fn with_foreign_keys(&self, foreign_keys: impl IntoIterator<Item = ForeignKey>) -> Self {
        Self {
            foreign_keys: foreign_keys.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Check that field and index names are unique within this table, and
    /// that no primary key field is nullable.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SnapshotError::DuplicateField {
                    table: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.primary_key && field.null {
                return Err(SnapshotError::NullablePrimaryKey {
                    table: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for index in &self.indices {
            if !seen.insert(index.name.as_str()) {
                return Err(SnapshotError::DuplicateIndex {
                    table: self.name.clone(),
                    index: index.name.clone(),
                });
            }
        }

        Ok(())
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.fields == other.fields
            && same_members(&self.indices, &other.indices)
            && same_members(&self.checks, &other.checks)
            && same_members(&self.foreign_keys, &other.foreign_keys)
    }
}

/// Order-insensitive comparison of two small collections.
fn same_members<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
}

/// A complete schema snapshot: an ordered list of tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    /// Create a schema from a list of tables.
    pub fn new(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    /// Tables, in snapshot order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Get a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Copy of this schema where `table` replaces the table of the same name,
    /// or is appended if there is none.
    pub fn with_table(&self, table: Table) -> Self {
        let mut tables = self.tables.clone();
        match tables.iter_mut().find(|t| t.name == table.name) {
            Some(slot) => *slot = table,
            None => tables.push(table),
        }
        Self { tables }
    }

    /// Copy of this schema without the named table.
    pub fn without_table(&self, name: &str) -> Self {
        Self {
            tables: self
                .tables
                .iter()
                .filter(|t| t.name != name)
                .cloned()
                .collect(),
        }
    }

    /// Check every snapshot precondition: unique table names within the
    /// schema, and [`Table::validate`] for each table.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        validate_tables(&self.tables)
    }
}

impl From<Vec<Table>> for Schema {
    fn from(tables: Vec<Table>) -> Self {
        Self { tables }
    }
}

/// Validate a bare list of tables, as [`Schema::validate`] does.
pub fn validate_tables(tables: &[Table]) -> Result<(), SnapshotError> {
    let mut seen = HashSet::new();
    for table in tables {
        if !seen.insert(table.name.as_str()) {
            return Err(SnapshotError::DuplicateTable {
                table: table.name.clone(),
            });
        }
        table.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
