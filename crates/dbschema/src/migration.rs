//! Hand-written migrations.
//!
//! A [`Migration`] is a named, ordered list of [`Change`]s built through a
//! closure, plus optional conditions that decide whether it should run
//! against a given database.
//!
//! ```
//! use dbschema::{Field, Migration};
//!
//! let migration = Migration::build("split_user_names", |m| {
//!     m.skip_if(|schema| schema.table("users").is_some_and(|t| t.has_field("first_name")));
//!     m.alter_table("users", |t| {
//!         t.add_column(Field::new("first_name", "text"));
//!         t.rename_column("name", "last_name");
//!     });
//! });
//!
//! assert_eq!(migration.changes().len(), 1);
//! ```

use crate::{
    AlterTable, Change, CheckConstraint, ColumnChange, DefaultValue, Field, FieldType, ForeignKey,
    Index, IndexChange, Schema, Table, check_constraint_name, foreign_key_name, index_name,
    parse_fk_reference, unique_index_name,
};
use std::fmt;
use tracing::{debug, trace};

type Condition = Box<dyn Fn(&Schema) -> bool + Send + Sync>;

/// A named list of changes with run conditions.
pub struct Migration {
    name: String,
    changes: Vec<Change>,
    apply_conditions: Vec<Condition>,
    skip_conditions: Vec<Condition>,
}

impl Migration {
    /// Build a migration by running `body` against a fresh [`MigrationBuilder`].
    pub fn build(name: impl Into<String>, body: impl FnOnce(&mut MigrationBuilder)) -> Self {
        let mut builder = MigrationBuilder::default();
        body(&mut builder);

        let migration = Self {
            name: name.into(),
            changes: builder.changes,
            apply_conditions: builder.apply_conditions,
            skip_conditions: builder.skip_conditions,
        };
        debug!(
            migration = %migration.name,
            changes = migration.changes.len(),
            "migration built"
        );
        migration
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The changes, in application order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    /// Whether this migration should run against `actual`: every `apply_if`
    /// condition holds and no `skip_if` condition does.
    ///
    /// A migration without conditions always runs.
    pub fn should_run(&self, actual: &Schema) -> bool {
        let run = self.apply_conditions.iter().all(|condition| condition(actual))
            && !self.skip_conditions.iter().any(|condition| condition(actual));
        trace!(migration = %self.name, run, "evaluated migration conditions");
        run
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("changes", &self.changes)
            .field("apply_conditions", &self.apply_conditions.len())
            .field("skip_conditions", &self.skip_conditions.len())
            .finish()
    }
}

/// Collects changes and conditions for [`Migration::build`].
#[derive(Default)]
pub struct MigrationBuilder {
    changes: Vec<Change>,
    apply_conditions: Vec<Condition>,
    skip_conditions: Vec<Condition>,
}

impl MigrationBuilder {
    /// Only run when `condition` holds for the actual schema.
    pub fn apply_if(
        &mut self,
        condition: impl Fn(&Schema) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.apply_conditions.push(Box::new(condition));
        self
    }

    /// Don't run when `condition` holds for the actual schema.
    pub fn skip_if(
        &mut self,
        condition: impl Fn(&Schema) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.skip_conditions.push(Box::new(condition));
        self
    }

    /// Create a table.
    ///
    /// Emits a [`Change::CreateTable`] without foreign keys, followed by one
    /// [`Change::CreateForeignKey`] per declared foreign key, so tables that
    /// reference each other can be created in one migration.
    pub fn create_table(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut TableBuilder),
    ) -> &mut Self {
        let mut builder = TableBuilder::new(name.into());
        body(&mut builder);

        let table = Table::new(builder.name.as_str())
            .with_fields(builder.fields)
            .with_indices(builder.indices)
            .with_checks(builder.checks);
        self.changes.push(Change::CreateTable(table));
        for foreign_key in builder.foreign_keys {
            self.changes.push(Change::CreateForeignKey {
                table: builder.name.clone(),
                foreign_key,
            });
        }
        self
    }

    pub fn drop_table(&mut self, name: impl Into<String>) -> &mut Self {
        self.changes.push(Change::DropTable { name: name.into() });
        self
    }

    pub fn rename_table(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.changes.push(Change::RenameTable {
            old_name: from.into(),
            new_name: to.into(),
        });
        self
    }

    /// Alter an existing table.
    ///
    /// Column and index operations are grouped in one [`Change::AlterTable`];
    /// foreign key operations follow it as separate changes. The `AlterTable`
    /// is left out when it is empty and foreign key operations were declared.
    pub fn alter_table(
        &mut self,
        name: impl Into<String>,
        body: impl FnOnce(&mut AlterTableBuilder),
    ) -> &mut Self {
        let mut builder = AlterTableBuilder {
            alter: AlterTable::new(name),
            foreign_keys: Vec::new(),
        };
        body(&mut builder);

        if !builder.alter.is_empty() || builder.foreign_keys.is_empty() {
            self.changes.push(Change::AlterTable(builder.alter));
        }
        self.changes.extend(builder.foreign_keys);
        self
    }
}

/// Declares the contents of a new table.
pub struct TableBuilder {
    name: String,
    fields: Vec<Field>,
    indices: Vec<Index>,
    checks: Vec<CheckConstraint>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: Vec::new(),
            indices: Vec::new(),
            checks: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Add a primary key column.
    pub fn primary_key(
        &mut self,
        name: impl Into<String>,
        field_type: impl Into<FieldType>,
    ) -> &mut Self {
        self.field(Field::new(name, field_type).primary_key())
    }

    pub fn index(&mut self, index: Index) -> &mut Self {
        self.indices.push(index);
        self
    }

    /// Add a plain index on `columns`, named `idx_{table}_{columns}`.
    pub fn index_on(&mut self, columns: &[&str]) -> &mut Self {
        let name = index_name(&self.name, columns);
        self.index(Index::on(name, columns))
    }

    /// Add a unique index on `columns`, named `uq_{table}_{columns}`.
    pub fn unique_index_on(&mut self, columns: &[&str]) -> &mut Self {
        let name = unique_index_name(&self.name, columns);
        self.index(Index::on(name, columns).unique())
    }

    pub fn check(&mut self, name: impl Into<String>, condition: impl Into<String>) -> &mut Self {
        self.checks.push(CheckConstraint::new(name, condition));
        self
    }

    /// Add a CHECK constraint named after a hash of its condition.
    pub fn check_expr(&mut self, condition: impl Into<String>) -> &mut Self {
        let condition = condition.into();
        let name = check_constraint_name(&self.name, &condition);
        self.check(name, condition)
    }

    pub fn foreign_key(&mut self, foreign_key: ForeignKey) -> &mut Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Add a single-column foreign key.
    ///
    /// `target` is either `table.column`, `table(column)` or a bare table name
    /// (referencing its primary key). The constraint is named
    /// `{table}_{column}_fkey`.
    pub fn references(&mut self, column: &str, target: &str) -> &mut Self {
        let name = foreign_key_name(&self.name, &[column]);
        let foreign_key = match parse_fk_reference(target) {
            Some((table, target_column)) => {
                ForeignKey::new(name, [column], table).references_columns([target_column])
            }
            None => ForeignKey::new(name, [column], target),
        };
        self.foreign_key(foreign_key)
    }
}

/// Declares the operations of an [`AlterTable`].
pub struct AlterTableBuilder {
    alter: AlterTable,
    foreign_keys: Vec<Change>,
}

impl AlterTableBuilder {
    fn column(&mut self, change: ColumnChange) -> &mut Self {
        self.alter.fields.push(change);
        self
    }

    pub fn add_column(&mut self, field: Field) -> &mut Self {
        self.column(ColumnChange::CreateColumn(field))
    }

    pub fn drop_column(&mut self, name: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::DropColumn { name: name.into() })
    }

    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::RenameColumn {
            old_name: from.into(),
            new_name: to.into(),
        })
    }

    pub fn alter_column_type(
        &mut self,
        name: impl Into<String>,
        new_type: impl Into<FieldType>,
    ) -> &mut Self {
        self.column(ColumnChange::AlterColumnType {
            name: name.into(),
            new_type: new_type.into(),
        })
    }

    pub fn add_primary_key(&mut self, name: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::CreatePrimaryKey { name: name.into() })
    }

    pub fn drop_primary_key(&mut self, name: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::DropPrimaryKey { name: name.into() })
    }

    pub fn allow_null(&mut self, name: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::AllowNull { name: name.into() })
    }

    pub fn disallow_null(&mut self, name: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::DisallowNull { name: name.into() })
    }

    pub fn alter_column_default(
        &mut self,
        name: impl Into<String>,
        new_default: impl Into<DefaultValue>,
    ) -> &mut Self {
        self.column(ColumnChange::AlterColumnDefault {
            name: name.into(),
            new_default: Some(new_default.into()),
        })
    }

    pub fn drop_column_default(&mut self, name: impl Into<String>) -> &mut Self {
        self.column(ColumnChange::AlterColumnDefault {
            name: name.into(),
            new_default: None,
        })
    }

    pub fn add_index(&mut self, index: Index) -> &mut Self {
        self.alter.indices.push(IndexChange::CreateIndex(index));
        self
    }

    pub fn drop_index(&mut self, name: impl Into<String>) -> &mut Self {
        self.alter
            .indices
            .push(IndexChange::DropIndex { name: name.into() });
        self
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> &mut Self {
        self.foreign_keys.push(Change::CreateForeignKey {
            table: self.alter.name.clone(),
            foreign_key,
        });
        self
    }

    pub fn drop_foreign_key(&mut self, name: impl Into<String>) -> &mut Self {
        self.foreign_keys.push(Change::DropForeignKey {
            table: self.alter.name.clone(),
            name: name.into(),
        });
        self
    }

    pub fn rename_foreign_key(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> &mut Self {
        self.foreign_keys.push(Change::RenameForeignKey {
            table: self.alter.name.clone(),
            old_name: from.into(),
            new_name: to.into(),
        });
        self
    }
}
