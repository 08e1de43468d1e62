//! Replay - apply changes to an in-memory schema.
//!
//! Replaying a change list against a [`Schema`] checks the same
//! preconditions an executor would hit against a real database (a dropped
//! column must exist, a created index must not, a foreign key target must
//! exist) and produces the schema that results.
//!
//! ```text
//! -- This fails:
//! ALTER TABLE comment ADD CONSTRAINT ... REFERENCES post(id);  -- "post" doesn't exist!
//! ALTER TABLE posts RENAME TO post;
//!
//! -- This works:
//! ALTER TABLE posts RENAME TO post;
//! ALTER TABLE comment ADD CONSTRAINT ... REFERENCES post(id);
//! ```
//!
//! Nothing here touches a database.

use crate::{
    AlterTable, Change, ColumnChange, Field, ForeignKey, Index, IndexChange, IndexTarget,
    ReplayError, Schema, Table,
};
use tracing::{debug, trace};

/// Extension trait to apply [`Change`]s to a [`Schema`] snapshot.
///
/// Both methods leave the receiver untouched and return the resulting schema.
pub trait Replay {
    /// Apply a single change.
    fn apply(&self, change: &Change) -> Result<Schema, ReplayError>;

    /// Apply changes in order, stopping at the first one that fails.
    fn replay(&self, changes: &[Change]) -> Result<Schema, ReplayError>;
}

impl Replay for Schema {
    fn apply(&self, change: &Change) -> Result<Schema, ReplayError> {
        let change_desc = change.to_string();
        trace!(change = %change_desc, "applying change");

        match change {
            Change::CreateTable(table) => {
                if self.has_table(table.name()) {
                    return Err(ReplayError::TableAlreadyExists {
                        change: change_desc,
                        table: table.name().to_string(),
                    });
                }
                for fk in table.foreign_keys() {
                    if fk.references_table != table.name() && !self.has_table(&fk.references_table)
                    {
                        return Err(ReplayError::ForeignKeyTargetNotFound {
                            change: change_desc,
                            target_table: fk.references_table.clone(),
                        });
                    }
                }
                Ok(self.with_table(table.clone()))
            }

            Change::DropTable { name } => {
                existing_table(self, name, &change_desc)?;
                Ok(self.without_table(name))
            }

            Change::AlterTable(alter) => {
                let table = existing_table(self, &alter.name, &change_desc)?;
                Ok(self.with_table(alter_table(table, alter, &change_desc)?))
            }

            Change::RenameTable { old_name, new_name } => {
                existing_table(self, old_name, &change_desc)?;
                if self.has_table(new_name) {
                    return Err(ReplayError::TableAlreadyExists {
                        change: change_desc,
                        table: new_name.clone(),
                    });
                }
                Ok(rename_table(self, old_name, new_name))
            }

            Change::CreateForeignKey { table, foreign_key } => {
                let current = existing_table(self, table, &change_desc)?;
                if current.foreign_key(&foreign_key.name).is_some() {
                    return Err(ReplayError::ForeignKeyAlreadyExists {
                        change: change_desc,
                        table: table.clone(),
                        foreign_key: foreign_key.name.clone(),
                    });
                }
                if foreign_key.references_table != *table
                    && !self.has_table(&foreign_key.references_table)
                {
                    return Err(ReplayError::ForeignKeyTargetNotFound {
                        change: change_desc,
                        target_table: foreign_key.references_table.clone(),
                    });
                }
                let mut foreign_keys = current.foreign_keys().to_vec();
                foreign_keys.push(foreign_key.clone());
                Ok(self.with_table(current.with_foreign_keys(foreign_keys)))
            }

            Change::DropForeignKey { table, name } => {
                let current = existing_table(self, table, &change_desc)?;
                existing_foreign_key(current, name, &change_desc)?;
                let foreign_keys = current
                    .foreign_keys()
                    .iter()
                    .filter(|fk| fk.name != *name)
                    .cloned();
                Ok(self.with_table(current.with_foreign_keys(foreign_keys)))
            }

            Change::RenameForeignKey {
                table,
                old_name,
                new_name,
            } => {
                let current = existing_table(self, table, &change_desc)?;
                existing_foreign_key(current, old_name, &change_desc)?;
                if current.foreign_key(new_name).is_some() {
                    return Err(ReplayError::ForeignKeyAlreadyExists {
                        change: change_desc,
                        table: table.clone(),
                        foreign_key: new_name.clone(),
                    });
                }
                let foreign_keys = current.foreign_keys().iter().map(|fk| {
                    if fk.name == *old_name {
                        fk.with_name(new_name.clone())
                    } else {
                        fk.clone()
                    }
                });
                Ok(self.with_table(current.with_foreign_keys(foreign_keys)))
            }
        }
    }

    fn replay(&self, changes: &[Change]) -> Result<Schema, ReplayError> {
        let span = tracing::debug_span!(
            "replay",
            tables = self.tables().len(),
            changes = changes.len()
        );
        let _enter = span.enter();

        let mut schema = self.clone();
        for change in changes {
            schema = schema.apply(change)?;
        }

        debug!(tables = schema.tables().len(), "replay complete");
        Ok(schema)
    }
}

fn existing_table<'s>(
    schema: &'s Schema,
    name: &str,
    change: &str,
) -> Result<&'s Table, ReplayError> {
    schema.table(name).ok_or_else(|| ReplayError::TableNotFound {
        change: change.to_string(),
        table: name.to_string(),
    })
}

fn existing_foreign_key<'t>(
    table: &'t Table,
    name: &str,
    change: &str,
) -> Result<&'t ForeignKey, ReplayError> {
    table
        .foreign_key(name)
        .ok_or_else(|| ReplayError::ForeignKeyNotFound {
            change: change.to_string(),
            table: table.name().to_string(),
            foreign_key: name.to_string(),
        })
}

/// Rename a table in place. Foreign keys pointing at it follow the rename.
fn rename_table(schema: &Schema, old_name: &str, new_name: &str) -> Schema {
    Schema::new(schema.tables().iter().map(|table| {
        let table = if table.name() == old_name {
            table.with_name(new_name)
        } else {
            table.clone()
        };
        if !table
            .foreign_keys()
            .iter()
            .any(|fk| fk.references_table == old_name)
        {
            return table;
        }
        let foreign_keys = table.foreign_keys().iter().map(|fk| {
            let mut fk = fk.clone();
            if fk.references_table == old_name {
                fk.references_table = new_name.to_string();
            }
            fk
        });
        table.with_foreign_keys(foreign_keys)
    }))
}

/// Apply column operations, then index operations, to a copy of `table`.
fn alter_table(table: &Table, alter: &AlterTable, change: &str) -> Result<Table, ReplayError> {
    let mut fields = table.fields().to_vec();
    let mut indices = table.indices().to_vec();
    let mut foreign_keys = table.foreign_keys().to_vec();

    let column_not_found = |column: &str| ReplayError::ColumnNotFound {
        change: change.to_string(),
        table: table.name().to_string(),
        column: column.to_string(),
    };
    let column_exists = |column: &str| ReplayError::ColumnAlreadyExists {
        change: change.to_string(),
        table: table.name().to_string(),
        column: column.to_string(),
    };

    for op in &alter.fields {
        if let ColumnChange::CreateColumn(field) = op {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(column_exists(&field.name));
            }
            fields.push(field.clone());
            continue;
        }

        if let ColumnChange::RenameColumn { old_name, new_name } = op {
            if fields.iter().any(|f| f.name == *new_name) {
                return Err(column_exists(new_name));
            }
            let field = field_mut(&mut fields, old_name).ok_or_else(|| column_not_found(old_name))?;
            field.name = new_name.clone();
            rename_references(&mut indices, &mut foreign_keys, old_name, new_name);
            continue;
        }

        let name = op.column_name();
        let position = fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| column_not_found(name))?;

        match op {
            ColumnChange::DropColumn { .. } => {
                fields.remove(position);
            }
            ColumnChange::AlterColumnType { new_type, .. } => {
                fields[position].field_type = new_type.clone();
            }
            ColumnChange::CreatePrimaryKey { .. } => {
                fields[position].primary_key = true;
                fields[position].null = false;
            }
            ColumnChange::DropPrimaryKey { .. } => {
                fields[position].primary_key = false;
            }
            ColumnChange::AllowNull { .. } => {
                fields[position].null = true;
            }
            ColumnChange::DisallowNull { .. } => {
                fields[position].null = false;
            }
            ColumnChange::AlterColumnDefault { new_default, .. } => {
                fields[position].default = new_default.clone();
            }
            ColumnChange::CreateColumn(_) | ColumnChange::RenameColumn { .. } => {}
        }
    }

    for op in &alter.indices {
        match op {
            IndexChange::CreateIndex(index) => {
                if indices.iter().any(|i| i.name == index.name) {
                    return Err(ReplayError::IndexAlreadyExists {
                        change: change.to_string(),
                        table: table.name().to_string(),
                        index: index.name.clone(),
                    });
                }
                indices.push(index.clone());
            }
            IndexChange::DropIndex { name } => {
                let position = indices.iter().position(|i| i.name == *name).ok_or_else(|| {
                    ReplayError::IndexNotFound {
                        change: change.to_string(),
                        table: table.name().to_string(),
                        index: name.clone(),
                    }
                })?;
                indices.remove(position);
            }
        }
    }

    Ok(table
        .with_fields(fields)
        .with_indices(indices)
        .with_foreign_keys(foreign_keys))
}

fn field_mut<'f>(fields: &'f mut [Field], name: &str) -> Option<&'f mut Field> {
    fields.iter_mut().find(|f| f.name == name)
}

/// Point index columns and foreign key columns at a renamed column.
fn rename_references(
    indices: &mut [Index],
    foreign_keys: &mut [ForeignKey],
    old_name: &str,
    new_name: &str,
) {
    for column in indices.iter_mut().flat_map(|i| i.columns.iter_mut()) {
        if let IndexTarget::Field(name) = &mut column.target
            && name == old_name
        {
            *name = new_name.to_string();
        }
    }
    for column in foreign_keys.iter_mut().flat_map(|fk| fk.columns.iter_mut()) {
        if column == old_name {
            *column = new_name.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultValue, FieldType, ReferentialAction, between};

    fn users() -> Table {
        Table::new("users")
            .with_fields([
                Field::new("id", "integer").primary_key(),
                Field::new("email", "text").not_null(),
            ])
            .with_indices([Index::on("users_email_idx", &["email"]).unique()])
    }

    fn posts() -> Table {
        Table::new("posts")
            .with_fields([
                Field::new("id", "integer").primary_key(),
                Field::new("author_id", "integer").not_null(),
            ])
            .with_foreign_keys([ForeignKey::new("posts_author_id_fkey", ["author_id"], "users")])
    }

    fn alter(name: &str, fields: Vec<ColumnChange>, indices: Vec<IndexChange>) -> Change {
        Change::AlterTable(AlterTable {
            name: name.to_string(),
            fields,
            indices,
        })
    }

    #[test]
    fn test_create_and_drop_table() {
        let schema = Schema::default()
            .replay(&[
                Change::CreateTable(users()),
                Change::CreateTable(posts()),
                Change::DropTable {
                    name: "users".to_string(),
                },
            ])
            .unwrap();

        let names: Vec<&str> = schema.tables().iter().map(Table::name).collect();
        assert_eq!(names, vec!["posts"]);
    }

    #[test]
    fn test_create_existing_table() {
        let schema = Schema::new([users()]);
        let err = schema.apply(&Change::CreateTable(users())).unwrap_err();
        assert_eq!(
            err,
            ReplayError::TableAlreadyExists {
                change: "+ table users".to_string(),
                table: "users".to_string(),
            }
        );
        assert_eq!(err.to_string(), "+ table users: table 'users' already exists");
    }

    #[test]
    fn test_create_table_requires_fk_target() {
        let err = Schema::default()
            .apply(&Change::CreateTable(posts()))
            .unwrap_err();
        assert!(matches!(
            err,
            ReplayError::ForeignKeyTargetNotFound { target_table, .. } if target_table == "users"
        ));

        // Self references are fine.
        let category = Table::new("category")
            .with_fields([Field::new("id", "integer").primary_key(), Field::new("parent_id", "integer")])
            .with_foreign_keys([ForeignKey::new("category_parent_id_fkey", ["parent_id"], "category")]);
        assert!(Schema::default().apply(&Change::CreateTable(category)).is_ok());
    }

    #[test]
    fn test_drop_missing_table() {
        let err = Schema::default()
            .apply(&Change::DropTable {
                name: "ghost".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "- table ghost: table 'ghost' does not exist");
    }

    #[test]
    fn test_rename_table_keeps_position_and_retargets_fks() {
        let schema = Schema::new([users(), posts(), Table::new("tags")]);
        let renamed = schema
            .apply(&Change::RenameTable {
                old_name: "users".to_string(),
                new_name: "people".to_string(),
            })
            .unwrap();

        let names: Vec<&str> = renamed.tables().iter().map(Table::name).collect();
        assert_eq!(names, vec!["people", "posts", "tags"]);
        let fk = renamed
            .table("posts")
            .and_then(|t| t.foreign_key("posts_author_id_fkey"))
            .unwrap();
        assert_eq!(fk.references_table, "people");

        // The receiver is untouched.
        assert!(schema.has_table("users"));
    }

    #[test]
    fn test_rename_table_onto_existing() {
        let schema = Schema::new([users(), posts()]);
        let err = schema
            .apply(&Change::RenameTable {
                old_name: "users".to_string(),
                new_name: "posts".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ReplayError::TableAlreadyExists { table, .. } if table == "posts"));
    }

    #[test]
    fn test_alter_columns() {
        let schema = Schema::new([users()]);
        let altered = schema
            .apply(&alter(
                "users",
                vec![
                    ColumnChange::CreateColumn(Field::new("name", "text")),
                    ColumnChange::RenameColumn {
                        old_name: "email".to_string(),
                        new_name: "login".to_string(),
                    },
                    ColumnChange::AlterColumnType {
                        name: "id".to_string(),
                        new_type: FieldType::new("bigint"),
                    },
                    ColumnChange::DisallowNull {
                        name: "name".to_string(),
                    },
                    ColumnChange::AlterColumnDefault {
                        name: "name".to_string(),
                        new_default: Some(DefaultValue::from("anonymous")),
                    },
                ],
                vec![],
            ))
            .unwrap();

        let table = altered.table("users").unwrap();
        let names: Vec<&str> = table.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "login", "name"]);
        assert_eq!(table.fields()[0].field_type.as_str(), "bigint");
        let name = table.field("name").unwrap();
        assert!(!name.null);
        assert_eq!(name.default, Some(DefaultValue::from("anonymous")));

        // The index follows the renamed column.
        assert!(table.has_unique_index_on(&["login"]));
        assert!(!table.has_index_on(&["email"]));
    }

    #[test]
    fn test_primary_key_changes() {
        let schema = Schema::new([Table::new("t").with_fields([
            Field::new("a", "integer"),
            Field::new("b", "integer").primary_key(),
        ])]);
        let altered = schema
            .apply(&alter(
                "t",
                vec![
                    ColumnChange::CreatePrimaryKey {
                        name: "a".to_string(),
                    },
                    ColumnChange::DropPrimaryKey {
                        name: "b".to_string(),
                    },
                    ColumnChange::AllowNull {
                        name: "b".to_string(),
                    },
                ],
                vec![],
            ))
            .unwrap();

        let table = altered.table("t").unwrap();
        assert_eq!(table.primary_key_fields(), vec!["a"]);
        assert!(!table.field("a").unwrap().null);
        assert!(table.field("b").unwrap().null);
    }

    #[test]
    fn test_alter_missing_column() {
        let schema = Schema::new([users()]);
        let err = schema
            .apply(&alter(
                "users",
                vec![ColumnChange::DropColumn {
                    name: "ghost".to_string(),
                }],
                vec![],
            ))
            .unwrap_err();
        assert_eq!(
            err,
            ReplayError::ColumnNotFound {
                change: "~ table users".to_string(),
                table: "users".to_string(),
                column: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_create_and_rename_onto_existing_column() {
        let schema = Schema::new([users()]);
        for op in [
            ColumnChange::CreateColumn(Field::new("email", "text")),
            ColumnChange::RenameColumn {
                old_name: "id".to_string(),
                new_name: "email".to_string(),
            },
        ] {
            let err = schema.apply(&alter("users", vec![op], vec![])).unwrap_err();
            assert!(matches!(
                err,
                ReplayError::ColumnAlreadyExists { column, .. } if column == "email"
            ));
        }
    }

    #[test]
    fn test_alter_missing_table() {
        let err = Schema::default()
            .apply(&alter("ghost", vec![], vec![]))
            .unwrap_err();
        assert!(matches!(err, ReplayError::TableNotFound { table, .. } if table == "ghost"));
    }

    #[test]
    fn test_index_changes() {
        let schema = Schema::new([users()]);

        let replaced = schema
            .apply(&alter(
                "users",
                vec![],
                vec![
                    IndexChange::DropIndex {
                        name: "users_email_idx".to_string(),
                    },
                    IndexChange::CreateIndex(Index::on("users_email_idx", &["email"])),
                ],
            ))
            .unwrap();
        let table = replaced.table("users").unwrap();
        assert!(table.has_index_on(&["email"]));
        assert!(!table.has_unique_index_on(&["email"]));

        let err = schema
            .apply(&alter(
                "users",
                vec![],
                vec![IndexChange::CreateIndex(Index::on("users_email_idx", &["id"]))],
            ))
            .unwrap_err();
        assert!(matches!(err, ReplayError::IndexAlreadyExists { .. }));

        let err = schema
            .apply(&alter(
                "users",
                vec![],
                vec![IndexChange::DropIndex {
                    name: "ghost_idx".to_string(),
                }],
            ))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "~ table users: index 'ghost_idx' does not exist on 'users'"
        );
    }

    #[test]
    fn test_foreign_key_changes() {
        let schema = Schema::new([users(), posts().with_foreign_keys(Vec::new())]);
        let fk = ForeignKey::new("posts_author_id_fkey", ["author_id"], "users")
            .on_delete(ReferentialAction::Cascade);

        let schema = schema
            .replay(&[
                Change::CreateForeignKey {
                    table: "posts".to_string(),
                    foreign_key: fk.clone(),
                },
                Change::RenameForeignKey {
                    table: "posts".to_string(),
                    old_name: "posts_author_id_fkey".to_string(),
                    new_name: "posts_author_fk".to_string(),
                },
            ])
            .unwrap();
        let posts = schema.table("posts").unwrap();
        assert_eq!(posts.foreign_keys(), &[fk.with_name("posts_author_fk")]);

        let err = schema
            .apply(&Change::CreateForeignKey {
                table: "posts".to_string(),
                foreign_key: fk.with_name("posts_author_fk"),
            })
            .unwrap_err();
        assert!(matches!(err, ReplayError::ForeignKeyAlreadyExists { .. }));

        let dropped = schema
            .apply(&Change::DropForeignKey {
                table: "posts".to_string(),
                name: "posts_author_fk".to_string(),
            })
            .unwrap();
        assert!(dropped.table("posts").unwrap().foreign_keys().is_empty());

        let err = dropped
            .apply(&Change::DropForeignKey {
                table: "posts".to_string(),
                name: "posts_author_fk".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ReplayError::ForeignKeyNotFound { .. }));
    }

    #[test]
    fn test_foreign_key_target_must_exist() {
        let schema = Schema::new([posts().with_foreign_keys(Vec::new())]);
        let err = schema
            .apply(&Change::CreateForeignKey {
                table: "posts".to_string(),
                foreign_key: ForeignKey::new("posts_author_id_fkey", ["author_id"], "users"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ReplayError::ForeignKeyTargetNotFound { target_table, .. } if target_table == "users"
        ));
    }

    #[test]
    fn test_replay_stops_at_first_error() {
        let schema = Schema::default();
        let err = schema
            .replay(&[
                Change::CreateTable(users()),
                Change::CreateTable(users()),
                Change::CreateTable(Table::new("never")),
            ])
            .unwrap_err();
        assert!(matches!(err, ReplayError::TableAlreadyExists { .. }));
        assert!(schema.tables().is_empty());
    }

    #[test]
    fn test_replaying_a_diff_reaches_desired() {
        let desired = vec![
            Table::new("users")
                .with_fields([
                    Field::new("id", "bigint").primary_key(),
                    Field::new("email", "text").not_null().default_value(""),
                    Field::new("bio", "text"),
                ])
                .with_indices([Index::on("users_email_idx", &["email"]).unique()]),
            Table::new("tags").with_fields([Field::new("name", "text").primary_key()]),
        ];
        let actual = Schema::new([
            Table::new("users")
                .with_fields([
                    Field::new("id", "integer").primary_key(),
                    Field::new("email", "text"),
                    Field::new("legacy", "integer"),
                ])
                .with_indices([Index::on("users_email_idx", &["email"])]),
            Table::new("sessions"),
        ]);

        let changes = between(&desired, actual.tables()).unwrap();
        let replayed = actual.replay(&changes).unwrap();

        let replayed_names: Vec<&str> = replayed.tables().iter().map(Table::name).collect();
        assert_eq!(replayed_names, vec!["users", "tags"]);
        for table in &desired {
            assert_eq!(replayed.table(table.name()), Some(table));
        }
    }
}
