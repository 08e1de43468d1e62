//! dbschema - compute the changes between two relational schema snapshots.
//!
//! A *desired* schema (what the application declares) and an *actual* schema
//! (what an introspector read from a live database) are both plain lists of
//! [`Table`]s. [`between`] compares them and returns the ordered [`Change`]s
//! that turn the actual schema into the desired one.
//!
//! ```
//! use dbschema::{between, describe, Field, Table};
//!
//! let desired = vec![Table::new("users").with_fields([
//!     Field::new("id", "integer").primary_key(),
//!     Field::new("email", "text").not_null(),
//! ])];
//! let actual = vec![Table::new("users").with_fields([
//!     Field::new("id", "integer").primary_key(),
//! ])];
//!
//! let changes = between(&desired, &actual).unwrap();
//! assert_eq!(describe(&changes), "~ table users\n    + email: text not null\n");
//! ```
//!
//! Changes can also be written by hand with [`Migration`], and any change list
//! can be replayed against an in-memory [`Schema`] with [`Replay`] to see the
//! schema it produces.

mod changes;
mod diff;
mod error;
mod migration;
mod replay;

pub use dbschema_definitions::*;

pub use changes::{AlterTable, Change, ColumnChange, IndexChange, describe};
pub use diff::{DiffOptions, IndexPolicy, SchemaDiff, between, between_with};
pub use error::{Error, ReplayError, Side};
pub use migration::{AlterTableBuilder, Migration, MigrationBuilder, TableBuilder};
pub use replay::Replay;

pub type Result<T> = std::result::Result<T, Error>;
