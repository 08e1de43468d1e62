use crate::SnapshotError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("invalid {side} schema: {source}")]
    InvalidSnapshot {
        side: Side,
        #[source]
        source: SnapshotError,
    },
}

/// Which snapshot of a diff an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Desired,
    Actual,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Desired => write!(f, "desired"),
            Side::Actual => write!(f, "actual"),
        }
    }
}

/// A change cannot be applied to an in-memory schema.
///
/// Each variant carries the rendered change that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("{change}: table '{table}' does not exist")]
    TableNotFound { change: String, table: String },

    #[error("{change}: table '{table}' already exists")]
    TableAlreadyExists { change: String, table: String },

    #[error("{change}: column '{table}.{column}' does not exist")]
    ColumnNotFound {
        change: String,
        table: String,
        column: String,
    },

    #[error("{change}: column '{table}.{column}' already exists")]
    ColumnAlreadyExists {
        change: String,
        table: String,
        column: String,
    },

    #[error("{change}: index '{index}' does not exist on '{table}'")]
    IndexNotFound {
        change: String,
        table: String,
        index: String,
    },

    #[error("{change}: index '{index}' already exists on '{table}'")]
    IndexAlreadyExists {
        change: String,
        table: String,
        index: String,
    },

    #[error("{change}: foreign key '{foreign_key}' does not exist on '{table}'")]
    ForeignKeyNotFound {
        change: String,
        table: String,
        foreign_key: String,
    },

    #[error("{change}: foreign key '{foreign_key}' already exists on '{table}'")]
    ForeignKeyAlreadyExists {
        change: String,
        table: String,
        foreign_key: String,
    },

    #[error("{change}: referenced table '{target_table}' does not exist")]
    ForeignKeyTargetNotFound {
        change: String,
        target_table: String,
    },
}
