use std::fmt;

/// Sort order for index columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending order (default)
    #[default]
    Asc,
    /// Descending order
    Desc,
}

impl SortOrder {
    /// Returns the SQL keyword for this sort order, or empty string for ASC (default).
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "",
            SortOrder::Desc => " DESC",
        }
    }
}

/// Nulls ordering for index columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullsOrder {
    /// Use database default (NULLS LAST for ASC, NULLS FIRST for DESC)
    #[default]
    Default,
    /// Sort nulls before non-null values
    First,
    /// Sort nulls after non-null values
    Last,
}

impl NullsOrder {
    /// Returns the SQL clause for this nulls ordering, or empty string for default.
    pub fn to_sql(&self) -> &'static str {
        match self {
            NullsOrder::Default => "",
            NullsOrder::First => " NULLS FIRST",
            NullsOrder::Last => " NULLS LAST",
        }
    }
}

/// What an index column points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexTarget {
    /// A plain reference to a field of the table.
    Field(String),
    /// An arbitrary SQL expression, e.g. `lower(email)`.
    Expression(String),
}

/// A column in an index with optional sort order and nulls ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexColumn {
    /// Field or expression being indexed
    pub target: IndexTarget,
    /// Sort order (ASC or DESC)
    pub order: SortOrder,
    /// Nulls ordering (NULLS FIRST, NULLS LAST, or default)
    pub nulls: NullsOrder,
}

impl IndexColumn {
    /// Create a new index column with default (ASC) ordering and default nulls.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            target: IndexTarget::Field(name.into()),
            order: SortOrder::Asc,
            nulls: NullsOrder::Default,
        }
    }

    /// Create a new index column with DESC ordering and default nulls.
    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            order: SortOrder::Desc,
            ..Self::new(name)
        }
    }

    /// Create a new index column with NULLS FIRST ordering.
    pub fn nulls_first(name: impl Into<String>) -> Self {
        Self {
            nulls: NullsOrder::First,
            ..Self::new(name)
        }
    }

    /// Create an expression column with default ordering.
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            target: IndexTarget::Expression(expr.into()),
            order: SortOrder::Asc,
            nulls: NullsOrder::Default,
        }
    }

    /// The field name, unless this column is an expression.
    pub fn field_name(&self) -> Option<&str> {
        match &self.target {
            IndexTarget::Field(name) => Some(name),
            IndexTarget::Expression(_) => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.target, IndexTarget::Expression(_))
    }

    /// Parse a column specification like "col_name", "col_name DESC", or "col_name DESC NULLS FIRST".
    ///
    /// Anything wrapped in parentheses, like `(lower(email)) DESC`, is an expression.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let upper = spec.to_uppercase();

        // Parse nulls ordering first (it comes at the end)
        let (spec_without_nulls, nulls) = if upper.ends_with(" NULLS FIRST") {
            (&spec[..spec.len() - 12], NullsOrder::First)
        } else if upper.ends_with(" NULLS LAST") {
            (&spec[..spec.len() - 11], NullsOrder::Last)
        } else {
            (spec, NullsOrder::Default)
        };

        let trimmed = spec_without_nulls.trim();
        let upper_trimmed = trimmed.to_uppercase();

        // Parse sort order
        let (target, order) = if upper_trimmed.ends_with(" DESC") {
            (trimmed[..trimmed.len() - 5].trim(), SortOrder::Desc)
        } else if upper_trimmed.ends_with(" ASC") {
            (trimmed[..trimmed.len() - 4].trim(), SortOrder::Asc)
        } else {
            (trimmed, SortOrder::Asc)
        };

        let target = if target.len() >= 2 && target.starts_with('(') && target.ends_with(')') {
            IndexTarget::Expression(target[1..target.len() - 1].trim().to_string())
        } else {
            IndexTarget::Field(unquote_ident(target))
        };

        Self {
            target,
            order,
            nulls,
        }
    }
}

fn unquote_ident(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let inner = &s[1..s.len() - 1];
        return inner.replace("\"\"", "\"");
    }
    s.to_string()
}

impl fmt::Display for IndexColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            IndexTarget::Field(name) => write!(f, "{}", name)?,
            IndexTarget::Expression(expr) => write!(f, "({})", expr)?,
        }
        write!(f, "{}{}", self.order.to_sql(), self.nulls.to_sql())
    }
}

/// A database index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Index name
    pub name: String,
    /// Column(s) in the index with sort order
    pub columns: Vec<IndexColumn>,
    /// Whether this is a unique index
    pub unique: bool,
    /// Optional WHERE clause for partial indexes
    pub condition: Option<String>,
}

impl Index {
    /// A non-unique index over the given columns.
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = IndexColumn>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().collect(),
            unique: false,
            condition: None,
        }
    }

    /// A non-unique index over plain field names.
    pub fn on(name: impl Into<String>, fields: &[&str]) -> Self {
        Self::new(name, fields.iter().map(|f| IndexColumn::new(*f)))
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Whether any column is an expression.
    pub fn has_expressions(&self) -> bool {
        self.columns.iter().any(IndexColumn::is_expression)
    }

    /// Whether this index covers exactly `field_names`, in order, with no
    /// expression columns.
    pub fn covers(&self, field_names: &[&str]) -> bool {
        self.columns.len() == field_names.len()
            && self
                .columns
                .iter()
                .zip(field_names)
                .all(|(col, name)| col.field_name() == Some(*name))
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unique = if self.unique { "UNIQUE " } else { "" };
        let cols: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        write!(f, "{}INDEX {} ({})", unique, self.name, cols.join(", "))?;
        if let Some(condition) = &self.condition {
            write!(f, " WHERE {}", condition)?;
        }
        Ok(())
    }
}
