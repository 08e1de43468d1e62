use std::fmt;

/// A normalized column type identifier.
///
/// Normalization lowercases the type, collapses whitespace, strips spaces
/// inside modifiers, and folds the common Postgres aliases onto their
/// canonical spelling, so `INT4`, `int` and `integer` all compare equal.
/// Nothing else is interpreted: `varchar(255)` and `varchar(100)` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType(String);

impl FieldType {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize_type(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldType {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();

    // "numeric (10, 2)[]" -> rest "numeric", modifier "(10,2)", array "[]".
    let (rest, array) = split_array_suffix(&lower);
    let (rest, modifier) = split_modifier(rest);
    let base = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    let base = fold_alias(&base);

    // The precision of time types sits before the time zone clause.
    let typed = match base.strip_suffix(" with time zone") {
        Some(head) if !modifier.is_empty() => format!("{}{} with time zone", head, modifier),
        _ => format!("{}{}", base, modifier),
    };

    format!("{}{}", typed, array)
}

/// Split trailing `[]` / `[n]` groups off, with whitespace removed.
fn split_array_suffix(ty: &str) -> (&str, String) {
    let mut rest = ty.trim_end();
    let mut groups = Vec::new();
    while rest.ends_with(']') {
        let Some(open) = rest.rfind('[') else {
            break;
        };
        groups.push(&rest[open..]);
        rest = rest[..open].trim_end();
    }

    let array = groups
        .iter()
        .rev()
        .flat_map(|group| group.chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    (rest, array)
}

/// Pull the first parenthesized modifier out of the type name.
///
/// Returns the name with the modifier replaced by a space, and the modifier
/// with whitespace removed. Without a closed `(...)` group the name is
/// returned unchanged.
fn split_modifier(ty: &str) -> (String, String) {
    let Some(open) = ty.find('(') else {
        return (ty.to_string(), String::new());
    };
    let Some(close) = ty[open..].find(')').map(|offset| open + offset) else {
        return (ty.to_string(), String::new());
    };

    let modifier = ty[open..=close]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let rest = format!("{} {}", &ty[..open], &ty[close + 1..]);
    (rest, modifier)
}

fn fold_alias(base: &str) -> String {
    let folded = match base {
        "int" | "int4" => "integer",
        "int2" => "smallint",
        "int8" => "bigint",
        "serial4" => "serial",
        "serial8" => "bigserial",
        "bool" => "boolean",
        "float4" => "real",
        "float8" => "double precision",
        "decimal" => "numeric",
        "varchar" => "character varying",
        "char" => "character",
        "timestamptz" => "timestamp with time zone",
        "timestamp without time zone" => "timestamp",
        "timetz" => "time with time zone",
        "time without time zone" => "time",
        other => other,
    };
    folded.to_string()
}

/// A literal default value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    /// Decimal value kept as written (`"0.5"`), so comparison stays exact.
    Numeric(String),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Numeric(n) => write!(f, "{}", n),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// A column default.
///
/// Defaults compare structurally: `Literal(Integer(0))` and
/// `Literal(Text("0"))` are different defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DefaultValue {
    /// A constant value.
    Literal(Literal),
    /// A database expression such as `now()` or `gen_random_uuid()`.
    Expression(String),
}

impl DefaultValue {
    pub fn is_expression(&self) -> bool {
        matches!(self, DefaultValue::Expression(_))
    }

    pub fn expression(expr: impl Into<String>) -> Self {
        DefaultValue::Expression(expr.into())
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Literal(Literal::Boolean(value))
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Literal(Literal::Integer(value))
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Literal(Literal::Integer(value.into()))
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::Literal(Literal::Text(value.to_string()))
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::Literal(Literal::Text(value))
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(lit) => write!(f, "{}", lit),
            DefaultValue::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Normalized column type
    pub field_type: FieldType,
    /// Whether this column is (part of) the primary key
    pub primary_key: bool,
    /// Whether the column allows NULL
    pub null: bool,
    /// Default value (if any)
    pub default: Option<DefaultValue>,
    /// Whether the column is backed by a sequence (serial, identity)
    pub has_sequence: bool,
}

impl Field {
    /// A nullable column with no default.
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            primary_key: false,
            null: true,
            default: None,
            has_sequence: false,
        }
    }

    /// Mark as primary key. Primary key columns are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.null = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.null = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn default_value(mut self, default: impl Into<DefaultValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn default_expression(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    pub fn with_sequence(mut self) -> Self {
        self.has_sequence = true;
        self
    }

    pub fn default_is_expression(&self) -> bool {
        self.default.as_ref().is_some_and(DefaultValue::is_expression)
    }

    /// Copy of this field under a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.field_type)?;
        if self.primary_key {
            write!(f, " primary key")?;
        } else if !self.null {
            write!(f, " not null")?;
        }
        if let Some(default) = &self.default {
            write!(f, " default {}", default)?;
        }
        if self.has_sequence {
            write!(f, " (sequence)")?;
        }
        Ok(())
    }
}
