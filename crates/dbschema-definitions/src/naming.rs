//! Deterministic names for indices and constraints declared without one.

const PG_IDENT_MAX: usize = 63;

/// Generate a standard index name for a table and columns.
///
/// Uses the convention `idx_{table}_{columns}` where columns are joined by underscore.
///
/// ```
/// assert_eq!(dbschema_definitions::index_name("user", &["email"]), "idx_user_email");
/// ```
pub fn index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("idx_{}_{}", table, cols.join("_"))
}

/// Generate a standard unique index name for a table and columns.
///
/// ```
/// assert_eq!(dbschema_definitions::unique_index_name("user", &["email"]), "uq_user_email");
/// ```
pub fn unique_index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("uq_{}_{}", table, cols.join("_"))
}

/// Generate a foreign key constraint name, Postgres style: `{table}_{columns}_fkey`.
pub fn foreign_key_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("{}_{}_fkey", table, cols.join("_"))
}

/// Generate a deterministic CHECK constraint name for a table and expression.
///
/// Constraint names must be unique within a schema, so we include the table name
/// and a stable hash of the expression (after whitespace normalization).
pub fn check_constraint_name(table: &str, expr: &str) -> String {
    let normalized = normalize_sql_expr_for_hash(expr);
    let hex = blake3::hash(normalized.as_bytes()).to_hex().to_string();
    let suffix = &hex[..16];

    let prefix_overhead = "ck__".len();
    let max_table_len = PG_IDENT_MAX.saturating_sub(prefix_overhead + suffix.len());

    format!("ck_{}_{}", truncate_ident(table, max_table_len), suffix)
}

fn truncate_ident(name: &str, max_len: usize) -> &str {
    if name.len() <= max_len {
        return name;
    }
    let mut len = max_len;
    while len > 0 && !name.is_char_boundary(len) {
        len -= 1;
    }
    &name[..len]
}

/// Collapse runs of whitespace outside quoted strings and identifiers.
fn normalize_sql_expr_for_hash(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut pending_space = false;
    let mut quote: Option<char> = None;

    let mut chars = expr.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                // SQL escapes quotes by doubling them
                match chars.next_if_eq(&q) {
                    Some(escaped) => out.push(escaped),
                    None => quote = None,
                }
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);

        if ch == '\'' || ch == '"' {
            quote = Some(ch);
        }
    }

    out
}
