use super::*;

fn users() -> Table {
    Table::new("users")
        .with_fields([
            Field::new("id", "integer").primary_key().with_sequence(),
            Field::new("email", "varchar").not_null(),
            Field::new("name", "text"),
        ])
        .with_indices([Index::on("users_email_idx", &["email"]).unique()])
}

#[test]
fn test_field_type_normalization() {
    assert_eq!(FieldType::new("INT4"), FieldType::new("integer"));
    assert_eq!(FieldType::new("int"), FieldType::new("Integer"));
    assert_eq!(FieldType::new("int8").as_str(), "bigint");
    assert_eq!(FieldType::new("  Timestamp   With  Time Zone ").as_str(), "timestamp with time zone");
    assert_eq!(FieldType::new("timestamptz").as_str(), "timestamp with time zone");
    assert_eq!(FieldType::new("VARCHAR (255)").as_str(), "character varying(255)");
    assert_eq!(FieldType::new("numeric(10, 2)").as_str(), "numeric(10,2)");
    assert_eq!(FieldType::new("int4[]").as_str(), "integer[]");
    assert_ne!(FieldType::new("varchar(100)"), FieldType::new("varchar(255)"));
    assert_eq!(FieldType::new("my_enum").as_str(), "my_enum");
}

#[test]
fn test_field_type_modifier_inside_name() {
    assert_eq!(
        FieldType::new("timestamp(3) with time zone").as_str(),
        "timestamp(3) with time zone"
    );
    assert_eq!(FieldType::new("timestamptz(3)").as_str(), "timestamp(3) with time zone");
    assert_eq!(FieldType::new("time(6) without time zone").as_str(), "time(6)");
    assert_eq!(FieldType::new("timetz (6)").as_str(), "time(6) with time zone");
    assert_eq!(
        FieldType::new("TIMESTAMP (3)  WITH TIME ZONE"),
        FieldType::new("timestamptz(3)")
    );
    assert_eq!(
        FieldType::new("timestamp(3) without time zone"),
        FieldType::new("timestamp(3)")
    );
    assert_eq!(FieldType::new("varchar(20) []").as_str(), "character varying(20)[]");
}

#[test]
fn test_default_comparison_is_structural() {
    assert_ne!(DefaultValue::from(0), DefaultValue::from("0"));
    assert_eq!(DefaultValue::from(0), DefaultValue::Literal(Literal::Integer(0)));
    assert!(DefaultValue::expression("now()").is_expression());
    assert!(!DefaultValue::from(true).is_expression());
}

#[test]
fn test_primary_key_is_not_null() {
    let field = Field::new("id", "integer").nullable().primary_key();
    assert!(field.primary_key);
    assert!(!field.null);
}

#[test]
fn test_field_lookup() {
    let table = users();
    assert_eq!(table.field("email").map(|f| f.null), Some(false));
    assert!(table.has_field("name"));
    assert!(!table.has_field("missing"));
    assert!(table.field("missing").is_none());
}

#[test]
fn test_index_lookup() {
    let table = users();
    assert!(table.has_index("users_email_idx"));
    assert!(table.index("nope").is_none());
    assert!(table.has_index_on(&["email"]));
    assert!(table.has_unique_index_on(&["email"]));
    assert!(!table.has_index_on(&["name"]));
    assert!(!table.has_index_on(&["email", "name"]));
}

#[test]
fn test_index_on_requires_exact_order() {
    let table = Table::new("posts").with_indices([Index::on("posts_a_b_idx", &["a", "b"])]);
    assert!(table.has_index_on(&["a", "b"]));
    assert!(!table.has_index_on(&["b", "a"]));
    assert!(!table.has_unique_index_on(&["a", "b"]));
}

#[test]
fn test_expression_index_never_covers_fields() {
    let table = Table::new("users").with_indices([Index::new(
        "users_lower_email_idx",
        [IndexColumn::expression("lower(email)")],
    )
    .unique()]);
    assert!(!table.has_index_on(&["email"]));
    assert!(!table.has_unique_index_on(&["email"]));
    assert!(table.has_expressions());
}

#[test]
fn test_has_expressions() {
    assert!(!users().has_expressions());

    let with_default = users().with_fields([Field::new("created_at", "timestamptz")
        .not_null()
        .default_expression("now()")]);
    assert!(with_default.has_expressions());

    let with_literal = users().with_fields([Field::new("active", "bool").default_value(true)]);
    assert!(!with_literal.has_expressions());

    let with_check = users().with_checks([CheckConstraint::new("positive_id", "id > 0")]);
    assert!(with_check.has_expressions());
}

#[test]
fn test_with_transforms_leave_original_untouched() {
    let original = users();
    let renamed = original.with_name("people");
    let emptied = original.with_fields(Vec::new());
    let unindexed = original.with_indices(Vec::new());
    let keyed = original.with_foreign_keys([ForeignKey::new("fk", ["id"], "accounts")]);

    assert_eq!(original, users());
    assert_eq!(renamed.name(), "people");
    assert_eq!(renamed.fields(), original.fields());
    assert_eq!(renamed.indices(), original.indices());
    assert!(emptied.fields().is_empty());
    assert_eq!(emptied.indices(), original.indices());
    assert!(unindexed.indices().is_empty());
    assert_eq!(unindexed.fields(), original.fields());
    assert_eq!(keyed.foreign_keys().len(), 1);
    assert_eq!(keyed.fields(), original.fields());
}

#[test]
fn test_table_equality() {
    assert_eq!(users(), users());
    assert_ne!(users(), users().with_name("people"));
    assert_ne!(
        users(),
        users().with_checks([CheckConstraint::new("c", "id > 0")])
    );

    // Field order is significant.
    let fields: Vec<Field> = users().fields().iter().rev().cloned().collect();
    assert_ne!(users(), users().with_fields(fields));
}

#[test]
fn test_table_equality_ignores_index_order() {
    let a = Index::on("a_idx", &["a"]);
    let b = Index::on("b_idx", &["b"]).unique();
    let left = Table::new("t").with_indices([a.clone(), b.clone()]);
    let right = Table::new("t").with_indices([b, a]);
    assert_eq!(left, right);
}

#[test]
fn test_primary_key_fields() {
    let table = Table::new("post_tag").with_fields([
        Field::new("post_id", "bigint").primary_key(),
        Field::new("note", "text"),
        Field::new("tag_id", "bigint").primary_key(),
    ]);
    assert_eq!(table.primary_key_fields(), vec!["post_id", "tag_id"]);
}

#[test]
fn test_validate_duplicate_field() {
    let table = Table::new("users").with_fields([
        Field::new("id", "integer"),
        Field::new("id", "bigint"),
    ]);
    assert_eq!(
        table.validate(),
        Err(SnapshotError::DuplicateField {
            table: "users".to_string(),
            field: "id".to_string(),
        })
    );
}

#[test]
fn test_validate_duplicate_index() {
    let table = Table::new("users").with_indices([
        Index::on("idx", &["a"]),
        Index::on("idx", &["b"]),
    ]);
    assert!(matches!(
        table.validate(),
        Err(SnapshotError::DuplicateIndex { index, .. }) if index == "idx"
    ));
}

#[test]
fn test_validate_nullable_primary_key() {
    let mut id = Field::new("id", "integer").primary_key();
    id.null = true;
    let table = Table::new("users").with_fields([id]);
    assert_eq!(
        table.validate(),
        Err(SnapshotError::NullablePrimaryKey {
            table: "users".to_string(),
            field: "id".to_string(),
        })
    );
    assert!(users().validate().is_ok());
}

#[test]
fn test_validate_duplicate_table() {
    let schema = Schema::new([users(), Table::new("posts"), users()]);
    assert_eq!(
        schema.validate(),
        Err(SnapshotError::DuplicateTable {
            table: "users".to_string()
        })
    );
    assert!(Schema::new([users(), Table::new("posts")]).validate().is_ok());
}

#[test]
fn test_schema_copy_on_write() {
    let schema = Schema::new([users()]);
    let with_posts = schema.with_table(Table::new("posts"));
    let replaced = with_posts.with_table(Table::new("users"));
    let without = replaced.without_table("users");

    assert_eq!(schema.tables().len(), 1);
    assert_eq!(with_posts.tables().len(), 2);
    assert_eq!(replaced.tables()[0].name(), "users");
    assert!(replaced.table("users").is_some_and(|t| t.fields().is_empty()));
    assert!(!without.has_table("users"));
    assert!(without.has_table("posts"));
    assert!(schema.table("users").is_some_and(|t| t.fields().len() == 3));
}

#[test]
fn test_parse_fk_reference_dot_format() {
    assert_eq!(parse_fk_reference("users.id"), Some(("users", "id")));
    assert_eq!(
        parse_fk_reference("category.parent_id"),
        Some(("category", "parent_id"))
    );
}

#[test]
fn test_parse_fk_reference_paren_format() {
    assert_eq!(parse_fk_reference("users(id)"), Some(("users", "id")));
}

#[test]
fn test_parse_fk_reference_invalid() {
    assert_eq!(parse_fk_reference(""), None);
    assert_eq!(parse_fk_reference("users"), None);
    assert_eq!(parse_fk_reference(".id"), None);
    assert_eq!(parse_fk_reference("users."), None);
    assert_eq!(parse_fk_reference("(id)"), None);
    assert_eq!(parse_fk_reference("users("), None);
    assert_eq!(parse_fk_reference("users()"), None);
}

#[test]
fn test_index_column_parse() {
    let col = IndexColumn::parse("name");
    assert_eq!(col.field_name(), Some("name"));
    assert_eq!(col.order, SortOrder::Asc);
    assert_eq!(col.nulls, NullsOrder::Default);

    let col = IndexColumn::parse("created_at DESC");
    assert_eq!(col.field_name(), Some("created_at"));
    assert_eq!(col.order, SortOrder::Desc);

    let col = IndexColumn::parse("priority DESC NULLS FIRST");
    assert_eq!(col.field_name(), Some("priority"));
    assert_eq!(col.order, SortOrder::Desc);
    assert_eq!(col.nulls, NullsOrder::First);

    let col = IndexColumn::parse("score ASC NULLS LAST");
    assert_eq!(col.order, SortOrder::Asc);
    assert_eq!(col.nulls, NullsOrder::Last);

    let col = IndexColumn::parse("\"order\"");
    assert_eq!(col.field_name(), Some("order"));
}

#[test]
fn test_index_column_parse_expression() {
    let col = IndexColumn::parse("(lower(email)) DESC");
    assert!(col.is_expression());
    assert_eq!(col.field_name(), None);
    assert_eq!(col.target, IndexTarget::Expression("lower(email)".to_string()));
    assert_eq!(col.order, SortOrder::Desc);
}

#[test]
fn test_display() {
    let table = users();
    let rendered: Vec<String> = table.fields().iter().map(|f| f.to_string()).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    id: integer primary key (sequence)
    email: character varying not null
    name: text
    ");

    let idx = Index::new(
        "users_recent_idx",
        [IndexColumn::desc("created_at"), IndexColumn::nulls_first("deleted_at")],
    )
    .with_condition("deleted_at IS NULL");
    assert_eq!(
        idx.to_string(),
        "INDEX users_recent_idx (created_at DESC, deleted_at NULLS FIRST) WHERE deleted_at IS NULL"
    );

    let fk = ForeignKey::new("posts_author_id_fkey", ["author_id"], "users")
        .references_columns(["id"])
        .on_delete(ReferentialAction::Cascade);
    assert_eq!(
        fk.to_string(),
        "FOREIGN KEY posts_author_id_fkey (author_id) -> users.id ON DELETE CASCADE"
    );
    assert_eq!(
        DefaultValue::from("it's").to_string(),
        "'it''s'"
    );
}
