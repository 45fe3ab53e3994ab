//! INSERT, UPDATE and DELETE rendering plus expression forms.

mod common;
use common::*;

use sqlbridge_core::ast::{
    BinaryOp, DeleteStatement, Expr, InsertSource, InsertStatement, JoinClause, JoinType,
    OrderBy, SelectStatement, TableRef, UpdateStatement,
};
use sqlbridge_core::dialect::{Db2Dialect, GenericDialect, PostgresDialect, SqliteDialect};
use sqlbridge_core::{CompileError, SqlValue};

// ===================================================================
// INSERT
// ===================================================================

fn insert_user() -> InsertStatement {
    InsertStatement::into_table("users", &["name"]).row(vec![Expr::bind("ada")])
}

#[test]
fn insert_returning_styles() {
    let insert = insert_user().returning(&["id"]);
    assert_eq!(
        sql(&PostgresDialect::new(), insert.clone()),
        "INSERT INTO \"users\" (\"name\") VALUES (?) RETURNING \"id\""
    );
    assert_eq!(
        sql(&Db2Dialect::new(), insert.clone()),
        "SELECT \"id\" FROM FINAL TABLE (INSERT INTO \"users\" (\"name\") VALUES (?))"
    );
    assert_eq!(
        sql(&GenericDialect::new(), insert),
        "INSERT INTO \"users\" (\"name\") VALUES (?)"
    );
}

#[test]
fn insert_multiple_rows_keeps_bind_order() {
    let insert = InsertStatement::into_table("users", &["id", "name"])
        .row(vec![Expr::bind(1i64), Expr::bind("a")])
        .row(vec![Expr::bind(2i64), Expr::bind("b")]);
    let compiled = compile(&SqliteDialect::new(), insert);
    assert_eq!(
        compiled.sql,
        "INSERT INTO \"users\" (\"id\", \"name\") VALUES (?, ?), (?, ?)"
    );
    assert_eq!(
        compiled.binds,
        vec![
            SqlValue::Int(1),
            SqlValue::Text(String::from("a")),
            SqlValue::Int(2),
            SqlValue::Text(String::from("b")),
        ]
    );
}

#[test]
fn insert_default_values() {
    let mut insert = InsertStatement::into_table("events", &[]);
    insert.values = InsertSource::DefaultValues;
    assert_eq!(
        sql(&PostgresDialect::new(), insert),
        "INSERT INTO \"events\" DEFAULT VALUES"
    );
}

#[test]
fn insert_from_select() {
    let mut insert = InsertStatement::into_table("users", &["name"]);
    insert.values = InsertSource::Query(Box::new(
        SelectStatement::from_table(TableRef::with_schema("archive", "users")).column(Expr::column("name")),
    ));
    assert_eq!(
        sql(&PostgresDialect::new(), insert),
        "INSERT INTO \"users\" (\"name\") SELECT \"name\" FROM \"archive\".\"users\""
    );
}

#[test]
fn insert_row_width_mismatch() {
    let insert = InsertStatement::into_table("users", &["id", "name"]).row(vec![Expr::bind(1i64)]);
    assert!(matches!(
        compile_err(&PostgresDialect::new(), insert),
        CompileError::InvalidTree(_)
    ));
}

// ===================================================================
// UPDATE / DELETE
// ===================================================================

#[test]
fn limited_update_uses_keyed_subselect() {
    let update = UpdateStatement::table("users")
        .set("name", Expr::bind("x"))
        .filter(Expr::column("active").eq(Expr::value(true)))
        .limit(Expr::integer(5))
        .key(Expr::column("id"));
    let compiled = compile(&PostgresDialect::new(), update);
    assert_eq!(
        compiled.sql,
        "UPDATE \"users\" SET \"name\" = ? WHERE \"id\" IN \
         (SELECT \"id\" FROM \"users\" WHERE \"active\" = TRUE LIMIT 5)"
    );
    assert_eq!(compiled.binds, vec![SqlValue::Text(String::from("x"))]);
}

#[test]
fn limited_update_without_key_fails() {
    let update = UpdateStatement::table("users")
        .set("name", Expr::bind("x"))
        .limit(Expr::integer(5));
    assert_eq!(
        compile_err(&PostgresDialect::new(), update),
        CompileError::UnkeyedRowLimit { statement: "UPDATE" }
    );
}

#[test]
fn ordered_delete_without_limit_drops_order() {
    let delete = DeleteStatement::from_table("users")
        .filter(Expr::column("id").eq(Expr::bind(9i64)))
        .order(OrderBy::desc(Expr::column("id")));
    assert_eq!(
        sql(&PostgresDialect::new(), delete),
        "DELETE FROM \"users\" WHERE \"id\" = ?"
    );
}

#[test]
fn limited_delete_is_stable() {
    let delete = DeleteStatement::from_table("users")
        .limit(Expr::integer(2))
        .key(Expr::column("id"));
    assert_eq!(
        sql(&SqliteDialect::new(), delete.clone()),
        "DELETE FROM \"users\" WHERE \"id\" IN (SELECT \"id\" FROM \"users\" LIMIT 2)"
    );
    assert_stable(&SqliteDialect::new(), delete);
}

#[test]
fn update_without_assignments_fails() {
    assert!(matches!(
        compile_err(&GenericDialect::new(), UpdateStatement::table("users")),
        CompileError::InvalidTree(_)
    ));
}

// ===================================================================
// Expressions
// ===================================================================

fn where_sql(dialect: &dyn sqlbridge_core::Dialect, predicate: Expr) -> String {
    sql(
        dialect,
        SelectStatement::from_table(TableRef::table("users"))
            .column(Expr::column("id"))
            .filter(predicate),
    )
}

#[test]
fn empty_in_list_matches_nothing() {
    assert_eq!(
        where_sql(&PostgresDialect::new(), Expr::column("id").in_list(vec![])),
        "SELECT \"id\" FROM \"users\" WHERE 1=0"
    );
    assert_eq!(
        where_sql(&PostgresDialect::new(), Expr::column("id").not_in_list(vec![])),
        "SELECT \"id\" FROM \"users\" WHERE 1=1"
    );
}

#[test]
fn or_predicates_are_grouped() {
    let select = SelectStatement::from_table(TableRef::table("users"))
        .column(Expr::column("id"))
        .filter(
            Expr::column("id")
                .eq(Expr::integer(1))
                .or(Expr::column("id").eq(Expr::integer(2))),
        )
        .filter(Expr::column("name").is_null());
    assert_eq!(
        sql(&GenericDialect::new(), select),
        "SELECT \"id\" FROM \"users\" WHERE (\"id\" = 1 OR \"id\" = 2) AND \"name\" IS NULL"
    );
}

#[test]
fn arithmetic_precedence() {
    let expr = Expr::column("a")
        .binary(BinaryOp::Add, Expr::column("b"))
        .binary(BinaryOp::Mul, Expr::column("c"));
    let select = SelectStatement::from_table(TableRef::table("t")).column(expr);
    assert_eq!(
        sql(&GenericDialect::new(), select),
        "SELECT (\"a\" + \"b\") * \"c\" FROM \"t\""
    );
}

#[test]
fn case_sensitive_comparison_uses_collation() {
    assert_eq!(
        where_sql(
            &SqliteDialect::new(),
            Expr::column("name").bin().eq(Expr::bind("Bob"))
        ),
        "SELECT \"id\" FROM \"users\" WHERE \"name\" COLLATE BINARY = ?"
    );
    assert_eq!(
        where_sql(&PostgresDialect::new(), Expr::column("name").bin().eq(Expr::bind("Bob"))),
        "SELECT \"id\" FROM \"users\" WHERE \"name\" = ?"
    );
}

#[test]
fn raw_fragment_binds_follow_text_order() {
    let compiled = compile(
        &PostgresDialect::new(),
        SelectStatement::from_table(TableRef::table("users"))
            .column(Expr::column("id"))
            .filter(Expr::column("name").eq(Expr::bind("a")))
            .filter(Expr::sql_with_binds(
                "\"id\" BETWEEN ? AND ?",
                vec![SqlValue::Int(1), SqlValue::Int(9)],
            )),
    );
    assert_eq!(
        compiled.sql,
        "SELECT \"id\" FROM \"users\" WHERE \"name\" = ? AND \"id\" BETWEEN ? AND ?"
    );
    assert_eq!(
        compiled.binds,
        vec![
            SqlValue::Text(String::from("a")),
            SqlValue::Int(1),
            SqlValue::Int(9),
        ]
    );
}

#[test]
fn distinct_order_stays_out_of_projections() {
    let select = SelectStatement::from_table(TableRef::table("users"))
        .distinct()
        .column(Expr::column("id"))
        .order(OrderBy::desc(Expr::column("name")));
    assert_eq!(
        sql(&GenericDialect::new(), select),
        "SELECT DISTINCT \"id\" FROM \"users\" ORDER BY \"name\" DESC"
    );
}

#[test]
fn joins_and_exists() {
    let check = SelectStatement::from_table(TableRef::table("memberships"))
        .column(Expr::integer(1))
        .filter(Expr::qualified_column("memberships", "member_id").eq(Expr::qualified_column("u", "id")));
    let select = SelectStatement::from_table(TableRef::table("users").alias("u"))
        .column(Expr::Wildcard {
            table: Some(String::from("u")),
        })
        .join(JoinClause::new(
            JoinType::Left,
            TableRef::table("events").alias("e"),
            Expr::qualified_column("e", "payload").eq(Expr::qualified_column("u", "name")),
        ))
        .filter(Expr::exists(check));
    assert_eq!(
        sql(&PostgresDialect::new(), select),
        "SELECT \"u\".* FROM \"users\" \"u\" \
         LEFT OUTER JOIN \"events\" \"e\" ON \"e\".\"payload\" = \"u\".\"name\" \
         WHERE EXISTS (SELECT 1 FROM \"memberships\" \
         WHERE \"memberships\".\"member_id\" = \"u\".\"id\")"
    );
}

#[test]
fn concat_uses_dialect_operator() {
    let select = SelectStatement::from_table(TableRef::table("users"))
        .column(Expr::column("name").concat(Expr::value("!")));
    assert_eq!(
        sql(&PostgresDialect::new(), select),
        "SELECT \"name\" || '!' FROM \"users\""
    );
}
