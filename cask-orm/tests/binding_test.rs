mod common;

use cask_orm::{
    Drivers, Error, NormalizedType, ParameterMapping, Params, SqlMap, SqlMapper, SqlText,
    UpdateStatement, Value,
};
use common::ScriptedConnection;

#[test]
fn test_placeholders_render_per_driver() {
    let sql = SqlText::parse("SELECT * FROM t WHERE a = #a# AND b = #b# OR a = #a#").unwrap();
    let params = Params::new().with("a", 1i64).with("b", "x");

    let pg = sql.bind(Drivers::Postgres, &params, &[], "t.select").unwrap();
    assert_eq!(pg.sql, "SELECT * FROM t WHERE a = $1 AND b = $2 OR a = $3");
    assert_eq!(
        pg.values,
        vec![Value::Int(1), Value::Text("x".to_string()), Value::Int(1)]
    );

    let oracle = sql.bind(Drivers::Oracle, &params, &[], "t.select").unwrap();
    assert_eq!(oracle.sql, "SELECT * FROM t WHERE a = :1 AND b = :2 OR a = :3");

    let sqlite = sql.bind(Drivers::SQLite, &params, &[], "t.select").unwrap();
    assert_eq!(sqlite.sql, "SELECT * FROM t WHERE a = ? AND b = ? OR a = ?");
    let mysql = sql.bind(Drivers::MySQL, &params, &[], "t.select").unwrap();
    assert_eq!(mysql.sql, sqlite.sql);
}

#[test]
fn test_doubled_hash_is_a_literal() {
    let sql = SqlText::parse("SELECT '##tag' FROM t WHERE id = #id#").unwrap();
    let bound = sql
        .bind(Drivers::SQLite, &Params::new().with("id", 1i64), &[], "t.q")
        .unwrap();
    assert_eq!(bound.sql, "SELECT '#tag' FROM t WHERE id = ?");
}

#[test]
fn test_malformed_templates_fail_to_parse() {
    assert!(matches!(
        SqlText::parse("SELECT * FROM t WHERE a = #a"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        SqlText::parse("SELECT * FROM t WHERE a = ## AND b = #"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        SqlText::parse("SELECT * FROM t WHERE a = #a b#"),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_type_hints_coerce_values_at_bind_time() {
    let sql = SqlText::parse("UPDATE t SET age = #age#, name = #name#").unwrap();
    let mappings = vec![
        ParameterMapping::typed("age", NormalizedType::Integer),
        ParameterMapping::typed("name", NormalizedType::String),
    ];
    let params = Params::new().with("age", "36").with("name", 1234i64);

    let bound = sql.bind(Drivers::SQLite, &params, &mappings, "t.update").unwrap();
    assert_eq!(
        bound.values,
        vec![Value::Int(36), Value::Text("1234".to_string())]
    );
}

#[test]
fn test_null_passes_through_every_hint() {
    let sql = SqlText::parse("UPDATE t SET age = #age#").unwrap();
    let mappings = vec![ParameterMapping::typed("age", NormalizedType::Integer)];
    let params = Params::new().with("age", Value::Null);

    let bound = sql.bind(Drivers::SQLite, &params, &mappings, "t.update").unwrap();
    assert_eq!(bound.values, vec![Value::Null]);
}

#[test]
fn test_uncoercible_values_are_mapping_errors() {
    let sql = SqlText::parse("UPDATE t SET age = #age#").unwrap();
    let mappings = vec![ParameterMapping::typed("age", NormalizedType::Integer)];
    let params = Params::new().with("age", "not a number");

    let err = sql
        .bind(Drivers::SQLite, &params, &mappings, "t.update")
        .unwrap_err();
    assert!(matches!(err, Error::Mapping(_)));
}

#[tokio::test]
async fn test_missing_parameter_aborts_before_any_sql() {
    let update = UpdateStatement::new(
        "accounts.rename",
        "UPDATE accounts SET first_name = #first_name# WHERE id = #id#",
        vec![],
    )
    .unwrap();
    let mapper = SqlMapper::new(
        SqlMap::builder(Drivers::SQLite)
            .statement(update.into())
            .unwrap()
            .build(),
    );

    let conn = ScriptedConnection::new(Drivers::SQLite);
    let params = Params::new().with("first_name", "Ada");

    let err = mapper
        .update(&conn, "accounts.rename", &params)
        .await
        .unwrap_err();

    match err {
        Error::Binding {
            statement,
            property,
        } => {
            assert_eq!(statement, "accounts.rename");
            assert_eq!(property, "id");
        }
        other => panic!("expected a binding error, got {other:?}"),
    }
    assert!(conn.calls().is_empty());
}
