mod common;

use cask_orm::{
    DeleteStatement, Drivers, Error, InsertStatement, NormalizedType, Params, SelectStatement,
    SqlMap, SqlMapConfig, SqlMapper, Row, UpdateStatement, Value,
};
use common::ScriptedConnection;

#[test]
fn test_duplicate_statement_ids_are_rejected_at_build_time() {
    let first = SelectStatement::new("accounts.count", "SELECT COUNT(*) FROM accounts", vec![])
        .unwrap();
    let second =
        SelectStatement::new("accounts.count", "SELECT COUNT(id) FROM accounts", vec![]).unwrap();

    let err = SqlMap::builder(Drivers::SQLite)
        .statement(first.into())
        .unwrap()
        .statement(second.into())
        .unwrap_err();

    match err {
        Error::Configuration(message) => assert!(message.contains("duplicate")),
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn test_empty_statement_ids_are_rejected() {
    let err = InsertStatement::new("  ", "INSERT INTO t (a) VALUES (#a#)", vec![]).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_parameter_mappings_must_cover_template_placeholders() {
    use cask_orm::ParameterMapping;

    let err = UpdateStatement::new(
        "accounts.touch",
        "UPDATE accounts SET email = #email#",
        vec![ParameterMapping::new("missing")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = DeleteStatement::new(
        "accounts.delete",
        "DELETE FROM accounts WHERE id = #id#",
        vec![ParameterMapping::new("id"), ParameterMapping::new("id")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_unknown_statement_id_fails_without_issuing_sql() {
    let mapper = SqlMapper::new(SqlMap::builder(Drivers::SQLite).build());
    let conn = ScriptedConnection::new(Drivers::SQLite);

    let err = mapper
        .query_for_object::<i64, _>(&conn, "nowhere.select", &Params::new())
        .await
        .unwrap_err();

    match err {
        Error::StatementNotFound(id) => assert_eq!(id, "nowhere.select"),
        other => panic!("expected statement-not-found, got {other:?}"),
    }
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn test_statement_kind_mismatch_is_a_configuration_error() {
    let select =
        SelectStatement::new("accounts.all", "SELECT id FROM accounts", vec![]).unwrap();
    let mapper = SqlMapper::new(
        SqlMap::builder(Drivers::SQLite)
            .statement(select.into())
            .unwrap()
            .build(),
    );
    let conn = ScriptedConnection::new(Drivers::SQLite);

    let err = mapper
        .update(&conn, "accounts.all", &Params::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn test_config_document_builds_a_working_map() {
    let document = r#"{
        "statements": [
            {
                "kind": "select",
                "id": "accounts.emails",
                "sql": "SELECT account_email, account_age FROM accounts WHERE account_age > #min_age#",
                "parameters": [{ "name": "min_age", "type": "integer" }],
                "resultMap": [
                    { "column": "account_email", "property": "email" },
                    { "column": "account_age", "property": "age", "type": "integer" }
                ]
            },
            {
                "kind": "insert",
                "id": "accounts.insert",
                "sql": "INSERT INTO accounts (id, account_email) VALUES (#id#, #account_email#)",
                "selectKey": {
                    "sql": "SELECT nextval('accounts_seq')",
                    "property": "id",
                    "mode": "pre"
                }
            }
        ]
    }"#;

    let map = SqlMapConfig::from_json(document)
        .unwrap()
        .into_map(Drivers::Postgres)
        .unwrap();
    assert_eq!(map.len(), 2);
    let mapper = SqlMapper::new(map);

    let conn = ScriptedConnection::new(Drivers::Postgres);
    conn.push_rows(vec![
        Row::new()
            .with("account_email", "ada@example.org")
            .with("account_age", "36"),
    ]);

    // The type hint in the parameter list coerces numeric text before it is
    // bound; the result map renames and coerces on the way back out.
    let params = Params::new().with("min_age", "30");
    let found: Vec<(String, i64)> = mapper
        .query_for_list(&conn, "accounts.emails", &params)
        .await
        .unwrap();

    assert_eq!(found, vec![("ada@example.org".to_string(), 36)]);
    match &conn.calls()[0] {
        common::Call::Query(sql, values) => {
            assert_eq!(
                sql,
                "SELECT account_email, account_age FROM accounts WHERE account_age > $1"
            );
            assert_eq!(values, &vec![Value::Int(30)]);
        }
        other => panic!("expected a query, got {other:?}"),
    }
}

#[test]
fn test_config_document_with_duplicate_ids_fails_to_build() {
    let document = r#"{
        "statements": [
            { "kind": "delete", "id": "t.delete", "sql": "DELETE FROM t WHERE id = #id#" },
            { "kind": "delete", "id": "t.delete", "sql": "DELETE FROM t WHERE id = #id#" }
        ]
    }"#;

    let err = SqlMapConfig::from_json(document)
        .unwrap()
        .into_map(Drivers::SQLite)
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_result_map_failure_discards_the_whole_result() {
    let select = SelectStatement::new("accounts.ages", "SELECT age FROM accounts", vec![])
        .unwrap()
        .with_result_map(cask_orm::ResultMap::new(vec![
            cask_orm::ResultMapping::new("age").typed(NormalizedType::Integer),
        ]));
    let mapper = SqlMapper::new(
        SqlMap::builder(Drivers::SQLite)
            .statement(select.into())
            .unwrap()
            .build(),
    );

    let conn = ScriptedConnection::new(Drivers::SQLite);
    conn.push_rows(vec![
        Row::new().with("age", 30i64),
        Row::new().with("age", "not a number"),
    ]);

    let err = mapper
        .query_for_list::<i64, _>(&conn, "accounts.ages", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Mapping(_)));
}
