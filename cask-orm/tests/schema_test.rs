use std::sync::Arc;

use cask_orm::{
    Database, Error, FromRow, NormalizedType, Params, Record, RecordColumn, RecordState, Row,
    Value,
};

#[derive(Debug, Clone)]
struct Widget {
    id: i64,
    label: String,
    weight: f64,
    state: RecordState,
}

impl FromRow for Widget {
    fn from_row(row: &Row) -> Result<Self, Error> {
        let missing = |name: &str| Error::Mapping(format!("row is missing column `{name}`"));
        Ok(Self {
            id: row
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| missing("id"))?,
            label: row
                .get("label")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| missing("label"))?,
            weight: row
                .get("weight")
                .and_then(Value::as_f64)
                .ok_or_else(|| missing("weight"))?,
            state: RecordState::Persisted,
        })
    }
}

impl Record for Widget {
    fn table_name() -> &'static str {
        "widgets"
    }

    fn columns() -> Vec<RecordColumn> {
        vec![
            RecordColumn {
                name: "id",
                db_type: "INTEGER",
                primary_key: true,
                nullable: false,
            },
            RecordColumn {
                name: "label",
                db_type: "TEXT",
                primary_key: false,
                nullable: false,
            },
            RecordColumn {
                name: "weight",
                db_type: "REAL",
                primary_key: false,
                nullable: true,
            },
        ]
    }

    fn state(&self) -> RecordState {
        self.state
    }

    fn set_state(&mut self, state: RecordState) {
        self.state = state;
    }

    fn to_params(&self) -> Params {
        Params::new()
            .with("id", self.id)
            .with("label", self.label.clone())
            .with("weight", self.weight)
    }

    fn apply_generated_key(&mut self, key: Value) -> Result<(), Error> {
        self.id = key
            .as_i64()
            .ok_or_else(|| Error::Mapping(format!("generated key {key:?} is not an integer")))?;
        Ok(())
    }
}

#[tokio::test]
async fn test_introspected_columns_expose_normalized_types() -> Result<(), Box<dyn std::error::Error>>
{
    let db = Database::builder()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    db.create_table::<Widget>().await?;

    let info = db.describe_table("widgets").await?;
    assert_eq!(info.name(), "widgets");
    assert_eq!(info.columns().len(), 3);

    let id = info.column("id").expect("id column");
    assert!(id.primary_key());
    assert_eq!(id.db_type(), "INTEGER");
    assert_eq!(id.normalized_type(), NormalizedType::Integer);

    let label = info.column("label").expect("label column");
    assert!(!label.primary_key());
    assert!(!label.nullable());
    assert_eq!(label.normalized_type(), NormalizedType::String);

    let weight = info.column("weight").expect("weight column");
    assert!(weight.nullable());
    assert_eq!(weight.normalized_type(), NormalizedType::Float);

    assert_eq!(info.primary_keys().count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_table_metadata_is_cached_per_table() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    db.create_table::<Widget>().await?;

    let first = db.describe_table("widgets").await?;
    let second = db.describe_table("widgets").await?;
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[tokio::test]
async fn test_describing_a_missing_table_is_a_configuration_error()
-> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    let err = db.describe_table("nowhere").await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    Ok(())
}
