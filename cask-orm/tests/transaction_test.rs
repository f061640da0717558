use cask_orm::{
    Connection, Database, InsertStatement, Params, SelectStatement, SqlMap, SqlMapper,
};

async fn setup() -> Result<(Database, SqlMapper), Box<dyn std::error::Error>> {
    let db = Database::builder()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    db.execute(
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)",
        &[],
    )
    .await?;

    let map = SqlMap::builder(db.driver())
        .statement(
            InsertStatement::new(
                "notes.insert",
                "INSERT INTO notes (id, body) VALUES (#id#, #body#)",
                vec![],
            )?
            .into(),
        )?
        .statement(
            SelectStatement::new("notes.count", "SELECT COUNT(*) FROM notes", vec![])?.into(),
        )?
        .build();
    Ok((db, SqlMapper::new(map)))
}

#[tokio::test]
async fn test_rolled_back_work_is_invisible() -> Result<(), Box<dyn std::error::Error>> {
    let (db, mapper) = setup().await?;

    let tx = db.begin().await?;
    let params = Params::new().with("id", 1i64).with("body", "draft");
    mapper.insert(&tx, "notes.insert", &params).await?;

    // Inside the transaction the row is there.
    let count: Option<i64> = mapper.query_for_object(&tx, "notes.count", &Params::new()).await?;
    assert_eq!(count, Some(1));

    tx.rollback().await?;

    let count: Option<i64> = mapper.query_for_object(&db, "notes.count", &Params::new()).await?;
    assert_eq!(count, Some(0));
    Ok(())
}

#[tokio::test]
async fn test_committed_work_persists() -> Result<(), Box<dyn std::error::Error>> {
    let (db, mapper) = setup().await?;

    let tx = db.begin().await?;
    let params = Params::new().with("id", 1i64).with("body", "kept");
    mapper.insert(&tx, "notes.insert", &params).await?;
    tx.commit().await?;

    let count: Option<i64> = mapper.query_for_object(&db, "notes.count", &Params::new()).await?;
    assert_eq!(count, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_a_completed_transaction_refuses_further_work() -> Result<(), Box<dyn std::error::Error>>
{
    let (db, mapper) = setup().await?;

    let tx = db.begin().await?;
    let handle = tx.clone();
    tx.rollback().await?;

    let params = Params::new().with("id", 1i64).with("body", "late");
    let err = mapper.insert(&handle, "notes.insert", &params).await.unwrap_err();
    assert!(matches!(err, cask_orm::Error::Execution { .. }));
    Ok(())
}
