use cask_orm::{
    Database, Error, Finder, FromRow, FromValue, KeyStrategy, Params, Record, RecordColumn,
    RecordState, Row, SqlMap, SqlMapper, Value,
};

#[derive(Debug, Clone)]
struct User {
    id: i64,
    username: String,
    age: i64,
    state: RecordState,
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, Error> {
        let field = |name: &str| {
            row.get(name)
                .cloned()
                .ok_or_else(|| Error::Mapping(format!("row is missing column `{name}`")))
        };
        Ok(Self {
            id: i64::from_value(&field("id")?)?,
            username: String::from_value(&field("username")?)?,
            age: i64::from_value(&field("age")?)?,
            state: RecordState::Persisted,
        })
    }
}

impl Record for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn columns() -> Vec<RecordColumn> {
        vec![
            RecordColumn { name: "id", db_type: "INTEGER", primary_key: true, nullable: false },
            RecordColumn { name: "username", db_type: "TEXT", primary_key: false, nullable: false },
            RecordColumn { name: "age", db_type: "INTEGER", primary_key: false, nullable: false },
        ]
    }

    fn key_strategy() -> KeyStrategy {
        KeyStrategy::Identity
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
            .with("username", self.username.clone())
            .with("age", self.age)
    }

    fn apply_generated_key(&mut self, key: Value) -> Result<(), Error> {
        self.id = key
            .as_i64()
            .ok_or_else(|| Error::Mapping(format!("generated key {key:?} is not an integer")))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let db = Database::builder()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    db.create_table::<User>().await?;

    let mapper = SqlMapper::new(
        SqlMap::builder(cask_orm::Drivers::SQLite)
            .register_record::<User>()?
            .build(),
    );

    let mut alice = User { id: 0, username: "alice".to_string(), age: 30, state: RecordState::New };
    alice.save(&mapper, &db).await?;
    println!("Inserted user: {} (id {})", alice.username, alice.id);

    alice.age = 31;
    alice.save(&mapper, &db).await?;

    let finder = Finder::<User>::new(&mapper);
    let found = finder.find_by(&db, "username", "alice").await?;
    println!("Found user: {found:?}");

    let info = db.describe_table("users").await?;
    for column in info.columns() {
        println!(
            "Column {}: {} ({:?})",
            column.name(),
            column.db_type(),
            column.normalized_type()
        );
    }

    alice.delete(&mapper, &db).await?;
    println!("Users left: {}", finder.find_all(&db).await?.len());

    Ok(())
}
