use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::database::{Connection, Drivers, any_arguments, decode_any_row};
use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

/// A wrapper around a SQLx transaction.
///
/// Usable anywhere a [`Connection`] is, so statement execution and record
/// operations compose with explicit transaction boundaries. Dropping the
/// wrapper without committing rolls the transaction back, as sqlx does.
#[derive(Debug, Clone)]
pub struct Transaction {
    tx: Arc<Mutex<Option<sqlx::Transaction<'static, sqlx::Any>>>>,
    driver: Drivers,
}

impl Transaction {
    pub(crate) fn new(tx: sqlx::Transaction<'static, sqlx::Any>, driver: Drivers) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            driver,
        }
    }

    /// Commits the transaction.
    ///
    /// Persists all changes made during the transaction to the database.
    pub async fn commit(self) -> Result<(), Error> {
        let tx = self.take().await?;
        tx.commit().await?;
        Ok(())
    }

    /// Rolls back the transaction explicitly.
    pub async fn rollback(self) -> Result<(), Error> {
        let tx = self.take().await?;
        tx.rollback().await?;
        Ok(())
    }

    async fn take(&self) -> Result<sqlx::Transaction<'static, sqlx::Any>, Error> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Connection("transaction already completed".to_string()))
    }
}

impl Connection for Transaction {
    fn driver(&self) -> Drivers {
        self.driver
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, Error>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard
                .as_mut()
                .ok_or_else(|| Error::Connection("transaction already completed".to_string()))?;
            let args = any_arguments(params);
            let result = sqlx::query_with(sql, args).execute(&mut **tx).await?;
            Ok(result.rows_affected())
        })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, Error>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard
                .as_mut()
                .ok_or_else(|| Error::Connection("transaction already completed".to_string()))?;
            let args = any_arguments(params);
            let rows = sqlx::query_with(sql, args).fetch_all(&mut **tx).await?;
            rows.iter().map(decode_any_row).collect()
        })
    }
}
