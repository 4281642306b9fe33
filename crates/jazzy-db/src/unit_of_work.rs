//! # Unit of Work
//!
//! One pooled connection inside one SQLite write transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  begin()     acquire connection, BEGIN IMMEDIATE (takes the write lock) │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  read snapshot ─► plan ─► write entry, draws, frame                     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  finish(Ok)  ─► COMMIT                                                  │
//! │  finish(Err) ─► ROLLBACK                                                │
//! │  dropped     ─► connection closed, SQLite discards the transaction      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `BEGIN IMMEDIATE` takes the lock before the snapshot is read, so two
//! sales of the same frame queue up instead of both reading the same
//! quantity. A second writer waits up to the pool's busy timeout.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, warn};

use crate::error::{DbError, DbResult};

pub struct UnitOfWork {
    conn: PoolConnection<Sqlite>,
    operation: &'static str,
    finished: bool,
}

impl UnitOfWork {
    pub async fn begin(pool: &SqlitePool, operation: &'static str) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::Busy => DbError::Busy,
                other => DbError::TransactionFailed(other.to_string()),
            })?;
        debug!(operation, "Unit of work started");

        Ok(UnitOfWork {
            conn,
            operation,
            finished: false,
        })
    }

    /// The transaction's connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.finished = true;
        debug!(operation = self.operation, "Unit of work committed");
        Ok(())
    }

    pub async fn rollback(mut self) -> DbResult<()> {
        sqlx::query("ROLLBACK")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.finished = true;
        debug!(operation = self.operation, "Unit of work rolled back");
        Ok(())
    }

    /// Commits on `Ok`, rolls back on `Err`, and passes the outcome through.
    pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<DbError> + std::fmt::Display,
    {
        let operation = self.operation;
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "Rolling back unit of work");
                if let Err(rollback_err) = self.rollback().await {
                    // The connection is closed on drop, which discards the
                    // transaction anyway.
                    error!(operation, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            error!(
                operation = self.operation,
                "Unit of work dropped without commit or rollback; closing its connection"
            );
            self.conn.close_on_drop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn company_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin_unit("test").await.unwrap();
        sqlx::query("INSERT INTO companies (company_name) VALUES ('Kering')")
            .execute(uow.conn())
            .await
            .unwrap();

        uow.finish::<_, DbError>(Ok(())).await.unwrap();

        assert_eq!(company_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_error_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin_unit("test").await.unwrap();
        sqlx::query("INSERT INTO companies (company_name) VALUES ('Kering')")
            .execute(uow.conn())
            .await
            .unwrap();

        let outcome: Result<(), DbError> = Err(DbError::Internal("boom".to_string()));
        assert!(uow.finish(outcome).await.is_err());

        assert_eq!(company_count(&db).await, 0);
    }
}
