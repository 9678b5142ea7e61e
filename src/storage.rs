//! Storage gateway for the `users` table.
//!
//! All statements run on one borrowed [`MySqlConnection`]. Every insert is
//! its own transaction: the duplicate check happens outside it, and dry runs
//! roll the transaction back once the statement has been evaluated.

use sqlx::{Connection, MySqlConnection};

use crate::error::{UploadError, UploadResult};
use crate::record::Record;

pub const USERS_TABLE: &str = "users";

const DROP_USERS_TABLE: &str = "DROP TABLE IF EXISTS `users`";

const CREATE_USERS_TABLE: &str = r#"CREATE TABLE `users` (
    `id` INT PRIMARY KEY AUTO_INCREMENT,
    `name` VARCHAR(255) NOT NULL,
    `surname` VARCHAR(255) NOT NULL,
    `email` VARCHAR(255) NOT NULL
)"#;

const CREATE_EMAIL_INDEX: &str = "CREATE UNIQUE INDEX users_email_uindex ON `users` (`email`)";

/// Result of handing one record to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row committed.
    Inserted,
    /// Email already present; nothing was attempted.
    Duplicate,
    /// Statement succeeded but the transaction was rolled back (dry run).
    RolledBack,
}

/// Operations the import needs from persistent storage.
#[allow(async_fn_in_trait)]
pub trait UserStore {
    /// Whether the `users` table exists in the current database.
    async fn table_exists(&mut self) -> UploadResult<bool>;

    /// Drop and recreate the `users` table with its unique email index.
    async fn create_table(&mut self) -> UploadResult<()>;

    /// Insert `record` unless its email is already stored.
    async fn insert_user(&mut self, record: &Record, dry_run: bool) -> UploadResult<InsertOutcome>;
}

/// MySQL implementation of [`UserStore`].
pub struct UserGateway<'c> {
    conn: &'c mut MySqlConnection,
}

impl<'c> UserGateway<'c> {
    pub fn new(conn: &'c mut MySqlConnection) -> Self {
        Self { conn }
    }

    /// Number of rows currently in `users`.
    pub async fn count_users(&mut self) -> UploadResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Stored `(name, surname, email)` tuples ordered by id.
    pub async fn list_users(&mut self) -> UploadResult<Vec<(String, String, String)>> {
        let rows = sqlx::query_as("SELECT name, surname, email FROM users ORDER BY id")
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(rows)
    }
}

impl UserStore for UserGateway<'_> {
    async fn table_exists(&mut self) -> UploadResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(USERS_TABLE)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(count > 0)
    }

    async fn create_table(&mut self) -> UploadResult<()> {
        let mut tx = self.conn.begin().await?;

        for statement in [DROP_USERS_TABLE, CREATE_USERS_TABLE, CREATE_EMAIL_INDEX] {
            if let Err(err) = sqlx::query(statement).execute(&mut *tx).await {
                log::error!("failed to create users table: {}", err);
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!("rollback after failed table creation failed: {}", rollback_err);
                }
                return Err(UploadError::TableCreation(err));
            }
        }

        tx.commit().await.map_err(UploadError::TableCreation)?;
        log::info!("users table created");
        Ok(())
    }

    async fn insert_user(&mut self, record: &Record, dry_run: bool) -> UploadResult<InsertOutcome> {
        let existing = sqlx::query_scalar::<_, String>("SELECT u.email FROM users u WHERE u.email = ?")
            .bind(record.email())
            .fetch_optional(&mut *self.conn)
            .await;

        match existing {
            Ok(Some(_)) => {
                log::warn!("User already exists, skipping: {}", record);
                return Ok(InsertOutcome::Duplicate);
            }
            Ok(None) => {}
            Err(err) => {
                log::error!("An error occurred when checking for user {}: {}", record, err);
                return Err(UploadError::Lookup {
                    record: record.to_string(),
                    source: err,
                });
            }
        }

        let insert_error = |source: sqlx::Error| UploadError::Insert {
            record: record.to_string(),
            source,
        };

        let mut tx = match self.conn.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                log::error!("User was not added {}: {}", record, err);
                return Err(insert_error(err));
            }
        };

        let inserted = sqlx::query("INSERT INTO users (`name`, `surname`, `email`) VALUES (?, ?, ?)")
            .bind(record.name())
            .bind(record.surname())
            .bind(record.email())
            .execute(&mut *tx)
            .await;

        if let Err(err) = inserted {
            // The unique index catches rows committed after the lookup ran.
            let duplicate = is_unique_violation(&err);
            if duplicate {
                log::warn!("User already exists, skipping: {}", record);
            } else {
                log::error!("User was not added {}: {}", record, err);
            }

            if let Err(rollback_err) = tx.rollback().await {
                log::error!("rollback for {} failed: {}", record, rollback_err);
            }

            return if duplicate {
                Ok(InsertOutcome::Duplicate)
            } else {
                Err(insert_error(err))
            };
        }

        if dry_run {
            if let Err(err) = tx.rollback().await {
                log::error!("Dry run rollback failed for {}: {}", record, err);
                return Err(insert_error(err));
            }
            log::info!("Dry run, not committed: {}", record);
            Ok(InsertOutcome::RolledBack)
        } else {
            if let Err(err) = tx.commit().await {
                log::error!("User was not added {}: {}", record, err);
                return Err(insert_error(err));
            }
            log::debug!("inserted {}", record);
            Ok(InsertOutcome::Inserted)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
