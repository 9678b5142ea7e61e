pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod storage;

pub use app::run;
pub use config::{Config, DatabaseConfig, ImportOptions, Mode};
pub use error::{UploadError, UploadResult};
pub use record::Record;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn"))
            .format_timestamp(None)
            .init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use std::collections::HashSet;

    use crate::error::{UploadError, UploadResult};
    use crate::record::Record;
    use crate::storage::{InsertOutcome, UserStore};

    pub use database::{TestDatabase, TestDatabaseError};

    /// In-memory [`UserStore`] mirroring the gateway's check-then-insert rules.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        table: bool,
        rows: Vec<Record>,
        failing_emails: HashSet<String>,
        failing_rollbacks: HashSet<String>,
        fail_create: bool,
        transactions: usize,
        tables_created: usize,
    }

    impl MemoryStore {
        /// A store with no `users` table.
        pub fn new() -> Self {
            Self::default()
        }

        /// A store with an empty `users` table.
        pub fn with_table() -> Self {
            Self {
                table: true,
                ..Self::default()
            }
        }

        /// Add a committed row directly, bypassing the duplicate check.
        pub fn seed(&mut self, record: Record) {
            self.rows.push(record);
        }

        /// Make inserts for `email` fail like a rejected statement.
        pub fn fail_on(&mut self, email: &str) {
            self.failing_emails.insert(email.to_string());
        }

        /// Make rolling back the transaction for `email` fail.
        pub fn fail_rollback_on(&mut self, email: &str) {
            self.failing_rollbacks.insert(email.to_string());
        }

        pub fn fail_create_table(&mut self) {
            self.fail_create = true;
        }

        pub fn rows(&self) -> &[Record] {
            &self.rows
        }

        pub fn has_table(&self) -> bool {
            self.table
        }

        /// Insert transactions begun so far, committed or not.
        pub fn transactions(&self) -> usize {
            self.transactions
        }

        pub fn tables_created(&self) -> usize {
            self.tables_created
        }
    }

    impl UserStore for MemoryStore {
        async fn table_exists(&mut self) -> UploadResult<bool> {
            Ok(self.table)
        }

        async fn create_table(&mut self) -> UploadResult<()> {
            if self.fail_create {
                return Err(UploadError::TableCreation(sqlx::Error::Protocol(
                    "simulated DDL failure".to_string(),
                )));
            }
            self.table = true;
            self.rows.clear();
            self.tables_created += 1;
            Ok(())
        }

        async fn insert_user(
            &mut self,
            record: &Record,
            dry_run: bool,
        ) -> UploadResult<InsertOutcome> {
            if self.rows.iter().any(|row| row.email() == record.email()) {
                log::warn!("User already exists, skipping: {}", record);
                return Ok(InsertOutcome::Duplicate);
            }

            self.transactions += 1;

            let rollback_fails = self.failing_rollbacks.contains(record.email());

            if self.failing_emails.contains(record.email()) {
                log::error!("User was not added {}: simulated insert failure", record);
                if rollback_fails {
                    log::error!("rollback for {} failed: simulated rollback failure", record);
                }
                return Err(UploadError::Insert {
                    record: record.to_string(),
                    source: sqlx::Error::Protocol("simulated insert failure".to_string()),
                });
            }

            if dry_run {
                if rollback_fails {
                    return Err(UploadError::Insert {
                        record: record.to_string(),
                        source: sqlx::Error::Protocol("simulated rollback failure".to_string()),
                    });
                }
                return Ok(InsertOutcome::RolledBack);
            }

            self.rows.push(record.clone());
            Ok(InsertOutcome::Inserted)
        }
    }

    pub mod database {
        use log::LevelFilter;
        use sqlx::mysql::MySqlConnectOptions;
        use sqlx::{ConnectOptions, Connection, MySqlConnection};
        use testcontainers_modules::mysql::Mysql;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use uuid::Uuid;

        use crate::config::DatabaseConfig;

        const MYSQL_PORT: u16 = 3306;
        const ROOT_USER: &str = "root";
        const BOOTSTRAP_DATABASE: &str = "test";

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Disposable MySQL database for integration tests.
        pub struct TestDatabase {
            config: DatabaseConfig,
            admin_options: MySqlConnectOptions,
            container: Option<ContainerAsync<Mysql>>,
        }

        impl TestDatabase {
            /// Start a MySQL container and create a uniquely named database in it.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Mysql::default().start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(MYSQL_PORT).await?;

                let admin_options = MySqlConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(ROOT_USER)
                    .database(BOOTSTRAP_DATABASE)
                    .log_statements(LevelFilter::Off);

                let database = format!("catalyst_{}", Uuid::new_v4().simple());
                let mut admin = MySqlConnection::connect_with(&admin_options).await?;
                let create_sql = format!("CREATE DATABASE `{}`", database);
                sqlx::query(&create_sql).execute(&mut admin).await?;
                admin.close().await?;

                Ok(Self {
                    config: DatabaseConfig {
                        username: ROOT_USER.to_string(),
                        password: String::new(),
                        host,
                        port,
                        database,
                    },
                    admin_options,
                    container: Some(container),
                })
            }

            /// Connection settings pointing at the fresh database.
            pub fn config(&self) -> &DatabaseConfig {
                &self.config
            }

            pub async fn connect(&self) -> Result<MySqlConnection, TestDatabaseError> {
                let conn = MySqlConnection::connect_with(
                    &self.config.connect_options().log_statements(LevelFilter::Off),
                )
                .await?;
                Ok(conn)
            }

            /// Drop the database and stop the container.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                let mut admin = MySqlConnection::connect_with(&self.admin_options).await?;
                let drop_sql = format!("DROP DATABASE IF EXISTS `{}`", self.config.database);
                sqlx::query(&drop_sql).execute(&mut admin).await?;
                admin.close().await?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }
    }
}
