use std::path::PathBuf;

use log::LevelFilter;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection, MySqlConnection};

use crate::error::{UploadError, UploadResult};

pub const DEFAULT_DATABASE: &str = "catalystUsers";
pub const DEFAULT_PORT: u16 = 3306;

/// Connection settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.database)
            .log_statements(LevelFilter::Debug);

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }

    /// Open the single connection used for the whole run.
    pub async fn connect(&self) -> UploadResult<MySqlConnection> {
        log::info!(
            "connecting to mysql://{}@{}:{}/{}",
            self.username,
            self.host,
            self.port,
            self.database
        );

        MySqlConnection::connect_with(&self.connect_options())
            .await
            .map_err(UploadError::Connection)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub file: PathBuf,
    pub dry_run: bool,
    pub simple_names: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Drop and recreate the `users` table, then exit.
    CreateTable,
    Import(ImportOptions),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub mode: Mode,
}
