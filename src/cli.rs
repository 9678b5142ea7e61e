use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{Config, DEFAULT_DATABASE, DEFAULT_PORT, DatabaseConfig, ImportOptions, Mode};
use crate::error::{UploadError, UploadResult};

#[derive(Parser, Debug)]
#[command(
    name = "user-upload",
    about = "Import users (name, surname, email) from a CSV file into a MySQL `users` table",
    disable_help_flag = true
)]
pub struct Cli {
    /// MySQL username.
    #[arg(short = 'u', long, env = "USER_UPLOAD_USERNAME")]
    pub username: Option<String>,

    /// MySQL password.
    #[arg(short = 'p', long, env = "USER_UPLOAD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// MySQL hostname.
    #[arg(short = 'h', long, env = "USER_UPLOAD_HOST")]
    pub host: Option<String>,

    /// MySQL database name.
    #[arg(short = 'd', long, env = "USER_UPLOAD_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// MySQL port.
    #[arg(long, env = "USER_UPLOAD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// CSV file to import.
    #[arg(long, value_name = "CSV FILE")]
    pub file: Option<PathBuf>,

    /// Create (or overwrite) the `users` table. Other commands are ignored.
    #[arg(long = "create_table")]
    pub create_table: bool,

    /// Used with --file: run the import without altering the database.
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Remove every non-alphabetic character from names.
    #[arg(long = "simple_names")]
    pub simple_names: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn required(value: Option<String>, message: &str) -> UploadResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| UploadError::Config(message.to_string()))
}

impl Cli {
    /// Resolve the parsed arguments into a run configuration.
    pub fn into_config(self) -> UploadResult<Config> {
        let username = required(
            self.username,
            "Please provide a MYSQL Database Username (-u)",
        )?;
        let password = required(
            self.password,
            "Please provide a MYSQL Database Password (-p)",
        )?;
        let host = required(self.host, "Please provide a MYSQL Database Hostname (-h)")?;

        let mode = if self.create_table {
            if self.file.is_some() || self.dry_run || self.simple_names {
                log::warn!("--create_table given, ignoring --file, --dry_run and --simple_names");
            }
            Mode::CreateTable
        } else {
            let file = self.file.ok_or_else(|| {
                UploadError::Config(
                    "Please specify a file to import (--file [csv file name])".to_string(),
                )
            })?;
            Mode::Import(ImportOptions {
                file,
                dry_run: self.dry_run,
                simple_names: self.simple_names,
            })
        };

        Ok(Config {
            database: DatabaseConfig {
                username,
                password,
                host,
                port: self.port,
                database: self.database,
            },
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("user-upload").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn import_mode_with_all_flags() {
        let config = parse(&[
            "-u", "root", "-p", "secret", "-h", "localhost", "--file", "users.csv", "--dry_run",
            "--simple_names",
        ])
        .into_config()
        .expect("valid config");

        assert_eq!(config.database.username, "root");
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.database, DEFAULT_DATABASE);
        assert_eq!(config.database.port, DEFAULT_PORT);
        assert_eq!(
            config.mode,
            Mode::Import(ImportOptions {
                file: PathBuf::from("users.csv"),
                dry_run: true,
                simple_names: true,
            })
        );
    }

    #[test]
    fn database_name_can_be_overridden() {
        let config = parse(&[
            "-u", "root", "-p", "secret", "-h", "localhost", "-d", "staging", "--file", "u.csv",
        ])
        .into_config()
        .expect("valid config");

        assert_eq!(config.database.database, "staging");
    }

    #[test]
    fn create_table_ignores_import_flags() {
        let config = parse(&[
            "-u", "root", "-p", "secret", "-h", "localhost", "--create_table", "--dry_run",
        ])
        .into_config()
        .expect("valid config");

        assert_eq!(config.mode, Mode::CreateTable);
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        // Explicit empty values shadow any USER_UPLOAD_* variables in the environment.
        let err = parse(&["-u", "", "-p", "secret", "-h", "localhost", "--file", "u.csv"])
            .into_config()
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide a MYSQL Database Username (-u)");

        let err = parse(&["-u", "root", "-p", "secret", "-h", " ", "--file", "u.csv"])
            .into_config()
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide a MYSQL Database Hostname (-h)");
    }

    #[test]
    fn import_requires_a_file() {
        let err = parse(&["-u", "root", "-p", "secret", "-h", "localhost"])
            .into_config()
            .unwrap_err();

        assert!(matches!(err, UploadError::Config(_)));
        assert!(err.to_string().contains("--file"));
    }
}
