use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type UploadResult<T> = Result<T, UploadError>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Config(String),
    #[error("Users table does not exist. Please run this script using the --create_table command")]
    MissingTable,
    #[error("File could not be read ({}): {source}", .path.display())]
    UnreadableFile { path: PathBuf, source: io::Error },
    #[error("Invalid email, skipping: {record}")]
    InvalidEmail { record: String },
    #[error("Invalid characters in name, skipping: {record}")]
    InvalidName { record: String },
    #[error("Malformed row on line {line}, skipping: expected name, surname and email but found {columns} column(s)")]
    MalformedRow { line: u64, columns: usize },
    #[error("Unreadable row, skipping: {0}")]
    UnreadableRow(csv::Error),
    #[error("An error occurred when checking for user {record}: {source}")]
    Lookup { record: String, source: sqlx::Error },
    #[error("User was not added {record}: {source}")]
    Insert { record: String, source: sqlx::Error },
    #[error("An error occurred when creating users table: {0}")]
    TableCreation(sqlx::Error),
    #[error("Connection failed: {0}")]
    Connection(sqlx::Error),
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl UploadError {
    /// Errors that only affect the current row; the import moves on to the next one.
    pub fn is_row_local(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidEmail { .. }
                | UploadError::InvalidName { .. }
                | UploadError::MalformedRow { .. }
                | UploadError::UnreadableRow(_)
                | UploadError::Lookup { .. }
                | UploadError::Insert { .. }
        )
    }
}
