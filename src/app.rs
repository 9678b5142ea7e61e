//! Top-level run: connect, then either bootstrap the table or import a file.

use std::io::{BufRead, Write};

use sqlx::{Connection, MySqlConnection};

use crate::config::{Config, ImportOptions, Mode};
use crate::error::UploadResult;
use crate::pipeline::{ImportStats, Importer, open_source};
use crate::prompt::confirm_overwrite;
use crate::storage::{UserGateway, UserStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSetup {
    Created,
    /// Operator declined to overwrite the existing table.
    Unchanged,
}

/// Execute the configured mode against a freshly opened connection.
///
/// `input` and `output` carry the overwrite confirmation dialogue and the
/// end-of-run messages.
pub async fn run<R: BufRead, W: Write>(config: &Config, input: R, mut output: W) -> UploadResult<()> {
    match &config.mode {
        Mode::CreateTable => {
            let mut conn = config.database.connect().await?;
            let result = create_users_table(&mut UserGateway::new(&mut conn), input, &mut output)
                .await
                .map(|_| ());
            close(conn).await;
            result
        }
        Mode::Import(options) => {
            // An unreadable file fails before any connection is made.
            let source = open_source(&options.file)?;
            let mut conn = config.database.connect().await?;
            let result = import(&mut UserGateway::new(&mut conn), options, source, &mut output)
                .await
                .map(|_| ());
            close(conn).await;
            result
        }
    }
}

async fn close(conn: MySqlConnection) {
    if let Err(err) = conn.close().await {
        log::warn!("failed to close database connection cleanly: {}", err);
    }
}

/// Create the `users` table, asking for confirmation when one already exists.
pub async fn create_users_table<S: UserStore, R: BufRead, W: Write>(
    store: &mut S,
    input: R,
    mut output: W,
) -> UploadResult<TableSetup> {
    if store.table_exists().await? && !confirm_overwrite(input, &mut output)? {
        writeln!(output, "No changes have been made, Exiting")?;
        return Ok(TableSetup::Unchanged);
    }

    match store.create_table().await {
        Ok(()) => {
            writeln!(output, "Users table successfully created.")?;
            Ok(TableSetup::Created)
        }
        Err(err) => {
            writeln!(output, "{}", err)?;
            writeln!(output, "No changes have been made to the database.")?;
            Err(err)
        }
    }
}

/// Run the ingestion pipeline over `source` and print its summary.
pub async fn import<S: UserStore, R: std::io::Read, W: Write>(
    store: &mut S,
    options: &ImportOptions,
    source: R,
    mut output: W,
) -> UploadResult<ImportStats> {
    log::info!("importing users from {}", options.file.display());

    let stats = Importer::new(store, options).run(source).await?;
    writeln!(output, "{}", stats)?;

    if options.dry_run {
        writeln!(output, "Dry run complete, no changes have been made.")?;
    }

    Ok(stats)
}
