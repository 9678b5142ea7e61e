//! CSV ingestion pipeline.
//!
//! Rows are read one at a time, turned into [`Record`]s and handed to a
//! [`UserStore`]. Bad rows are logged and skipped; only a missing `users`
//! table or an I/O failure on the source stops the run.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::config::ImportOptions;
use crate::error::{UploadError, UploadResult};
use crate::record::Record;
use crate::storage::{InsertOutcome, UserStore};

const HEADER: [&str; 3] = ["name", "surname", "email"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Reading,
    Dispatching,
    Done,
    Failed,
}

/// Per-run counters, printed once the input is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Data rows seen, header excluded
    pub rows: usize,
    pub header_skipped: bool,
    /// Rows committed
    pub inserted: usize,
    /// Rows evaluated and rolled back in dry-run mode
    pub previewed: usize,
    pub duplicates: usize,
    /// Rows rejected before reaching storage (bad name or email, bad shape, undecodable)
    pub invalid: usize,
    /// Rows whose statements failed
    pub failed: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} row(s): {} inserted, {} previewed (dry run), {} duplicate(s), {} invalid, {} failed",
            self.rows, self.inserted, self.previewed, self.duplicates, self.invalid, self.failed
        )
    }
}

/// Open the CSV source for reading.
pub fn open_source(path: &Path) -> UploadResult<File> {
    File::open(path).map_err(|source| UploadError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether `row` is the `name, surname, email` column header (any case).
pub fn is_header_row(row: &StringRecord) -> bool {
    row.len() >= HEADER.len()
        && row
            .iter()
            .zip(HEADER)
            .all(|(field, expected)| field.trim().eq_ignore_ascii_case(expected))
}

/// Build a [`Record`] from the first three columns of `row`.
pub fn row_to_record(row: &StringRecord, simple_names: bool) -> UploadResult<Record> {
    match (row.get(0), row.get(1), row.get(2)) {
        (Some(name), Some(surname), Some(email)) => {
            Record::build(name, surname, email, simple_names)
        }
        _ => Err(UploadError::MalformedRow {
            line: row.position().map(|pos| pos.line()).unwrap_or_default(),
            columns: row.len(),
        }),
    }
}

pub struct Importer<'s, S: UserStore> {
    store: &'s mut S,
    dry_run: bool,
    simple_names: bool,
    state: PipelineState,
    stats: ImportStats,
}

impl<'s, S: UserStore> Importer<'s, S> {
    pub fn new(store: &'s mut S, options: &ImportOptions) -> Self {
        Self {
            store,
            dry_run: options.dry_run,
            simple_names: options.simple_names,
            state: PipelineState::Idle,
            stats: ImportStats::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &ImportStats {
        &self.stats
    }

    /// Import every row of `source`.
    ///
    /// The `users` table must exist, dry run or not. The header row is only
    /// recognised in first position; later identical rows are ordinary data.
    pub async fn run<R: Read>(&mut self, source: R) -> UploadResult<ImportStats> {
        match self.store.table_exists().await {
            Ok(true) => {}
            Ok(false) => return Err(self.fail(UploadError::MissingTable)),
            Err(err) => return Err(self.fail(err)),
        }

        if self.dry_run {
            log::info!("dry run: no changes will be committed");
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(source);
        let mut row = StringRecord::new();
        let mut first_row = true;

        loop {
            self.state = PipelineState::Reading;

            match reader.read_record(&mut row) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) if err.is_io_error() => return Err(self.fail(err.into())),
                Err(err) => {
                    first_row = false;
                    self.stats.rows += 1;
                    self.skip(UploadError::UnreadableRow(err));
                    continue;
                }
            }

            if std::mem::take(&mut first_row) && is_header_row(&row) {
                log::debug!("skipping header row");
                self.stats.header_skipped = true;
                continue;
            }

            self.stats.rows += 1;

            let record = match row_to_record(&row, self.simple_names) {
                Ok(record) => record,
                Err(err) => {
                    self.skip(err);
                    continue;
                }
            };

            self.dispatch(&record).await;
        }

        self.state = PipelineState::Done;
        log::info!("{}", self.stats);
        Ok(self.stats.clone())
    }

    async fn dispatch(&mut self, record: &Record) {
        self.state = PipelineState::Dispatching;
        log::debug!("dispatching {}", record);

        match self.store.insert_user(record, self.dry_run).await {
            Ok(InsertOutcome::Inserted) => self.stats.inserted += 1,
            Ok(InsertOutcome::RolledBack) => self.stats.previewed += 1,
            Ok(InsertOutcome::Duplicate) => self.stats.duplicates += 1,
            // The store has already logged the database detail.
            Err(err) if err.is_row_local() => self.stats.failed += 1,
            Err(err) => {
                log::error!("{}", err);
                self.stats.failed += 1;
            }
        }
    }

    fn skip(&mut self, err: UploadError) {
        log::warn!("{}", err);
        self.stats.invalid += 1;
    }

    fn fail(&mut self, err: UploadError) -> UploadError {
        log::error!("{}", err);
        self.state = PipelineState::Failed;
        err
    }
}
