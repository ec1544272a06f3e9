//! Result log writer
//!
//! The single owner of the result log. Records arrive over a channel from the worker pool
//! and are appended as CSV rows, one flush per row, so a killed process leaves a usable
//! partial log. The writer stops on [`ResultMessage::Shutdown`].

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::app::models::ResultRecord;
use crate::errors::{WriterError, WriterResult};

/// Column order of the result log
pub const COLUMNS: [&str; 4] = ["media_path", "media_bucket", "proxy_path", "error"];

/// Message carried by the result channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultMessage {
    Record(ResultRecord),
    Shutdown,
}

/// Sending half handed to workers
pub type ResultSender = mpsc::UnboundedSender<ResultMessage>;

/// Receiving half owned by the writer
pub type ResultReceiver = mpsc::UnboundedReceiver<ResultMessage>;

/// Create the result channel
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    mpsc::unbounded_channel()
}

/// What the writer did over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub rows_written: u64,
    pub successes: u64,
    pub failures: u64,
    pub write_errors: u64,
    /// False when the channel closed without a shutdown sentinel
    pub clean_shutdown: bool,
}

/// Appends result records to the CSV log
#[derive(Debug)]
pub struct ResultWriter {
    path: PathBuf,
    file: File,
}

impl ResultWriter {
    /// Open (or create) the log for appending, writing the header into an empty file
    ///
    /// # Errors
    ///
    /// `WriterError::Open` if the file cannot be opened; this is fatal for a run
    pub async fn open(path: &Path) -> WriterResult<Self> {
        let open_err = |source| WriterError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(open_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(open_err)?;
        let existing_len = file.metadata().await.map_err(open_err)?.len();

        let mut writer = Self {
            path: path.to_path_buf(),
            file,
        };

        if existing_len == 0 {
            let header = encode_row(|w| w.write_record(COLUMNS))?;
            writer.write_bytes(&header).await?;
        } else {
            tracing::info!(
                "Appending to existing result log {} ({} bytes)",
                path.display(),
                existing_len
            );
        }

        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk
    pub async fn write_record(&mut self, record: &ResultRecord) -> WriterResult<()> {
        let row = encode_row(|w| w.serialize(record))?;
        self.write_bytes(&row).await
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> WriterResult<()> {
        self.file.write_all(bytes).await?;
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok(())
    }

    /// Consume records until the shutdown sentinel arrives
    ///
    /// A failed write is logged and counted; the writer keeps going.
    pub async fn run(mut self, mut rx: ResultReceiver) -> WriterReport {
        let mut report = WriterReport::default();
        tracing::info!("Result writer started on {}", self.path.display());

        while let Some(message) = rx.recv().await {
            match message {
                ResultMessage::Record(record) => match self.write_record(&record).await {
                    Ok(()) => {
                        report.rows_written += 1;
                        if record.is_success() {
                            report.successes += 1;
                        } else {
                            report.failures += 1;
                        }
                    }
                    Err(e) => {
                        report.write_errors += 1;
                        tracing::error!(
                            "Could not write result for {}: {}",
                            record.media_path,
                            e
                        );
                    }
                },
                ResultMessage::Shutdown => {
                    report.clean_shutdown = true;
                    break;
                }
            }
        }

        if report.clean_shutdown {
            tracing::info!(
                "Result writer finished: {} rows written",
                report.rows_written
            );
        } else {
            tracing::warn!(
                "Result channel closed without shutdown signal after {} rows",
                report.rows_written
            );
        }
        report
    }
}

fn encode_row<F>(write: F) -> WriterResult<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    write(&mut writer)?;
    writer
        .into_inner()
        .map_err(|e| WriterError::Io(e.into_error()))
}
