//! Scan statistics and the final run summary

use std::collections::BTreeSet;
use std::fmt;

use crate::app::listing::SkipReason;
use crate::app::models::file_extension;
use crate::app::worker::PoolReport;
use crate::app::writer::WriterReport;

/// Counters collected while scanning the input list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lines read from the list
    pub lines_read: u64,
    /// Blank and comment lines
    pub skipped_blank: u64,
    /// Dot-files
    pub skipped_hidden: u64,
    /// Names matching an ignore pattern
    pub skipped_ignored: u64,
    /// Entries checked against the archive
    pub verified: u64,
    /// Entries the archive does not know
    pub missing: u64,
    /// Entries abandoned after an archive error
    pub lookup_errors: u64,
    /// Generation requests accepted by the archive
    pub generation_requested: u64,
    /// Generation requests that failed
    pub generation_failed: u64,
    /// Listed proxies without a stored file yet, left for a later run
    pub pending: u64,
    /// Work items handed to the pool
    pub enqueued: u64,
    /// Distinct lowercase extensions of accepted entries
    pub extensions: BTreeSet<String>,
}

impl ScanStats {
    pub(crate) fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Blank | SkipReason::Comment => self.skipped_blank += 1,
            SkipReason::DotFile => self.skipped_hidden += 1,
            SkipReason::Ignored => self.skipped_ignored += 1,
        }
    }

    pub(crate) fn record_extension(&mut self, path: &str) {
        if let Some(ext) = file_extension(path) {
            self.extensions.insert(ext);
        }
    }

    /// Lines that were filtered out before any archive call
    pub fn skipped(&self) -> u64 {
        self.skipped_blank + self.skipped_hidden + self.skipped_ignored
    }
}

/// Everything a run did, returned by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub scan: ScanStats,
    pub pool: PoolReport,
    pub writer: WriterReport,
    /// Scanning stopped early because no worker was left to take work
    pub aborted: bool,
}

impl RunSummary {
    /// Whether the run should be reported as a failure
    pub fn is_failure(&self) -> bool {
        self.aborted || !self.writer.clean_shutdown
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lines read:            {}", self.scan.lines_read)?;
        writeln!(f, "Skipped:               {}", self.scan.skipped())?;
        writeln!(f, "Verified:              {}", self.scan.verified)?;
        writeln!(f, "Missing from archive:  {}", self.scan.missing)?;
        writeln!(f, "Lookup errors:         {}", self.scan.lookup_errors)?;
        writeln!(
            f,
            "Generation requests:   {} ({} failed)",
            self.scan.generation_requested, self.scan.generation_failed
        )?;
        writeln!(f, "Pending proxies:       {}", self.scan.pending)?;
        writeln!(f, "Enqueued:              {}", self.scan.enqueued)?;
        writeln!(f, "Records written:       {}", self.writer.rows_written)?;
        writeln!(f, "Download failures:     {}", self.writer.failures)?;

        let extensions: Vec<&str> = self.scan.extensions.iter().map(String::as_str).collect();
        write!(f, "Extensions seen:       {}", extensions.join(", "))?;

        if self.aborted {
            write!(f, "\nRun aborted: no workers left to take work")?;
        }
        Ok(())
    }
}
