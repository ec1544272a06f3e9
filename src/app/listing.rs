//! Input file list reading and filtering
//!
//! The list is newline-delimited, one path per line. Lines are decoded as UTF-8 with
//! invalid sequences replaced rather than rejected, so one badly encoded name never stops
//! a scan. Blank lines, `#` comments, dot-files and names matching an ignore pattern are
//! skipped; optionally the first K directory components are dropped.

use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Split};

use crate::app::models::file_name;
use crate::constants::listing;
use crate::errors::{ListError, ListResult};

/// A path accepted from the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// 1-based line number in the list file
    pub line_number: usize,
    /// Path after prefix stripping, used for the content identifier
    pub path: String,
}

/// Why a line was not turned into an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    Comment,
    DotFile,
    Ignored,
}

/// Decision for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Accepted(ListEntry),
    Skipped { line_number: usize, reason: SkipReason },
}

/// Filtering rules applied to every line
#[derive(Debug, Clone)]
pub struct ListFilter {
    ignore: Vec<Regex>,
    strip_components: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        let ignore = listing::DEFAULT_IGNORE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self {
            ignore,
            strip_components: 0,
        }
    }
}

impl ListFilter {
    /// Build a filter from ignore patterns and a strip count
    ///
    /// # Errors
    ///
    /// Returns `ListError::InvalidPattern` for the first pattern that does not compile
    pub fn new<S: AsRef<str>>(ignore_patterns: &[S], strip_components: usize) -> ListResult<Self> {
        let ignore = ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| ListError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<ListResult<Vec<_>>>()?;

        Ok(Self {
            ignore,
            strip_components,
        })
    }

    /// Classify one raw line
    pub fn apply(&self, line_number: usize, raw: &str) -> LineOutcome {
        let path = raw.trim_end();
        let skipped = |reason| LineOutcome::Skipped {
            line_number,
            reason,
        };

        if path.trim_start().is_empty() {
            return skipped(SkipReason::Blank);
        }
        if path.trim_start().starts_with(listing::COMMENT_PREFIX) {
            return skipped(SkipReason::Comment);
        }

        let name = file_name(path);
        if name.starts_with('.') {
            return skipped(SkipReason::DotFile);
        }
        if self.ignore.iter().any(|re| re.is_match(name)) {
            return skipped(SkipReason::Ignored);
        }

        LineOutcome::Accepted(ListEntry {
            line_number,
            path: self.strip(path),
        })
    }

    /// Drop the first `strip_components` directory components, keeping the file name
    fn strip(&self, path: &str) -> String {
        if self.strip_components == 0 {
            return path.to_string();
        }

        let (dir, name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        };
        let kept: Vec<&str> = dir.split('/').skip(self.strip_components).collect();
        let dir = kept.join("/");

        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    }
}

/// Streaming reader over a list file
pub struct FileListReader {
    lines: Split<BufReader<File>>,
    filter: ListFilter,
    line_number: usize,
}

impl FileListReader {
    /// Open a list file
    ///
    /// # Errors
    ///
    /// `ListError::NotFound` if the file does not exist, `ListError::Io` otherwise
    pub async fn open(path: &Path, filter: ListFilter) -> ListResult<Self> {
        let file = File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ListError::NotFound {
                    path: PathBuf::from(path),
                }
            } else {
                ListError::Io(e)
            }
        })?;

        Ok(Self {
            lines: BufReader::new(file).split(b'\n'),
            filter,
            line_number: 0,
        })
    }

    /// Next line with its filtering decision, `None` at end of file
    pub async fn next_line(&mut self) -> ListResult<Option<LineOutcome>> {
        let Some(bytes) = self.lines.next_segment().await? else {
            return Ok(None);
        };
        self.line_number += 1;

        let text = String::from_utf8_lossy(&bytes);
        if matches!(text, std::borrow::Cow::Owned(_)) {
            tracing::warn!(
                "Line {} is not valid UTF-8, invalid bytes replaced",
                self.line_number
            );
        }

        Ok(Some(self.filter.apply(self.line_number, &text)))
    }

    /// Next accepted entry, skipping filtered lines
    pub async fn next_entry(&mut self) -> ListResult<Option<ListEntry>> {
        while let Some(outcome) = self.next_line().await? {
            if let LineOutcome::Accepted(entry) = outcome {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}
