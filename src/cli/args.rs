//! Command-line argument parsing for Proxy Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Every flag that has a
//! configuration file counterpart overrides it when given.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::app::client::SignatureScheme;
use crate::config::AppConfig;

/// Proxy Fetcher - Download media proxies from the archive
#[derive(Parser, Debug)]
#[command(
    name = "proxy_fetcher",
    version,
    about = "Download media proxies for a list of archived files",
    long_about = "Reads a list of source paths, checks each against the archive service, requests
generation of missing proxies and downloads existing ones with a pool of workers.
Every download outcome is appended to a CSV result log."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch proxies for every file in a list
    Fetch(FetchArgs),

    /// Show what the archive knows about one file
    Inspect(InspectArgs),

    /// Print content identifiers for paths
    Id(IdArgs),
}

/// Archive connection overrides shared by commands that talk to the service
#[derive(Args, Debug, Clone, Default)]
pub struct ArchiveArgs {
    /// Collection (bucket) the paths belong to
    #[arg(long)]
    pub collection: Option<String>,

    /// Archive hostname, optionally with a port
    #[arg(long)]
    pub hostname: Option<String>,

    /// Shared HMAC secret
    #[arg(long)]
    pub secret: Option<String>,

    /// Request signing scheme
    #[arg(long, value_enum)]
    pub scheme: Option<SignatureScheme>,

    /// Talk plain HTTP instead of HTTPS
    #[arg(long)]
    pub insecure_http: bool,
}

impl ArchiveArgs {
    /// Apply the given flags on top of a loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(collection) = &self.collection {
            config.archive.collection = Some(collection.clone());
        }
        if let Some(hostname) = &self.hostname {
            config.archive.hostname = Some(hostname.clone());
        }
        if let Some(secret) = &self.secret {
            config.archive.secret = Some(secret.clone());
        }
        if let Some(scheme) = self.scheme {
            config.archive.signature_scheme = scheme;
        }
        if self.insecure_http {
            config.archive.scheme = "http".to_string();
        }
    }
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Newline-delimited list of source paths
    #[arg(short, long, value_name = "FILE")]
    pub list: PathBuf,

    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Number of concurrent download workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Directory to download proxies into
    #[arg(short, long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// CSV result log to append to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Drop this many leading directories from each listed path
    #[arg(long, value_name = "K")]
    pub strip: Option<usize>,

    /// Skip file names matching this regex (repeatable; replaces configured patterns)
    #[arg(long = "ignore", value_name = "REGEX")]
    pub ignore: Vec<String>,
}

impl FetchArgs {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Number of workers must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Apply the given flags on top of a loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        self.archive.apply_to(config);

        if let Some(workers) = self.workers {
            config.pipeline.worker_count = workers;
        }
        if let Some(dir) = &self.download_dir {
            config.pipeline.download_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.pipeline.output_log = output.clone();
        }
        if let Some(strip) = self.strip {
            config.pipeline.strip_components = strip;
        }
        if !self.ignore.is_empty() {
            config.pipeline.ignore_patterns = self.ignore.clone();
        }
    }
}

/// Arguments for the inspect command
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("target").required(true).args(["id", "path"])))]
pub struct InspectArgs {
    /// Content identifier to inspect
    #[arg(long)]
    pub id: Option<String>,

    /// Source path to inspect, combined with the collection
    #[arg(long)]
    pub path: Option<String>,

    #[command(flatten)]
    pub archive: ArchiveArgs,
}

/// Arguments for the id command
#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Collection (bucket) the paths belong to
    #[arg(long)]
    pub collection: Option<String>,

    /// Source paths
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level requested by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}
