//! Command handlers for Proxy Fetcher CLI
//!
//! This module implements the command handlers that merge CLI arguments into the loaded
//! configuration and drive the core application functionality.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::app::client::ArchiveClient;
use crate::app::content_id::ContentId;
use crate::app::models::required_proxies;
use crate::app::orchestrator::Orchestrator;
use crate::cli::progress::scan_spinner;
use crate::cli::{FetchArgs, IdArgs, InspectArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, ListError, Result};

/// Handle the fetch command
///
/// Runs the full scan and download pipeline and prints a summary. A run that had to stop
/// early, or whose result log was not closed cleanly, is reported as an error.
pub async fn handle_fetch(args: FetchArgs, mut config: AppConfig, quiet: bool) -> Result<()> {
    let start_time = Instant::now();

    args.validate().map_err(AppError::generic)?;
    args.apply_to(&mut config);
    config.validate()?;

    // Fail before contacting anything if there is nothing to read
    if !args.list.is_file() {
        return Err(ListError::NotFound {
            path: args.list.clone(),
        }
        .into());
    }

    let client = Arc::new(ArchiveClient::new(config.client_config()?)?);
    let run_config = config.orchestrator_config(&args.list)?;
    info!(
        "Fetching proxies into {} using {}",
        run_config.worker.download_dir.display(),
        client.base_url()
    );

    let spinner = scan_spinner(config.pipeline.show_progress && !quiet);
    let summary = Orchestrator::new(run_config, client)
        .with_progress(spinner)
        .run()
        .await?;

    if !quiet {
        println!("{summary}");
        println!("Completed in {:.1?}", start_time.elapsed());
    }

    if summary.is_failure() {
        return Err(AppError::generic(
            "Run did not complete, see the log for details",
        ));
    }
    if summary.pool.idle > 0 || summary.pool.panicked > 0 {
        warn!("Some workers did not shut down cleanly");
    }

    Ok(())
}

/// Handle the inspect command
///
/// Checks one asset and prints its proxies, or the proxies it would need.
pub async fn handle_inspect(args: InspectArgs, mut config: AppConfig) -> Result<()> {
    args.archive.apply_to(&mut config);

    let id = match (&args.id, &args.path) {
        (Some(id), _) => ContentId::from_encoded(id.clone()),
        (None, Some(path)) => ContentId::new(config.collection()?, path),
        (None, None) => return Err(AppError::generic("Either --id or --path is required")),
    };

    let client = ArchiveClient::new(config.client_config()?)?;

    println!("Content id: {id}");
    if let Some(decoded) = id.decode() {
        println!("Refers to:  {decoded}");
    }

    if !client.verify_exists(&id).await? {
        println!("Not present in the archive");
        return Ok(());
    }

    let proxies = client.list_proxies(&id).await?;
    if proxies.is_empty() {
        println!("No proxies");
        if let Some(path) = &args.path {
            let needed: Vec<&str> = required_proxies(path).iter().map(|t| t.as_str()).collect();
            if needed.is_empty() {
                println!("No proxy types apply to this file");
            } else {
                println!("Would request: {}", needed.join(", "));
            }
        }
        return Ok(());
    }

    println!("{} proxies:", proxies.len());
    for proxy in &proxies {
        let location = match (&proxy.bucket_name, &proxy.bucket_path) {
            (Some(bucket), Some(path)) => format!("{bucket}:{path}"),
            (None, Some(path)) => path.clone(),
            _ => "-".to_string(),
        };
        let state = if proxy.is_available() {
            "available"
        } else {
            "pending"
        };
        println!("  {:<10} {:<10} {}", proxy.proxy_type.as_str(), state, location);
    }

    Ok(())
}

/// Handle the id command
///
/// Prints one content identifier per path, in order.
pub fn handle_id(args: IdArgs, config: AppConfig) -> Result<()> {
    let collection = match &args.collection {
        Some(collection) => collection.clone(),
        None => config.collection()?.to_string(),
    };

    for path in &args.paths {
        println!("{}", ContentId::new(&collection, path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ArchiveArgs;
    use crate::errors::ConfigError;
    use std::path::PathBuf;

    fn fetch_args(list: PathBuf) -> FetchArgs {
        FetchArgs {
            list,
            archive: ArchiveArgs::default(),
            workers: None,
            download_dir: None,
            output: None,
            strip: None,
            ignore: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_fetch_without_secret_is_config_error() {
        let mut config = AppConfig::default();
        config.archive.hostname = Some("archive.example.com".to_string());
        config.archive.collection = Some("media".to_string());

        let result = handle_fetch(fetch_args(PathBuf::from("files.txt")), config, true).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_with_missing_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.archive.hostname = Some("archive.example.com".to_string());
        config.archive.collection = Some("media".to_string());
        config.archive.secret = Some("s3cret".to_string());

        let args = fetch_args(dir.path().join("absent.txt"));
        let result = handle_fetch(args, config, true).await;
        assert!(matches!(
            result,
            Err(AppError::List(ListError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_id_needs_collection() {
        let args = IdArgs {
            collection: None,
            paths: vec!["a.mov".to_string()],
        };
        assert!(handle_id(args, AppConfig::default()).is_err());

        let args = IdArgs {
            collection: Some("media".to_string()),
            paths: vec!["a.mov".to_string()],
        };
        assert!(handle_id(args, AppConfig::default()).is_ok());
    }
}
