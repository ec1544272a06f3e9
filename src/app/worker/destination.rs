//! Local destination paths for downloaded proxies
//!
//! The destination is derived from the work item alone, so re-running over the same list
//! lands on the same path and the existing file is recognised. Probing for a free
//! `name-N.ext` is kept only for items that carry no usable source path.

use std::path::{Path, PathBuf};

use crate::app::models::{file_extension, file_name, WorkItem};
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Deterministic download path for a work item
///
/// `<download_dir>/<source dirs>/<source name><type suffix>.<ext>`, where the extension
/// comes from the proxy's own name or the proxy type's default. The source name keeps its
/// extension, so `clip.mov` and `clip.mxf` in one directory never share a destination.
pub fn destination_for(download_dir: &Path, item: &WorkItem) -> DownloadResult<PathBuf> {
    let components = sanitized_components(&item.source_path);
    let extension = file_extension(&item.display_name)
        .unwrap_or_else(|| item.proxy_type.default_extension().to_string());

    let Some((source_name, dirs)) = components.split_last() else {
        tracing::debug!(
            "No usable source path for {}, probing for a free name",
            item.display_name
        );
        let stem = fallback_stem(&item.display_name);
        return find_available_path(download_dir, &stem, &extension, files::MAX_NAME_ATTEMPTS);
    };

    let mut path = download_dir.to_path_buf();
    for dir in dirs {
        path.push(dir);
    }
    path.push(format!(
        "{}{}.{}",
        source_name,
        item.proxy_type.file_suffix(),
        extension
    ));
    Ok(path)
}

/// First free `stem.ext`, `stem-1.ext`, `stem-2.ext`, … in `dir`
///
/// # Errors
///
/// `DownloadError::NamingExhausted` when all `max_attempts` candidates exist
pub fn find_available_path(
    dir: &Path,
    stem: &str,
    extension: &str,
    max_attempts: u32,
) -> DownloadResult<PathBuf> {
    for counter in 0..max_attempts {
        let name = if counter == 0 {
            format!("{stem}.{extension}")
        } else {
            format!("{stem}-{counter}.{extension}")
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
        tracing::debug!("Path already exists: {}", candidate.display());
    }

    Err(DownloadError::NamingExhausted {
        attempts: max_attempts,
    })
}

/// Path components that are safe to recreate under the download directory
fn sanitized_components(path: &str) -> Vec<&str> {
    path.split(|c: char| c == '/' || c == '\\')
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "." && *c != "..")
        .collect()
}

fn fallback_stem(display_name: &str) -> String {
    let name = file_name(display_name).trim_start_matches('.');
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    if stem.is_empty() {
        "proxy".to_string()
    } else {
        stem.to_string()
    }
}
