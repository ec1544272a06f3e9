//! Proxy Fetcher Library
//!
//! A Rust library for fetching media proxies from an archive service. It checks a list of
//! source files against the archive, requests generation of missing proxies and downloads
//! existing ones concurrently, logging every outcome to a CSV result log.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_WORKER_COUNT, 5);
        assert_eq!(ENV_SECRET, "ARCHIVE_HUNTER_SECRET");
        assert!(USER_AGENT.starts_with("proxy-fetcher/"));
    }

    #[test]
    fn test_error_types() {
        let queue_error = errors::QueueError::NoConsumers;
        let app_error = AppError::Queue(queue_error);

        assert_eq!(app_error.category(), "queue");
        assert!(!app_error.is_recoverable());
    }
}
