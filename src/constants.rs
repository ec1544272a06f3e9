//! Application constants for Proxy Fetcher
//!
//! This module centralizes the constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Hostname of the archive service
    pub const HOSTNAME: &str = "ARCHIVE_HUNTER_HOST";

    /// Shared HMAC secret for the archive service
    pub const SECRET: &str = "ARCHIVE_HUNTER_SECRET";

    /// Collection (bucket) the listed files belong to
    pub const COLLECTION: &str = "ARCHIVE_HUNTER_COLLECTION";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("proxy-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
}

/// Request signing constants
pub mod signing {
    /// Prefix of every authorization token
    pub const TOKEN_PREFIX: &str = "HMAC ";

    /// Date header used by the path-only scheme
    pub const LEGACY_DATE_HEADER: &str = "X-Gu-Tools-HMAC-Date";

    /// Token header used by the path-only scheme
    pub const LEGACY_TOKEN_HEADER: &str = "X-Gu-Tools-HMAC-Token";

    /// Date header used by the content-aware scheme
    pub const DATE_HEADER: &str = "Date";

    /// Token header used by the content-aware scheme
    pub const AUTHORIZATION_HEADER: &str = "Authorization";

    /// Body digest header used by the content-aware scheme
    pub const CHECKSUM_HEADER: &str = "X-Sha384-Checksum";

    /// RFC 1123 date format, always rendered in GMT
    pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
}

/// Archive service endpoints and identifier rules
pub mod archive {
    /// Longest identifier string (before base64) the service accepts
    pub const MAX_ID_LENGTH: usize = 512;

    /// Separator between collection and path in an identifier
    pub const ID_SEPARATOR: char = ':';

    /// Path prefix for all API calls
    pub const API_PREFIX: &str = "api";

    /// Query parameter naming the proxy type on the playable endpoint
    pub const PROXY_TYPE_PARAM: &str = "proxyType";
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for API requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;

    /// Automatic retries per API call; zero matches the historical behaviour
    pub const DEFAULT_MAX_RETRIES: u32 = 0;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;

    /// Ceiling for a single backoff delay (milliseconds)
    pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

    /// Largest accepted `client.max_retries`
    pub const MAX_RETRIES: u32 = 10;
}

/// File operation constants
pub mod files {
    /// Suffix of in-flight downloads before the atomic rename
    pub const PARTIAL_FILE_SUFFIX: &str = ".partial";

    /// Default result log file name
    pub const DEFAULT_OUTPUT_LOG: &str = "proxy-results.csv";

    /// Default download directory
    pub const DEFAULT_DOWNLOAD_DIR: &str = "./proxies";

    /// Upper bound on `-1`, `-2`, … suffixes tried for an unnamed download
    pub const MAX_NAME_ATTEMPTS: u32 = 100;

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "proxy-fetcher.toml";

    /// Directory name under the user config dir
    pub const CONFIG_DIR_NAME: &str = "proxy-fetcher";
}

/// Worker pool constants
pub mod workers {
    use super::Duration;

    /// Default number of concurrent download workers
    pub const DEFAULT_WORKER_COUNT: usize = 5;

    /// Maximum number of concurrent download workers
    pub const MAX_WORKER_COUNT: usize = 64;

    /// Default bound of the work queue
    pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

    /// How long an idle worker waits for work before giving up
    pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(600);

    /// Upper bound on resolving and downloading a single item
    pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(600);

    /// How often a blocked enqueue re-checks that consumers are still alive
    pub const ENQUEUE_POLL_INTERVAL: Duration = Duration::from_secs(1);
}

/// Input list filtering defaults
pub mod listing {
    /// File names matching these patterns are never processed
    pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[r"^Rendered - .*"];

    /// Lines starting with this marker are comments
    pub const COMMENT_PREFIX: char = '#';
}

// Re-export commonly used constants for convenience
pub use http::USER_AGENT;
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use workers::DEFAULT_WORKER_COUNT;

pub const ENV_HOSTNAME: &str = env::HOSTNAME;
pub const ENV_SECRET: &str = env::SECRET;
