//! Data models for Proxy Fetcher
//!
//! Proxy kinds, the extension policy that decides which proxies a media file needs, the
//! archive's proxy listing format, and the two values that flow through the pipeline:
//! [`WorkItem`] into the worker pool and [`ResultRecord`] out of it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::app::content_id::ContentId;

/// Kind of derived media the archive can hold for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyType {
    Video,
    Audio,
    Thumbnail,
    Poster,
    /// Anything the archive reports that this tool does not know about
    #[serde(other)]
    Unknown,
}

impl ProxyType {
    /// Wire name used in URLs and listings
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Video => "VIDEO",
            ProxyType::Audio => "AUDIO",
            ProxyType::Thumbnail => "THUMBNAIL",
            ProxyType::Poster => "POSTER",
            ProxyType::Unknown => "UNKNOWN",
        }
    }

    /// Extension used when the proxy name does not carry one
    pub fn default_extension(&self) -> &'static str {
        match self {
            ProxyType::Video => "mp4",
            ProxyType::Audio => "mp3",
            ProxyType::Thumbnail | ProxyType::Poster => "jpg",
            ProxyType::Unknown => "bin",
        }
    }

    /// Appended to the file stem so several proxies of one asset can share a directory
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ProxyType::Video | ProxyType::Audio => "",
            ProxyType::Thumbnail => "_thumb",
            ProxyType::Poster => "_poster",
            ProxyType::Unknown => "_proxy",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProxyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIDEO" => Ok(ProxyType::Video),
            "AUDIO" => Ok(ProxyType::Audio),
            "THUMBNAIL" => Ok(ProxyType::Thumbnail),
            "POSTER" => Ok(ProxyType::Poster),
            other => Err(format!("unknown proxy type: {other}")),
        }
    }
}

/// Extension class of a source media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Video,
    Audio,
    Image,
    Unrecognized,
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mxf", "mp4", "mov", "lrv", "mkv", "m4v", "mpg", "mpeg", "mts", "webm",
];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "aif", "aiff", "mp3", "m4a", "flac", "aac"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "cr2", "tif", "tiff", "tga", "png", "dpx"];

impl MediaClass {
    /// Classify a lowercase extension without the leading dot
    pub fn classify(extension: &str) -> Self {
        let ext = extension.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaClass::Video
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaClass::Audio
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaClass::Image
        } else {
            MediaClass::Unrecognized
        }
    }

    /// Proxies the archive should hold for this class
    pub fn required_proxies(&self) -> &'static [ProxyType] {
        match self {
            MediaClass::Video => &[ProxyType::Video, ProxyType::Thumbnail],
            MediaClass::Audio => &[ProxyType::Audio, ProxyType::Thumbnail],
            MediaClass::Image => &[ProxyType::Thumbnail],
            MediaClass::Unrecognized => &[],
        }
    }
}

/// Required proxies for a file, keyed on its extension
pub fn required_proxies(path: &str) -> &'static [ProxyType] {
    match file_extension(path) {
        Some(ext) => MediaClass::classify(&ext).required_proxies(),
        None => &[],
    }
}

/// Lowercase extension of the last path component, if it has one
pub fn file_extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Last `/`-separated component of a path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// One proxy as reported by the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDescriptor {
    pub file_id: String,
    #[serde(default)]
    pub proxy_id: Option<String>,
    pub proxy_type: ProxyType,
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub bucket_path: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl ProxyDescriptor {
    /// Whether the archive actually has content stored for this proxy
    pub fn is_available(&self) -> bool {
        self.bucket_path
            .as_deref()
            .map(|p| !p.is_empty())
            .unwrap_or(false)
    }
}

/// Body of the proxy listing endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyListing {
    #[serde(default)]
    pub entries: Vec<ProxyDescriptor>,
    #[serde(default)]
    pub entry_count: u64,
}

/// One proxy download, handed from the scanner to the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source_bucket: String,
    pub source_path: String,
    pub proxy_type: ProxyType,
    pub proxy_archive_id: ContentId,
    pub display_name: String,
}

impl WorkItem {
    /// Build the work item for one listed proxy of a source file
    pub fn for_proxy(
        source_bucket: &str,
        source_path: &str,
        content_id: &ContentId,
        proxy: &ProxyDescriptor,
    ) -> Self {
        let display_name = proxy
            .bucket_path
            .as_deref()
            .map(file_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| file_name(source_path))
            .to_string();

        Self {
            source_bucket: source_bucket.to_string(),
            source_path: source_path.to_string(),
            proxy_type: proxy.proxy_type,
            proxy_archive_id: content_id.clone(),
            display_name,
        }
    }
}

/// Outcome of one work item, one row of the result log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub media_path: String,
    pub media_bucket: String,
    pub proxy_path: String,
    pub error: String,
}

impl ResultRecord {
    pub fn success(item: &WorkItem, proxy_path: impl Into<String>) -> Self {
        Self {
            media_path: item.source_path.clone(),
            media_bucket: item.source_bucket.clone(),
            proxy_path: proxy_path.into(),
            error: String::new(),
        }
    }

    pub fn failure(item: &WorkItem, error: impl fmt::Display) -> Self {
        let mut error = error.to_string();
        if error.is_empty() {
            error.push_str("unknown error");
        }
        Self {
            media_path: item.source_path.clone(),
            media_bucket: item.source_bucket.clone(),
            proxy_path: String::new(),
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}
