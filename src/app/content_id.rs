//! Content identifiers for archive assets
//!
//! The archive addresses an asset by the base64 form of `collection:path`. Identifiers
//! longer than the service accepts have their middle removed before encoding.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};

use crate::constants::archive::{ID_SEPARATOR, MAX_ID_LENGTH};

/// Archive primary key for a (collection, path) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    /// Derive the identifier for `path` inside `collection`
    pub fn new(collection: &str, path: &str) -> Self {
        let joined = format!("{collection}{ID_SEPARATOR}{path}");
        let chars: Vec<char> = joined.chars().collect();
        let source = if chars.len() > MAX_ID_LENGTH {
            shorten(&chars)
        } else {
            joined
        };
        Self(STANDARD.encode(source.as_bytes()))
    }

    /// Wrap an identifier that was computed elsewhere
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back to `collection:path`, if the identifier is valid UTF-8 base64
    pub fn decode(&self) -> Option<String> {
        let bytes = STANDARD.decode(&self.0).ok()?;
        String::from_utf8(bytes).ok()
    }
}

/// Drop the middle third so the result fits the service limit
fn shorten(chars: &[char]) -> String {
    let chunk = chars.len() / 3;
    let taken = 2 * chunk;

    if taken > MAX_ID_LENGTH {
        let half = MAX_ID_LENGTH / 2;
        return chars[..half]
            .iter()
            .chain(&chars[chars.len() - half..])
            .collect();
    }

    let mid = MAX_ID_LENGTH - taken;
    chars[..chunk]
        .iter()
        .chain(&chars[chunk..chunk + mid])
        .chain(&chars[2 * chunk..3 * chunk])
        .collect()
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
