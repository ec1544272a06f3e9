//! Request signing for the archive API
//!
//! Every API call carries an HMAC token computed over a canonical string built from the
//! request. Two generations of the scheme exist:
//!
//! - path-only: `date "\n" path`, HMAC-SHA256, sent in the `X-Gu-Tools-HMAC-*` headers
//! - content-aware: `date "\n" length "\n" checksum "\n" method "\n" path[?query]`,
//!   HMAC-SHA384, sent in `Date`, `Authorization` and `X-Sha384-Checksum`
//!
//! A signature is only valid for the request it was computed for, so nothing here is cached.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384};
use url::Url;

use crate::constants::signing;
use crate::errors::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;

/// Which generation of the signing scheme the target endpoint expects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    /// Date and URL path only, SHA-256
    #[default]
    PathOnly,
    /// Date, body length, body checksum, method and path with query, SHA-384
    ContentAware,
}

/// Headers and diagnostics for one outbound request
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: HeaderMap,
    pub canonical_string: String,
    pub timestamp: DateTime<Utc>,
    authorization: String,
    date: String,
    checksum: Option<String>,
}

impl SignedRequest {
    /// Value of the token header, `HMAC <base64>`
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// HTTP date the signature was computed for
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Base64 SHA-384 of the body, content-aware scheme only
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Attach the signed headers to a request
    pub fn apply(self, builder: RequestBuilder) -> RequestBuilder {
        builder.headers(self.headers)
    }
}

/// Signs archive requests with a shared secret
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
    scheme: SignatureScheme,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("secret", &"<redacted>")
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl RequestSigner {
    /// Create a signer; the secret must not be empty
    pub fn new(secret: impl Into<String>, scheme: SignatureScheme) -> AuthResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::InvalidKey {
                reason: "shared secret is empty".to_string(),
            });
        }
        Ok(Self { secret, scheme })
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Sign a request using the current time
    pub fn sign(&self, method: &Method, url: &Url, body: &[u8]) -> AuthResult<SignedRequest> {
        self.sign_at(method, url, body, Utc::now())
    }

    /// Sign a request as of `now`
    ///
    /// Pure in its inputs: the same arguments always produce the same token.
    pub fn sign_at(
        &self,
        method: &Method,
        url: &Url,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> AuthResult<SignedRequest> {
        let date = http_date(now);

        let (canonical_string, token, checksum) = match self.scheme {
            SignatureScheme::PathOnly => {
                let canonical = format!("{}\n{}", date, url.path());
                let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
                    .map_err(|e| AuthError::InvalidKey {
                        reason: e.to_string(),
                    })?;
                mac.update(canonical.as_bytes());
                let token = STANDARD.encode(mac.finalize().into_bytes());
                (canonical, token, None)
            }
            SignatureScheme::ContentAware => {
                let checksum = body_checksum(body);
                let target = match url.query() {
                    Some(query) => format!("{}?{}", url.path(), query),
                    None => url.path().to_string(),
                };
                let canonical = format!(
                    "{}\n{}\n{}\n{}\n{}",
                    date,
                    body.len(),
                    checksum,
                    method.as_str(),
                    target
                );
                let mut mac = HmacSha384::new_from_slice(self.secret.as_bytes())
                    .map_err(|e| AuthError::InvalidKey {
                        reason: e.to_string(),
                    })?;
                mac.update(canonical.as_bytes());
                let token = STANDARD.encode(mac.finalize().into_bytes());
                (canonical, token, Some(checksum))
            }
        };

        let authorization = format!("{}{}", signing::TOKEN_PREFIX, token);

        let mut headers = HeaderMap::new();
        match self.scheme {
            SignatureScheme::PathOnly => {
                insert_header(&mut headers, signing::LEGACY_DATE_HEADER, &date)?;
                insert_header(&mut headers, signing::LEGACY_TOKEN_HEADER, &authorization)?;
            }
            SignatureScheme::ContentAware => {
                insert_header(&mut headers, signing::DATE_HEADER, &date)?;
                insert_header(&mut headers, signing::AUTHORIZATION_HEADER, &authorization)?;
                if let Some(checksum) = &checksum {
                    insert_header(&mut headers, signing::CHECKSUM_HEADER, checksum)?;
                }
            }
        }

        tracing::trace!("Signed {} {} with {:?}", method, url.path(), self.scheme);

        Ok(SignedRequest {
            headers,
            canonical_string,
            timestamp: now,
            authorization,
            date,
            checksum,
        })
    }
}

/// RFC 1123 date in GMT
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format(signing::HTTP_DATE_FORMAT).to_string()
}

/// Base64 SHA-384 of a request body; an empty body still has a checksum
pub fn body_checksum(body: &[u8]) -> String {
    STANDARD.encode(Sha384::digest(body))
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> AuthResult<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| AuthError::InvalidHeaderValue { header: name })?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeaderValue { header: name })?;
    headers.insert(header_name, header_value);
    Ok(())
}
