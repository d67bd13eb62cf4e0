//! OKX request signing.
//!
//! Every private request carries four headers:
//! - `OK-ACCESS-KEY`: the API key
//! - `OK-ACCESS-SIGN`: base64(HMAC-SHA256(secret, timestamp + METHOD + path + body))
//! - `OK-ACCESS-TIMESTAMP`: ISO-8601 UTC timestamp with milliseconds
//! - `OK-ACCESS-PASSPHRASE`: the passphrase chosen when the key was created
//!
//! The exchange rejects stale timestamps, so headers are built per request.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;

use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

const HEADER_KEY: &str = "ok-access-key";
const HEADER_SIGN: &str = "ok-access-sign";
const HEADER_TIMESTAMP: &str = "ok-access-timestamp";
const HEADER_PASSPHRASE: &str = "ok-access-passphrase";

/// API key, secret key and passphrase for one OKX account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl Credentials {
    pub fn new(api_key: &str, secret_key: &str, passphrase: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
            passphrase: passphrase.to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &"***")
            .field("passphrase", &"***")
            .finish()
    }
}

/// Keep the first four characters of a key for identification in logs.
pub fn redact(value: &str) -> String {
    let head: String = value.chars().take(4).collect();
    format!("{}***", head)
}

/// Format a timestamp the way OKX expects it: `2020-12-08T09:08:57.715Z`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Compute the `OK-ACCESS-SIGN` value.
///
/// `request_path` includes the query string; `body` is the JSON body or an
/// empty string for GET requests.
pub fn sign(
    secret_key: &str,
    timestamp: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let prehash = format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body);

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| ExchangeError::Auth(format!("invalid secret key: {}", e)))?;
    mac.update(prehash.as_bytes());

    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the four authentication headers for a request issued at `now`.
pub fn auth_headers(
    credentials: &Credentials,
    now: DateTime<Utc>,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<HeaderMap, ExchangeError> {
    let ts = timestamp(now);
    let signature = sign(&credentials.secret_key, &ts, method, request_path, body)?;

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(HEADER_KEY), header_value(&credentials.api_key)?);
    headers.insert(HeaderName::from_static(HEADER_SIGN), header_value(&signature)?);
    headers.insert(HeaderName::from_static(HEADER_TIMESTAMP), header_value(&ts)?);
    headers.insert(
        HeaderName::from_static(HEADER_PASSPHRASE),
        header_value(&credentials.passphrase)?,
    );

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, ExchangeError> {
    HeaderValue::from_str(value).map_err(|e| ExchangeError::Auth(format!("invalid header value: {}", e)))
}
