//! HTTP client wrapper for dereferencing external feature references.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_READ_TIMEOUT_SECS};
use crate::error::{FeatureError, Result};

/// User agent string identifying this exporter.
const USER_AGENT: &str = concat!("featuregraph/", env!("CARGO_PKG_VERSION"));

/// Create a client with the default timeouts.
pub fn create_default_client() -> Result<Client> {
    create_client(
        Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
        Duration::from_secs(HTTP_READ_TIMEOUT_SECS),
    )
}

/// Create a configured HTTP client.
///
/// # Arguments
/// * `connect_timeout` - Limit for establishing the connection
/// * `timeout` - Limit for the whole request including the body
pub fn create_client(connect_timeout: Duration, timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| FeatureError::Http {
            url: String::new(),
            source,
        })
}

/// Download a document as text.
///
/// A single attempt: connection failures, timeouts and non-success status
/// codes are returned to the caller, which decides whether to retry.
pub fn download_text(client: &Client, url: &str) -> Result<String> {
    let http_error = |source| FeatureError::Http {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(http_error)?;
    let bytes = response.bytes().map_err(http_error)?;
    tracing::debug!(url, bytes = bytes.len(), "downloaded external document");
    Ok(bytes_to_string(&bytes, url))
}

/// Decode a response body, replacing invalid UTF-8 sequences.
fn bytes_to_string(bytes: &[u8], url: &str) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(_) => {
            tracing::warn!(url, "response is not valid UTF-8, replacing invalid sequences");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        assert!(create_default_client().is_ok());
    }

    #[test]
    fn test_bytes_to_string_lossy() {
        assert_eq!(bytes_to_string(b"<a/>", "http://x"), "<a/>");
        assert_eq!(bytes_to_string(&[b'a', 0xff, b'b'], "http://x"), "a\u{fffd}b");
    }

    #[test]
    fn test_download_unreachable_host() {
        let client = create_client(Duration::from_millis(200), Duration::from_millis(500)).unwrap();
        let err = download_text(&client, "http://127.0.0.1:9/doc.xml").unwrap_err();
        assert!(matches!(err, FeatureError::Http { ref url, .. } if url == "http://127.0.0.1:9/doc.xml"));
    }
}
