//! Fetching of external feature documents.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::ExportConfig;
use crate::error::Result;
use crate::http::{create_client, download_text};

/// Source of documents behind external references.
pub trait ExternalResolver {
    /// Return the document at `url`, which carries no fragment.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Resolver issuing one blocking GET per document.
///
/// Connect and read timeouts come from the export settings; failures are
/// not retried.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: Client,
}

impl HttpResolver {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let client = create_client(
            Duration::from_secs(config.http_connect_timeout_secs),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ExternalResolver for HttpResolver {
    fn fetch(&self, url: &str) -> Result<String> {
        download_text(&self.client, url)
    }
}
