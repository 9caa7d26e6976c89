use anyhow::Result;
use reqwest::blocking::Client;
use std::time::Duration;

use crate::entry::{DiskUsage, Entry};

/// Where directory listings come from.
pub trait ListingSource {
    fn fetch(&self, path: &str) -> Result<Vec<Entry>>;
}

/// Talks to a running xplore server.
pub struct HttpListingSource {
    client: Client,
    server_url: String,
}

impl HttpListingSource {
    /// server_url: e.g. "http://localhost:9001"
    pub fn new(server_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET /api/disk-usage
    pub fn disk_usage(&self) -> Result<DiskUsage> {
        let url = format!("{}/api/disk-usage", self.server_url);
        let usage = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json::<DiskUsage>()?;
        Ok(usage)
    }
}

impl ListingSource for HttpListingSource {
    /// GET /api/files?path=
    fn fetch(&self, path: &str) -> Result<Vec<Entry>> {
        let url = format!("{}/api/files", self.server_url);
        let entries = self
            .client
            .get(url)
            .query(&[("path", path)])
            .send()?
            .error_for_status()?
            .json::<Vec<Entry>>()?;
        Ok(entries)
    }
}
