//! Blocking HTTP client for the Pushshift-style search endpoint.

use crate::config::HarvestOptions;
use crate::fetch::{PageError, PageRequest, PageSource};
use crate::records::Record;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

#[derive(Deserialize)]
struct SearchResponse<T> {
    data: Vec<T>,
}

#[derive(Clone, Debug)]
pub struct PushshiftClient {
    http: Client,
    base_url: String,
}

impl PushshiftClient {
    pub fn new(opts: &HarvestOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(opts.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self::with_client(http, &opts.base_url))
    }

    /// Use a preconfigured HTTP client (proxy, TLS or timeout settings of the caller).
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn endpoint(&self, req: &PageRequest) -> String {
        format!("{}/{}/", self.base_url, req.kind.dir_name())
    }
}

impl PageSource for PushshiftClient {
    fn fetch_page<T: Record>(&self, req: &PageRequest) -> Result<Vec<T>, PageError> {
        let params = [
            ("subreddit", req.community.clone()),
            ("after", req.after.to_string()),
            ("before", req.before.to_string()),
            ("q", String::new()),
            ("size", req.size.to_string()),
        ];
        let resp = self.http.get(self.endpoint(req)).query(&params).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PageError::Status(status.as_u16()));
        }
        let body = resp.text()?;
        let parsed: SearchResponse<T> =
            serde_json::from_str(&body).map_err(|e| PageError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }
}
