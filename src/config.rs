use std::path::{Path, PathBuf};
use std::time::Duration;

/// Communities harvested when none are configured explicitly.
pub const DEFAULT_COMMUNITIES: [&str; 8] = [
    "ethereum",
    "cardano",
    "Bitcoin",
    "dashpay",
    "nanocurrency",
    "tezos",
    "Polkadot",
    "Monero",
];

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct HarvestOptions {
    pub data_root: PathBuf,
    pub communities: Vec<String>,
    pub start_year: u16,
    pub reference_hour: u8,           // hour-of-day anchoring each window's end

    // remote API
    pub base_url: String,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub page_delay: Duration,         // pause after every successful page
    pub retry_delay: Duration,        // pause after every failed page
    pub max_retries: usize,           // consecutive failures before a window is abandoned
    pub stop_at_window_start: bool,   // opt-in lower-bound guard on the cursor

    pub progress: bool,               // show progress bars
    pub log_file: Option<PathBuf>,    // None logs to stderr
    pub log_level: String,            // used when RUST_LOG is unset
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data/reddit"),
            communities: DEFAULT_COMMUNITIES.iter().map(|s| s.to_string()).collect(),
            start_year: 2015,
            reference_hour: 12,

            base_url: "https://api.pushshift.io/reddit/search".to_string(),
            request_timeout: Duration::from_secs(60),
            page_size: 500,
            page_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(10),
            max_retries: 10,
            stop_at_window_start: false,

            progress: true,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl HarvestOptions {
    pub fn with_data_root(mut self, root: impl AsRef<Path>) -> Self {
        self.data_root = root.as_ref().to_path_buf();
        self
    }
    pub fn with_communities<I, S>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.communities = communities
            .into_iter()
            .map(Into::into)
            .map(|s: String| s.trim().trim_start_matches("r/").to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }
    pub fn with_start_year(mut self, year: u16) -> Self {
        self.start_year = year;
        self
    }
    pub fn with_reference_hour(mut self, hour: u8) -> Self {
        self.reference_hour = hour.min(23);
        self
    }
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }
    pub fn with_delays(mut self, page_delay: Duration, retry_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self.retry_delay = retry_delay;
        self
    }
    pub fn with_max_retries(mut self, n: usize) -> Self {
        self.max_retries = n.max(1);
        self
    }
    pub fn with_stop_at_window_start(mut self, yes: bool) -> Self {
        self.stop_at_window_start = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}
