//! Backward-walking paginated fetch of one (community, window, kind) triple.
//!
//! The loop is modelled as a small state machine. `transition` is pure: it only
//! looks at the current state and the outcome of one page request, so the
//! "same cursor on failure, cursor advanced only on success" rule can be tested
//! without any I/O. `Fetcher::fetch` drives it against a `PageSource`.

use crate::config::HarvestOptions;
use crate::date::TimeWindow;
use crate::records::{ItemKind, Record};
use std::thread::sleep;
use std::time::Duration;
use thiserror::Error;

/// One page query against the search endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub community: String,
    pub kind: ItemKind,
    pub after: i64,
    pub before: i64,
    pub size: usize,
}

/// Transient failure of a single page request. Always retried.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Failure signal for a whole window. Nothing fetched so far may be persisted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("abandoned after {attempts} consecutive failed requests at cursor {cursor}: {last_error}")]
    Abandoned {
        attempts: usize,
        cursor: i64,
        last_error: PageError,
    },
}

/// Anything that can answer a page query with typed records.
pub trait PageSource {
    fn fetch_page<T: Record>(&self, req: &PageRequest) -> Result<Vec<T>, PageError>;
}

impl<P: PageSource + ?Sized> PageSource for &P {
    fn fetch_page<T: Record>(&self, req: &PageRequest) -> Result<Vec<T>, PageError> {
        (**self).fetch_page(req)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FetchPolicy {
    pub page_size: usize,
    pub page_delay: Duration,
    pub retry_delay: Duration,
    pub max_retries: usize,
    pub stop_at_window_start: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&HarvestOptions::default())
    }
}

impl From<&HarvestOptions> for FetchPolicy {
    fn from(opts: &HarvestOptions) -> Self {
        Self {
            page_size: opts.page_size.max(1),
            page_delay: opts.page_delay,
            retry_delay: opts.retry_delay,
            max_retries: opts.max_retries.max(1),
            stop_at_window_start: opts.stop_at_window_start,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    /// Next request uses `cursor` as its upper bound.
    Fetching { cursor: i64, failures: usize },
    /// Last request failed; wait, then retry the same cursor.
    BackingOff { cursor: i64, failures: usize },
    Succeeded,
    Abandoned { cursor: i64, failures: usize },
}

/// What one page request produced, reduced to what the state machine needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Empty,
    Items { oldest: i64 },
    Failed,
}

impl FetchState {
    pub fn start(window: TimeWindow) -> Self {
        FetchState::Fetching { cursor: window.end, failures: 0 }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FetchState::Succeeded | FetchState::Abandoned { .. })
    }

    /// Leave `BackingOff` once the retry delay has elapsed.
    pub fn resume(self) -> Self {
        match self {
            FetchState::BackingOff { cursor, failures } => FetchState::Fetching { cursor, failures },
            other => other,
        }
    }
}

/// Pure transition for a `Fetching` state given the outcome of its request.
/// Non-`Fetching` states are returned unchanged.
pub fn transition(state: FetchState, outcome: PageOutcome, policy: &FetchPolicy, window: TimeWindow) -> FetchState {
    let FetchState::Fetching { cursor, failures } = state else {
        return state;
    };
    match outcome {
        PageOutcome::Empty => FetchState::Succeeded,
        PageOutcome::Items { oldest } => {
            let next = oldest.saturating_sub(1);
            if policy.stop_at_window_start && next < window.start {
                FetchState::Succeeded
            } else {
                FetchState::Fetching { cursor: next, failures: 0 }
            }
        }
        PageOutcome::Failed => {
            let failures = failures + 1;
            if failures >= policy.max_retries.max(1) {
                FetchState::Abandoned { cursor, failures }
            } else {
                FetchState::BackingOff { cursor, failures }
            }
        }
    }
}

pub struct Fetcher<P> {
    source: P,
    policy: FetchPolicy,
}

impl<P: PageSource> Fetcher<P> {
    pub fn new(source: P, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch every item of kind `T` created inside `window`, newest pages first.
    /// Returns the complete collection or `FetchError`, never a partial result.
    pub fn fetch<T: Record>(&self, community: &str, window: TimeWindow) -> Result<Vec<T>, FetchError> {
        let mut items: Vec<T> = Vec::new();
        let mut state = FetchState::start(window);
        let mut last_error: Option<PageError> = None;

        loop {
            match state {
                FetchState::Fetching { cursor, failures } => {
                    let req = PageRequest {
                        community: community.to_string(),
                        kind: T::KIND,
                        after: window.start,
                        before: cursor,
                        size: self.policy.page_size,
                    };
                    let outcome = match self.source.fetch_page::<T>(&req) {
                        Ok(page) => {
                            let oldest = page.iter().map(|it| it.created_utc()).min();
                            match oldest {
                                None => PageOutcome::Empty,
                                Some(oldest) => {
                                    tracing::debug!("Found {} more {}s (cursor {})", page.len(), T::KIND, cursor);
                                    items.extend(page);
                                    PageOutcome::Items { oldest }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to get {}s for {} at cursor {} (attempt {}): {}",
                                T::KIND, community, cursor, failures + 1, e
                            );
                            last_error = Some(e);
                            PageOutcome::Failed
                        }
                    };
                    state = transition(state, outcome, &self.policy, window);
                    if let PageOutcome::Items { .. } = outcome {
                        if !state.is_terminal() {
                            sleep(self.policy.page_delay);
                        }
                    }
                }
                FetchState::BackingOff { failures, .. } => {
                    tracing::debug!("Backing off after {} consecutive failures", failures);
                    sleep(self.policy.retry_delay);
                    state = state.resume();
                }
                FetchState::Succeeded => {
                    tracing::info!("{} {}s extracted for {}", items.len(), T::KIND, community);
                    return Ok(items);
                }
                FetchState::Abandoned { cursor, failures } => {
                    tracing::error!(
                        "Failed to get {}s for {} after {} attempts",
                        T::KIND, community, failures
                    );
                    return Err(FetchError::Abandoned {
                        attempts: failures,
                        cursor,
                        last_error: last_error.unwrap_or_else(|| PageError::Decode("no response".into())),
                    });
                }
            }
        }
    }
}
